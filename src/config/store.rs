//! # 配置存储
//!
//! ## 设计思路
//!
//! 配置通过 `Arc<RwLock<AppConfig>>` 共享，单次请求内使用同一份快照，
//! 避免处理中途配置漂移。持久化沿用 `settings.json` 的做法：
//! `serde_json` 美化输出整份配置。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::AppConfig;
use crate::error::AppError;

/// 共享配置存储。
#[derive(Debug, Clone)]
pub struct ConfigStore {
    inner: Arc<RwLock<AppConfig>>,
    path: Option<PathBuf>,
}

impl ConfigStore {
    /// 纯内存存储，`save()` 为空操作。
    pub fn in_memory(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            path: None,
        }
    }

    /// 从 JSON 文件加载；文件不存在时使用默认配置并记住路径。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();
        let config = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str::<AppConfig>(&content)
                .map_err(|e| AppError::Config(format!("解析配置文件失败: {}", e)))?
        } else {
            log::warn!("⚠️ 配置文件不存在，使用默认配置: {}", path.display());
            AppConfig::default()
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(config)),
            path: Some(path),
        })
    }

    /// 获取配置快照。
    pub fn snapshot(&self) -> AppConfig {
        match self.inner.read() {
            Ok(cfg) => cfg.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 在写锁内修改配置，返回闭包结果。
    pub fn update<R>(&self, f: impl FnOnce(&mut AppConfig) -> R) -> R {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    pub fn save(&self) -> Result<(), AppError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let content = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| AppError::Config(format!("序列化配置失败: {}", e)))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// 关闭情感匹配并持久化。
    pub fn disable_sentiment(&self) {
        self.update(|cfg| cfg.sentiment.enabled = false);
        if let Err(err) = self.save() {
            log::warn!("⚠️ 保存情感匹配禁用状态失败: {}", err);
        }
    }

    pub fn set_sentiment_enabled(&self, enabled: bool) {
        self.update(|cfg| cfg.sentiment.enabled = enabled);
        if let Err(err) = self.save() {
            log::warn!("⚠️ 保存情感匹配设置失败: {}", err);
        }
    }
}
