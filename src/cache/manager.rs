//! # 分区缓存管理器
//!
//! ## 设计思路
//!
//! 每个分区（字体 / 背景 / 角色 / 通用图片）拥有独立的映射与读写锁，
//! 清理某个分区绝不影响其它分区。条目插入后不可变，每次读取返回副本，
//! 调用方可以随意修改自己的副本而不会污染缓存母版。
//!
//! ## 实现思路
//!
//! - 命中：读锁内克隆后返回，读与读之间互不阻塞。
//! - 未命中：锁外解码，再用写锁 `entry().or_insert()` 插入（先到先得）。
//! - 每个分区带一个 `epoch`，清理时递增；解码期间发生过清理的结果只返回、不入缓存，
//!   避免旧缩放参数的图片在失效后又被写回。
//! - 资源缺失时返回透明占位图并记日志，占位图不入缓存。

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use fontdue::{Font, FontSettings};
use image::RgbaImage;

use super::decode;
use super::paths::{AssetLocator, extensionless_key};
use crate::config::{CANVAS_WIDTH, ConfigStore};
use crate::error::AppError;

/// 缓存分区。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachePartition {
    Font,
    Background,
    Character,
    General,
}

impl CachePartition {
    pub const ALL: [CachePartition; 4] = [Self::Font, Self::Background, Self::Character, Self::General];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Font => "font",
            Self::Background => "background",
            Self::Character => "character",
            Self::General => "image",
        }
    }
}

/// 清理范围。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope {
    All,
    Only(CachePartition),
}

impl FromStr for ClearScope {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "font" => Ok(Self::Only(CachePartition::Font)),
            "background" => Ok(Self::Only(CachePartition::Background)),
            "character" => Ok(Self::Only(CachePartition::Character)),
            "image" | "general" => Ok(Self::Only(CachePartition::General)),
            other => Err(AppError::Config(format!(
                "未知缓存分区：{}（可选：all / font / background / character / image）",
                other
            ))),
        }
    }
}

struct Partition<T> {
    entries: RwLock<HashMap<String, T>>,
    epoch: AtomicU64,
}

impl<T: Clone> Partition<T> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            epoch: AtomicU64::new(0),
        }
    }

    fn get(&self, key: &str) -> Option<T> {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        guard.get(key).cloned()
    }

    /// 插入（若解码期间未被清理）并返回副本。
    fn insert_if_current(&self, key: String, value: T, epoch: u64) -> T {
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return value;
        }
        guard.entry(key).or_insert(value).clone()
    }

    fn clear(&self) {
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        self.epoch.fetch_add(1, Ordering::SeqCst);
        guard.clear();
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn keys(&self) -> Vec<String> {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = guard.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}

/// 分区缓存管理器。
///
/// 进程内通常只创建一个实例，以 `Arc<CacheManager>` 传给渲染器、预加载与调度流水线。
pub struct CacheManager {
    store: ConfigStore,
    fonts: Partition<Font>,
    backgrounds: Partition<RgbaImage>,
    characters: Partition<RgbaImage>,
    general: Partition<RgbaImage>,
    frame_valid: AtomicBool,
}

impl CacheManager {
    pub fn new(store: ConfigStore) -> Self {
        Self {
            store,
            fonts: Partition::new(),
            backgrounds: Partition::new(),
            characters: Partition::new(),
            general: Partition::new(),
            frame_valid: AtomicBool::new(false),
        }
    }

    fn locator(&self) -> AssetLocator {
        AssetLocator::new(self.store.snapshot().assets_path)
    }

    /// 背景图：首次解码时等比缩放到画布宽度并长期缓存。
    pub fn background(&self, name: &str) -> RgbaImage {
        let path = self.locator().background_path(name);
        let key = path.to_string_lossy().to_string();

        if let Some(hit) = self.backgrounds.get(&key) {
            return hit;
        }

        let epoch = self.backgrounds.epoch();
        match decode::decode_rgba(&path) {
            Ok(img) => {
                let img = decode::resize_to_width(img, CANVAS_WIDTH);
                self.backgrounds.insert_if_current(key, img, epoch)
            }
            Err(err) => {
                log::warn!("⚠️ 背景图片不可用，使用透明占位图: {} ({})", path.display(), err);
                decode::resize_to_width(decode::placeholder(), CANVAS_WIDTH)
            }
        }
    }

    /// 角色立绘：解码时按配置中角色的缩放比例预先缩放。
    ///
    /// 缩放比例变更后需要调用 `clear(ClearScope::Only(CachePartition::Character))`。
    pub fn character(&self, character: &str, emotion_index: u32) -> RgbaImage {
        let config = self.store.snapshot();
        let path = AssetLocator::new(&config.assets_path).character_path(character, emotion_index);
        let key = extensionless_key(&path);

        if let Some(hit) = self.characters.get(&key) {
            return hit;
        }

        let epoch = self.characters.epoch();
        match decode::decode_rgba(&path) {
            Ok(img) => {
                let scale = config.character(character).map(|p| p.scale).unwrap_or(1.0);
                let img = decode::scale_by(img, scale);
                self.characters.insert_if_current(key, img, epoch)
            }
            Err(err) => {
                log::warn!("⚠️ 角色图片不可用，使用透明占位图: {} ({})", path.display(), err);
                decode::placeholder()
            }
        }
    }

    /// 通用贴图（文本框、名字框、额外图层）。
    pub fn image(&self, file: &str) -> RgbaImage {
        let path = self.locator().shader_path(file);
        let key = path.to_string_lossy().to_string();

        if let Some(hit) = self.general.get(&key) {
            return hit;
        }

        let epoch = self.general.epoch();
        match decode::decode_rgba(&path) {
            Ok(img) => self.general.insert_if_current(key, img, epoch),
            Err(err) => {
                log::warn!("⚠️ 贴图不可用，使用透明占位图: {} ({})", path.display(), err);
                decode::placeholder()
            }
        }
    }

    /// 字体按“名称 + 字号”缓存；字体文件缺失时返回 `None`。
    pub fn font(&self, name: &str, size: u32) -> Option<Font> {
        let key = format!("{}_{}", name, size);
        if let Some(hit) = self.fonts.get(&key) {
            return Some(hit);
        }

        let path = self.locator().font_path(name);
        let epoch = self.fonts.epoch();
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(err) => {
                log::warn!("⚠️ 字体文件不可用: {} ({})", path.display(), err);
                return None;
            }
        };
        let settings = FontSettings {
            scale: size as f32,
            ..FontSettings::default()
        };
        match Font::from_bytes(data, settings) {
            Ok(font) => Some(self.fonts.insert_if_current(key, font, epoch)),
            Err(err) => {
                log::warn!("⚠️ 字体解析失败: {} ({})", path.display(), err);
                None
            }
        }
    }

    /// 清理指定分区；任何清理都会让上一帧的静态图层失效。
    pub fn clear(&self, scope: ClearScope) {
        let targets: Vec<CachePartition> = match scope {
            ClearScope::All => CachePartition::ALL.to_vec(),
            ClearScope::Only(partition) => vec![partition],
        };
        for partition in targets {
            match partition {
                CachePartition::Font => self.fonts.clear(),
                CachePartition::Background => self.backgrounds.clear(),
                CachePartition::Character => self.characters.clear(),
                CachePartition::General => self.general.clear(),
            }
            log::debug!("🧹 已清理缓存分区: {}", partition.as_str());
        }
        self.invalidate_frame();
    }

    pub fn len(&self, partition: CachePartition) -> usize {
        match partition {
            CachePartition::Font => self.fonts.len(),
            CachePartition::Background => self.backgrounds.len(),
            CachePartition::Character => self.characters.len(),
            CachePartition::General => self.general.len(),
        }
    }

    pub fn is_empty(&self, partition: CachePartition) -> bool {
        self.len(partition) == 0
    }

    /// 分区内的缓存键（排序后）。
    pub fn keys(&self, partition: CachePartition) -> Vec<String> {
        match partition {
            CachePartition::Font => self.fonts.keys(),
            CachePartition::Background => self.backgrounds.keys(),
            CachePartition::Character => self.characters.keys(),
            CachePartition::General => self.general.keys(),
        }
    }

    /// 上一帧合成结果的静态图层是否仍可复用。
    pub fn frame_valid(&self) -> bool {
        self.frame_valid.load(Ordering::SeqCst)
    }

    pub fn mark_frame_rendered(&self) {
        self.frame_valid.store(true, Ordering::SeqCst);
    }

    pub fn invalidate_frame(&self) {
        self.frame_valid.store(false, Ordering::SeqCst);
    }
}
