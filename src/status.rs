//! 状态回调。
//!
//! GUI 只通过两个回调观察核心：单参数的文字状态，以及情感分析子系统的三态生命周期。

use std::sync::Arc;

/// 人类可读的进度 / 结果消息。
pub type StatusCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// 情感分析子系统的生命周期快照。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SentimentStatus {
    pub initialized: bool,
    pub enabled: bool,
    pub initializing: bool,
}

impl SentimentStatus {
    pub const INITIALIZING: Self = Self {
        initialized: false,
        enabled: true,
        initializing: true,
    };
    pub const READY: Self = Self {
        initialized: true,
        enabled: true,
        initializing: false,
    };
    pub const DISABLED: Self = Self {
        initialized: false,
        enabled: false,
        initializing: false,
    };
}

pub type LifecycleCallback = Arc<dyn Fn(SentimentStatus) + Send + Sync>;

/// 只写日志的默认状态回调。
pub fn log_status() -> StatusCallback {
    Arc::new(|message: &str| log::info!("📣 {}", message))
}

/// 只写日志的默认生命周期回调。
pub fn log_lifecycle() -> LifecycleCallback {
    Arc::new(|status: SentimentStatus| {
        log::debug!(
            "📣 情感分析状态 initialized={} enabled={} initializing={}",
            status.initialized,
            status.enabled,
            status.initializing
        )
    })
}
