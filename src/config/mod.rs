//! # 配置模块（config）
//!
//! - `model`：组件、角色、样式、情感匹配等数据形状
//! - `store`：共享快照与 JSON 持久化
//!
//! 配置文件如何编辑由外部 GUI 负责，这里只关心核心读取与回写的字段。

mod model;
mod store;

pub use model::{
    ALL_EMOTIONS_FILTER, Align, AppConfig, BackgroundLayer, CANVAS_WIDTH, CanvasSize,
    CharacterLayer, CharacterProfile, ComponentKind, CutMode, CutSettings, ModelConfig,
    OverlayLayer, PreloadSettings, Region, SentimentClientConfig, SentimentSettings, StyleConfig,
    TextConfig, VisualComponent,
};
pub use store::ConfigStore;
