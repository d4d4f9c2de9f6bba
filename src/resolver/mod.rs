//! # 帧参数解析模块（resolver）
//!
//! ## 设计思路
//!
//! 把“随机选表情 / 随机选背景 / 强制覆盖 / 静态层复用”这些决策集中在一处，
//! 渲染器拿到的图层列表里不再有任何随机性。
//!
//! ```text
//! AppConfig.style.components ──clone──► 工作副本
//!                                         │
//!                          FrameResolver::resolve
//!                                         │
//!              Vec<ResolvedLayer> ◄───────┘   write_back_overrides ──► 持久配置
//! ```

mod frame_key;
mod layer;
mod resolve;

pub use frame_key::FrameKey;
pub use layer::{BackgroundFill, ResolvedComponent, ResolvedKind, ResolvedLayer};
pub use resolve::{FrameResolver, NAMEBOX_FONT, Resolution, SentimentPick, write_back_overrides};
