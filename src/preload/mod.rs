//! # 预加载模块（preload）
//!
//! ## 设计思路
//!
//! 用户切换角色后，在后台把该角色全部表情解码进缓存，首次生成时就能直接命中。
//! 预加载只追求“尽量快地跟上最新选择”，不保证完整：
//!
//! ```text
//! submit(A) ─┐
//! submit(B) ─┴─► [pending: B] ──► worker ──► cache.character(B, 1..=n)
//!                                   ▲
//!                     每个表情之间检查 generation，过期即放弃
//! ```
//!
//! ## 实现思路
//!
//! - 槽位：`Mutex<Option<String>>` + `Condvar`，覆盖写入。
//! - 取消：`AtomicU64` 代次作为取消令牌，工作线程取任务时记录代次，之后只读比较。
//! - 背景预加载是一次性线程，不占用角色预加载的槽位。

mod scheduler;

pub use scheduler::{PreloadProgress, PreloadScheduler};
