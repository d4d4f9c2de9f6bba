//! # 魔裁文本框：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │             外部 GUI / 快捷键 / 命令行 (main.rs)          │
//! │        StatusCallback ◄──── 状态文字 / 情感三态 ────┐     │
//! └───────┬──────────────────────────────────────────────┼─────┘
//!         │ generate_image / generate_preview            │
//! ┌───────┼──────────────────────────────────────────────┼─────┐
//! │       ▼            核心 (Rust)                       │     │
//! │  pipeline ── DispatchPipeline                        │     │
//! │   │  ├─ ClipboardAccess / KeyInjector / Foreground ──┼─ platform
//! │   │  ├─ resolver ── FrameResolver + FrameKey         │     │
//! │   │  ├─ render ──── Renderer (BasicRenderer)         │     │
//! │   │  └─ sentiment ─ SentimentClientManager ──────────┘     │
//! │   │                                                        │
//! │  cache ──── CacheManager (font/background/character/general)
//! │   ▲                                                        │
//! │  preload ── PreloadScheduler (单槽位后台线程)              │
//! │                                                            │
//! │  config ─── ConfigStore (Arc<RwLock<AppConfig>> + JSON)    │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`config`] | 配置数据模型与共享存储 |
//! | [`cache`] | 分区图片 / 字体缓存、帧复用标志 |
//! | [`resolver`] | 组件列表 → 无随机性的图层列表 |
//! | [`render`] | 合成器契约与参考实现 |
//! | [`preload`] | 角色 / 背景预加载 |
//! | [`sentiment`] | 情感分析客户端与生命周期 |
//! | [`pipeline`] | 剪贴板捕获与调度流水线 |
//! | [`platform`] | 剪贴板、键盘、前台进程的系统实现 |
//! | [`status`] | 状态回调类型 |

pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod platform;
pub mod preload;
pub mod render;
pub mod resolver;
pub mod sentiment;
pub mod status;
