//! # 分区缓存模块（cache）
//!
//! ## 设计思路
//!
//! 解码后的图片与字体按资源类型分区缓存，由一个显式的 `CacheManager`
//! 对象持有，不使用全局单例。渲染器、预加载线程与调度流水线共享同一个
//! `Arc<CacheManager>`。
//!
//! - `manager`：分区映射、读取副本、按分区清理、帧复用标志
//! - `decode`：解码、等比缩放、透明占位图
//! - `paths`：资源目录约定与扩展名探测
//!
//! ```text
//! CacheManager
//!    ├─ font        名称+字号 → fontdue::Font
//!    ├─ background  路径 → 缩放到画布宽度的 RGBA（长期）
//!    ├─ character   路径(去扩展名) → 预缩放 RGBA（缩放变更时清理）
//!    └─ general     路径 → RGBA
//! ```

mod decode;
mod manager;
mod paths;

pub use manager::{CacheManager, CachePartition, ClearScope};

pub(crate) use decode::{fit_within, resize_exact, scale_by};
