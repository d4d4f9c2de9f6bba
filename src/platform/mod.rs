//! # 平台协作者（platform）
//!
//! 调度流水线三个协作者 trait 的系统实现：
//!
//! - `clipboard`：`arboard` 读写系统剪贴板
//! - `keyboard`：`enigo` 模拟按键
//! - `foreground`：前台进程检测（Windows / macOS）

mod clipboard;
mod foreground;
mod keyboard;

pub use clipboard::ArboardClipboard;
pub use foreground::SystemForeground;
pub use keyboard::EnigoKeyboard;
