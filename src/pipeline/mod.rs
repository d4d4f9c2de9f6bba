//! # 调度流水线模块（pipeline）
//!
//! 从快捷键触发到图片发送出去的整条自动化链路。
//!
//! - `collab`：剪贴板 / 键盘 / 前台进程三个协作者 trait
//! - `keys`：剪切、粘贴、发送的按键序列
//! - `session`：计时参数与单次会话记录
//! - `dispatch`：`DispatchPipeline` 本体与预览生成

mod collab;
mod dispatch;
mod keys;
mod session;

pub use collab::{ClipboardAccess, ForegroundProcess, KeyInjector};
pub use dispatch::{
    DispatchPipeline, MSG_COPY_FAILED, MSG_NO_COMPONENTS, MSG_NO_CONTENT, MSG_NOT_ALLOWED,
};
pub use keys::{Key, KeyStep, KeyStroke, cut_plan, enter_plan, paste_plan};
pub use session::{AutomationSession, PipelineTimings};
