//! 调度流水线依赖的外部协作者。
//!
//! 平台实现位于 `crate::platform`，测试中替换为记录调用的假实现。

use image::RgbaImage;

use super::keys::KeyStroke;
use crate::error::AppError;

/// 系统剪贴板。
pub trait ClipboardAccess: Send + Sync {
    fn clear(&self) -> Result<(), AppError>;

    /// 同时读取文本与图片；任意一项缺失返回 `None`。
    fn text_and_image(&self) -> Result<(Option<String>, Option<RgbaImage>), AppError>;

    fn copy_image(&self, image: &RgbaImage) -> Result<(), AppError>;

    fn has_image(&self) -> bool;
}

/// 键盘输入模拟。
pub trait KeyInjector: Send + Sync {
    /// 依次发送一批按键。
    fn send(&self, strokes: &[KeyStroke]) -> Result<(), AppError>;
}

/// 前台进程查询。
pub trait ForegroundProcess: Send + Sync {
    /// 前台窗口所属进程的可执行文件名；查询失败返回 `None`。
    fn active_process_name(&self) -> Option<String>;

    /// 当前平台是否支持查询；不支持时白名单检查总是通过。
    fn is_supported(&self) -> bool {
        true
    }
}
