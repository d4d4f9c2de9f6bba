//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，替代各模块中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)`、`expect()` 等不一致模式。
//!
//! 协作者（剪贴板、键盘注入、渲染器）统一返回 `Result<T, AppError>`，
//! 由调度流水线在边界处转换为人类可读的状态字符串，绝不向外传播。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `SentimentError` / `std::io::Error` 提供 `From` 转换，无需手动 map。

use crate::sentiment::SentimentError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 剪贴板读写操作失败
    #[error("剪贴板操作失败: {0}")]
    Clipboard(String),

    /// 输入模拟失败
    #[error("输入模拟失败: {0}")]
    Input(String),

    /// 图层合成失败
    #[error("图像合成失败: {0}")]
    Render(String),

    /// 图片解码 / 缩放失败
    #[error("图片处理失败: {0}")]
    Image(String),

    /// 配置读写失败
    #[error("配置错误: {0}")]
    Config(String),

    /// 阻塞线程池中的任务异常结束
    #[error("线程执行失败：{0}")]
    Task(String),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 情感分析子系统错误
    #[error("{0}")]
    Sentiment(#[from] SentimentError),
}
