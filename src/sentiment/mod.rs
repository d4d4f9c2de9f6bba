//! # 情感匹配模块（sentiment）
//!
//! 把捕获到的文本交给 OpenAI 兼容的聊天模型分类，得到闭合词表中的一个情感词，
//! 再由解析器挑选对应表情。整个子系统是“尽力而为”的：任何失败都只会让它
//! 自我禁用并报告原因，不会阻塞或打断图片生成。
//!
//! - `backend`：`ChatBackend` trait 与 reqwest 实现
//! - `analyzer`：提示词、握手、回复提取
//! - `manager`：生命周期状态机、按配置变化重新初始化
//! - `error`：`SentimentError`

mod analyzer;
mod backend;
mod error;
mod manager;

pub use analyzer::{SentimentAnalyzer, extract_emotion, extract_option, options_prompt, rule_prompt};
pub use backend::{
    BackendFactory, ChatBackend, ChatMessage, ChatRequest, OpenAiBackend, openai_factory,
};
pub use error::SentimentError;
pub use manager::{ClientState, SentimentClientManager};
