/// 情感分析后端错误。
///
/// 只在 `sentiment` 模块内部流动，管理器在边界处把它们降级为
/// “未初始化 / 无分类结果”，不会传播到调度流水线。
#[derive(Debug, thiserror::Error)]
pub enum SentimentError {
    #[error("网络请求失败: {0}")]
    Network(String),

    #[error("服务端返回错误 HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("响应解析失败: {0}")]
    Decode(String),

    #[error("模型返回了空内容")]
    EmptyReply,

    /// 规则握手未被模型确认
    #[error("AI未正确确认规则，回复: {0}")]
    Handshake(String),

    #[error("情感分析配置错误: {0}")]
    Config(String),
}

impl From<reqwest::Error> for SentimentError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SentimentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
