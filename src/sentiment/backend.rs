//! # 聊天补全后端
//!
//! ## 设计思路
//!
//! 分析器只依赖 `ChatBackend` trait，生产环境使用 OpenAI 兼容的 HTTP 实现，
//! 测试中注入脚本化的假后端或 `wiremock` 服务器。
//!
//! ## 实现思路
//!
//! - `POST {base_url}chat/completions`，请求体用 `serde_json` 手动序列化。
//! - 只读取 `choices[0].message.content`，其余字段忽略。
//! - 非 2xx 响应保留状态码与响应体，便于状态栏展示原因。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use super::error::SentimentError;
use crate::config::SentimentClientConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// 单条对话消息。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// 聊天补全请求。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// 聊天补全后端。
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// 返回第一个候选回复的内容（未裁剪）。
    async fn complete(&self, request: &ChatRequest) -> Result<String, SentimentError>;
}

/// 根据客户端配置构建后端，便于测试替换。
pub type BackendFactory =
    Arc<dyn Fn(&SentimentClientConfig) -> Result<Arc<dyn ChatBackend>, SentimentError> + Send + Sync>;

/// 默认工厂：OpenAI 兼容 HTTP 后端。
pub fn openai_factory() -> BackendFactory {
    Arc::new(|config: &SentimentClientConfig| {
        let backend = OpenAiBackend::new(&config.base_url, &config.api_key)?;
        Ok(Arc::new(backend) as Arc<dyn ChatBackend>)
    })
}

/// OpenAI 兼容的 `chat/completions` 客户端。
pub struct OpenAiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiBackend {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, SentimentError> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(SentimentError::Config("base_url 不能为空".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SentimentError::Config(format!("HTTP 客户端构建失败: {}", e)))?;

        Ok(Self {
            client,
            endpoint: completions_endpoint(base_url),
            api_key: api_key.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn completions_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<String, SentimentError> {
        let body = serde_json::to_string(request)?;

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            log::warn!("⚠️ 聊天补全请求失败 status={} model={}", status.as_u16(), request.model);
            return Err(SentimentError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(SentimentError::EmptyReply)
    }
}
