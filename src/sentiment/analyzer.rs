//! # 情感分析器
//!
//! ## 设计思路
//!
//! 一个分析器绑定一个后端 + 模型 + 情感词表。连接分两步：
//!
//! 1. 探测：发送 `Hello`（`max_tokens = 5`），要求返回非空内容。
//! 2. 握手：以规则提示词为 system、`请任意回复` 为 user，回复（小写后）
//!    必须包含词表中的至少一个词，否则视为模型没有接受规则。
//!
//! 分类时把回复中 ASCII 单词字符与中日韩统一表意文字以外的字符全部去掉，
//! 剩余内容必须与词表某项完全一致。

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::backend::{ChatBackend, ChatMessage, ChatRequest};
use super::error::SentimentError;

const TEMPERATURE: f32 = 0.1;
const PROBE_MAX_TOKENS: u32 = 5;
const HANDSHAKE_MESSAGE: &str = "请任意回复";

static NON_EMOTION_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\x{4e00}-\x{9fff}]").expect("valid emotion regex"));

/// 规则提示词，列出全部情感词；无法判断时要求返回“平静”。
pub fn rule_prompt(emotions: &[String]) -> String {
    let options = emotions
        .iter()
        .map(|e| format!("'{}'", e))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "你是一个专门聊天文本的情感分析助手。你的任务是：分析用户输入文本的情感，并从以下选项中选择最匹配的一个：[{}]。\n\n\
         规则：\n\
         1. 只返回情感词汇，不要添加其他内容\n\
         2. 文本没有实际含义时，可能需要推测前后文来判断情感\n\
         3. 无法判断或无内容时返回\"平静\"\n\
         4. 选项列表总是以最新的为准\n\n\
         请开始分析随后的用户输入：",
        options
    )
}

/// 自定义选项列表的提示词。
pub fn options_prompt(options: &[String]) -> String {
    format!(
        "你是一个聊天文本情感分析助手。你需要分析用户输入文本的情感，并从以下选项中选择最合适的一个表情，动作或者情感：[{}]。\n\n\
         规则：\n\
         1. 只返回选项中的词汇，不要添加其他内容\n\
         2. 文本没有实际含义时，可能需要推测前后文来判断情感\n\
         3. 无法判断或无内容时返回最后一个选项\n\
         4. 选项列表总是以最新的为准\n\n\
         请开始分析随后的用户输入：",
        options.join(", ")
    )
}

/// 去掉无关字符后与词表精确匹配。
pub fn extract_emotion(reply: &str, emotions: &[String]) -> Option<String> {
    let cleaned = NON_EMOTION_CHARS.replace_all(reply, "");
    emotions.iter().find(|e| e.as_str() == cleaned).cloned()
}

/// 依次尝试：完全匹配、包含匹配、忽略大小写的包含匹配。
pub fn extract_option(reply: &str, options: &[String]) -> Option<String> {
    let cleaned = reply.trim();
    if let Some(hit) = options.iter().find(|o| o.as_str() == cleaned) {
        return Some(hit.clone());
    }
    if let Some(hit) = options.iter().find(|o| cleaned.contains(o.as_str())) {
        return Some(hit.clone());
    }
    let lowered = cleaned.to_lowercase();
    options
        .iter()
        .find(|o| lowered.contains(&o.to_lowercase()))
        .cloned()
}

/// 绑定到某个后端与模型的情感分析器。
pub struct SentimentAnalyzer {
    backend: Arc<dyn ChatBackend>,
    model: String,
    emotions: Vec<String>,
    rule_prompt: String,
}

impl SentimentAnalyzer {
    pub fn new(backend: Arc<dyn ChatBackend>, model: impl Into<String>, emotions: Vec<String>) -> Self {
        let rule_prompt = rule_prompt(&emotions);
        Self {
            backend,
            model: model.into(),
            emotions,
            rule_prompt,
        }
    }

    pub fn emotions(&self) -> &[String] {
        &self.emotions
    }

    /// 探测 + 规则握手。
    pub async fn connect(&self) -> Result<(), SentimentError> {
        let probe = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user("Hello")],
            temperature: None,
            max_tokens: Some(PROBE_MAX_TOKENS),
            stream: false,
        };
        let reply = self.backend.complete(&probe).await?;
        if reply.trim().is_empty() {
            return Err(SentimentError::EmptyReply);
        }

        let reply = self.ask(&self.rule_prompt, HANDSHAKE_MESSAGE).await?;
        let lowered = reply.to_lowercase();
        if self.emotions.iter().any(|e| lowered.contains(e.as_str())) {
            log::info!("✅ 情感分析器握手成功 model={}", self.model);
            Ok(())
        } else {
            Err(SentimentError::Handshake(reply))
        }
    }

    /// 词表内的情感词；回复无法匹配时返回 `None`。
    pub async fn classify(&self, text: &str) -> Result<Option<String>, SentimentError> {
        let reply = self.ask(&self.rule_prompt, text).await?;
        let emotion = extract_emotion(&reply, &self.emotions);
        log::debug!("🧠 情感分析原始回复={:?} 结果={:?}", reply, emotion);
        Ok(emotion)
    }

    /// 从调用方给出的选项中选一个；请求失败或无法匹配时回退到第一个选项。
    ///
    /// 只有 `options` 为空时返回 `None`。
    pub async fn classify_with_options(&self, text: &str, options: &[String]) -> Option<String> {
        let first = options.first()?.clone();
        match self.ask(&options_prompt(options), text).await {
            Ok(reply) => Some(extract_option(&reply, options).unwrap_or(first)),
            Err(err) => {
                log::warn!("⚠️ 选项分析请求失败，使用第一个选项: {}", err);
                Some(first)
            }
        }
    }

    async fn ask(&self, system: &str, user: &str) -> Result<String, SentimentError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: Some(TEMPERATURE),
            max_tokens: None,
            stream: false,
        };
        let reply = self.backend.complete(&request).await?;
        Ok(reply.trim().to_string())
    }
}
