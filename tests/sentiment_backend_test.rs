use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use manosaba_textbox::config::{AppConfig, ConfigStore, ModelConfig};
use manosaba_textbox::sentiment::{
    ChatBackend, ChatMessage, ChatRequest, ClientState, OpenAiBackend, SentimentClientManager,
    SentimentError, openai_factory,
};
use manosaba_textbox::status::{log_lifecycle, log_status};

fn reply(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }
        ]
    })
}

fn request(text: &str) -> ChatRequest {
    ChatRequest {
        model: "qwen".to_string(),
        messages: vec![ChatMessage::user(text)],
        temperature: None,
        max_tokens: None,
        stream: false,
    }
}

#[tokio::test]
async fn backend_posts_to_chat_completions_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "qwen", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("开心")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(&format!("{}/v1/", server.uri()), "sk-test").expect("backend");
    let content = backend.complete(&request("hi")).await.expect("reply");
    assert_eq!(content, "开心");
}

#[tokio::test]
async fn non_success_status_keeps_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(&server.uri(), "").expect("backend");
    match backend.complete(&request("hi")).await {
        Err(SentimentError::Http { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid key");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn missing_choices_is_empty_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(&server.uri(), "").expect("backend");
    assert!(matches!(
        backend.complete(&request("hi")).await,
        Err(SentimentError::EmptyReply)
    ));
}

fn store_for(server: &MockServer, enabled: bool) -> ConfigStore {
    let mut config = AppConfig::default();
    config.sentiment.enabled = enabled;
    config.sentiment.ai_model = "ollama".to_string();
    config.sentiment.model_configs.insert(
        "ollama".to_string(),
        ModelConfig {
            api_key: String::new(),
            base_url: format!("{}/v1/", server.uri()),
            model: "qwen".to_string(),
        },
    );
    ConfigStore::in_memory(config)
}

#[tokio::test]
async fn manager_started_at_launch_classifies_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("开心")))
        .mount(&server)
        .await;

    let store = store_for(&server, true);
    let manager = SentimentClientManager::new(store, openai_factory(), log_status(), log_lifecycle());
    let startup = manager.start().expect("enabled feature starts initializing");
    assert!(startup.await.expect("join"));

    assert_eq!(manager.classify("今天真好").await.as_deref(), Some("开心"));
    assert_eq!(manager.state(), ClientState::Ready);

    // 探测 + 握手 + 分类
    let received = server.received_requests().await.expect("recording enabled");
    assert_eq!(received.len(), 3);
}

#[tokio::test]
async fn server_error_disables_and_persists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = store_for(&server, true);
    let manager = SentimentClientManager::new(
        store.clone(),
        openai_factory(),
        log_status(),
        log_lifecycle(),
    );

    assert!(!manager.initialize_async().await.expect("join"));
    assert_eq!(manager.state(), ClientState::Disabled);
    assert_eq!(manager.classify("今天真好").await, None);
    assert!(!store.snapshot().sentiment.enabled);
}

#[tokio::test]
async fn connection_test_against_unreachable_server_fails_quietly() {
    let server = MockServer::start().await;
    let store = store_for(&server, false);
    let manager = SentimentClientManager::new(
        store.clone(),
        openai_factory(),
        log_status(),
        log_lifecycle(),
    );
    let mut client = store.snapshot().sentiment.client_config();
    client.base_url = "http://127.0.0.1:9/v1/".to_string();

    assert!(!manager.test_connection(client).await);
    assert_eq!(manager.state(), ClientState::Uninitialized);
}
