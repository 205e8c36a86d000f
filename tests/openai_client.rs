use hook_services::error::HookError;
use hook_services::hooks::{CompletionProvider, CompletionRequest, OpenAiClient, generate_hooks};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new(
        &server.uri(),
        SecretString::new("sk-test".to_string()),
        "gpt-4o-mini",
    )
    .expect("Failed to build client")
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1677652288,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn request() -> CompletionRequest {
    CompletionRequest {
        system_prompt: "You write hooks.".to_string(),
        user_prompt: "About remote work".to_string(),
        temperature: 0.8,
        max_tokens: 200,
    }
}

#[tokio::test]
async fn sends_chat_completion_and_returns_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "n": 1,
            "max_tokens": 200,
            "messages": [
                { "role": "system", "content": "You write hooks." },
                { "role": "user", "content": "About remote work" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("1. Hook A")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server).complete(&request()).await.unwrap();
    assert_eq!(reply, "1. Hook A");
}

#[tokio::test]
async fn provider_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).complete(&request()).await.unwrap_err();
    match err {
        HookError::Upstream(message) => {
            assert!(message.contains("401"), "message: {message}");
            assert!(message.contains("Incorrect API key provided"), "message: {message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn failures_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).complete(&request()).await.unwrap_err();
    assert!(matches!(err, HookError::Upstream(ref m) if m.contains("upstream unavailable")));
}

#[tokio::test]
async fn generates_hooks_through_the_client() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("1. Hook A\n2. Hook B\n\n3. Hook C")),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let hooks = generate_hooks(&client, "You write hooks.", "remote work")
        .await
        .unwrap();
    assert_eq!(hooks, vec!["Hook A", "Hook B", "Hook C"]);
}

#[tokio::test]
async fn reply_without_choices_yields_no_hooks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = generate_hooks(&client, "You write hooks.", "remote work")
        .await
        .unwrap_err();
    assert!(matches!(err, HookError::NoHooks));
}

#[tokio::test]
async fn unreachable_provider_is_an_upstream_error() {
    // Nothing listens on port 1
    let client = OpenAiClient::new(
        "http://127.0.0.1:1",
        SecretString::new("sk-test".to_string()),
        "gpt-4o-mini",
    )
    .unwrap();

    let err = client.complete(&request()).await.unwrap_err();
    assert!(matches!(err, HookError::Upstream(_)));
}
