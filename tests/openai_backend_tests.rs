//! OpenAI-compatible backend against a mock HTTP server

use chirality_core::clients::{BackendError, CallOptions, GenerationBackend, OpenAiBackend};
use chirality_core::config::GenerationConfig;
use mockito::{Matcher, Server};
use serde_json::json;

fn config(base_url: String) -> GenerationConfig {
    GenerationConfig {
        base_url,
        model: "test-model".into(),
        timeout_ms: 2_000,
        ..Default::default()
    }
}

fn completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}

#[tokio::test]
async fn test_call_parses_json_content() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "test-model",
            "temperature": 0.5,
            "response_format": {"type": "json_object"}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion("```json\n{\"text\": {\"step\": \"Vent\"}}\n```"))
        .create_async()
        .await;

    let backend = OpenAiBackend::new(&config(server.url()), Some("test-key".into())).unwrap();
    let v = backend
        .call("sys", "user", &CallOptions::new(0.5))
        .await
        .unwrap();
    assert_eq!(v["text"]["step"], "Vent");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_prior_is_sent_as_assistant_turn() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex(r#""role":"assistant""#.to_string()))
        .with_status(200)
        .with_body(completion("{\"text\": {\"step\": \"Final\"}}"))
        .create_async()
        .await;

    let backend = OpenAiBackend::new(&config(server.url()), Some("k".into())).unwrap();
    let options = CallOptions::new(0.5).with_prior(json!({"text": {"step": "Draft"}}));
    let v = backend.call("sys", "user", &options).await.unwrap();
    assert_eq!(v["text"]["step"], "Final");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_success_status_is_http_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body("rate limited")
        .create_async()
        .await;

    let backend = OpenAiBackend::new(&config(server.url()), Some("k".into())).unwrap();
    let err = backend
        .call("sys", "user", &CallOptions::new(0.7))
        .await
        .unwrap_err();
    match err {
        BackendError::Http { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_prose_reply_is_parse_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion("I cannot help with that."))
        .create_async()
        .await;

    let backend = OpenAiBackend::new(&config(server.url()), Some("k".into())).unwrap();
    let err = backend
        .call("sys", "user", &CallOptions::new(0.7))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Parse(_)));
}

#[tokio::test]
async fn test_missing_key_fails_before_sending() {
    let backend = OpenAiBackend::new(&config("http://127.0.0.1:9".into()), None).unwrap();
    let err = backend
        .call("sys", "user", &CallOptions::new(0.7))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::MissingApiKey));
}
