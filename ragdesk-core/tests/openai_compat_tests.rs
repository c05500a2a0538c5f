//! Tests for the OpenAI-compatible embeddings and chat clients against a local stub server.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use ragdesk_core::chat::OpenAICompatibleChatClient;
use ragdesk_core::openai::OpenAIEmbeddingProvider;
use ragdesk_core::{EmbeddingProvider, GenerationParams, LlmClient, RagError};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Captured {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
}

impl Captured {
    fn record(&self, headers: &HeaderMap, body: Value) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.auth.lock().unwrap().push(auth);
        self.bodies.lock().unwrap().push(body);
    }
}

/// Returns embeddings in reverse index order to exercise reordering.
async fn embeddings_ok(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    captured.record(&headers, body.clone());
    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(i, _)| json!({ "index": i, "embedding": [i as f32, 1.0, 0.0] }))
        .collect();
    Json(json!({ "data": data }))
}

async fn embeddings_unavailable() -> (StatusCode, Json<Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": { "message": "model is loading" } })),
    )
}

async fn chat_ok(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    captured.record(&headers, body);
    Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": "Email support@x.com." } }]
    }))
}

async fn chat_rate_limited() -> (StatusCode, Json<Value>) {
    (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "error": { "message": "rate limit reached" } })))
}

async fn chat_no_choices() -> Json<Value> {
    Json(json!({ "choices": [] }))
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn stub_server(captured: Captured) -> String {
    let app = Router::new()
        .route("/ok/embeddings", post(embeddings_ok))
        .route("/down/embeddings", post(embeddings_unavailable))
        .route("/ok/chat/completions", post(chat_ok))
        .route("/limited/chat/completions", post(chat_rate_limited))
        .route("/empty/chat/completions", post(chat_no_choices))
        .with_state(captured);
    format!("http://{}", spawn(app).await)
}

#[tokio::test]
async fn embeddings_are_returned_in_input_order() {
    let captured = Captured::default();
    let base = stub_server(captured.clone()).await;
    let provider = OpenAIEmbeddingProvider::new("intfloat/e5-large-v2", 3)
        .unwrap()
        .with_base_url(format!("{base}/ok/"))
        .with_api_key("secret");

    let embeddings = provider.embed_batch(&["first", "second", "third"]).await.unwrap();
    assert_eq!(embeddings.len(), 3);
    for (i, embedding) in embeddings.iter().enumerate() {
        assert_eq!(embedding[0], i as f32);
    }

    let bodies = captured.bodies.lock().unwrap().clone();
    assert_eq!(bodies[0]["model"], "intfloat/e5-large-v2");
    assert_eq!(bodies[0]["input"], json!(["first", "second", "third"]));
    assert_eq!(captured.auth.lock().unwrap()[0].as_deref(), Some("Bearer secret"));
}

#[tokio::test]
async fn embedding_without_api_key_sends_no_authorization() {
    let captured = Captured::default();
    let base = stub_server(captured.clone()).await;
    let provider = OpenAIEmbeddingProvider::new("local", 3)
        .unwrap()
        .with_base_url(format!("{base}/ok"))
        .with_api_key("");

    let embedding = provider.embed("hello").await.unwrap();
    assert_eq!(embedding, vec![0.0, 1.0, 0.0]);
    assert_eq!(captured.auth.lock().unwrap()[0], None);
}

#[tokio::test]
async fn embedding_dimension_mismatch_is_unavailable() {
    let base = stub_server(Captured::default()).await;
    let provider =
        OpenAIEmbeddingProvider::new("local", 1024).unwrap().with_base_url(format!("{base}/ok"));

    let err = provider.embed("hello").await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingUnavailable { .. }), "unexpected error: {err}");
}

#[tokio::test]
async fn embedding_error_status_carries_api_message() {
    let base = stub_server(Captured::default()).await;
    let provider =
        OpenAIEmbeddingProvider::new("local", 3).unwrap().with_base_url(format!("{base}/down"));

    let err = provider.embed("hello").await.unwrap_err();
    match err {
        RagError::EmbeddingUnavailable { message, .. } => {
            assert!(message.contains("503"));
            assert!(message.contains("model is loading"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unreachable_embedding_server_is_unavailable() {
    let provider =
        OpenAIEmbeddingProvider::new("local", 3).unwrap().with_base_url("http://127.0.0.1:1");
    let err = provider.embed("hello").await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingUnavailable { .. }));
}

#[test]
fn embedding_provider_rejects_bad_configuration() {
    assert!(OpenAIEmbeddingProvider::new("", 3).is_err());
    assert!(OpenAIEmbeddingProvider::new("model", 0).is_err());
}

#[tokio::test]
async fn chat_sends_single_user_message_with_params() {
    let captured = Captured::default();
    let base = stub_server(captured.clone()).await;
    let client =
        OpenAICompatibleChatClient::new("groq", format!("{base}/ok"), "gsk-test", "llama-3.1-8b-instant")
            .unwrap();

    let params = GenerationParams::default();
    let answer = client.complete("How do I reset my password?", &params).await.unwrap();
    assert_eq!(answer, "Email support@x.com.");

    let body = captured.bodies.lock().unwrap()[0].clone();
    assert_eq!(body["model"], "llama-3.1-8b-instant");
    assert_eq!(body["messages"], json!([{ "role": "user", "content": "How do I reset my password?" }]));
    assert_eq!(body["max_tokens"], 1000);
    assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    assert_eq!(captured.auth.lock().unwrap()[0].as_deref(), Some("Bearer gsk-test"));
}

#[tokio::test]
async fn chat_error_status_is_generation_failed() {
    let base = stub_server(Captured::default()).await;
    let client =
        OpenAICompatibleChatClient::new("groq", format!("{base}/limited"), "key", "m").unwrap();

    let err = client.complete("hi", &GenerationParams::default()).await.unwrap_err();
    match err {
        RagError::GenerationFailed { provider, message } => {
            assert_eq!(provider, "groq");
            assert!(message.contains("rate limit reached"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn chat_without_choices_is_generation_failed() {
    let base = stub_server(Captured::default()).await;
    let client = OpenAICompatibleChatClient::new("groq", format!("{base}/empty"), "key", "m").unwrap();

    let err = client.complete("hi", &GenerationParams::default()).await.unwrap_err();
    assert!(matches!(err, RagError::GenerationFailed { .. }));
}

#[test]
fn chat_client_requires_api_key() {
    let err = OpenAICompatibleChatClient::groq("").err().unwrap();
    assert!(matches!(err, RagError::Config(_)));

    let client = OpenAICompatibleChatClient::groq("key").unwrap();
    assert_eq!(client.provider_name(), "groq");
    assert_eq!(client.model(), "llama-3.1-8b-instant");
}
