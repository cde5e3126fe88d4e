//! OpenAI-compatible embedder tests against a local stub server.

#![cfg(feature = "openai")]

use std::sync::{Arc, Mutex};

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use serde_json::{Value, json};
use uniguide_rag::openai::{OpenAIEmbeddingConfig, OpenAIEmbeddingProvider};
use uniguide_rag::{Chunk, EmbeddingIndex, EmbeddingProvider, RagError, Tags};

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: Value,
    seen: Arc<Mutex<Vec<Value>>>,
}

async fn embeddings(State(state): State<StubState>, Json(request): Json<Value>) -> impl IntoResponse {
    state.seen.lock().unwrap().push(request);
    (state.status, Json(state.body.clone()))
}

async fn spawn_stub(status: StatusCode, body: Value) -> (String, StubState, tokio::task::JoinHandle<()>) {
    let state = StubState { status, body, seen: Arc::new(Mutex::new(Vec::new())) };
    let app = Router::new().route("/v1/embeddings", post(embeddings)).with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{addr}/v1"), state, handle)
}

fn provider_for(base_url: &str, dimensions: usize) -> OpenAIEmbeddingProvider {
    let config = OpenAIEmbeddingConfig::new("sk-test")
        .with_model("text-embedding-3-small")
        .with_dimensions(dimensions)
        .with_base_url(base_url);
    OpenAIEmbeddingProvider::new(config).expect("provider")
}

fn chunk(n: usize, text: &str) -> Chunk {
    Chunk {
        id: format!("nust-fees_{n}"),
        document_id: "nust-fees".into(),
        text: text.into(),
        tags: Tags::new(),
        sequence_index: n,
    }
}

#[tokio::test]
async fn request_carries_model_input_and_dimensions() {
    let body = json!({ "data": [{ "index": 0, "embedding": [0.1, 0.2, 0.3] }] });
    let (base, state, handle) = spawn_stub(StatusCode::OK, body).await;

    let vector = provider_for(&base, 3).embed("NUST BS fee per semester").await.unwrap();
    assert_eq!(vector, vec![0.1, 0.2, 0.3]);

    let seen = state.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["model"], "text-embedding-3-small");
    assert_eq!(seen[0]["input"], json!(["NUST BS fee per semester"]));
    assert_eq!(seen[0]["dimensions"], 3);

    handle.abort();
}

#[tokio::test]
async fn dimensions_omitted_unless_truncating() {
    let body = json!({ "data": [{ "index": 0, "embedding": vec![0.0_f32; 1536] }] });
    let (base, state, handle) = spawn_stub(StatusCode::OK, body).await;

    let provider =
        OpenAIEmbeddingProvider::new(OpenAIEmbeddingConfig::new("sk-test").with_base_url(&base)).unwrap();
    provider.embed("QAU PhD Mathematics").await.unwrap();

    let seen = state.seen.lock().unwrap().clone();
    assert!(seen[0].get("dimensions").is_none());

    handle.abort();
}

#[tokio::test]
async fn out_of_order_items_are_reordered_by_index() {
    let body = json!({
        "data": [
            { "index": 2, "embedding": [0.0, 0.0, 1.0] },
            { "index": 0, "embedding": [1.0, 0.0, 0.0] },
            { "index": 1, "embedding": [0.0, 1.0, 0.0] }
        ]
    });
    let (base, state, handle) = spawn_stub(StatusCode::OK, body).await;

    let vectors = provider_for(&base, 3).embed_batch(&["ECAT", "NET", "NTS"]).await.unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]]);
    assert_eq!(state.seen.lock().unwrap()[0]["input"], json!(["ECAT", "NET", "NTS"]));

    handle.abort();
}

#[tokio::test]
async fn non_success_status_is_an_embedding_error() {
    let body = json!({ "error": { "message": "Incorrect API key provided" } });
    let (base, _state, handle) = spawn_stub(StatusCode::UNAUTHORIZED, body).await;

    let err = provider_for(&base, 3).embed("UET Lahore ECAT").await.unwrap_err();
    match err {
        RagError::Embedding { provider, message } => {
            assert_eq!(provider, "OpenAI");
            assert!(message.contains("401"), "{message}");
            assert!(message.contains("Incorrect API key provided"), "{message}");
        }
        other => panic!("expected embedding error, got {other:?}"),
    }

    handle.abort();
}

#[tokio::test]
async fn short_response_fails_the_index_build() {
    let body = json!({ "data": [{ "index": 0, "embedding": [1.0, 0.0, 0.0] }] });
    let (base, _state, handle) = spawn_stub(StatusCode::OK, body).await;

    let provider = provider_for(&base, 3);
    let chunks = vec![chunk(0, "BS fee: PKR 171,350 per semester"), chunk(1, "Hostel charges extra")];
    let err = EmbeddingIndex::build(chunks, &provider, "fp").await.unwrap_err();
    match err {
        RagError::Embedding { message, .. } => {
            assert!(message.contains("requested 2 embeddings, received 1"), "{message}");
        }
        other => panic!("expected embedding error, got {other:?}"),
    }

    handle.abort();
}

#[tokio::test]
async fn wrong_width_fails_the_index_build() {
    let body = json!({ "data": [{ "index": 0, "embedding": [1.0, 0.0] }] });
    let (base, _state, handle) = spawn_stub(StatusCode::OK, body).await;

    let provider = provider_for(&base, 3);
    let err = EmbeddingIndex::build(vec![chunk(0, "Merit list")], &provider, "fp").await.unwrap_err();
    assert!(matches!(err, RagError::Embedding { .. }));

    handle.abort();
}

#[tokio::test]
async fn unreachable_server_is_an_embedding_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = provider_for(&format!("http://{addr}/v1"), 3).embed("NUST NET").await.unwrap_err();
    assert!(matches!(err, RagError::Embedding { .. }));
}
