// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! HTTP tests for the /embedding endpoint
//!
//! These tests verify that:
//! - Valid UTF-8 bodies return one binary vector of the model's dimension
//! - The empty body is embedded like any other text
//! - Invalid UTF-8 is rejected with 400 before the model is invoked
//! - Model failures surface as 500 and leave the service usable
//! - Requests before the model is loaded get 503

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use language_processor::api::{create_app, AppState, ErrorResponse};
use language_processor::codec;
use language_processor::embeddings::{EmbeddingProvider, HashEmbeddingModel};
use language_processor::ServiceError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

const DIMENSION: usize = 384;

/// Test helper: AppState backed by the deterministic hash model
fn setup_state() -> (AppState, Arc<HashEmbeddingModel>) {
    let model = Arc::new(HashEmbeddingModel::new("test-model", DIMENSION, false).unwrap());
    (AppState::with_provider(model.clone()), model)
}

/// Provider that counts calls and fails on a marker input
struct CountingProvider {
    calls: AtomicUsize,
    inner: HashEmbeddingModel,
}

impl CountingProvider {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            inner: HashEmbeddingModel::new("counting", 8, false).unwrap(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CountingProvider {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text == "untokenizable" {
            return Err(ServiceError::EncodingFailure("tokenizer rejected input".into()));
        }
        self.inner.encode(text).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

fn embedding_request(method: Method, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri("/embedding")
        .body(body.into())
        .unwrap()
}

async fn read_body(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_post_returns_binary_vector() {
    let (state, model) = setup_state();
    let app = create_app(state);

    let response = app
        .oneshot(embedding_request(Method::POST, "Hello world"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/octet-stream"
    );

    let vector = codec::deserialize(&read_body(response).await).unwrap();
    assert_eq!(vector.len(), DIMENSION);
    assert_eq!(vector, model.generate("Hello world"));
}

#[tokio::test]
async fn test_get_with_body_is_accepted() {
    let (state, model) = setup_state();
    let app = create_app(state);

    let response = app
        .oneshot(embedding_request(Method::GET, "query text"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let vector = codec::deserialize(&read_body(response).await).unwrap();
    assert_eq!(vector, model.generate("query text"));
}

#[tokio::test]
async fn test_empty_body_has_full_dimension() {
    let (state, _) = setup_state();
    let app = create_app(state);

    let response = app
        .oneshot(embedding_request(Method::POST, Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let vector = codec::deserialize(&read_body(response).await).unwrap();
    assert_eq!(vector.len(), DIMENSION);
}

#[tokio::test]
async fn test_large_body_passes_through() {
    let (state, model) = setup_state();
    let app = create_app(state);

    // Larger than axum's default 2MB body limit
    let text = "word ".repeat(600_000);
    let response = app
        .oneshot(embedding_request(Method::POST, text.clone()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let vector = codec::deserialize(&read_body(response).await).unwrap();
    assert_eq!(vector, model.generate(&text));
}

#[tokio::test]
async fn test_invalid_utf8_rejected_without_model_call() {
    let provider = Arc::new(CountingProvider::new());
    let app = create_app(AppState::with_provider(provider.clone()));

    let response = app
        .oneshot(embedding_request(Method::POST, vec![0x80u8]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(error.error_type, "invalid_encoding");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_encoding_failure_is_isolated() {
    let provider = Arc::new(CountingProvider::new());
    let app = create_app(AppState::with_provider(provider.clone()));

    let failed = app
        .clone()
        .oneshot(embedding_request(Method::POST, "untokenizable"))
        .await
        .unwrap();
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorResponse = serde_json::from_slice(&read_body(failed).await).unwrap();
    assert_eq!(error.error_type, "encoding_failure");

    // The provider keeps serving after a per-request failure
    let ok = app
        .oneshot(embedding_request(Method::POST, "fine"))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let vector = codec::deserialize(&read_body(ok).await).unwrap();
    assert_eq!(vector.len(), 8);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_not_ready_returns_503() {
    let app = create_app(AppState::new_for_test());

    let response = app
        .oneshot(embedding_request(Method::POST, "too early"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let error: ErrorResponse = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(error.error_type, "service_unavailable");
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (state, _) = setup_state();
    let app = create_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/similarity")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: ErrorResponse = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(error.error_type, "not_found");
}

#[tokio::test]
async fn test_repeated_requests_are_deterministic() {
    let (state, _) = setup_state();
    let app = create_app(state);

    let mut payloads = Vec::new();
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(embedding_request(Method::POST, "same input"))
            .await
            .unwrap();
        payloads.push(read_body(response).await);
    }

    assert_eq!(payloads[0], payloads[1]);
    assert_eq!(payloads[1], payloads[2]);
}
