// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Concurrency tests for the /embedding endpoint
//!
//! Distinct texts sent at the same time must each come back with their own
//! vector, identical to what a single sequential request produces.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use futures::future::join_all;
use language_processor::api::{create_app, AppState};
use language_processor::codec;
use language_processor::embeddings::{EmbeddingProvider, HashEmbeddingModel};
use language_processor::ServiceError;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt; // for `oneshot`

/// Hash model that yields before answering, so requests interleave
struct SlowProvider {
    inner: HashEmbeddingModel,
}

#[async_trait]
impl EmbeddingProvider for SlowProvider {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        // Longer texts finish first to scramble completion order
        let delay = 30u64.saturating_sub(text.len() as u64 * 5);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.inner.encode(text).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

async fn embed(app: Router, text: String) -> Vec<f32> {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/embedding")
                .body(Body::from(text))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    codec::deserialize(&body).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_no_cross_talk() {
    let provider = Arc::new(SlowProvider {
        inner: HashEmbeddingModel::new("slow", 64, false).unwrap(),
    });
    let app = create_app(AppState::with_provider(provider.clone()));

    let texts: Vec<String> = ["a", "b", "c", "dd", "eee"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    // Sequential baseline
    let mut expected = Vec::new();
    for text in &texts {
        expected.push(embed(app.clone(), text.clone()).await);
    }

    // Same texts, all in flight at once, several rounds
    for _ in 0..5 {
        let tasks = texts
            .iter()
            .cloned()
            .map(|text| tokio::spawn(embed(app.clone(), text)));
        let results = join_all(tasks).await;

        for (i, result) in results.into_iter().enumerate() {
            let vector = result.expect("request task panicked");
            assert_eq!(vector, expected[i], "cross-talk for input {:?}", texts[i]);
        }
    }
}

#[tokio::test]
async fn test_concurrent_requests_hash_model() {
    let model = Arc::new(HashEmbeddingModel::new("hash", 128, true).unwrap());
    let app = create_app(AppState::with_provider(model.clone()));

    let texts: Vec<String> = (0..32).map(|i| format!("text number {}", i)).collect();
    let results = join_all(texts.iter().cloned().map(|t| embed(app.clone(), t))).await;

    for (text, vector) in texts.iter().zip(results) {
        assert_eq!(vector, model.generate(text));
    }
}
