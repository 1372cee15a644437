// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Provider lifecycle tests
//!
//! - The model is loaded exactly once, even when initialization races
//! - Late callers receive the already-loaded provider
//! - A failed load leaves the slot uninitialized

use language_processor::embeddings::{
    load_provider, EmbeddingProvider, HashEmbeddingModel, ProviderSlot, ProviderState,
};
use language_processor::{Backend, ServiceConfig, ServiceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn slow_loader(loads: Arc<AtomicUsize>) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    loads.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(Arc::new(HashEmbeddingModel::new("slow-load", 32, false)?))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_initialize_loads_once() {
    let slot = Arc::new(ProviderSlot::new());
    let loads = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let slot = slot.clone();
        let loads = loads.clone();
        handles.push(tokio::spawn(async move {
            slot.initialize(|| slow_loader(loads)).await.map(|p| p.dimension())
        }));
    }

    for handle in handles {
        let dimension = handle.await.unwrap().unwrap();
        assert_eq!(dimension, 32);
    }

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(slot.state(), ProviderState::Ready);
}

#[tokio::test]
async fn test_second_initialize_is_a_no_op() {
    let slot = ProviderSlot::new();
    let loads = Arc::new(AtomicUsize::new(0));

    let first = slot.initialize(|| slow_loader(loads.clone())).await.unwrap();
    let second = slot.initialize(|| slow_loader(loads.clone())).await.unwrap();

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_failed_load_can_be_retried() {
    let slot = ProviderSlot::new();

    let err = slot
        .initialize(|| async { Err(anyhow::anyhow!("weights corrupted")) })
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ServiceError::ModelLoadFailure(_)));
    assert_eq!(slot.state(), ProviderState::Uninitialized);

    let loads = Arc::new(AtomicUsize::new(0));
    slot.initialize(|| slow_loader(loads)).await.unwrap();
    assert!(slot.is_ready());
}

#[tokio::test]
async fn test_load_provider_into_slot() {
    let config = ServiceConfig {
        backend: Backend::Hash,
        dimension: Some(48),
        ..ServiceConfig::default()
    };

    let slot = ProviderSlot::new();
    slot.initialize(|| load_provider(&config)).await.unwrap();

    let provider = slot.get().unwrap();
    assert_eq!(provider.dimension(), 48);
    for text in ["", "a", "a much longer piece of text"] {
        assert_eq!(provider.encode(text).await.unwrap().len(), 48);
    }
}

#[tokio::test]
async fn test_missing_model_is_load_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig {
        model_path: Some(dir.path().join("model.onnx")),
        tokenizer_path: Some(dir.path().join("tokenizer.json")),
        ..ServiceConfig::default()
    };

    let slot = ProviderSlot::new();
    let err = slot
        .initialize(|| load_provider(&config))
        .await
        .err()
        .unwrap();

    match err {
        ServiceError::ModelLoadFailure(msg) => assert!(msg.contains("not found"), "{}", msg),
        other => panic!("expected ModelLoadFailure, got {:?}", other),
    }
    assert!(!slot.is_ready());
}
