// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding provider
//!
//! The provider maps text to a vector whose length is a property of the loaded
//! model. One provider is loaded per process and shared read-only by every
//! request through a [`ProviderSlot`].

pub mod hash_model;
pub mod loader;
pub mod onnx_model;
pub mod pipeline;
pub mod provider_slot;

use crate::error::ServiceError;
use async_trait::async_trait;

pub use hash_model::HashEmbeddingModel;
pub use loader::{load_provider, onnx_options, resolve_model_files, ModelFiles};
pub use onnx_model::{OnnxEmbeddingModel, OnnxOptions};
pub use pipeline::{ModuleManifest, ModulePipeline, PoolingMode};
pub use provider_slot::{ProviderSlot, ProviderState};

/// Text → vector backend
///
/// Implementations must be deterministic for a given loaded model and safe to
/// call from many requests at once.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds `text`, returning exactly [`dimension`](Self::dimension) values
    async fn encode(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    /// Fixed output dimensionality of the loaded model
    fn dimension(&self) -> usize;

    /// Model identity baked in at load time
    fn model_name(&self) -> &str;
}

/// L2-normalizes a vector in place; zero vectors are left untouched
pub(crate) fn l2_normalize(values: &mut [f32]) {
    let norm = values.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in values.iter_mut() {
            *value /= norm;
        }
    }
}
