// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Deterministic model-free embeddings
//!
//! Seeds a linear congruential generator with a hash of the input text. Useful
//! for running the service without model files and for exercising the HTTP
//! path in tests.

use super::{l2_normalize, EmbeddingProvider};
use crate::error::ServiceError;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct HashEmbeddingModel {
    model_name: String,
    dimension: usize,
    normalize: bool,
}

impl HashEmbeddingModel {
    pub fn new(model_name: impl Into<String>, dimension: usize, normalize: bool) -> Result<Self> {
        if dimension == 0 {
            return Err(anyhow!("Embedding dimension must be greater than 0"));
        }

        Ok(Self {
            model_name: model_name.into(),
            dimension,
            normalize,
        })
    }

    pub fn generate(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut current_seed = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            current_seed =
                (current_seed.wrapping_mul(1664525).wrapping_add(1013904223)) ^ (i as u64);

            // Map to [-1, 1]
            let value = (current_seed as f64 / u64::MAX as f64) * 2.0 - 1.0;
            embedding.push(value as f32);
        }

        if self.normalize {
            l2_normalize(&mut embedding);
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingModel {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        Ok(self.generate(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
