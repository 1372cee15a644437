// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service error taxonomy
//!
//! - **InvalidEncoding**: request body was not valid UTF-8 (client error, model never invoked)
//! - **EncodingFailure**: the model could not produce a vector for valid text (per-request)
//! - **ModelLoadFailure**: the model could not be loaded at startup (fatal)
//! - **NotReady**: a request arrived before the provider finished loading

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Request body is not valid UTF-8
    #[error("Request body is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    /// The model failed to embed a single input
    #[error("Failed to encode text: {0}")]
    EncodingFailure(String),

    /// The model could not be loaded
    #[error("Failed to load embedding model: {0}")]
    ModelLoadFailure(String),

    /// The provider has not been initialized yet
    #[error("Embedding provider is not ready")]
    NotReady,
}

impl ServiceError {
    /// Builds an `EncodingFailure` from any displayable cause
    pub fn encoding_failure(cause: impl std::fmt::Display) -> Self {
        ServiceError::EncodingFailure(cause.to_string())
    }

    /// Builds a `ModelLoadFailure`, keeping the full context chain of an anyhow error
    pub fn model_load_failure(cause: &anyhow::Error) -> Self {
        ServiceError::ModelLoadFailure(format!("{:#}", cause))
    }
}
