// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod codec;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod version;

pub use api::{create_app, AppState};
pub use codec::{CodecError, VectorResponse};
pub use config::{Backend, ServiceConfig};
pub use embeddings::{EmbeddingProvider, ProviderSlot, ProviderState};
pub use error::ServiceError;
