// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Single-instance holder for the process-wide embedding provider
//!
//! The slot starts `Uninitialized` and becomes `Ready` exactly once. Concurrent
//! `initialize` calls wait on the one in-flight load; a failed load leaves the
//! slot `Uninitialized`.

use super::EmbeddingProvider;
use crate::error::ServiceError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Uninitialized,
    Ready,
}

#[derive(Default)]
pub struct ProviderSlot {
    cell: OnceCell<Arc<dyn EmbeddingProvider>>,
}

impl std::fmt::Debug for ProviderSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("ProviderSlot");
        s.field("state", &self.state());
        if let Some(provider) = self.cell.get() {
            s.field("model_name", &provider.model_name())
                .field("dimension", &provider.dimension());
        }
        s.finish()
    }
}

impl ProviderSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot that is already `Ready` with `provider`
    pub fn ready(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(provider)),
        }
    }

    /// Runs `loader` unless the slot is already `Ready`
    ///
    /// # Errors
    /// `ServiceError::ModelLoadFailure` if the loader fails. The slot stays
    /// `Uninitialized` in that case.
    pub async fn initialize<F, Fut>(&self, loader: F) -> Result<Arc<dyn EmbeddingProvider>, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Arc<dyn EmbeddingProvider>>>,
    {
        let provider = self
            .cell
            .get_or_try_init(|| async {
                info!("Loading embedding provider");
                match loader().await {
                    Ok(provider) => {
                        info!(
                            model = provider.model_name(),
                            dimension = provider.dimension(),
                            "Embedding provider ready"
                        );
                        Ok(provider)
                    }
                    Err(e) => {
                        error!("Embedding provider failed to load: {:#}", e);
                        Err(ServiceError::model_load_failure(&e))
                    }
                }
            })
            .await?;

        Ok(provider.clone())
    }

    /// The loaded provider, or `NotReady`
    pub fn get(&self) -> Result<&Arc<dyn EmbeddingProvider>, ServiceError> {
        self.cell.get().ok_or(ServiceError::NotReady)
    }

    pub fn state(&self) -> ProviderState {
        if self.cell.initialized() {
            ProviderState::Ready
        } else {
            ProviderState::Uninitialized
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ProviderState::Ready
    }
}
