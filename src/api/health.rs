// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Liveness endpoint
//!
//! Confirms the process is serving HTTP. It deliberately ignores whether the
//! embedding model has finished loading.

use axum::Json;
use serde::{Deserialize, Serialize};

/// Fixed status token returned by the liveness endpoint
pub const STATUS_OK: &str = "OK";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: STATUS_OK.to_string(),
        }
    }
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}
