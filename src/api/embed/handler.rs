// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! `/embedding` HTTP handler
//!
//! Pipeline per request, strictly in order: decode body → encode with the
//! shared provider → serialize → respond.

use crate::api::embed::{TextRequest, VectorBody};
use crate::api::http_server::AppState;
use crate::api::ApiError;
use axum::extract::State;
use bytes::Bytes;
use tracing::debug;

/// GET/POST /embedding handler
///
/// # Request Body
/// Raw UTF-8 text. No headers or query parameters are required.
///
/// # Response Body
/// `application/octet-stream` carrying one `VectorResponse` message
/// (see [`crate::codec`]).
///
/// # Errors
/// - 400 `invalid_encoding` if the body is not valid UTF-8
/// - 500 `encoding_failure` if the model rejects the text
/// - 503 `service_unavailable` if the model is not loaded yet
pub async fn embedding_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<VectorBody, ApiError> {
    let request = TextRequest::decode(&body)?;
    let provider = state.provider.get()?;

    let vector = provider.encode(request.as_str()).await?;
    if vector.len() != provider.dimension() {
        return Err(ApiError::EncodingFailure(format!(
            "Model returned {} values (expected {})",
            vector.len(),
            provider.dimension()
        )));
    }

    let response = VectorBody::from(vector);
    debug!(
        request_bytes = body.len(),
        dimension = response.dimension(),
        payload_bytes = response.payload().len(),
        "Embedded request text"
    );

    Ok(response)
}
