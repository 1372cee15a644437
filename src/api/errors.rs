// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::error::ServiceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    pub request_id: Option<String>,
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidEncoding {
        /// Byte offset where decoding stopped
        valid_up_to: usize,
    },
    EncodingFailure(String),
    ServiceUnavailable(String),
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self, request_id: Option<String>) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg.clone(), None),
            ApiError::InvalidEncoding { valid_up_to } => {
                let mut details = HashMap::new();
                details.insert(
                    "valid_up_to".to_string(),
                    serde_json::Value::Number((*valid_up_to as u64).into()),
                );
                (
                    "invalid_encoding",
                    "Request body is not valid UTF-8".to_string(),
                    Some(details),
                )
            }
            ApiError::EncodingFailure(msg) => ("encoding_failure", msg.clone(), None),
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg.clone(), None),
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            request_id,
            details,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidEncoding { .. } => StatusCode::BAD_REQUEST,
            ApiError::EncodingFailure(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidEncoding(e) => ApiError::InvalidEncoding {
                valid_up_to: e.valid_up_to(),
            },
            ServiceError::EncodingFailure(msg) => ApiError::EncodingFailure(msg),
            ServiceError::NotReady => {
                ApiError::ServiceUnavailable("Embedding model is still loading".to_string())
            }
            ServiceError::ModelLoadFailure(msg) => ApiError::InternalError(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("{}", self);
        }

        (status, Json(self.to_response(None))).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidEncoding { valid_up_to } => write!(
                f,
                "Invalid encoding: body is not valid UTF-8 after byte {}",
                valid_up_to
            ),
            ApiError::EncodingFailure(msg) => write!(f, "Encoding failure: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}
