// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Binary response body for the embedding endpoint

use crate::codec;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

/// One serialized `VectorResponse`, sent as `application/octet-stream`
#[derive(Debug, Clone, PartialEq)]
pub struct VectorBody {
    payload: Bytes,
    dimension: usize,
}

impl VectorBody {
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

impl From<Vec<f32>> for VectorBody {
    fn from(vector: Vec<f32>) -> Self {
        let dimension = vector.len();
        Self {
            payload: Bytes::from(codec::serialize_owned(vector)),
            dimension,
        }
    }
}

impl IntoResponse for VectorBody {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, codec::MEDIA_TYPE)],
            self.payload,
        )
            .into_response()
    }
}
