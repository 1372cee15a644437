// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Vector wire codec
//!
//! Embedding vectors leave the service as a single protobuf message:
//!
//! ```proto
//! syntax = "proto3";
//!
//! message VectorResponse {
//!   repeated float value = 1;
//! }
//! ```
//!
//! # Wire layout
//! - Field number `1`, wire type `2` (packed, length-delimited)
//! - Each element is an IEEE-754 binary32, little-endian, in index order 0..N-1
//! - An empty vector encodes to an empty payload (proto3 omits empty fields)
//!
//! Any change to the field number, scalar type or packing is a breaking
//! change for every client holding the schema above.

use prost::Message;
use thiserror::Error;

/// Media type of a serialized [`VectorResponse`]
pub const MEDIA_TYPE: &str = "application/octet-stream";

/// Protobuf field number of `VectorResponse.value`
pub const VALUE_FIELD_TAG: u32 = 1;

/// The one message type on the wire
#[derive(Clone, PartialEq, Message)]
pub struct VectorResponse {
    /// Embedding values in index order
    #[prost(float, repeated, tag = "1")]
    pub value: Vec<f32>,
}

impl From<Vec<f32>> for VectorResponse {
    fn from(value: Vec<f32>) -> Self {
        Self { value }
    }
}

#[derive(Error, Debug)]
pub enum CodecError {
    /// Payload is not a valid `VectorResponse` message
    #[error("Malformed vector payload: {0}")]
    Malformed(#[from] prost::DecodeError),
}

/// Serializes a vector into a `VectorResponse` payload
pub fn serialize(vector: &[f32]) -> Vec<u8> {
    let message = VectorResponse {
        value: vector.to_vec(),
    };
    message.encode_to_vec()
}

/// Serializes an owned vector without copying its values
pub fn serialize_owned(vector: Vec<f32>) -> Vec<u8> {
    VectorResponse::from(vector).encode_to_vec()
}

/// Parses a `VectorResponse` payload back into its values
pub fn deserialize(payload: &[u8]) -> Result<Vec<f32>, CodecError> {
    let message = VectorResponse::decode(payload)?;
    Ok(message.value)
}
