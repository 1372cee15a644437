// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding API Module
//!
//! Raw text in, one binary `VectorResponse` out.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::embedding_handler;
pub use request::TextRequest;
pub use response::VectorBody;
