// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Request intake for the embedding endpoint
//!
//! The body is taken verbatim and decoded as UTF-8. Nothing else is checked:
//! empty and arbitrarily large bodies pass through unchanged.

use crate::error::ServiceError;

/// Decoded request text, borrowed from the raw body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRequest<'a> {
    text: &'a str,
}

impl<'a> TextRequest<'a> {
    /// Decodes `body` as UTF-8
    ///
    /// # Errors
    /// `ServiceError::InvalidEncoding` if the bytes are not valid UTF-8.
    pub fn decode(body: &'a [u8]) -> Result<Self, ServiceError> {
        let text = std::str::from_utf8(body)?;
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &'a str {
        self.text
    }
}
