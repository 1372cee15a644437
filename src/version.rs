// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the language processor

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Package name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Version of the `VectorResponse` wire schema.
/// Bump only together with a breaking change in `codec`.
pub const WIRE_SCHEMA_VERSION: u32 = 1;

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!(
        "{} v{} (wire schema v{})",
        NAME, VERSION_NUMBER, WIRE_SCHEMA_VERSION
    )
}
