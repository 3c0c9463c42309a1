// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the secure text stats service

/// Full version string with feature description
pub const VERSION: &str = "v1.2.0-framed-transport-2025-11-04";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.2.0";

/// Build date
pub const BUILD_DATE: &str = "2025-11-04";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "ecdh-key-exchange",
    "xchacha20-poly1305",
    "per-peer-sessions",
    "strict-key-agreement",
    "batch-scoring",
    "per-model-endpoints",
    "file-scoring",
    "framed-transport",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Secure Text Stats {} ({})", VERSION_NUMBER, BUILD_DATE)
}
