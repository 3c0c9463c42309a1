// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use crate::api::ApiError;
use serde::{Deserialize, Serialize};

/// Query string for `GET /shared-key`
///
/// Both fields are optional at the extractor level so a missing parameter
/// produces the standard error body instead of a bare rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharedKeyQuery {
    /// Hex private key the server issued to this peer
    pub local_private_key: Option<String>,
    /// Hex compressed public key of the other party
    pub remote_public_key: Option<String>,
}

impl SharedKeyQuery {
    /// Returns `(local_private_key, remote_public_key)` once both are present
    pub fn require(&self) -> Result<(&str, &str), ApiError> {
        let local = non_empty(&self.local_private_key)
            .ok_or_else(|| ApiError::validation("local_private_key", "Missing local_private_key"))?;
        let remote = non_empty(&self.remote_public_key).ok_or_else(|| {
            ApiError::validation("remote_public_key", "Missing remote_public_key")
        })?;
        Ok((local, remote))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
