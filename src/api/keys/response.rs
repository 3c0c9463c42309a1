// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use crate::crypto::IssuedKeys;
use serde::{Deserialize, Serialize};

/// Response body for `GET /keys`
///
/// All keys are hex; public keys are SEC1 compressed points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeysResponse {
    pub private_key: String,
    pub public_key: String,
    pub server_public_key: String,
    pub status: u16,
}

impl From<IssuedKeys> for KeysResponse {
    fn from(keys: IssuedKeys) -> Self {
        Self {
            private_key: keys.private_key,
            public_key: keys.public_key,
            server_public_key: keys.server_public_key,
            status: 200,
        }
    }
}

/// Response body for `GET /shared-key`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SharedKeyResponse {
    /// Hex of the 32-byte symmetric key
    pub shared_key: String,
    pub status: u16,
}
