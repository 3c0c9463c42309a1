// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Error types for key exchange, per-peer session state and the secure
//! channel, with enough context to tell a caller which key or which peer
//! was involved.
//!
//! ## Error Variants
//!
//! - **InvalidKeyMaterial**: key bytes are malformed (bad hex, wrong size, not a curve point)
//! - **KeyDerivationFailed**: ECDH or HKDF derivation failed
//! - **EncryptionFailed**: AEAD encryption failed
//! - **DecryptionFailed**: ciphertext unreadable under the given secret
//! - **NoSharedKey**: peer is unknown or its key exchange is incomplete
//! - **KeyMismatch**: client-role and server-role secrets disagree (strict mode)

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CryptoError {
    /// Malformed key material
    ///
    /// This error occurs when:
    /// - A key is not valid hex
    /// - A key has the wrong length
    /// - A public key does not decode to a curve point
    InvalidKeyMaterial {
        /// Which key failed (e.g. "local_private_key", "remote_public_key")
        key_type: String,
        /// Specific failure reason
        reason: String,
    },

    /// ECDH or HKDF derivation failed
    KeyDerivationFailed {
        /// Which derivation was being performed
        operation: String,
        /// Specific failure reason
        reason: String,
    },

    /// AEAD encryption failed
    EncryptionFailed {
        /// Specific failure reason
        reason: String,
    },

    /// Ciphertext could not be authenticated or decoded
    ///
    /// This error occurs when:
    /// - The secret does not match the one used for encryption
    /// - The ciphertext was truncated or tampered with
    /// - The envelope is not valid base64
    DecryptionFailed {
        /// Which operation was being performed
        operation: String,
        /// Specific failure reason
        reason: String,
    },

    /// Peer has no established shared key
    NoSharedKey {
        /// Peer identity (transport address)
        peer: String,
    },

    /// Client-role and server-role secrets differ
    KeyMismatch {
        /// Peer identity (transport address)
        peer: String,
    },
}

impl CryptoError {
    pub fn invalid_key(key_type: &str, reason: impl Into<String>) -> Self {
        CryptoError::InvalidKeyMaterial {
            key_type: key_type.to_string(),
            reason: reason.into(),
        }
    }

    pub fn decryption(operation: &str, reason: impl Into<String>) -> Self {
        CryptoError::DecryptionFailed {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::InvalidKeyMaterial { key_type, reason } => {
                write!(f, "Invalid key material ({}): {}", key_type, reason)
            }
            CryptoError::KeyDerivationFailed { operation, reason } => {
                write!(f, "Key derivation failed during {}: {}", operation, reason)
            }
            CryptoError::EncryptionFailed { reason } => {
                write!(f, "Encryption failed: {}", reason)
            }
            CryptoError::DecryptionFailed { operation, reason } => {
                write!(f, "Decryption failed during {}: {}", operation, reason)
            }
            CryptoError::NoSharedKey { peer } => {
                write!(
                    f,
                    "Connection is not secure, request a shared key first (peer: {})",
                    peer
                )
            }
            CryptoError::KeyMismatch { peer } => {
                write!(f, "The shared key is not the same (peer: {})", peer)
            }
        }
    }
}

impl std::error::Error for CryptoError {}

impl From<hex::FromHexError> for CryptoError {
    fn from(err: hex::FromHexError) -> Self {
        CryptoError::InvalidKeyMaterial {
            key_type: "hex_field".to_string(),
            reason: format!("hex decode error: {}", err),
        }
    }
}

impl From<base64::DecodeError> for CryptoError {
    fn from(err: base64::DecodeError) -> Self {
        CryptoError::DecryptionFailed {
            operation: "envelope_decode".to_string(),
            reason: format!("base64 decode error: {}", err),
        }
    }
}

impl From<k256::elliptic_curve::Error> for CryptoError {
    fn from(err: k256::elliptic_curve::Error) -> Self {
        CryptoError::InvalidKeyMaterial {
            key_type: "unknown".to_string(),
            reason: format!("k256 error: {}", err),
        }
    }
}

impl From<chacha20poly1305::aead::Error> for CryptoError {
    fn from(err: chacha20poly1305::aead::Error) -> Self {
        CryptoError::DecryptionFailed {
            operation: "AEAD".to_string(),
            reason: format!("chacha20poly1305 error: {}", err),
        }
    }
}
