// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDH Key Exchange Implementation
//!
//! Key pairs are secp256k1 scalars/points. Keys travel as hex strings: 32-byte
//! private scalars and 33-byte compressed SEC1 public points. The raw ECDH
//! x-coordinate is run through HKDF-SHA256 to obtain the 32-byte secret used
//! by the secure channel.

use super::CryptoError;
use hkdf::Hkdf;
use k256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use rand::rngs::OsRng;
use sha2::Sha256;
use std::fmt;

const HKDF_INFO: &[u8] = b"secure-text-stats/shared-key/v1";

/// A secp256k1 key pair issued for one peer and one role
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
}

impl KeyPair {
    /// Generate a fresh random key pair
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::random(&mut OsRng),
        }
    }

    /// Rebuild a key pair from a hex-encoded private scalar
    pub fn from_private_hex(private_hex: &str) -> Result<Self, CryptoError> {
        Ok(Self {
            secret: parse_private_key(private_hex, "private_key")?,
        })
    }

    pub fn private_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes().into()
    }

    /// Compressed SEC1 encoding of the public point (33 bytes)
    pub fn public_bytes(&self) -> Vec<u8> {
        self.secret
            .public_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    pub fn private_hex(&self) -> String {
        hex::encode(self.private_bytes())
    }

    pub fn public_hex(&self) -> String {
        hex::encode(self.public_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_hex())
            .field("private", &"<redacted>")
            .finish()
    }
}

/// 32-byte symmetric secret derived by ECDH + HKDF
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(secret_hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(strip_0x(secret_hex))
            .map_err(|e| CryptoError::invalid_key("shared_key", format!("hex decode error: {}", e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            CryptoError::invalid_key(
                "shared_key",
                format!("expected 32 bytes, got {}", b.len()),
            )
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short, non-reversible identifier that is safe to log
    pub fn fingerprint(&self) -> String {
        use sha2::Digest;
        let digest = Sha256::digest(self.0);
        hex::encode(&digest[..4])
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret({})", self.fingerprint())
    }
}

/// Derive a shared secret using ECDH
///
/// Deterministic: the same `(local_private, remote_public)` pair always yields
/// the same secret, and `derive(a, B) == derive(b, A)` for two key pairs.
///
/// # Arguments
///
/// * `local_private` - 32-byte private scalar
/// * `remote_public` - SEC1 public point (33 bytes compressed or 65 bytes uncompressed)
pub fn derive_shared_key(
    local_private: &[u8],
    remote_public: &[u8],
) -> Result<SharedSecret, CryptoError> {
    if local_private.len() != 32 {
        return Err(CryptoError::invalid_key(
            "local_private_key",
            format!("expected 32 bytes, got {}", local_private.len()),
        ));
    }
    let secret = SecretKey::from_slice(local_private)
        .map_err(|e| CryptoError::invalid_key("local_private_key", e.to_string()))?;

    if remote_public.len() != 33 && remote_public.len() != 65 {
        return Err(CryptoError::invalid_key(
            "remote_public_key",
            format!("expected 33 or 65 bytes, got {}", remote_public.len()),
        ));
    }
    let public = PublicKey::from_sec1_bytes(remote_public)
        .map_err(|_| CryptoError::invalid_key("remote_public_key", "not a valid curve point"))?;

    let shared = k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());

    let hkdf = Hkdf::<Sha256>::new(None, shared.raw_secret_bytes());
    let mut derived = [0u8; 32];
    hkdf.expand(HKDF_INFO, &mut derived)
        .map_err(|e| CryptoError::KeyDerivationFailed {
            operation: "hkdf_expand".to_string(),
            reason: e.to_string(),
        })?;

    Ok(SharedSecret(derived))
}

/// Hex front-end to [`derive_shared_key`], as used by the `shared-key` endpoint
pub fn derive_shared_key_hex(
    local_private_hex: &str,
    remote_public_hex: &str,
) -> Result<SharedSecret, CryptoError> {
    let local_private = hex::decode(strip_0x(local_private_hex)).map_err(|e| {
        CryptoError::invalid_key("local_private_key", format!("hex decode error: {}", e))
    })?;
    let remote_public = hex::decode(strip_0x(remote_public_hex)).map_err(|e| {
        CryptoError::invalid_key("remote_public_key", format!("hex decode error: {}", e))
    })?;
    derive_shared_key(&local_private, &remote_public)
}

fn parse_private_key(private_hex: &str, key_type: &str) -> Result<SecretKey, CryptoError> {
    let bytes = hex::decode(strip_0x(private_hex))
        .map_err(|e| CryptoError::invalid_key(key_type, format!("hex decode error: {}", e)))?;
    if bytes.len() != 32 {
        return Err(CryptoError::invalid_key(
            key_type,
            format!("expected 32 bytes, got {}", bytes.len()),
        ));
    }
    SecretKey::from_slice(&bytes).map_err(|e| CryptoError::invalid_key(key_type, e.to_string()))
}

fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}
