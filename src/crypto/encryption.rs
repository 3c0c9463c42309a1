// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! XChaCha20-Poly1305 Secure Channel
//!
//! Authenticated encryption keyed by a peer's [`SharedSecret`]. A message is
//! sealed into an envelope `[nonce (24 bytes) | ciphertext + tag]`; text
//! payloads carry the envelope as standard base64 so it fits in a form field.
//! Opening an envelope under any other secret fails the tag check and
//! returns [`CryptoError::DecryptionFailed`], never garbled plaintext.

use super::{CryptoError, SharedSecret};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};

pub const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;

/// Decrypt data using XChaCha20-Poly1305 AEAD
///
/// # Errors
///
/// Returns error if:
/// - Authentication tag verification fails (wrong key or tampered data)
/// - Nonce size is not 24 bytes
pub fn decrypt_with_aead(
    ciphertext: &[u8],
    nonce: &[u8],
    aad: &[u8],
    key: &[u8; 32],
) -> Result<Vec<u8>, CryptoError> {
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::decryption(
            "aead_decrypt",
            format!("expected {} byte nonce, got {}", NONCE_LEN, nonce.len()),
        ));
    }

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let payload = Payload {
        msg: ciphertext,
        aad,
    };

    cipher
        .decrypt(XNonce::from_slice(nonce), payload)
        .map_err(|_| {
            CryptoError::decryption(
                "aead_decrypt",
                "authentication failed (wrong key or corrupted data)",
            )
        })
}

/// Encrypt data using XChaCha20-Poly1305 AEAD
///
/// **CRITICAL**: never reuse a nonce with the same key. Callers in this crate
/// go through [`encrypt_file`], which draws a fresh random nonce every time.
pub fn encrypt_with_aead(
    plaintext: &[u8],
    nonce: &[u8],
    aad: &[u8],
    key: &[u8; 32],
) -> Result<Vec<u8>, CryptoError> {
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::EncryptionFailed {
            reason: format!("expected {} byte nonce, got {}", NONCE_LEN, nonce.len()),
        });
    }

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let payload = Payload {
        msg: plaintext,
        aad,
    };

    cipher
        .encrypt(XNonce::from_slice(nonce), payload)
        .map_err(|e| CryptoError::EncryptionFailed {
            reason: e.to_string(),
        })
}

/// Seal a whole byte buffer into a binary envelope
pub fn encrypt_file(plaintext: &[u8], secret: &SharedSecret) -> Result<Vec<u8>, CryptoError> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let sealed = encrypt_with_aead(plaintext, &nonce, b"", secret.as_bytes())?;

    let mut envelope = Vec::with_capacity(NONCE_LEN + sealed.len());
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&sealed);
    Ok(envelope)
}

/// Open a binary envelope produced by [`encrypt_file`]
pub fn decrypt_file(envelope: &[u8], secret: &SharedSecret) -> Result<Vec<u8>, CryptoError> {
    if envelope.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::decryption(
            "decrypt_file",
            format!(
                "envelope too short: expected at least {} bytes, got {}",
                NONCE_LEN + TAG_LEN,
                envelope.len()
            ),
        ));
    }
    let (nonce, sealed) = envelope.split_at(NONCE_LEN);
    decrypt_with_aead(sealed, nonce, b"", secret.as_bytes())
}

/// Encrypt a text payload into a base64 envelope
pub fn encrypt(plaintext: &str, secret: &SharedSecret) -> Result<String, CryptoError> {
    let envelope = encrypt_file(plaintext.as_bytes(), secret)?;
    Ok(STANDARD.encode(envelope))
}

/// Decrypt a base64 envelope produced by [`encrypt`]
pub fn decrypt(ciphertext: &str, secret: &SharedSecret) -> Result<String, CryptoError> {
    let envelope = STANDARD.decode(ciphertext.trim())?;
    let plaintext = decrypt_file(&envelope, secret).map_err(|e| match e {
        CryptoError::DecryptionFailed { reason, .. } => {
            CryptoError::decryption("decrypt_text", reason)
        }
        other => other,
    })?;
    String::from_utf8(plaintext)
        .map_err(|e| CryptoError::decryption("decrypt_text", format!("invalid UTF-8: {}", e)))
}
