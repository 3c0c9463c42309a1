// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key Exchange and Secure Channel
//!
//! - **ECDH**: secp256k1 key pairs, secrets derived with HKDF-SHA256
//! - **Session Store**: per-peer key material and exchange state
//! - **Encryption**: XChaCha20-Poly1305 envelopes keyed by a peer's secret
//!
//! ## Protocol Flow
//!
//! 1. Peer calls `keys`: server issues a client-role and a server-role key pair
//!    and returns the client pair plus the server public key
//! 2. Peer calls `shared-key` with its private key and a public key: server
//!    derives and records the client-role secret, independently derives the
//!    server-role secret, and returns the client-role secret
//! 3. All subsequent payloads for that peer are sealed with the client-role
//!    secret; requests from a peer without one are rejected

pub mod ecdh;
pub mod encryption;
pub mod error;
pub mod session_store;

pub use ecdh::{derive_shared_key, derive_shared_key_hex, KeyPair, SharedSecret};
pub use encryption::{decrypt, decrypt_file, encrypt, encrypt_file};
pub use error::CryptoError;
pub use session_store::{IssuedKeys, Readiness, SessionState, SessionStore};
