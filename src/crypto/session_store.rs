// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-Peer Session Storage
//!
//! Holds the key material issued to each peer and tracks where the peer is in
//! the key exchange:
//!
//! ```text
//! Unkeyed --request_key_pair--> KeysIssued --derive_shared_key--> SharedKeyEstablished
//! ```
//!
//! A peer is identified by its transport address only. Entries live for the
//! process lifetime; requesting keys again starts a new epoch with fresh
//! material.
//!
//! **Security**: keys are stored in memory only and never persisted to disk.

use super::ecdh::{derive_shared_key, derive_shared_key_hex, KeyPair, SharedSecret};
use super::CryptoError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unkeyed,
    KeysIssued,
    SharedKeyEstablished,
}

/// Result of [`SessionStore::check_ready`]
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    Ready(SharedSecret),
    NoKey,
}

/// Key material handed back to the peer by `request_key_pair`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedKeys {
    pub private_key: String,
    pub public_key: String,
    pub server_public_key: String,
}

#[derive(Debug)]
struct RoleKeys {
    pair: KeyPair,
    shared: Option<SharedSecret>,
}

impl RoleKeys {
    fn fresh() -> Self {
        Self {
            pair: KeyPair::generate(),
            shared: None,
        }
    }
}

#[derive(Debug)]
struct PeerSession {
    client: RoleKeys,
    server: RoleKeys,
    epoch: u64,
}

impl PeerSession {
    fn state(&self) -> SessionState {
        if self.client.shared.is_some() && self.server.shared.is_some() {
            SessionState::SharedKeyEstablished
        } else {
            SessionState::KeysIssued
        }
    }
}

/// In-memory per-peer key/session table
///
/// Cloning is cheap and every clone shares the same table, so one store can be
/// handed to the HTTP handlers and the framed listener alike.
#[derive(Clone)]
pub struct SessionStore {
    peers: Arc<RwLock<HashMap<String, PeerSession>>>,
    strict_key_agreement: bool,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            peers: Arc::new(RwLock::new(HashMap::new())),
            strict_key_agreement: false,
        }
    }

    /// Reject key exchanges whose client-role and server-role secrets differ
    pub fn with_strict_key_agreement(mut self, strict: bool) -> Self {
        self.strict_key_agreement = strict;
        self
    }

    /// Issue independent client-role and server-role key pairs for `peer`
    ///
    /// Unknown peers are created implicitly. A known peer gets fresh material
    /// and its epoch is bumped; any previously established secret is dropped.
    pub async fn request_key_pair(&self, peer: &str) -> IssuedKeys {
        let mut peers = self.peers.write().await;
        let epoch = peers.get(peer).map(|s| s.epoch + 1).unwrap_or(0);
        let session = PeerSession {
            client: RoleKeys::fresh(),
            server: RoleKeys::fresh(),
            epoch,
        };
        let issued = IssuedKeys {
            private_key: session.client.pair.private_hex(),
            public_key: session.client.pair.public_hex(),
            server_public_key: session.server.pair.public_hex(),
        };
        peers.insert(peer.to_string(), session);
        tracing::info!(
            "🔑 Key pairs issued for peer {} (epoch: {}, peers: {})",
            peer,
            epoch,
            peers.len()
        );
        issued
    }

    /// Combine the supplied keys into the client-role secret for `peer`
    ///
    /// The server-role secret is derived independently from the stored
    /// server-role private key and the stored client-role public key. The two
    /// agree when the client passes its own private key with the server public
    /// key. Disagreement is logged, or rejected with `KeyMismatch` when strict
    /// key agreement is on.
    pub async fn derive_shared_key(
        &self,
        peer: &str,
        local_private_hex: &str,
        remote_public_hex: &str,
    ) -> Result<SharedSecret, CryptoError> {
        let mut peers = self.peers.write().await;
        let session = peers.get_mut(peer).ok_or_else(|| CryptoError::NoSharedKey {
            peer: peer.to_string(),
        })?;

        let client_secret = derive_shared_key_hex(local_private_hex, remote_public_hex)?;
        let server_secret = derive_shared_key(
            &session.server.pair.private_bytes(),
            &session.client.pair.public_bytes(),
        )?;

        if client_secret != server_secret {
            if self.strict_key_agreement {
                tracing::error!("Key mismatch for peer {}: exchange rejected", peer);
                return Err(CryptoError::KeyMismatch {
                    peer: peer.to_string(),
                });
            }
            tracing::warn!(
                "Client-role and server-role secrets differ for peer {} (client {}, server {})",
                peer,
                client_secret.fingerprint(),
                server_secret.fingerprint()
            );
        }

        session.client.shared = Some(client_secret);
        session.server.shared = Some(server_secret);
        tracing::info!(
            "🔐 Shared key established for peer {} (epoch: {})",
            peer,
            session.epoch
        );
        tracing::debug!("Shared key fingerprint for {}: {}", peer, client_secret.fingerprint());

        Ok(client_secret)
    }

    pub async fn state(&self, peer: &str) -> SessionState {
        let peers = self.peers.read().await;
        peers
            .get(peer)
            .map(PeerSession::state)
            .unwrap_or(SessionState::Unkeyed)
    }

    /// `Ready` only once both roles hold a derived secret
    ///
    /// Does not compare the two secrets; see `with_strict_key_agreement`.
    pub async fn check_ready(&self, peer: &str) -> Readiness {
        let peers = self.peers.read().await;
        let Some(session) = peers.get(peer) else {
            return Readiness::NoKey;
        };
        match (session.client.shared, session.server.shared) {
            (Some(secret), Some(_)) => Readiness::Ready(secret),
            _ => Readiness::NoKey,
        }
    }

    /// Secret the secure channel uses for `peer`, or `NoSharedKey`
    pub async fn shared_secret(&self, peer: &str) -> Result<SharedSecret, CryptoError> {
        match self.check_ready(peer).await {
            Readiness::Ready(secret) => Ok(secret),
            Readiness::NoKey => {
                tracing::warn!("Peer {} has no established shared key", peer);
                Err(CryptoError::NoSharedKey {
                    peer: peer.to_string(),
                })
            }
        }
    }

    pub async fn epoch(&self, peer: &str) -> Option<u64> {
        let peers = self.peers.read().await;
        peers.get(peer).map(|s| s.epoch)
    }

    /// Get the number of known peers
    pub async fn count(&self) -> usize {
        let peers = self.peers.read().await;
        peers.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
