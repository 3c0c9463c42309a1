// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use crate::api::http_server::AppState;
use crate::api::keys::{KeysResponse, SharedKeyQuery, SharedKeyResponse};
use crate::api::{ApiError, PeerIdentity};
use axum::extract::{Query, State};
use axum::Json;
use std::sync::Arc;
use tracing::debug;

/// GET /keys
///
/// Issues a fresh key pair for the calling peer. Any previously derived
/// secret for that peer is dropped until `/shared-key` is called again.
pub async fn request_keys_handler(
    State(state): State<Arc<AppState>>,
    PeerIdentity(peer): PeerIdentity,
) -> Json<KeysResponse> {
    let keys = state.sessions.request_key_pair(&peer).await;
    debug!("GET /keys served for {}", peer);
    Json(keys.into())
}

/// GET /shared-key?local_private_key=..&remote_public_key=..
pub async fn shared_key_handler(
    State(state): State<Arc<AppState>>,
    PeerIdentity(peer): PeerIdentity,
    Query(query): Query<SharedKeyQuery>,
) -> Result<Json<SharedKeyResponse>, ApiError> {
    let (local_private_key, remote_public_key) = query.require()?;

    let secret = state
        .sessions
        .derive_shared_key(&peer, local_private_key, remote_public_key)
        .await?;

    debug!("GET /shared-key served for {}", peer);

    Ok(Json(SharedKeyResponse {
        shared_key: secret.to_hex(),
        status: 200,
    }))
}
