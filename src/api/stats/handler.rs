// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use crate::api::http_server::AppState;
use crate::api::stats::{StatsForm, StatsRequest};
use crate::api::{ApiError, PeerIdentity};
use crate::crypto::decrypt;
use crate::stats::{MetricMap, ALL_MODELS};
use axum::extract::{Path, State};
use axum::Json;
use axum_extra::extract::{Form, FormRejection};
use std::sync::Arc;
use tracing::{debug, info};

/// POST /stats
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    PeerIdentity(peer): PeerIdentity,
    form: Result<Form<StatsForm>, FormRejection>,
) -> Result<Json<Vec<MetricMap>>, ApiError> {
    let Form(form) = form.map_err(|e| ApiError::validation("form", e.to_string()))?;
    let results = score_for_peer(&state, &peer, form.into_request(ALL_MODELS)).await?;
    Ok(Json(results))
}

/// POST /stats/:model
pub async fn model_stats_handler(
    State(state): State<Arc<AppState>>,
    PeerIdentity(peer): PeerIdentity,
    Path(model): Path<String>,
    form: Result<Form<StatsForm>, FormRejection>,
) -> Result<Json<Vec<MetricMap>>, ApiError> {
    let Form(form) = form.map_err(|e| ApiError::validation("form", e.to_string()))?;
    let results = score_for_peer(&state, &peer, form.into_request(&model)).await?;
    Ok(Json(results))
}

/// Decrypt (unless plaintext was requested) and score a batch for `peer`
///
/// Shared by the HTTP handlers and the framed listener. Results keep the
/// order of the submitted texts.
pub async fn score_for_peer(
    state: &AppState,
    peer: &str,
    request: StatsRequest,
) -> Result<Vec<MetricMap>, ApiError> {
    if request.texts.is_empty() {
        return Err(ApiError::validation("text", "No text submitted"));
    }

    let StatsRequest {
        model,
        texts,
        ids,
        no_encryption,
    } = request;

    let texts = if no_encryption {
        texts
    } else {
        let secret = state.sessions.shared_secret(peer).await?;
        texts
            .iter()
            .map(|t| decrypt(t, &secret))
            .collect::<Result<Vec<_>, _>>()?
    };

    info!(
        "Text stats request from {}. Model: {}. Encrypted: {}. List len: {}",
        peer,
        model,
        !no_encryption,
        texts.len()
    );
    debug!("First text for {}: {:?}", peer, texts.first());

    let registry = state.registry.clone();
    tokio::task::spawn_blocking(move || registry.score_texts(&model, &texts, &ids))
        .await
        .map_err(|e| ApiError::internal("stats worker", e))?
        .map_err(ApiError::from)
}
