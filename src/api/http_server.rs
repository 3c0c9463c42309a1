// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::keys::{request_keys_handler, shared_key_handler};
use super::stats::{model_stats_handler, stats_handler};
use super::stats_file::stats_file_handler;
use crate::config::ServerConfig;
use crate::crypto::SessionStore;
use crate::stats::StatsRegistry;
use crate::version;

/// Everything the handlers share
///
/// The same state backs the framed listener, so a peer can exchange keys
/// over HTTP and score over either transport.
pub struct AppState {
    pub sessions: SessionStore,
    pub registry: Arc<StatsRegistry>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, registry: StatsRegistry) -> Self {
        Self {
            sessions: SessionStore::new().with_strict_key_agreement(config.strict_key_agreement),
            registry: Arc::new(registry),
            config: Arc::new(config),
        }
    }

    /// Default config with the built-in models
    pub fn new_for_test() -> Self {
        Self::new(ServerConfig::default(), StatsRegistry::with_builtin_models())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub build: String,
    pub features: Vec<String>,
    pub models: Vec<String>,
}

pub fn create_app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health_handler))
        // Key exchange
        .route("/keys", get(request_keys_handler))
        .route("/shared-key", get(shared_key_handler))
        // Scoring
        .route("/stats", post(stats_handler))
        .route("/stats/:model", post(model_stats_handler))
        .route("/stats-file", post(stats_file_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve the HTTP API on an already bound listener until it fails
pub async fn start_server(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    let app = create_app(state);
    tracing::info!("HTTP API listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: version::VERSION_NUMBER.to_string(),
        build: version::VERSION.to_string(),
        features: version::FEATURES.iter().map(|f| f.to_string()).collect(),
        models: state.registry.names(),
    })
}
