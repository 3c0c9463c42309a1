// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Key exchange endpoint tests
//!
//! Routes are driven through `oneshot` with a fixed mock peer address, so
//! every request in a test lands on the same session.

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{Request, StatusCode},
    Router,
};
use secure_text_stats::{
    api::{create_app, AppState, ErrorResponse, HealthResponse, KeysResponse, SharedKeyResponse},
    config::ServerConfig,
    crypto::derive_shared_key_hex,
    stats::StatsRegistry,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::util::ServiceExt;

fn app_with(state: Arc<AppState>) -> Router {
    create_app(state).layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 9], 40000))))
}

fn app() -> Router {
    app_with(Arc::new(AppState::new_for_test()))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_keys_returns_hex_material() {
    let app = app();
    let (status, body) = get(&app, "/keys").await;
    assert_eq!(status, StatusCode::OK);

    let keys: KeysResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(keys.status, 200);
    assert_eq!(keys.private_key.len(), 64);
    assert_eq!(keys.public_key.len(), 66);
    assert_eq!(keys.server_public_key.len(), 66);
    assert_ne!(keys.public_key, keys.server_public_key);
}

#[tokio::test]
async fn test_full_exchange_matches_local_derivation() {
    let app = app();
    let (_, body) = get(&app, "/keys").await;
    let keys: KeysResponse = serde_json::from_slice(&body).unwrap();

    let uri = format!(
        "/shared-key?local_private_key={}&remote_public_key={}",
        keys.private_key, keys.server_public_key
    );
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);

    let shared: SharedKeyResponse = serde_json::from_slice(&body).unwrap();
    let local = derive_shared_key_hex(&keys.private_key, &keys.server_public_key).unwrap();
    assert_eq!(shared.shared_key, local.to_hex());
}

#[tokio::test]
async fn test_shared_key_before_keys_is_rejected() {
    let app = app();
    let other = secure_text_stats::crypto::KeyPair::generate();
    let uri = format!(
        "/shared-key?local_private_key={}&remote_public_key={}",
        other.private_hex(),
        other.public_hex()
    );
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.status, 400);
    assert_eq!(error.message, "Secure session required");
}

#[tokio::test]
async fn test_missing_query_param() {
    let app = app();
    get(&app, "/keys").await;
    let (status, body) = get(&app, "/shared-key?local_private_key=abcd").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.error_info, "remote_public_key");
}

#[tokio::test]
async fn test_bad_hex_is_rejected() {
    let app = app();
    let (_, body) = get(&app, "/keys").await;
    let keys: KeysResponse = serde_json::from_slice(&body).unwrap();

    let uri = format!(
        "/shared-key?local_private_key=nothex&remote_public_key={}",
        keys.server_public_key
    );
    let (status, _) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_strict_mode_rejects_mismatched_combination() {
    let config = ServerConfig {
        strict_key_agreement: true,
        ..ServerConfig::default()
    };
    let app = app_with(Arc::new(AppState::new(
        config,
        StatsRegistry::with_builtin_models(),
    )));
    let (_, body) = get(&app, "/keys").await;
    let keys: KeysResponse = serde_json::from_slice(&body).unwrap();

    // Own public key instead of the server's
    let uri = format!(
        "/shared-key?local_private_key={}&remote_public_key={}",
        keys.private_key, keys.public_key
    );
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert!(error.error_info.contains("not the same"));
}

#[tokio::test]
async fn test_health_lists_models() {
    let app = app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, secure_text_stats::version::VERSION_NUMBER);
    assert_eq!(health.build, secure_text_stats::version::VERSION);
    assert!(health.features.contains(&"framed-transport".to_string()));
    assert!(health.models.contains(&"shape".to_string()));
}
