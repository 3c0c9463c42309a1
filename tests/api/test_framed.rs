// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Length-prefixed TCP transport against a live listener

use secure_text_stats::{
    api::{serve_framed, AppState},
    client::{FramedStatsClient, SessionKeys, StatsTransport, TransportError},
    stats::{MetricValue, TEXT_ID_FIELD},
};
use std::sync::Arc;
use tokio::net::TcpListener;

async fn spawn_listener(state: Arc<AppState>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_framed(listener, state));
    addr.to_string()
}

async fn keys_for_loopback(state: &AppState) -> SessionKeys {
    let issued = state.sessions.request_key_pair("127.0.0.1").await;
    let shared_key = state
        .sessions
        .derive_shared_key("127.0.0.1", &issued.private_key, &issued.server_public_key)
        .await
        .unwrap();
    SessionKeys {
        private_key: issued.private_key,
        public_key: issued.public_key,
        server_public_key: issued.server_public_key,
        shared_key,
    }
}

#[tokio::test]
async fn test_encrypted_batch_over_frames() {
    let state = Arc::new(AppState::new_for_test());
    let addr = spawn_listener(state.clone()).await;
    let client = FramedStatsClient::new(addr, Some(keys_for_loopback(&state).await));

    let texts = vec!["alpha beta".to_string(), "gamma".to_string()];
    let ids = vec!["4".to_string(), "5".to_string()];
    let results = client.score_batch(&texts, &ids, false).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0][TEXT_ID_FIELD], MetricValue::Text("4".to_string()));
    assert_eq!(results[0]["word_count"], MetricValue::Number(2.0));
    assert_eq!(results[1]["word_count"], MetricValue::Number(1.0));
}

#[tokio::test]
async fn test_parallel_calls_use_separate_connections() {
    let state = Arc::new(AppState::new_for_test());
    let addr = spawn_listener(state).await;
    let client = Arc::new(FramedStatsClient::new(addr, None));

    let mut handles = Vec::new();
    for i in 0..8 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let text = vec!["word ".repeat(i + 1)];
            client.score_batch(&text, &[], true).await
        }));
    }
    for (i, handle) in handles.into_iter().enumerate() {
        let results = handle.await.unwrap().unwrap();
        assert_eq!(results[0]["word_count"], MetricValue::Number((i + 1) as f64));
    }
}

#[tokio::test]
async fn test_server_errors_come_back_as_rejections() {
    let state = Arc::new(AppState::new_for_test());
    let addr = spawn_listener(state).await;

    // Encrypted request from a peer without a key
    let client = FramedStatsClient::new(addr.clone(), None);
    let err = client
        .call(&secure_text_stats::api::StatsRequest {
            model: "all".to_string(),
            texts: vec!["c2VhbGVk".to_string()],
            ids: vec![],
            no_encryption: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Rejected { status: 400, .. }));

    let client = FramedStatsClient::new(addr, None).with_model("nope");
    let err = client
        .score_batch(&["x".to_string()], &[], true)
        .await
        .unwrap_err();
    assert!(!err.is_fatal());
}
