// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Client against a live server on a loopback port

use secure_text_stats::{
    api::{serve_framed, start_server, AppState},
    client::{BatchDispatcher, ClientError, FramedStatsClient, HttpStatsClient, ResultSink, SourceTable},
    config::{ClientConfig, DispatchConfig, ServerConfig},
    crypto::derive_shared_key_hex,
    stats::{MetricValue, StatsRegistry, TEXT_ID_FIELD},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

const CSV: &str = "user,msg_text\n\
ann,Thanks for the great help today.\n\
bob,This build failed again and I hate it.\n\
cy,Meeting moved to 3pm.\n\
dee,Love it!\n\
eve,Sorry about the problem with the deploy.\n";

async fn spawn_server(config: ServerConfig) -> (SocketAddr, SocketAddr) {
    let state = Arc::new(AppState::new(config, StatsRegistry::with_builtin_models()));

    let http = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let http_addr = http.local_addr().unwrap();
    tokio::spawn(start_server(http, state.clone()));

    let framed = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let framed_addr = framed.local_addr().unwrap();
    tokio::spawn(serve_framed(framed, state));

    (http_addr, framed_addr)
}

fn client_config(addr: SocketAddr) -> ClientConfig {
    ClientConfig::new(&addr.ip().to_string(), addr.port())
}

#[tokio::test]
async fn test_connect_bootstraps_matching_keys() {
    let (addr, _) = spawn_server(ServerConfig::default()).await;
    let client = HttpStatsClient::connect(client_config(addr)).await.unwrap();

    let keys = client.keys().unwrap();
    let local = derive_shared_key_hex(&keys.private_key, &keys.server_public_key).unwrap();
    assert_eq!(keys.shared_key, local);

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn test_strict_client_against_strict_server() {
    let (addr, _) = spawn_server(ServerConfig {
        strict_key_agreement: true,
        ..ServerConfig::default()
    })
    .await;
    let config = ClientConfig {
        strict_key_agreement: true,
        ..client_config(addr)
    };
    assert!(HttpStatsClient::connect(config).await.is_ok());
}

#[tokio::test]
async fn test_score_single_text_both_modes() {
    let (addr, _) = spawn_server(ServerConfig::default()).await;
    let client = HttpStatsClient::connect(client_config(addr)).await.unwrap();

    let sealed = client.score_text("all", "What a wonderful day.", false).await.unwrap();
    let plain = client.score_text("all", "What a wonderful day.", true).await.unwrap();
    assert_eq!(sealed, plain);
    assert_eq!(sealed["word_count"], MetricValue::Number(4.0));
}

#[tokio::test]
async fn test_dataframe_over_http() {
    let (addr, _) = spawn_server(ServerConfig::default()).await;
    let client = Arc::new(HttpStatsClient::connect(client_config(addr)).await.unwrap());

    let source = SourceTable::from_bytes(CSV.as_bytes()).unwrap();
    let dispatcher = BatchDispatcher::new(
        client,
        DispatchConfig {
            rows_per_batch: 2,
            max_in_flight: 2,
            ..Default::default()
        },
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("mt_mr_rq_stats_result.csv");
    let mut sink = ResultSink::new(source.clone(), std::fs::File::create(&log_path).unwrap());
    let report = dispatcher.run(&source, "msg_text", &mut sink).await.unwrap();

    assert_eq!(report.rows_merged, 5);
    assert!(report.skipped.is_empty());
    let table = sink.table();
    assert_eq!(table.get(3, TEXT_ID_FIELD), Some(MetricValue::Text("3".to_string())));
    match table.get(0, "sentiment_polarity") {
        Some(MetricValue::Number(p)) => assert!(p > 0.0),
        other => panic!("unexpected polarity {:?}", other),
    }
    match table.get(1, "sentiment_polarity") {
        Some(MetricValue::Number(p)) => assert!(p < 0.0),
        other => panic!("unexpected polarity {:?}", other),
    }

    drop(sink);
    let log = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(log.lines().count(), 6);
}

#[tokio::test]
async fn test_dataframe_over_framed_transport() {
    let (addr, framed_addr) = spawn_server(ServerConfig::default()).await;
    let http = HttpStatsClient::connect(client_config(addr)).await.unwrap();
    let framed = FramedStatsClient::new(framed_addr.to_string(), http.keys().cloned());

    let source = SourceTable::from_bytes(CSV.as_bytes()).unwrap();
    let dispatcher = BatchDispatcher::new(Arc::new(framed), DispatchConfig::default()).unwrap();
    let mut sink = ResultSink::new(source.clone(), Vec::new());
    let report = dispatcher.run(&source, "msg_text", &mut sink).await.unwrap();

    assert_eq!(report.rows_merged, 5);
    assert_eq!(sink.table().get(3, "word_count"), Some(MetricValue::Number(2.0)));
}

#[tokio::test]
async fn test_analyse_file_writes_scored_copy() {
    let (addr, _) = spawn_server(ServerConfig::default()).await;
    let client = HttpStatsClient::connect(client_config(addr)).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("messages.csv");
    std::fs::write(&input, CSV).unwrap();

    let output = client
        .analyse_file(&input, dir.path(), "msg_text", 0, false)
        .await
        .unwrap();
    assert_eq!(output.file_name().unwrap(), "stats_messages.csv");

    let table = SourceTable::from_path(&output).unwrap();
    assert_eq!(table.len(), 5);
    assert_eq!(&table.columns()[..2], &["user", "msg_text"]);
    assert!(table.column_index("flesch_reading_ease").is_some());
}

#[tokio::test]
async fn test_unreachable_server_fails_key_exchange() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = HttpStatsClient::connect(client_config(addr)).await.unwrap_err();
    assert!(matches!(err, ClientError::KeyExchange(_)));
}
