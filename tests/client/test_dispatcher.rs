// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Batch dispatcher behaviour with scripted transports

use async_trait::async_trait;
use rand::Rng;
use secure_text_stats::{
    client::{
        BatchDispatcher, ClientError, ResultSink, SourceTable, StatsTransport, TransportError,
    },
    config::DispatchConfig,
    stats::{MetricMap, MetricValue, TEXT_ID_FIELD},
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn source(rows: usize) -> SourceTable {
    SourceTable::new(
        vec!["channel".to_string(), "text".to_string()],
        (0..rows)
            .map(|i| vec![format!("c{}", i % 3), "w ".repeat(i + 1)])
            .collect(),
    )
}

fn score(texts: &[String], ids: &[String]) -> Vec<MetricMap> {
    texts
        .iter()
        .zip(ids)
        .map(|(text, id)| {
            let mut m = MetricMap::new();
            m.insert(TEXT_ID_FIELD.to_string(), MetricValue::Text(id.clone()));
            m.insert(
                "words".to_string(),
                MetricValue::from(text.split_whitespace().count()),
            );
            m
        })
        .collect()
}

/// Sleeps a random few milliseconds per call so batches finish out of order
struct JitterTransport {
    max_delay_ms: u64,
    first_done: AtomicBool,
    early_calls: AtomicUsize,
}

impl JitterTransport {
    fn new(max_delay_ms: u64) -> Self {
        Self {
            max_delay_ms,
            first_done: AtomicBool::new(false),
            early_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl StatsTransport for JitterTransport {
    async fn score_batch(
        &self,
        texts: &[String],
        ids: &[String],
        _no_encryption: bool,
    ) -> Result<Vec<MetricMap>, TransportError> {
        let is_first = ids.first().map(|id| id == "0").unwrap_or(false);
        if !is_first && !self.first_done.load(Ordering::SeqCst) {
            self.early_calls.fetch_add(1, Ordering::SeqCst);
        }
        let delay = rand::thread_rng().gen_range(0..=self.max_delay_ms);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        if is_first {
            self.first_done.store(true, Ordering::SeqCst);
        }
        Ok(score(texts, ids))
    }
}

/// Fails every batch containing one of `bad_rows`
struct FlakyTransport {
    bad_rows: HashSet<String>,
    fatal: bool,
    calls: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl StatsTransport for FlakyTransport {
    async fn score_batch(
        &self,
        texts: &[String],
        ids: &[String],
        _no_encryption: bool,
    ) -> Result<Vec<MetricMap>, TransportError> {
        self.calls.lock().unwrap().push(ids.to_vec());
        if ids.iter().any(|id| self.bad_rows.contains(id)) {
            return Err(if self.fatal {
                TransportError::Fatal("connection refused".to_string())
            } else {
                TransportError::Transient("read timed out".to_string())
            });
        }
        Ok(score(texts, ids))
    }
}

fn flaky(bad: &[usize], fatal: bool) -> Arc<FlakyTransport> {
    Arc::new(FlakyTransport {
        bad_rows: bad.iter().map(|i| i.to_string()).collect(),
        fatal,
        calls: Mutex::new(Vec::new()),
    })
}

#[tokio::test]
async fn test_first_row_completes_before_others_start() {
    let transport = Arc::new(JitterTransport::new(15));
    let config = DispatchConfig {
        rows_per_batch: 3,
        max_in_flight: 4,
        ..Default::default()
    };
    let dispatcher = BatchDispatcher::new(transport.clone(), config).unwrap();
    let source = source(30);
    let mut sink = ResultSink::new(source.clone(), Vec::new());

    let report = dispatcher.run(&source, "text", &mut sink).await.unwrap();

    assert_eq!(report.dispatch_order[0], vec![0]);
    assert_eq!(transport.early_calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.rows_merged, 30);
}

#[tokio::test]
async fn test_every_row_dispatched_once() {
    let dispatcher = BatchDispatcher::new(
        Arc::new(JitterTransport::new(3)),
        DispatchConfig {
            rows_per_batch: 4,
            max_in_flight: 3,
            ..Default::default()
        },
    )
    .unwrap();
    let source = source(23);
    let mut sink = ResultSink::new(source.clone(), Vec::new());
    let report = dispatcher.run(&source, "text", &mut sink).await.unwrap();

    let mut seen: Vec<usize> = report.dispatch_order.iter().flatten().copied().collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..23).collect::<Vec<_>>());
    assert!(report.dispatch_order.iter().skip(1).all(|b| b.len() <= 4));
    assert_eq!(sink.table().merged_rows().len(), 23);
}

#[tokio::test]
async fn test_output_independent_of_completion_order() {
    let config = DispatchConfig {
        rows_per_batch: 2,
        max_in_flight: 5,
        ..Default::default()
    };
    let source = source(17);

    let sequential = BatchDispatcher::new(
        Arc::new(JitterTransport::new(0)),
        DispatchConfig {
            multi_threaded: false,
            ..config.clone()
        },
    )
    .unwrap();
    let mut expected = ResultSink::new(source.clone(), Vec::new());
    sequential.run(&source, "text", &mut expected).await.unwrap();

    for _ in 0..3 {
        let jittered =
            BatchDispatcher::new(Arc::new(JitterTransport::new(20)), config.clone()).unwrap();
        let mut sink = ResultSink::new(source.clone(), Vec::new());
        jittered.run(&source, "text", &mut sink).await.unwrap();
        assert_eq!(sink.table(), expected.table());
    }
}

#[tokio::test]
async fn test_transient_failures_skip_only_their_batch() {
    let transport = flaky(&[3], false);
    let dispatcher = BatchDispatcher::new(
        transport.clone(),
        DispatchConfig {
            rows_per_batch: 2,
            max_in_flight: 2,
            ..Default::default()
        },
    )
    .unwrap();
    let source = source(7);
    let mut sink = ResultSink::new(source.clone(), Vec::new());

    let report = dispatcher.run(&source, "text", &mut sink).await.unwrap();

    // Batches: [0], [1,2], [3,4], [5,6]
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].indices, vec![3, 4]);
    assert_eq!(sink.table().merged_rows(), vec![0, 1, 2, 5, 6]);
    assert_eq!(sink.table().get(4, "words"), Some(MetricValue::Number(0.0)));
    assert_eq!(report.rows_merged + report.skipped_rows(), 7);
}

#[tokio::test]
async fn test_fatal_error_aborts_dispatch() {
    let transport = flaky(&[1], true);
    let dispatcher = BatchDispatcher::new(
        transport.clone(),
        DispatchConfig {
            rows_per_batch: 1,
            max_in_flight: 1,
            ..Default::default()
        },
    )
    .unwrap();
    let source = source(10);
    let mut sink = ResultSink::new(source.clone(), Vec::new());

    let err = dispatcher.run(&source, "text", &mut sink).await.unwrap_err();
    match err {
        ClientError::Fatal { rows_merged, .. } => assert_eq!(rows_merged, 1),
        other => panic!("expected fatal error, got {:?}", other),
    }
    // Nothing submitted after the barrier that observed the failure
    assert_eq!(transport.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_result_log_header_once_in_completion_order() {
    let dispatcher = BatchDispatcher::new(
        Arc::new(JitterTransport::new(5)),
        DispatchConfig {
            rows_per_batch: 3,
            max_in_flight: 3,
            ..Default::default()
        },
    )
    .unwrap();
    let source = source(12);
    let mut sink = ResultSink::new(source.clone(), Vec::new());
    dispatcher.run(&source, "text", &mut sink).await.unwrap();

    let (_, log) = sink.into_parts().unwrap();
    let log = String::from_utf8(log).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 13);
    assert_eq!(lines[0], "\"server_text_id\",\"words\",\"channel\",\"text\"");
    assert_eq!(lines.iter().filter(|l| l.contains("server_text_id")).count(), 1);
    // Row 0 is always merged first
    assert!(lines[1].starts_with("\"0\","));
}

#[tokio::test]
async fn test_empty_results_are_skipped_not_merged() {
    struct Empty;

    #[async_trait]
    impl StatsTransport for Empty {
        async fn score_batch(
            &self,
            _texts: &[String],
            _ids: &[String],
            _no_encryption: bool,
        ) -> Result<Vec<MetricMap>, TransportError> {
            Ok(Vec::new())
        }
    }

    let dispatcher = BatchDispatcher::new(Arc::new(Empty), DispatchConfig::default()).unwrap();
    let source = source(3);
    let mut sink = ResultSink::new(source.clone(), Vec::new());
    let report = dispatcher.run(&source, "text", &mut sink).await.unwrap();

    assert_eq!(report.rows_merged, 0);
    assert_eq!(report.skipped.len(), 2);
}

/// Tracks how many calls are live when each call starts
#[derive(Default)]
struct ConcurrencyTransport {
    live: AtomicUsize,
    starts: Mutex<Vec<(usize, usize)>>,
}

#[async_trait]
impl StatsTransport for ConcurrencyTransport {
    async fn score_batch(
        &self,
        texts: &[String],
        ids: &[String],
        _no_encryption: bool,
    ) -> Result<Vec<MetricMap>, TransportError> {
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        let row: usize = ids[0].parse().unwrap();
        self.starts.lock().unwrap().push((row, live));
        tokio::time::sleep(Duration::from_millis(30)).await;
        self.live.fetch_sub(1, Ordering::SeqCst);
        Ok(score(texts, ids))
    }
}

#[tokio::test]
async fn test_cohort_drains_before_next_starts() {
    let transport = Arc::new(ConcurrencyTransport::default());
    let config = DispatchConfig {
        rows_per_batch: 1,
        max_in_flight: 3,
        ..Default::default()
    };
    let dispatcher = BatchDispatcher::new(transport.clone(), config).unwrap();
    let table = source(10);
    let mut sink = ResultSink::new(table.clone(), Vec::new());

    let report = dispatcher.run(&table, "text", &mut sink).await.unwrap();
    assert_eq!(report.rows_merged, 10);

    let mut starts = transport.starts.lock().unwrap().clone();
    starts.sort();
    assert_eq!(starts.len(), 10);

    let peak = starts.iter().map(|(_, live)| *live).max().unwrap();
    assert_eq!(peak, 3);

    // Row 0 alone, then cohorts {1,2,3}, {4,5,6}, {7,8,9}
    for (row, live) in &starts {
        if [0, 1, 4, 7].contains(row) {
            assert_eq!(*live, 1, "row {} started while another call was live", row);
        }
    }
}
