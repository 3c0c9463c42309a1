// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Batch dispatcher
//!
//! Splits a [`SourceTable`] into batches and scores them concurrently
//! through a [`StatsTransport`]:
//!
//! 1. Row 0 is sent alone and merged before anything else is submitted.
//! 2. Remaining rows are grouped `rows_per_batch` at a time.
//! 3. Once `max_in_flight` batches are outstanding, submission pauses until
//!    the whole cohort has completed (a barrier, not a sliding window).
//! 4. A trailing partial batch is sent last, then everything is drained.
//!
//! Workers report through a completion channel and every merge happens on
//! the dispatching task, so the sink needs no lock. Each submitted batch
//! produces exactly one outcome: merged, skipped, or fatal.

use crate::client::error::{ClientError, TransportError};
use crate::client::sink::ResultSink;
use crate::client::source::{RowIndex, SourceTable};
use crate::client::transport::StatsTransport;
use crate::config::DispatchConfig;
use crate::stats::MetricMap;
use futures::FutureExt;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub indices: Vec<RowIndex>,
    pub texts: Vec<String>,
}

impl Batch {
    fn push(&mut self, index: RowIndex, text: String) {
        self.indices.push(index);
        self.texts.push(text);
    }

    fn len(&self) -> usize {
        self.indices.len()
    }

    fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// A batch whose rows were not merged
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedBatch {
    pub indices: Vec<RowIndex>,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Batches in submission order
    pub dispatch_order: Vec<Vec<RowIndex>>,
    pub rows_merged: usize,
    pub skipped: Vec<SkippedBatch>,
    pub elapsed: Duration,
}

impl DispatchReport {
    pub fn batches_dispatched(&self) -> usize {
        self.dispatch_order.len()
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped.iter().map(|s| s.indices.len()).sum()
    }
}

struct Completed {
    batch: Batch,
    result: Result<Vec<MetricMap>, TransportError>,
    elapsed: Duration,
}

pub struct BatchDispatcher<T: StatsTransport + 'static> {
    transport: Arc<T>,
    config: DispatchConfig,
}

impl<T: StatsTransport + 'static> BatchDispatcher<T> {
    pub fn new(transport: Arc<T>, config: DispatchConfig) -> Result<Self, ClientError> {
        config.validate().map_err(ClientError::InvalidConfig)?;
        Ok(Self {
            transport,
            config: config.effective(),
        })
    }

    /// Effective configuration after mode overrides
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Score every row of `source` and record the results in `sink`
    ///
    /// Transient failures skip their batch and are listed in the report. A
    /// fatal transport failure stops further submission, waits for the
    /// batches already in flight, and returns `ClientError::Fatal`.
    pub async fn run<W: Write>(
        &self,
        source: &SourceTable,
        text_column: &str,
        sink: &mut ResultSink<W>,
    ) -> Result<DispatchReport, ClientError> {
        let column = source.column_index(text_column).ok_or_else(|| {
            ClientError::InvalidConfig(format!("text column '{}' not found", text_column))
        })?;

        let started = Instant::now();
        let total = source.len();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut run = Run {
            transport: self.transport.clone(),
            pool: Arc::new(Semaphore::new(self.config.max_in_flight)),
            no_encryption: self.config.no_encryption,
            tx,
            rx,
            in_flight: 0,
            rows_sent: 0,
            total,
            started,
            report: DispatchReport::default(),
            fatal: None,
        };

        info!(
            "Dispatching {} rows, rows per call: {}, max calls in flight: {}",
            total, self.config.rows_per_batch, self.config.max_in_flight
        );

        let mut pending = Batch::default();
        for (index, row) in source.rows().iter().enumerate() {
            if run.fatal.is_some() {
                break;
            }
            let text = row.get(column).cloned().unwrap_or_default();

            if index == 0 {
                let mut first = Batch::default();
                first.push(0, text);
                run.submit(first).await?;
                run.drain(sink).await?;
                continue;
            }

            pending.push(index, text);
            if pending.len() >= self.config.rows_per_batch {
                run.submit(std::mem::take(&mut pending)).await?;
            }
            if run.in_flight >= self.config.max_in_flight {
                info!(
                    "Waiting for futures, rows per call: {}, calls sent: {}, total rows sent {}, total rows processed {}/{}",
                    self.config.rows_per_batch,
                    run.report.batches_dispatched(),
                    run.rows_sent,
                    run.report.rows_merged,
                    total
                );
                run.drain(sink).await?;
            }
        }

        if run.fatal.is_none() && !pending.is_empty() {
            run.submit(pending).await?;
        }
        run.drain(sink).await?;

        run.report.elapsed = started.elapsed();
        if let Some(reason) = run.fatal {
            return Err(ClientError::Fatal {
                reason,
                rows_merged: run.report.rows_merged,
            });
        }

        info!(
            "Dispatch finished: {}/{} rows merged, {} batches skipped, elapsed {:?}",
            run.report.rows_merged,
            total,
            run.report.skipped.len(),
            run.report.elapsed
        );
        Ok(run.report)
    }
}

/// State of one `run` call
struct Run<T: StatsTransport + 'static> {
    transport: Arc<T>,
    pool: Arc<Semaphore>,
    no_encryption: bool,
    tx: mpsc::UnboundedSender<Completed>,
    rx: mpsc::UnboundedReceiver<Completed>,
    in_flight: usize,
    rows_sent: usize,
    total: usize,
    started: Instant,
    report: DispatchReport,
    fatal: Option<String>,
}

impl<T: StatsTransport + 'static> Run<T> {
    async fn submit(&mut self, batch: Batch) -> Result<(), ClientError> {
        let permit = self
            .pool
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;

        debug!("Submitting rows {:?}", batch.indices);
        self.report.dispatch_order.push(batch.indices.clone());
        self.rows_sent += batch.len();
        self.in_flight += 1;

        let transport = self.transport.clone();
        let tx = self.tx.clone();
        let no_encryption = self.no_encryption;
        tokio::spawn(async move {
            let _permit = permit;
            let started = Instant::now();
            let ids: Vec<String> = batch.indices.iter().map(|i| i.to_string()).collect();
            let result = AssertUnwindSafe(transport.score_batch(&batch.texts, &ids, no_encryption))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(TransportError::Transient("worker panicked".to_string())));
            let _ = tx.send(Completed {
                batch,
                result,
                elapsed: started.elapsed(),
            });
        });
        Ok(())
    }

    /// Wait for every outstanding batch, merging in completion order
    async fn drain<W: Write>(&mut self, sink: &mut ResultSink<W>) -> Result<(), ClientError> {
        while self.in_flight > 0 {
            let done = self.rx.recv().await.ok_or_else(|| ClientError::Fatal {
                reason: "completion channel closed".to_string(),
                rows_merged: self.report.rows_merged,
            })?;
            self.in_flight -= 1;
            self.complete(done, sink);
        }
        Ok(())
    }

    fn complete<W: Write>(&mut self, done: Completed, sink: &mut ResultSink<W>) {
        let Completed {
            batch,
            result,
            elapsed,
        } = done;

        let results = match result {
            Ok(results) if results.len() == batch.len() => results,
            Ok(results) => {
                let reason = format!(
                    "server returned {} results for {} rows",
                    results.len(),
                    batch.len()
                );
                self.skip(batch, reason);
                return;
            }
            Err(e) if e.is_fatal() => {
                warn!("Fatal transport error on rows {:?}: {}", batch.indices, e);
                self.abort(batch, e.to_string());
                return;
            }
            Err(e) => {
                self.skip(batch, e.to_string());
                return;
            }
        };

        if let Err(e) = sink.record(&batch.indices, &results) {
            error!("Could not record rows {:?}: {}", batch.indices, e);
            self.abort(batch, format!("writing results: {}", e));
            return;
        }
        self.report.rows_merged += batch.len();

        info!(
            "Index Range: {} - {} / {}, Elapsed: {:.2?}, Since start: {:.2?}, Time: {}",
            batch.indices.first().copied().unwrap_or_default(),
            batch.indices.last().copied().unwrap_or_default(),
            self.total,
            elapsed,
            self.started.elapsed(),
            chrono::Local::now().format("%Y/%m/%d %H:%M:%S")
        );
    }

    /// Stop further submission; batches already in flight still drain
    fn abort(&mut self, batch: Batch, reason: String) {
        self.fatal.get_or_insert_with(|| reason.clone());
        self.report.skipped.push(SkippedBatch {
            indices: batch.indices,
            reason,
        });
    }

    fn skip(&mut self, batch: Batch, reason: String) {
        warn!("Error processing rows {:?}: {}", batch.indices, reason);
        self.report.skipped.push(SkippedBatch {
            indices: batch.indices,
            reason,
        });
    }
}
