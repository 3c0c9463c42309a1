// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::client::{
    BatchDispatcher, DispatchReport, FramedStatsClient, HttpStatsClient, ResultSink, SourceTable,
};
use crate::config::{ClientConfig, DispatchConfig, TransportMode};
use crate::stats::ALL_MODELS;

/// Arguments for the text command
#[derive(Args, Debug)]
pub struct TextArgs {
    /// Text to score
    pub text: String,

    /// Model name, or "all"
    #[arg(long, default_value = ALL_MODELS)]
    pub model: String,

    /// Send the text in plaintext
    #[arg(long)]
    pub no_encryption: bool,
}

/// Arguments for the dataframe command
#[derive(Args, Debug)]
pub struct DataframeArgs {
    /// Input CSV
    pub input: PathBuf,

    /// Column holding the texts
    #[arg(long, default_value = "text")]
    pub text_col: String,

    /// Rows per request
    #[arg(long, default_value_t = 10)]
    pub rows_per_batch: usize,

    /// Requests in flight before waiting for the cohort
    #[arg(long, default_value_t = 100)]
    pub max_in_flight: usize,

    /// One request in flight at a time
    #[arg(long)]
    pub single_threaded: bool,

    /// One row per request
    #[arg(long)]
    pub single_message: bool,

    #[arg(long)]
    pub no_encryption: bool,

    #[arg(long, value_enum, default_value_t = TransportMode::Http)]
    pub transport: TransportMode,

    /// Only the first N rows
    #[arg(long)]
    pub limit: Option<usize>,

    /// Keep only rows where this column equals --filter-value (overrides --limit)
    #[arg(long, requires = "filter_value")]
    pub filter_col: Option<String>,

    #[arg(long, requires = "filter_col")]
    pub filter_value: Option<String>,

    /// Directory for the result CSVs
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

impl DataframeArgs {
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            rows_per_batch: self.rows_per_batch,
            max_in_flight: self.max_in_flight,
            multi_threaded: !self.single_threaded,
            multi_messages: !self.single_message,
            no_encryption: self.no_encryption,
        }
    }
}

/// Arguments for the file command
#[derive(Args, Debug)]
pub struct FileArgs {
    /// Input CSV
    pub input: PathBuf,

    /// Column holding the texts
    #[arg(long, default_value = "text")]
    pub text_col: String,

    /// Rows the server should score, 0 for all
    #[arg(long, default_value_t = 0)]
    pub amount: usize,

    #[arg(long)]
    pub no_encryption: bool,

    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

pub async fn score_text(config: ClientConfig, args: TextArgs) -> Result<()> {
    let client = HttpStatsClient::connect(config).await?;
    let result = client
        .score_text(&args.model, &args.text, args.no_encryption)
        .await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub async fn score_dataframe(config: ClientConfig, args: DataframeArgs) -> Result<()> {
    let table = SourceTable::from_path(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let filter = args
        .filter_col
        .as_deref()
        .zip(args.filter_value.as_deref());
    let source = table.select(args.limit, filter).map_err(|e| anyhow!(e))?;

    let dispatch = args.dispatch_config();
    dispatch.validate().map_err(|e| anyhow!(e))?;
    let log_path = args
        .output_dir
        .join(dispatch.output_filename(args.transport));
    let mut sink = ResultSink::new(
        source.clone(),
        File::create(&log_path).with_context(|| format!("creating {}", log_path.display()))?,
    );

    info!(
        "Scoring {} rows from {} over {} (multi-threaded: {}, multi-message: {})",
        source.len(),
        args.input.display(),
        args.transport,
        dispatch.multi_threaded,
        dispatch.multi_messages
    );

    let http = HttpStatsClient::connect(config.clone()).await?;
    let report = match args.transport {
        TransportMode::Http => {
            BatchDispatcher::new(Arc::new(http), dispatch)?
                .run(&source, &args.text_col, &mut sink)
                .await?
        }
        TransportMode::Framed => {
            let addr = config
                .framed_addr
                .clone()
                .ok_or_else(|| anyhow!("--framed-addr is required for the framed transport"))?;
            let framed = FramedStatsClient::new(addr, http.keys().cloned());
            BatchDispatcher::new(Arc::new(framed), dispatch)?
                .run(&source, &args.text_col, &mut sink)
                .await?
        }
    };

    let (table, _) = sink.into_parts()?;
    let stem = args
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("input");
    let table_path = args.output_dir.join(format!("stats_{}.csv", stem));
    table.write_csv(File::create(&table_path)?)?;

    summarize(&report, &log_path, &table_path);
    Ok(())
}

pub async fn score_file(config: ClientConfig, args: FileArgs) -> Result<()> {
    let client = HttpStatsClient::connect(config).await?;
    let output = client
        .analyse_file(
            &args.input,
            &args.output_dir,
            &args.text_col,
            args.amount,
            args.no_encryption,
        )
        .await?;
    println!("{}", output.display());
    Ok(())
}

pub async fn health(config: ClientConfig) -> Result<()> {
    let client = HttpStatsClient::new(config)?;
    let health = client.health().await?;
    println!(
        "{} (version {}, build {}, models: {})",
        health.status,
        health.version,
        health.build,
        health.models.join(", ")
    );
    Ok(())
}

fn summarize(report: &DispatchReport, log_path: &std::path::Path, table_path: &std::path::Path) {
    info!(
        "Merged {} rows in {} batches, elapsed {:.2?}",
        report.rows_merged,
        report.batches_dispatched(),
        report.elapsed
    );
    for skipped in &report.skipped {
        warn!("Skipped rows {:?}: {}", skipped.indices, skipped.reason);
    }
    info!("Results log: {}", log_path.display());
    info!("Result table: {}", table_path.display());
}
