// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use secure_text_stats::{
    api::{serve_framed, start_server, AppState},
    config::ServerConfig,
    stats::StatsRegistry,
    version,
};
use std::{env, fs::File, path::PathBuf, sync::Arc, sync::Mutex};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt::writer::MakeWriterExt, EnvFilter};

/// Secure text stats server
#[derive(Parser, Debug)]
#[command(name = "secure-text-stats", version = version::VERSION_NUMBER)]
struct ServerCli {
    /// TOML config file; environment variables are used when absent
    #[arg(long, env = "STATS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = ServerCli::parse();

    let config = match &cli.config {
        Some(path) => ServerConfig::from_toml_file(path)?,
        None => {
            let config = ServerConfig::from_env();
            config.validate()?;
            config
        }
    };

    init_tracing(config.log_filename.as_deref())?;
    info!("🚀 Starting {}", version::get_version_string());

    let mut registry = StatsRegistry::with_builtin_models();
    if !config.enabled_models.is_empty() {
        registry.retain_named(&config.enabled_models)?;
    }
    info!("📊 Models loaded: {}", registry.names().join(", "));
    if config.strict_key_agreement {
        info!("🔐 Strict key agreement enabled");
    }

    let state = Arc::new(AppState::new(config.clone(), registry));

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    let http = tokio::spawn(start_server(listener, state.clone()));

    let framed = match &config.framed_addr {
        Some(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding {}", addr))?;
            Some(tokio::spawn(serve_framed(listener, state.clone())))
        }
        None => None,
    };

    tokio::select! {
        result = http => result??,
        result = async {
            match framed {
                Some(handle) => handle.await,
                None => std::future::pending().await,
            }
        } => result??,
        _ = signal::ctrl_c() => info!("Shutdown signal received"),
    }

    Ok(())
}

/// Log to stdout, and also to `log_filename` (truncated) when set
fn init_tracing(log_filename: Option<&str>) -> Result<()> {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());

    match log_filename {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating log file {}", path))?;
            builder
                .with_ansi(false)
                .with_writer(std::io::stdout.and(Mutex::new(file)))
                .init();
        }
        None => builder.init(),
    }
    Ok(())
}
