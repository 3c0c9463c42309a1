// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analysis;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::ClientConfig;

/// Secure text stats client
#[derive(Parser, Debug)]
#[command(name = "stats-client")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Score texts on a secure text stats server", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub server: ServerArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the server is and how keys are checked
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Server IP address
    #[arg(long, env = "STATS_SERVER_IP", default_value = "127.0.0.1", global = true)]
    pub server_ip: String,

    /// Server HTTP port
    #[arg(long, env = "STATS_SERVER_PORT", default_value_t = 5000, global = true)]
    pub server_port: u16,

    /// Address of the framed TCP listener (required with --transport framed)
    #[arg(long, env = "STATS_FRAMED_ADDR", global = true)]
    pub framed_addr: Option<String>,

    /// Fail the key exchange when the server key differs from the local derivation
    #[arg(long, global = true)]
    pub strict_key_agreement: bool,
}

impl ServerArgs {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            framed_addr: self.framed_addr.clone(),
            strict_key_agreement: self.strict_key_agreement,
            ..ClientConfig::new(&self.server_ip, self.server_port)
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score a single text
    Text(analysis::TextArgs),

    /// Score a CSV row by row through the batch dispatcher
    Dataframe(analysis::DataframeArgs),

    /// Upload a whole CSV and let the server score it
    File(analysis::FileArgs),

    /// Check that the server is up
    Health,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.server.client_config();
    match cli.command {
        Commands::Text(args) => analysis::score_text(config, args).await,
        Commands::Dataframe(args) => analysis::score_dataframe(config, args).await,
        Commands::File(args) => analysis::score_file(config, args).await,
        Commands::Health => analysis::health(config).await,
    }
}
