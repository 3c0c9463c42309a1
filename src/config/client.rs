// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client-side configuration: where the server is and how rows are dispatched

use serde::{Deserialize, Serialize};
use std::fmt;

/// How batches travel to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// One HTTP request per batch
    Http,
    /// One length-prefixed TCP exchange per batch
    Framed,
}

impl TransportMode {
    /// Short tag used in output file names
    pub fn tag(&self) -> &'static str {
        match self {
            TransportMode::Http => "rq",
            TransportMode::Framed => "sk",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Http => write!(f, "Requests"),
            TransportMode::Framed => write!(f, "Socket"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// e.g. `http://127.0.0.1:5000`
    pub base_url: String,
    /// Address of the framed listener, required for `TransportMode::Framed`
    pub framed_addr: Option<String>,
    pub transport: TransportMode,
    /// Verify the returned shared key against a local derivation
    pub strict_key_agreement: bool,
}

impl ClientConfig {
    pub fn new(server_ip: &str, server_port: u16) -> Self {
        Self {
            base_url: format!("http://{}:{}", server_ip, server_port),
            framed_addr: None,
            transport: TransportMode::Http,
            strict_key_agreement: false,
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub rows_per_batch: usize,
    pub max_in_flight: usize,
    pub multi_threaded: bool,
    pub multi_messages: bool,
    pub no_encryption: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            rows_per_batch: 10,
            max_in_flight: 100,
            multi_threaded: true,
            multi_messages: true,
            no_encryption: false,
        }
    }
}

impl DispatchConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.rows_per_batch == 0 {
            return Err("rows_per_batch must be at least 1".to_string());
        }
        if self.max_in_flight == 0 {
            return Err("max_in_flight must be at least 1".to_string());
        }
        Ok(())
    }

    /// Apply the mode overrides: single-threaded forces one call in flight,
    /// single-message forces one row per batch
    pub fn effective(&self) -> Self {
        Self {
            rows_per_batch: if self.multi_messages {
                self.rows_per_batch
            } else {
                1
            },
            max_in_flight: if self.multi_threaded {
                self.max_in_flight
            } else {
                1
            },
            ..self.clone()
        }
    }

    /// Output file name encoding threading, batching and transport mode
    pub fn output_filename(&self, transport: TransportMode) -> String {
        format!(
            "{}_{}_{}_stats_result.csv",
            if self.multi_threaded { "mt" } else { "st" },
            if self.multi_messages { "mr" } else { "sr" },
            transport.tag()
        )
    }
}
