// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration
//!
//! Loaded from a TOML file when one is given, otherwise from environment
//! variables. Missing keys fall back to the defaults below.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

fn default_listen_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_allowed_extensions() -> Vec<String> {
    ["csv", "txt", "dat", "json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Optional length-prefixed TCP listener sharing the same sessions
    #[serde(default)]
    pub framed_addr: Option<String>,
    /// File extensions accepted by `stats-file`
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Request body cap for uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Mirror logs into this file (truncated at start-up)
    #[serde(default)]
    pub log_filename: Option<String>,
    /// Reject key exchanges whose client and server secrets differ
    #[serde(default)]
    pub strict_key_agreement: bool,
    /// Restrict the registry to these models (empty = all built-ins)
    #[serde(default)]
    pub enabled_models: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            framed_addr: None,
            allowed_extensions: default_allowed_extensions(),
            max_upload_bytes: default_max_upload_bytes(),
            log_filename: None,
            strict_key_agreement: false,
            enabled_models: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ip = env::var("STATS_IP").unwrap_or_else(|_| "0.0.0.0".to_string());
        let listen_addr = match env::var("STATS_PORT") {
            Ok(port) => format!("{}:{}", ip, port),
            Err(_) if env::var("STATS_IP").is_ok() => format!("{}:5000", ip),
            Err(_) => defaults.listen_addr,
        };

        Self {
            listen_addr,
            framed_addr: env::var("STATS_FRAMED_ADDR").ok(),
            allowed_extensions: env::var("STATS_ALLOWED_EXTENSIONS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.allowed_extensions),
            max_upload_bytes: env::var("STATS_MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
            log_filename: env::var("STATS_LOG_FILENAME").ok(),
            strict_key_agreement: env::var("STATS_STRICT_KEY_AGREEMENT")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
            enabled_models: env::var("STATS_MODELS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("parsing server config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.allowed_extensions.is_empty() {
            return Err(anyhow!("allowed_extensions must not be empty"));
        }
        if self.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than 0"));
        }
        self.listen_addr
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("invalid listen_addr '{}'", self.listen_addr))?;
        if let Some(framed) = &self.framed_addr {
            framed
                .parse::<std::net::SocketAddr>()
                .with_context(|| format!("invalid framed_addr '{}'", framed))?;
        }
        Ok(())
    }

    /// Case-insensitive check of a filename against `allowed_extensions`
    pub fn is_allowed_file(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => self
                .allowed_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
