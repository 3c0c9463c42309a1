// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod crypto;
pub mod stats;
pub mod version;

pub use api::{create_app, AppState, ApiError};
pub use client::{BatchDispatcher, ClientError, HttpStatsClient, ResultSink, SourceTable};
pub use config::{ClientConfig, DispatchConfig, ServerConfig, TransportMode};
pub use crypto::{CryptoError, SessionStore, SharedSecret};
pub use stats::{MetricMap, MetricValue, StatsModel, StatsRegistry};
