// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text scoring boundary
//!
//! The server only needs two things from a scorer: a mapping of metric name to
//! value for a text, and a way to pick scorers by name. Everything else about
//! the models is opaque to the pipeline.

pub mod metric;
pub mod models;
pub mod registry;

pub use metric::{ColumnKind, MetricMap, MetricValue, TEXT_ID_FIELD};
pub use models::{LexiconSentimentModel, ReadabilityModel, TextShapeModel};
pub use registry::{StatsError, StatsModel, StatsRegistry, ALL_MODELS};
