// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Text scoring endpoints
//!
//! `POST /stats` runs every registered model, `POST /stats/:model` a single
//! one. Texts arrive as repeated `text` form fields, encrypted under the
//! peer's shared key unless `no_encryption` is set.

pub mod handler;
pub mod request;

pub use handler::{model_stats_handler, score_for_peer, stats_handler};
pub use request::{parse_flag, StatsForm, StatsRequest};
