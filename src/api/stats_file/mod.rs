// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Whole-file scoring endpoint
//!
//! `POST /stats-file` takes a CSV upload (encrypted with the peer's shared
//! key unless `no_encryption` is set), scores one text column and returns
//! the table with metric columns appended, encrypted the same way.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{score_table, stats_file_handler};
pub use request::{StatsFileUpload, ValidatedUpload};
pub use response::StatsFileResponse;
