// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use axum::http::header;
use axum::response::{IntoResponse, Response};

/// Scored table returned as a file download
#[derive(Debug, Clone)]
pub struct StatsFileResponse {
    pub filename: String,
    pub body: Vec<u8>,
    /// Body is an encrypted envelope rather than CSV text
    pub encrypted: bool,
}

impl StatsFileResponse {
    /// `messages.csv` -> `stats_messages.csv`
    pub fn output_name(upload_name: &str) -> String {
        let stem = upload_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(upload_name);
        format!("stats_{}.csv", stem)
    }
}

impl IntoResponse for StatsFileResponse {
    fn into_response(self) -> Response {
        let content_type = if self.encrypted {
            "application/octet-stream"
        } else {
            "text/csv"
        };
        (
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", self.filename),
                ),
            ],
            self.body,
        )
            .into_response()
    }
}
