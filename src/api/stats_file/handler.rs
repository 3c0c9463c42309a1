// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use crate::api::http_server::AppState;
use crate::api::stats_file::{StatsFileResponse, StatsFileUpload};
use crate::api::{ApiError, PeerIdentity};
use crate::client::sink::OutputTable;
use crate::client::source::SourceTable;
use crate::crypto::{decrypt_file, encrypt_file};
use crate::stats::{MetricValue, StatsRegistry, TEXT_ID_FIELD};
use axum::extract::State;
use axum_extra::extract::Multipart;
use std::sync::Arc;
use tracing::{info, warn};

/// POST /stats-file
pub async fn stats_file_handler(
    State(state): State<Arc<AppState>>,
    PeerIdentity(peer): PeerIdentity,
    multipart: Multipart,
) -> Result<StatsFileResponse, ApiError> {
    let upload = StatsFileUpload::from_multipart(multipart)
        .await?
        .validate(&state.config)?;

    let secret = if upload.no_encryption {
        None
    } else {
        Some(state.sessions.shared_secret(&peer).await?)
    };

    let plaintext = match &secret {
        Some(secret) => decrypt_file(&upload.file, secret)?,
        None => upload.file.to_vec(),
    };

    let source = SourceTable::from_bytes(&plaintext)
        .map_err(|e| ApiError::validation("file", format!("Could not parse CSV: {}", e)))?;
    let column = source.column_index(&upload.txt_col_name).ok_or_else(|| {
        ApiError::validation(
            "txt_col_name",
            format!("Column '{}' not found in file", upload.txt_col_name),
        )
    })?;

    info!(
        "File stats request from {}. File: {}. Encrypted: {}. Rows: {}. Amount: {}",
        peer,
        upload.filename,
        secret.is_some(),
        source.len(),
        upload.amount
    );

    let registry = state.registry.clone();
    let amount = upload.amount;
    let csv = tokio::task::spawn_blocking(move || {
        score_table(&registry, source, column, amount).to_csv_bytes()
    })
    .await
    .map_err(|e| ApiError::internal("stats-file worker", e))?
    .map_err(|e| ApiError::internal("stats-file", e))?;

    let (body, encrypted) = match &secret {
        Some(secret) => (encrypt_file(&csv, secret)?, true),
        None => (csv, false),
    };

    Ok(StatsFileResponse {
        filename: StatsFileResponse::output_name(&upload.filename),
        body,
        encrypted,
    })
}

/// Score `column` of the first `amount` rows (every row when 0)
///
/// Rows that fail to score are logged and keep default metric values.
pub fn score_table(
    registry: &StatsRegistry,
    source: SourceTable,
    column: usize,
    amount: usize,
) -> OutputTable {
    let cap = if amount == 0 {
        source.len()
    } else {
        amount.min(source.len())
    };
    let texts: Vec<String> = source
        .rows()
        .iter()
        .take(cap)
        .map(|row| row[column].clone())
        .collect();

    let mut table = OutputTable::new(source);
    for (index, text) in texts.iter().enumerate() {
        match registry.compute_all(text) {
            Ok(mut result) => {
                result.insert(
                    TEXT_ID_FIELD.to_string(),
                    MetricValue::Text(index.to_string()),
                );
                table.merge_results(&[index], &[result]);
            }
            Err(e) => warn!("Row {} could not be scored: {}", index, e),
        }
    }
    table
}
