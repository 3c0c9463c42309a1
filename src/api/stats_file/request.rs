// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use crate::api::stats::parse_flag;
use crate::api::ApiError;
use crate::config::ServerConfig;
use axum_extra::extract::Multipart;
use bytes::Bytes;

/// Raw multipart fields of `POST /stats-file`
///
/// | field          | content                                   |
/// |----------------|-------------------------------------------|
/// | `file`         | CSV bytes, possibly an encrypted envelope |
/// | `txt_col_name` | column holding the texts                  |
/// | `amount`       | row cap, `0` scores every row             |
/// | `no_encryption`| lenient boolean                           |
#[derive(Debug, Default)]
pub struct StatsFileUpload {
    pub filename: Option<String>,
    pub file: Option<Bytes>,
    pub txt_col_name: Option<String>,
    pub amount: Option<String>,
    pub no_encryption: bool,
}

/// Upload that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub filename: String,
    pub file: Bytes,
    pub txt_col_name: String,
    pub amount: usize,
    pub no_encryption: bool,
}

impl StatsFileUpload {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut upload = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::validation("multipart", e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    upload.filename = Some(field.file_name().unwrap_or_default().to_string());
                    upload.file = Some(
                        field
                            .bytes()
                            .await
                            .map_err(|e| ApiError::validation("file", e.to_string()))?,
                    );
                }
                "txt_col_name" | "amount" | "no_encryption" => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| ApiError::validation(&name, e.to_string()))?;
                    match name.as_str() {
                        "txt_col_name" => upload.txt_col_name = Some(value),
                        "amount" => upload.amount = Some(value),
                        _ => upload.no_encryption = parse_flag(&value),
                    }
                }
                other => tracing::debug!("Ignoring multipart field '{}'", other),
            }
        }
        Ok(upload)
    }

    pub fn validate(self, config: &ServerConfig) -> Result<ValidatedUpload, ApiError> {
        let file = self
            .file
            .ok_or_else(|| ApiError::validation("file", "No file part"))?;
        let filename = self.filename.unwrap_or_default();
        if filename.is_empty() {
            return Err(ApiError::validation("file", "No selected file"));
        }
        if !config.is_allowed_file(&filename) {
            return Err(ApiError::validation(
                "file",
                format!(
                    "File type not allowed, expected one of: {}",
                    config.allowed_extensions.join(", ")
                ),
            ));
        }
        let txt_col_name = self
            .txt_col_name
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ApiError::validation("txt_col_name", "Missing txt_col_name"))?;
        let amount = match self.amount.as_deref().map(str::trim) {
            None | Some("") => 0,
            Some(raw) => raw.parse().map_err(|_| {
                ApiError::validation("amount", format!("amount must be a non-negative integer, got '{}'", raw))
            })?,
        };

        Ok(ValidatedUpload {
            filename,
            file,
            txt_col_name,
            amount,
            no_encryption: self.no_encryption,
        })
    }
}
