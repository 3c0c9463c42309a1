// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use crate::stats::ALL_MODELS;
use serde::{Deserialize, Serialize};

/// Form body of `POST /stats`
///
/// ```text
/// text=<b64>&text=<b64>&id=0&id=1&no_encryption=False
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsForm {
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default)]
    pub id: Vec<String>,
    #[serde(default)]
    pub no_encryption: Option<String>,
}

impl StatsForm {
    pub fn into_request(self, model: &str) -> StatsRequest {
        StatsRequest {
            model: model.to_string(),
            no_encryption: self.no_encryption.as_deref().map(parse_flag).unwrap_or(false),
            texts: self.text,
            ids: self.id,
        }
    }
}

/// A scoring request independent of the transport that carried it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRequest {
    #[serde(default = "default_model")]
    pub model: String,
    pub texts: Vec<String>,
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub no_encryption: bool,
}

fn default_model() -> String {
    ALL_MODELS.to_string()
}

/// Lenient boolean: `true`, `1`, `yes`, `on` in any case
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
