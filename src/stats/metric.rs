// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key attached to every result mapping, carrying the caller's text id
pub const TEXT_ID_FIELD: &str = "server_text_id";

/// One result mapping: metric name -> value, iterated in name order
pub type MetricMap = BTreeMap<String, MetricValue>;

/// A single metric value as it travels over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
    Null,
}

/// Column type inferred from the first value seen for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
}

impl ColumnKind {
    pub fn of(value: &MetricValue) -> Self {
        match value {
            MetricValue::Number(_) => ColumnKind::Numeric,
            MetricValue::Text(_) | MetricValue::Null => ColumnKind::Text,
        }
    }

    /// Value a cell holds before any result is written to it
    pub fn default_value(&self) -> MetricValue {
        match self {
            ColumnKind::Numeric => MetricValue::Number(0.0),
            ColumnKind::Text => MetricValue::Text(String::new()),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Number(v)
    }
}

impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        MetricValue::Number(v as f64)
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(v: Option<f64>) -> Self {
        v.map(MetricValue::Number).unwrap_or(MetricValue::Null)
    }
}

/// CSV cell rendering: numbers in shortest form, null as empty
impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(n) => write!(f, "{}", n),
            MetricValue::Text(s) => write!(f, "{}", s),
            MetricValue::Null => Ok(()),
        }
    }
}
