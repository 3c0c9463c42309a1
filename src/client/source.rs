// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tabular row source
//!
//! A CSV file loaded into memory as string cells. Row position is the
//! `RowIndex` used for dispatch and merge.

use csv::ReaderBuilder;
use std::io::{self, Read};
use std::path::Path;
use tracing::warn;

pub type RowIndex = usize;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SourceTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Parse CSV with a header row
    ///
    /// Short rows are padded with empty cells. A row with more cells than the
    /// header is an error.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
        let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let mut rows = Vec::new();
        for (index, record) in rdr.records().enumerate() {
            let record = record?;
            if record.len() > columns.len() {
                warn!(
                    "Row {} has {} fields, header has {}",
                    index,
                    record.len(),
                    columns.len()
                );
                return Err(csv::Error::from(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "row {} has {} fields but the header has {}",
                        index,
                        record.len(),
                        columns.len()
                    ),
                )));
            }
            let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            row.resize(columns.len(), String::new());
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, csv::Error> {
        Self::from_reader(bytes)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, csv::Error> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: RowIndex) -> Option<&[String]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Keep rows whose `column` equals `value`, or else the first `limit`
    /// rows. The filter wins when both are given; surviving rows are
    /// renumbered from 0.
    pub fn select(
        &self,
        limit: Option<usize>,
        filter: Option<(&str, &str)>,
    ) -> Result<Self, String> {
        let rows = match filter {
            Some((column, value)) => {
                let col = self
                    .column_index(column)
                    .ok_or_else(|| format!("filter column '{}' not found", column))?;
                self.rows
                    .iter()
                    .filter(|r| r.get(col).map_or(false, |c| c == value))
                    .cloned()
                    .collect()
            }
            None => match limit {
                Some(n) if n > 0 => self.rows.iter().take(n).cloned().collect(),
                _ => self.rows.clone(),
            },
        };
        Ok(Self {
            columns: self.columns.clone(),
            rows,
        })
    }
}
