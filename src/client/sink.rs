// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Result sink
//!
//! Two destinations for every merged batch:
//! - [`OutputTable`]: the source rows with metric columns appended, indexed
//!   by `RowIndex`. Its content depends only on which rows were merged, not
//!   on the order their batches completed in.
//! - [`CsvLog`]: an append-only CSV written in completion order. The header
//!   is metric fields of the first result followed by the source columns,
//!   emitted exactly once.

use crate::client::source::{RowIndex, SourceTable};
use crate::stats::{ColumnKind, MetricMap, MetricValue};
use csv::{QuoteStyle, WriterBuilder};
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    source: SourceTable,
    /// Fixed by the first merged result
    metric_columns: Option<Vec<(String, ColumnKind)>>,
    cells: BTreeMap<RowIndex, MetricMap>,
}

impl OutputTable {
    pub fn new(source: SourceTable) -> Self {
        Self {
            source,
            metric_columns: None,
            cells: BTreeMap::new(),
        }
    }

    pub fn source(&self) -> &SourceTable {
        &self.source
    }

    pub fn metric_columns(&self) -> Vec<&str> {
        self.metric_columns
            .iter()
            .flatten()
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Rows that have received a result
    pub fn merged_rows(&self) -> Vec<RowIndex> {
        self.cells.keys().copied().collect()
    }

    /// Write each result into the row named by the matching index
    ///
    /// The first call fixes the metric columns. Fields outside that set are
    /// dropped with a warning; indices outside the source are skipped.
    /// Returns the number of rows written.
    pub fn merge_results(&mut self, indices: &[RowIndex], results: &[MetricMap]) -> usize {
        if self.metric_columns.is_none() {
            if let Some(first) = results.first() {
                self.metric_columns = Some(
                    first
                        .iter()
                        .map(|(k, v)| (k.clone(), ColumnKind::of(v)))
                        .collect(),
                );
            }
        }
        let known: HashSet<String> = self
            .metric_columns()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut merged = 0;
        for (&index, result) in indices.iter().zip(results) {
            if index >= self.source.len() {
                warn!("Result for row {} is outside the source table, skipped", index);
                continue;
            }
            let mut row = MetricMap::new();
            for (field, value) in result {
                if known.contains(field) {
                    row.insert(field.clone(), value.clone());
                } else {
                    warn!("Ignoring field '{}' for row {}: not in output schema", field, index);
                }
            }
            self.cells.insert(index, row);
            merged += 1;
        }
        merged
    }

    /// Metric value of one cell, or the column default if never written
    pub fn get(&self, index: RowIndex, field: &str) -> Option<MetricValue> {
        let (_, kind) = self
            .metric_columns
            .as_ref()?
            .iter()
            .find(|(name, _)| name == field)?;
        Some(
            self.cells
                .get(&index)
                .and_then(|row| row.get(field))
                .cloned()
                .unwrap_or_else(|| kind.default_value()),
        )
    }

    /// Source columns followed by metric columns, one line per source row
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .from_writer(writer);
        let columns = self.metric_columns.as_deref().unwrap_or(&[]);

        let mut header: Vec<&str> = self.source.columns().iter().map(String::as_str).collect();
        header.extend(columns.iter().map(|(name, _)| name.as_str()));
        wtr.write_record(&header)?;

        for (index, row) in self.source.rows().iter().enumerate() {
            let mut record: Vec<String> = row.clone();
            let cells = self.cells.get(&index);
            for (name, kind) in columns {
                let value = cells
                    .and_then(|c| c.get(name))
                    .cloned()
                    .unwrap_or_else(|| kind.default_value());
                record.push(value.to_string());
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, csv::Error> {
        let mut out = Vec::new();
        self.write_csv(&mut out)?;
        Ok(out)
    }
}

/// Append-only CSV of results in completion order
pub struct CsvLog<W: Write> {
    writer: csv::Writer<W>,
    header: Option<Vec<String>>,
    rows_written: usize,
}

impl<W: Write> CsvLog<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: WriterBuilder::new()
                .quote_style(QuoteStyle::Always)
                .from_writer(writer),
            header: None,
            rows_written: 0,
        }
    }

    /// Append one line per result: metric values, then the source row
    pub fn append(
        &mut self,
        results: &[MetricMap],
        source_columns: &[String],
        source_rows: &[&[String]],
    ) -> Result<(), csv::Error> {
        let Some(first) = results.first() else {
            return Ok(());
        };

        if self.header.is_none() {
            let fields: Vec<String> = first.keys().cloned().collect();
            let mut line = fields.clone();
            line.extend(source_columns.iter().cloned());
            self.writer.write_record(&line)?;
            self.header = Some(fields);
        }
        let fields = self.header.as_deref().unwrap_or(&[]);

        for (result, source_row) in results.iter().zip(source_rows) {
            let mut line: Vec<String> = fields
                .iter()
                .map(|f| result.get(f).map(|v| v.to_string()).unwrap_or_default())
                .collect();
            line.extend(source_row.iter().cloned());
            self.writer.write_record(&line)?;
            self.rows_written += 1;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn into_inner(self) -> Result<W, csv::Error> {
        self.writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}

/// Destination of merged batches
pub struct ResultSink<W: Write> {
    table: OutputTable,
    log: CsvLog<W>,
}

impl<W: Write> ResultSink<W> {
    pub fn new(source: SourceTable, writer: W) -> Self {
        Self {
            table: OutputTable::new(source),
            log: CsvLog::new(writer),
        }
    }

    pub fn merge_results(&mut self, indices: &[RowIndex], results: &[MetricMap]) -> usize {
        self.table.merge_results(indices, results)
    }

    pub fn append_csv(
        &mut self,
        indices: &[RowIndex],
        results: &[MetricMap],
    ) -> Result<(), csv::Error> {
        let source = self.table.source();
        let rows: Vec<&[String]> = indices
            .iter()
            .map(|&i| source.row(i).unwrap_or(&[]))
            .collect();
        self.log.append(results, source.columns(), &rows)
    }

    /// Merge a completed batch into both destinations
    ///
    /// The log is written first; the table is left untouched when it fails.
    pub fn record(
        &mut self,
        indices: &[RowIndex],
        results: &[MetricMap],
    ) -> Result<usize, csv::Error> {
        self.append_csv(indices, results)?;
        Ok(self.merge_results(indices, results))
    }

    pub fn table(&self) -> &OutputTable {
        &self.table
    }

    pub fn rows_logged(&self) -> usize {
        self.log.rows_written()
    }

    pub fn into_parts(self) -> Result<(OutputTable, W), csv::Error> {
        Ok((self.table, self.log.into_inner()?))
    }
}
