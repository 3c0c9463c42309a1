// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client side of the pipeline: key bootstrap, transports, batch dispatch
//! and result collection

pub mod dispatcher;
pub mod error;
pub mod framed;
pub mod sink;
pub mod source;
pub mod transport;

pub use dispatcher::{Batch, BatchDispatcher, DispatchReport, SkippedBatch};
pub use error::{ClientError, TransportError};
pub use framed::FramedStatsClient;
pub use sink::{CsvLog, OutputTable, ResultSink};
pub use source::{RowIndex, SourceTable};
pub use transport::{HttpStatsClient, SessionKeys, StatsTransport};
