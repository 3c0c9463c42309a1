// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::crypto::CryptoError;
use thiserror::Error;

/// Failure of a single scoring call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Timeout, malformed reply, local encryption failure; the batch is skipped
    #[error("transient transport failure: {0}")]
    Transient(String),

    /// Server unreachable or connection broken; dispatch stops
    #[error("connection failed: {0}")]
    Fatal(String),

    /// Server answered with an error body
    #[error("server rejected request ({status}): {message} [{error_info}]")]
    Rejected {
        status: u16,
        message: String,
        error_info: String,
    },
}

impl TransportError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransportError::Fatal(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransportError::Fatal(err.to_string())
        } else {
            TransportError::Transient(err.to_string())
        }
    }
}

impl From<CryptoError> for TransportError {
    fn from(err: CryptoError) -> Self {
        TransportError::Transient(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("key exchange failed: {0}")]
    KeyExchange(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("dispatch aborted after {rows_merged} merged rows: {reason}")]
    Fatal { reason: String, rows_merged: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
