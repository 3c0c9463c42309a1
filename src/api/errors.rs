// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::crypto::CryptoError;
use crate::stats::StatsError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub message: String,
    pub error_info: String,
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Missing or unready key, bad key material, key mismatch
    Protocol(String),
    /// Payload unreadable under the peer's stored secret
    Decryption(String),
    ValidationError {
        field: String,
        message: String,
    },
    InternalError {
        context: String,
        detail: String,
    },
}

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn internal(context: &str, detail: impl fmt::Display) -> Self {
        ApiError::InternalError {
            context: context.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let (message, error_info) = match self {
            ApiError::Protocol(info) => ("Secure session required".to_string(), info.clone()),
            ApiError::Decryption(info) => {
                ("Could not decrypt request payload".to_string(), info.clone())
            }
            ApiError::ValidationError { field, message } => (message.clone(), field.clone()),
            ApiError::InternalError { context, detail } => (
                format!("Internal Server Error in {}", context),
                detail.clone(),
            ),
        };

        ErrorResponse {
            message,
            error_info,
            status: self.status_code(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Protocol(_) | ApiError::Decryption(_) | ApiError::ValidationError { .. } => {
                400
            }
            ApiError::InternalError { .. } => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            ApiError::Decryption(msg) => write!(f, "Decryption error: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::InternalError { context, detail } => {
                write!(f, "Internal error in {}: {}", context, detail)
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<CryptoError> for ApiError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::DecryptionFailed { .. } => ApiError::Decryption(err.to_string()),
            CryptoError::EncryptionFailed { .. } => ApiError::internal("encryption", err),
            CryptoError::InvalidKeyMaterial { .. }
            | CryptoError::KeyDerivationFailed { .. }
            | CryptoError::NoSharedKey { .. }
            | CryptoError::KeyMismatch { .. } => ApiError::Protocol(err.to_string()),
        }
    }
}

impl From<StatsError> for ApiError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::UnknownModel { .. } => ApiError::validation("model", err.to_string()),
            StatsError::IdCountMismatch { .. } => ApiError::validation("id", err.to_string()),
            StatsError::ModelFailed { .. } => ApiError::internal("stats", err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }
        (status, Json(self.to_response())).into_response()
    }
}
