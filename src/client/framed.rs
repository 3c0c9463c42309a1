// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Framed TCP client
//!
//! Opens a fresh connection for every call, so concurrent batches never
//! share a socket. Key material comes from a prior HTTP exchange with the
//! same server; the server keys sessions by IP, not by connection.

use crate::api::framed::{frame_codec, FramedResponse};
use crate::api::StatsRequest;
use crate::client::error::TransportError;
use crate::client::transport::{rejected, seal_texts, SessionKeys, StatsTransport};
use crate::stats::{MetricMap, ALL_MODELS};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

const DEFAULT_MAX_FRAME: usize = 64 * 1024 * 1024;

pub struct FramedStatsClient {
    addr: String,
    keys: Option<SessionKeys>,
    model: String,
    max_frame_length: usize,
}

impl FramedStatsClient {
    pub fn new(addr: impl Into<String>, keys: Option<SessionKeys>) -> Self {
        Self {
            addr: addr.into(),
            keys,
            model: ALL_MODELS.to_string(),
            max_frame_length: DEFAULT_MAX_FRAME,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// One request/response exchange on a new connection
    pub async fn call(&self, request: &StatsRequest) -> Result<Vec<MetricMap>, TransportError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| TransportError::Fatal(format!("{}: {}", self.addr, e)))?;
        let mut framed = Framed::new(stream, frame_codec(self.max_frame_length));

        let payload =
            serde_json::to_vec(request).map_err(|e| TransportError::Transient(e.to_string()))?;
        framed
            .send(Bytes::from(payload))
            .await
            .map_err(|e| TransportError::Fatal(e.to_string()))?;

        let frame = framed
            .next()
            .await
            .ok_or_else(|| TransportError::Fatal("connection closed before reply".to_string()))?
            .map_err(|e| TransportError::Fatal(e.to_string()))?;

        match serde_json::from_slice::<FramedResponse>(&frame)
            .map_err(|e| TransportError::Transient(format!("malformed reply: {}", e)))?
        {
            FramedResponse::Results { results } => Ok(results),
            FramedResponse::Error(body) => Err(rejected(body)),
        }
    }
}

#[async_trait]
impl StatsTransport for FramedStatsClient {
    async fn score_batch(
        &self,
        texts: &[String],
        ids: &[String],
        no_encryption: bool,
    ) -> Result<Vec<MetricMap>, TransportError> {
        let request = StatsRequest {
            model: self.model.clone(),
            texts: seal_texts(texts, self.keys.as_ref(), no_encryption)?,
            ids: ids.to_vec(),
            no_encryption,
        };
        self.call(&request).await
    }
}
