// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Length-prefixed TCP transport
//!
//! Each frame carries one JSON [`StatsRequest`] and is answered by one
//! [`FramedResponse`] frame on the same connection. A connection may carry
//! any number of exchanges. The peer identity is the socket's remote IP,
//! so keys negotiated over HTTP apply here too.

use crate::api::http_server::AppState;
use crate::api::stats::{score_for_peer, StatsRequest};
use crate::api::{ApiError, ErrorResponse, PeerIdentity};
use crate::stats::MetricMap;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FramedResponse {
    Results { results: Vec<MetricMap> },
    Error(ErrorResponse),
}

/// Codec shared by both ends; frames above `max_frame_length` are refused
pub fn frame_codec(max_frame_length: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(max_frame_length)
        .new_codec()
}

/// Accept connections until the listener fails
pub async fn serve_framed(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    info!("Framed listener on {}", listener.local_addr()?);
    loop {
        let (stream, addr) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, state).await {
                warn!("Framed connection from {} closed with error: {}", addr, e);
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<AppState>,
) -> std::io::Result<()> {
    let PeerIdentity(peer) = PeerIdentity::from_addr(&addr);
    let mut framed = Framed::new(stream, frame_codec(state.config.max_upload_bytes));
    debug!("Framed connection opened by {}", peer);

    while let Some(frame) = framed.next().await {
        let frame = frame?;
        let response = match serde_json::from_slice::<StatsRequest>(&frame) {
            Ok(request) => match score_for_peer(&state, &peer, request).await {
                Ok(results) => FramedResponse::Results { results },
                Err(e) => error_frame(e),
            },
            Err(e) => error_frame(ApiError::validation("frame", e.to_string())),
        };

        let payload = serde_json::to_vec(&response)?;
        framed.send(Bytes::from(payload)).await?;
    }

    debug!("Framed connection closed by {}", peer);
    Ok(())
}

fn error_frame(err: ApiError) -> FramedResponse {
    warn!("Framed request rejected: {}", err);
    FramedResponse::Error(err.to_response())
}
