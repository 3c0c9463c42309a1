// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Peer identity extractor
//!
//! Sessions are keyed by the remote IP of the connection, without the port,
//! so successive requests from one client land on the same entry.

use crate::api::ApiError;
use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerIdentity(pub String);

impl PeerIdentity {
    pub fn from_addr(addr: &SocketAddr) -> Self {
        Self(addr.ip().to_string())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for PeerIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ConnectInfo(addr) = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal("peer identity", e))?;
        Ok(Self::from_addr(&addr))
    }
}
