// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod framed;
pub mod http_server;
pub mod keys;
pub mod peer;
pub mod stats;
pub mod stats_file;

pub use errors::{ApiError, ErrorResponse};
pub use framed::{serve_framed, FramedResponse};
pub use http_server::{create_app, start_server, AppState, HealthResponse};
pub use keys::{KeysResponse, SharedKeyQuery, SharedKeyResponse};
pub use peer::PeerIdentity;
pub use stats::{StatsForm, StatsRequest};
pub use stats_file::StatsFileResponse;
