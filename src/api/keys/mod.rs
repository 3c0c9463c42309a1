// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Key exchange endpoints
//!
//! `GET /keys` issues a fresh server key pair to the calling peer and
//! `GET /shared-key` completes the agreement. Both mutate the peer's entry
//! in the shared `SessionStore`.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{request_keys_handler, shared_key_handler};
pub use request::SharedKeyQuery;
pub use response::{KeysResponse, SharedKeyResponse};
