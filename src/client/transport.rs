// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP client for the stats server
//!
//! Construction runs both key round trips (`GET /keys`, then
//! `GET /shared-key`) and keeps the resulting material for the lifetime of
//! the client. Every later call encrypts its payload with that key unless
//! plaintext is requested.

use crate::api::{ErrorResponse, HealthResponse, KeysResponse, SharedKeyResponse};
use crate::client::error::{ClientError, TransportError};
use crate::config::ClientConfig;
use crate::crypto::{decrypt_file, derive_shared_key_hex, encrypt, encrypt_file, SharedSecret};
use crate::stats::{MetricMap, ALL_MODELS};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Anything that can score a batch of texts remotely
#[async_trait]
pub trait StatsTransport: Send + Sync {
    /// Score `texts` in order; `ids` are echoed back as `server_text_id`
    async fn score_batch(
        &self,
        texts: &[String],
        ids: &[String],
        no_encryption: bool,
    ) -> Result<Vec<MetricMap>, TransportError>;
}

/// Key material held by a client after the exchange
#[derive(Clone, PartialEq)]
pub struct SessionKeys {
    pub private_key: String,
    pub public_key: String,
    pub server_public_key: String,
    pub shared_key: SharedSecret,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("public_key", &self.public_key)
            .field("server_public_key", &self.server_public_key)
            .field("shared_key", &self.shared_key)
            .finish_non_exhaustive()
    }
}

/// Encrypt each text individually, or pass them through untouched
pub(crate) fn seal_texts(
    texts: &[String],
    keys: Option<&SessionKeys>,
    no_encryption: bool,
) -> Result<Vec<String>, TransportError> {
    if no_encryption {
        return Ok(texts.to_vec());
    }
    let keys = keys.ok_or_else(|| {
        TransportError::Transient("no shared key, run the key exchange first".to_string())
    })?;
    texts
        .iter()
        .map(|t| encrypt(t, &keys.shared_key).map_err(TransportError::from))
        .collect()
}

pub(crate) fn rejected(body: ErrorResponse) -> TransportError {
    TransportError::Rejected {
        status: body.status,
        message: body.message,
        error_info: body.error_info,
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

pub struct HttpStatsClient {
    client: reqwest::Client,
    config: ClientConfig,
    keys: Option<SessionKeys>,
}

impl std::fmt::Debug for HttpStatsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStatsClient")
            .field("base_url", &self.config.base_url)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl HttpStatsClient {
    /// Client without key material; call [`request_keys`](Self::request_keys)
    /// before encrypted requests
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            client,
            config,
            keys: None,
        })
    }

    /// Build a client and complete the key exchange
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let mut client = Self::new(config)?;
        client.request_keys().await?;
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn keys(&self) -> Option<&SessionKeys> {
        self.keys.as_ref()
    }

    /// Run `GET /keys` then `GET /shared-key` and keep the result
    ///
    /// The shared key is requested for the issued private key and the
    /// server public key, so it can be checked against a local derivation.
    pub async fn request_keys(&mut self) -> Result<&SessionKeys, ClientError> {
        let issued: KeysResponse = self
            .get_json("keys", &[])
            .await
            .map_err(|e| ClientError::KeyExchange(format!("GET keys: {}", e)))?;

        let shared: SharedKeyResponse = self
            .get_json(
                "shared-key",
                &[
                    ("local_private_key", issued.private_key.as_str()),
                    ("remote_public_key", issued.server_public_key.as_str()),
                ],
            )
            .await
            .map_err(|e| ClientError::KeyExchange(format!("GET shared-key: {}", e)))?;

        let shared_key = SharedSecret::from_hex(&shared.shared_key)?;
        let local = derive_shared_key_hex(&issued.private_key, &issued.server_public_key)?;
        if local != shared_key {
            if self.config.strict_key_agreement {
                return Err(ClientError::KeyExchange(
                    "server shared key does not match the local derivation".to_string(),
                ));
            }
            warn!(
                "Server shared key {} differs from local derivation {}",
                shared_key.fingerprint(),
                local.fingerprint()
            );
        }

        info!("Shared key established with {}", self.config.base_url);
        debug!("Shared key fingerprint: {}", shared_key.fingerprint());

        Ok(self.keys.insert(SessionKeys {
            private_key: issued.private_key,
            public_key: issued.public_key,
            server_public_key: issued.server_public_key,
            shared_key,
        }))
    }

    pub async fn health(&self) -> Result<HealthResponse, TransportError> {
        self.get_json("health", &[]).await
    }

    /// `POST /stats` (or `/stats/{model}`) for one batch
    pub async fn get_text_stats(
        &self,
        model: &str,
        texts: &[String],
        ids: &[String],
        no_encryption: bool,
    ) -> Result<Vec<MetricMap>, TransportError> {
        let sealed = seal_texts(texts, self.keys.as_ref(), no_encryption)?;

        let mut form: Vec<(&str, &str)> = Vec::with_capacity(sealed.len() + ids.len() + 1);
        form.extend(sealed.iter().map(|t| ("text", t.as_str())));
        form.extend(ids.iter().map(|id| ("id", id.as_str())));
        form.push(("no_encryption", flag(no_encryption)));

        let path = if model == ALL_MODELS {
            "stats".to_string()
        } else {
            format!("stats/{}", model)
        };

        let response = self
            .client
            .post(self.config.endpoint(&path))
            .form(&form)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Score a single text and return its mapping
    pub async fn score_text(
        &self,
        model: &str,
        text: &str,
        no_encryption: bool,
    ) -> Result<MetricMap, ClientError> {
        let results = self
            .get_text_stats(model, &[text.to_string()], &["0".to_string()], no_encryption)
            .await?;
        results.into_iter().next().ok_or_else(|| {
            ClientError::Transport(TransportError::Transient(
                "server returned no result".to_string(),
            ))
        })
    }

    /// Upload a whole CSV to `POST /stats-file` and write the scored table
    /// to `<output_dir>/stats_<stem>.csv`
    pub async fn analyse_file(
        &self,
        input: &Path,
        output_dir: &Path,
        txt_col_name: &str,
        amount: usize,
        no_encryption: bool,
    ) -> Result<PathBuf, ClientError> {
        let raw = tokio::fs::read(input).await?;
        let key = if no_encryption {
            None
        } else {
            Some(
                self.keys
                    .as_ref()
                    .map(|k| k.shared_key)
                    .ok_or_else(|| ClientError::KeyExchange("no shared key".to_string()))?,
            )
        };

        let payload = match &key {
            Some(key) => encrypt_file(&raw, key)?,
            None => raw,
        };
        let filename = input
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.csv")
            .to_string();
        let stem = input
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        info!(
            "Uploading {} ({} bytes, encrypted: {})",
            filename,
            payload.len(),
            key.is_some()
        );

        let form = Form::new()
            .part("file", Part::bytes(payload).file_name(filename))
            .text("txt_col_name", txt_col_name.to_string())
            .text("amount", amount.to_string())
            .text("no_encryption", flag(no_encryption));

        let response = self
            .client
            .post(self.config.endpoint("stats-file"))
            .multipart(form)
            .send()
            .await
            .map_err(TransportError::from)?;
        let response = check_status(response).await?;
        let body = response.bytes().await.map_err(TransportError::from)?;

        let csv = match &key {
            Some(key) => decrypt_file(&body, key)?,
            None => body.to_vec(),
        };

        let output = output_dir.join(format!("stats_{}.csv", stem));
        tokio::fs::write(&output, csv).await?;
        info!("Scored file written to {}", output.display());
        Ok(output)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, TransportError> {
        let response = self
            .client
            .get(self.config.endpoint(path))
            .query(query)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl StatsTransport for HttpStatsClient {
    async fn score_batch(
        &self,
        texts: &[String],
        ids: &[String],
        no_encryption: bool,
    ) -> Result<Vec<MetricMap>, TransportError> {
        self.get_text_stats(ALL_MODELS, texts, ids, no_encryption)
            .await
    }
}

/// Turn a non-2xx reply into `Rejected`, keeping the server's error body
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => rejected(body),
        Err(_) => TransportError::Rejected {
            status: status.as_u16(),
            message: text,
            error_info: String::new(),
        },
    })
}
