//! Wire Format
//!
//! Single send: `GET {url}?api_key=..&token=..&tlm=<snapshot json>`
//! Bulk send: `POST {bulk_url}?api_key=..` with body
//! `{"data": [{"token": .., "tlm_list": [snapshot, ..]}]}`

use serde::{Deserialize, Serialize};
use std::time::Duration;
use vehicle_metrics::TelemetrySnapshot;

use crate::error::UplinkError;

/// Endpoint limit on snapshots per bulk request
pub const MAX_BULK_BATCH: usize = 10;

/// Uplink configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UplinkConfig {
    /// Single snapshot endpoint
    pub url: String,
    /// Bulk endpoint
    pub bulk_url: String,
    /// Snapshots per bulk request, capped at [`MAX_BULK_BATCH`]
    pub max_batch: usize,
    /// Per-request timeout handed to the transport (seconds)
    pub timeout_secs: u64,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            url: "https://api.iternio.com/1/tlm/send".to_string(),
            bulk_url: "https://api.iternio.com/1/tlm/send_bulk".to_string(),
            max_batch: MAX_BULK_BATCH,
            timeout_secs: 10,
        }
    }
}

impl UplinkConfig {
    /// Effective batch size
    pub fn batch_size(&self) -> usize {
        self.max_batch.clamp(1, MAX_BULK_BATCH)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// API key and per-user token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    pub user_token: Option<String>,
}

impl Credentials {
    /// The user token, if one is configured and non-blank
    pub fn token(&self) -> Result<&str, UplinkError> {
        match self.user_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(UplinkError::MissingToken),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Transport-agnostic description of one HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct UplinkRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Duration,
}

impl UplinkRequest {
    /// One-shot request carrying a single snapshot in the query string
    pub fn single(
        config: &UplinkConfig,
        credentials: &Credentials,
        snapshot: &TelemetrySnapshot,
    ) -> Result<Self, UplinkError> {
        let token = credentials.token()?;
        let tlm = serde_json::to_string(snapshot)?;

        Ok(Self {
            method: Method::Get,
            url: config.url.clone(),
            query: vec![
                ("api_key".to_string(), credentials.api_key.clone()),
                ("token".to_string(), token.to_string()),
                ("tlm".to_string(), tlm),
            ],
            headers: Vec::new(),
            body: None,
            timeout: config.timeout(),
        })
    }

    /// Bulk request carrying a batch of queued snapshots
    pub fn bulk(
        config: &UplinkConfig,
        credentials: &Credentials,
        snapshots: Vec<TelemetrySnapshot>,
    ) -> Result<Self, UplinkError> {
        let token = credentials.token()?;
        let payload = BulkPayload {
            data: vec![BulkEntry {
                token: token.to_string(),
                tlm_list: snapshots,
            }],
        };

        Ok(Self {
            method: Method::Post,
            url: config.bulk_url.clone(),
            query: vec![("api_key".to_string(), credentials.api_key.clone())],
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(serde_json::to_string(&payload)?),
            timeout: config.timeout(),
        })
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Bulk request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkPayload {
    pub data: Vec<BulkEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkEntry {
    pub token: String,
    pub tlm_list: Vec<TelemetrySnapshot>,
}
