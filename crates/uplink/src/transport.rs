//! HTTP Transport

use std::future::Future;
use std::pin::Pin;
use tracing::debug;

use crate::error::TransportError;
use crate::wire::{Method, UplinkRequest};

/// Pending result of a request: the HTTP status code or a transport failure
pub type TransportFuture = Pin<Box<dyn Future<Output = Result<u16, TransportError>> + Send + 'static>>;

/// Delivers uplink requests. Retry and timeout policy belong to the
/// implementation.
pub trait Transport: Send + Sync {
    fn send(&self, request: UplinkRequest) -> TransportFuture;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        Self::with_user_agent(concat!("telemetry-agent/", env!("CARGO_PKG_VERSION")))
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: UplinkRequest) -> TransportFuture {
        let client = self.client.clone();

        Box::pin(async move {
            let mut builder = match request.method {
                Method::Get => client.get(&request.url),
                Method::Post => client.post(&request.url),
            };
            builder = builder.query(&request.query).timeout(request.timeout);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            debug!("{:?} {}", request.method, request.url);

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else if e.is_builder() {
                    TransportError::InvalidRequest(e.to_string())
                } else {
                    TransportError::Network(e.to_string())
                }
            })?;

            Ok(response.status().as_u16())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{Credentials, UplinkConfig};
    use vehicle_metrics::TelemetrySnapshot;

    #[test]
    fn test_client_builds() {
        assert!(HttpTransport::new().is_ok());
    }

    #[test]
    fn test_invalid_user_agent_fails_client_setup() {
        let result = HttpTransport::with_user_agent("telemetry\nagent");
        assert!(matches!(result, Err(TransportError::Client(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_transport_error() {
        let config = UplinkConfig {
            url: "http://127.0.0.1:9/tlm".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let credentials = Credentials {
            api_key: "k".to_string(),
            user_token: Some("t".to_string()),
        };
        let request = UplinkRequest::single(&config, &credentials, &TelemetrySnapshot::baseline()).unwrap();

        let result = HttpTransport::new().unwrap().send(request).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_malformed_url_is_rejected() {
        let request = UplinkRequest {
            method: Method::Get,
            url: "not a url".to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            timeout: std::time::Duration::from_secs(1),
        };
        let result = HttpTransport::new().unwrap().send(request).await;
        assert!(result.is_err());
    }
}
