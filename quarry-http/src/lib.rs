//! HTTP transport for quarry backed by reqwest
//!
//! [`ReqwestTransport`] issues each [`TransportRequest`] as a single HTTP
//! exchange and returns the raw body. The connect timeout belongs to the
//! underlying client; the read timeout is applied per request. Responses
//! with a 4xx status are engine answers (missing document, rejected query)
//! and are returned as-is for the normalizer. Server errors fail.

use async_trait::async_trait;
use bytes::Bytes;
use quarry::config::TransportConfig;
use quarry::{Transport, TransportError, TransportRequest};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Transport over a pooled reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build http client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        Self::new(config.connect_timeout())
    }

    /// Use an existing client, e.g. one shared with other components
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn headers(request: &TransportRequest) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidRequest(format!("header {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidRequest(format!("header value: {}", e)))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

fn classify(err: reqwest::Error, read_timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(read_timeout)
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(verb = %request.verb, uri = %request.uri))]
    async fn execute(&self, request: TransportRequest) -> Result<Bytes, TransportError> {
        let method = Method::from_bytes(request.verb.as_str().as_bytes())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let headers = Self::headers(&request)?;
        let read_timeout = request.read_timeout;

        let mut builder = self
            .client
            .request(method, &request.uri)
            .headers(headers)
            .timeout(read_timeout);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify(e, read_timeout))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify(e, read_timeout))?;

        if status.is_server_error() {
            warn!(status = status.as_u16(), "Engine returned server error");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        debug!(status = status.as_u16(), bytes = body.len(), "Response received");
        Ok(body)
    }
}
