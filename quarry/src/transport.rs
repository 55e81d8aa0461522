//! Transport seam between the session and the network

use crate::error::TransportError;
use crate::request::{PreparedRequest, Verb};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Default connect and read timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One HTTP exchange as the transport sees it
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub verb: Verb,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl TransportRequest {
    /// Build from a prepared request, serializing the body for verbs that
    /// carry one.
    pub fn from_prepared(
        prepared: &PreparedRequest,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let body = match (&prepared.body, prepared.verb.has_body()) {
            (Some(body), true) => Some(
                serde_json::to_vec(body)
                    .map_err(|e| TransportError::InvalidRequest(e.to_string()))?,
            ),
            _ => None,
        };

        Ok(Self {
            verb: prepared.verb,
            uri: prepared.uri.clone(),
            headers: vec![("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string())],
            body,
            connect_timeout: timeout,
            read_timeout: timeout,
        })
    }
}

/// Executes a request and returns the raw response body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> Result<Bytes, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: TransportRequest) -> Result<Bytes, TransportError> {
        (**self).execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_prepared_sets_json_header() {
        let prepared = PreparedRequest {
            verb: Verb::Post,
            uri: "http://localhost:9200/a/b/_search".into(),
            body: Some(json!({"size": 1})),
        };
        let req = TransportRequest::from_prepared(&prepared, Duration::from_secs(5)).unwrap();
        assert_eq!(
            req.headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
        assert_eq!(req.body.as_deref(), Some(br#"{"size":1}"#.as_slice()));
        assert_eq!(req.read_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_bodiless_verbs_drop_body() {
        let prepared = PreparedRequest {
            verb: Verb::Delete,
            uri: "http://localhost:9200/a/b/1".into(),
            body: Some(json!({"ignored": true})),
        };
        let req = TransportRequest::from_prepared(&prepared, DEFAULT_TIMEOUT).unwrap();
        assert!(req.body.is_none());
    }
}
