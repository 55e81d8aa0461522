//! Request-mode derivation: operation to URI, verb and body
//!
//! [`prepare`] is pure. It validates the target, runs the compilers a search
//! needs and returns everything the transport needs to issue one request.

use crate::compile::{QueryAssembler, SearchMode};
use crate::error::SpecError;
use crate::spec::QuerySpecification;
use serde_json::Value;
use std::fmt;
use tracing::debug;
use url::Url;

/// HTTP verbs used against the engine. `Update` is sent as a custom method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Update,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Update => "UPDATE",
        }
    }

    /// Whether requests with this verb carry a JSON body
    pub fn has_body(&self) -> bool {
        !matches!(self, Verb::Get | Verb::Delete)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller wants done with the specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create or replace a document
    Save,
    /// Partial document update
    Update,
    Delete,
    Get,
    Search(SearchMode),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Save => "save",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Get => "get",
            Operation::Search(SearchMode::Plain) => "search",
            Operation::Search(SearchMode::Scored) => "scored_search",
            Operation::Search(SearchMode::MultiKeyword) => "multi_keyword_search",
        }
    }

    pub fn is_search(&self) -> bool {
        matches!(self, Operation::Search(_))
    }
}

/// Base address of the engine. Resource URIs are always derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEndpoint {
    base: Url,
}

impl HostEndpoint {
    /// Plain-HTTP endpoint at `host:port`
    pub fn new(host: &str, port: u16) -> Result<Self, SpecError> {
        Self::with_scheme("http", host, port)
    }

    pub fn with_scheme(scheme: &str, host: &str, port: u16) -> Result<Self, SpecError> {
        Self::parse(&format!("{}://{}:{}/", scheme, host, port))
    }

    /// Parse a full base URL such as `http://localhost:9200`
    pub fn parse(raw: &str) -> Result<Self, SpecError> {
        let base = Url::parse(raw).map_err(|e| SpecError::InvalidHost(format!("{}: {}", raw, e)))?;
        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(SpecError::InvalidHost(raw.to_string()));
        }
        Ok(Self { base })
    }

    pub fn as_url(&self) -> &Url {
        &self.base
    }

    /// URI for a resource below the base. Segments are percent-encoded.
    pub fn resource(&self, segments: &[&str]) -> Result<String, SpecError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SpecError::InvalidHost(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }
}

impl fmt::Display for HostEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)
    }
}

/// A request ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub verb: Verb,
    pub uri: String,
    /// Compiled document; `None` for bodiless verbs and empty searches
    pub body: Option<Value>,
}

/// Derive the request for `operation` on `spec`.
///
/// Target validation runs first, so a search without index/type reports
/// that before any compile error.
pub fn prepare(
    host: &HostEndpoint,
    spec: &QuerySpecification,
    operation: Operation,
) -> Result<PreparedRequest, SpecError> {
    let prepared = match operation {
        Operation::Save => {
            let (index, doc_type) = spec.target().ok_or(SpecError::CreateTargetRequired)?;
            let (verb, uri) = match spec.id.as_deref().filter(|id| !id.is_empty()) {
                Some(id) => (Verb::Put, host.resource(&[index, doc_type, id])?),
                None => (Verb::Post, host.resource(&[index, doc_type])?),
            };
            PreparedRequest {
                verb,
                uri,
                body: Some(Value::Object(spec.document.clone())),
            }
        }
        Operation::Update => {
            let (index, doc_type, id) = spec
                .target_with_id()
                .ok_or(SpecError::UpdateTargetRequired)?;
            PreparedRequest {
                verb: Verb::Update,
                uri: host.resource(&[index, doc_type, id, "_update"])?,
                body: Some(Value::Object(spec.document.clone())),
            }
        }
        Operation::Delete => {
            let (index, doc_type, id) = spec
                .target_with_id()
                .ok_or(SpecError::DeleteTargetRequired)?;
            PreparedRequest {
                verb: Verb::Delete,
                uri: host.resource(&[index, doc_type, id])?,
                body: None,
            }
        }
        Operation::Get => {
            let (index, doc_type, id) = spec
                .target_with_id()
                .ok_or(SpecError::GetTargetRequired)?;
            PreparedRequest {
                verb: Verb::Get,
                uri: host.resource(&[index, doc_type, id])?,
                body: None,
            }
        }
        Operation::Search(mode) => {
            let (index, doc_type) = spec.target().ok_or(SpecError::IndexTypeRequired)?;
            let uri = host.resource(&[index, doc_type, "_search"])?;
            let body = QueryAssembler::assemble(spec, mode)?;
            let body = serde_json::to_value(&body).map_err(|e| SpecError::Malformed(e.to_string()))?;
            PreparedRequest {
                verb: Verb::Post,
                uri,
                body: match &body {
                    Value::Object(map) if map.is_empty() => None,
                    _ => Some(body),
                },
            }
        }
    };

    debug!(
        operation = operation.name(),
        verb = %prepared.verb,
        uri = %prepared.uri,
        "Prepared request"
    );
    Ok(prepared)
}
