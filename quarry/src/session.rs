//! Request session state machine
//!
//! A [`Session`] walks one request at a time through
//! `Unconfigured -> Idle -> Configured -> Selected -> Executed`, and
//! [`clear`](Session::clear) returns it to `Idle` for the next request.
//! Out-of-order calls are rejected with
//! [`SessionError::IllegalTransition`] instead of producing a half-built
//! request.

use crate::compile::SearchMode;
use crate::config::Config;
use crate::error::{SessionError, SpecError};
use crate::request::{prepare, HostEndpoint, Operation};
use crate::response::{DebugInfo, ResponseNormalizer, ResultEnvelope};
use crate::spec::QuerySpecification;
use crate::transport::{Transport, TransportRequest, DEFAULT_TIMEOUT};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No host yet
    Unconfigured,
    /// Host known, no specification
    Idle,
    /// Specification set, no operation chosen
    Configured,
    Selected(Operation),
    Executed,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Unconfigured => "unconfigured",
            SessionState::Idle => "idle",
            SessionState::Configured => "configured",
            SessionState::Selected(_) => "selected",
            SessionState::Executed => "executed",
        }
    }
}

/// Specification as handed over by the caller
#[derive(Debug, Clone)]
enum Params {
    Typed(QuerySpecification),
    /// Parsed at call time, strictly for searches and leniently for
    /// document operations
    Mapping(Value),
}

impl Params {
    fn raw(&self) -> Value {
        match self {
            Params::Typed(spec) => spec.to_mapping(),
            Params::Mapping(raw) => raw.clone(),
        }
    }

    fn resolve(&self, operation: Operation) -> Result<QuerySpecification, SpecError> {
        match self {
            Params::Typed(spec) => Ok(spec.clone()),
            Params::Mapping(raw) if operation.is_search() => {
                QuerySpecification::from_json(raw.clone())
            }
            Params::Mapping(raw) => QuerySpecification::from_document_json(raw.clone()),
        }
    }
}

pub struct Session<T: Transport> {
    transport: T,
    host: Option<HostEndpoint>,
    timeout: Duration,
    debug: bool,
    params: Option<Params>,
    state: SessionState,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            host: None,
            timeout: DEFAULT_TIMEOUT,
            debug: false,
            params: None,
            state: SessionState::Unconfigured,
        }
    }

    /// Session already pointed at `host`
    pub fn with_host(transport: T, host: HostEndpoint) -> Self {
        let mut session = Self::new(transport);
        session.host = Some(host);
        session.state = SessionState::Idle;
        session
    }

    /// Session using the endpoint, timeout and debug flag from `config`
    pub fn from_config(transport: T, config: &Config) -> Result<Self, SpecError> {
        let mut session = Self::with_host(transport, config.host_endpoint()?);
        session.timeout = config.transport.timeout();
        session.debug = config.debug;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn host(&self) -> Option<&HostEndpoint> {
        self.host.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// The caller's current mapping, if one was set
    pub fn params(&self) -> Option<Value> {
        self.params.as_ref().map(Params::raw)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Point the session at a host. Only allowed before a specification is set.
    pub fn set_host(&mut self, host: HostEndpoint) -> Result<&mut Self, SessionError> {
        match self.state {
            SessionState::Unconfigured | SessionState::Idle => {
                self.host = Some(host);
                self.state = SessionState::Idle;
                Ok(self)
            }
            state => Err(SessionError::illegal(state.name(), "set_host")),
        }
    }

    pub fn set_params(&mut self, spec: QuerySpecification) -> Result<&mut Self, SessionError> {
        self.install(Params::Typed(spec))
    }

    /// Set the specification from its JSON mapping. A mapping that does not
    /// fit the selected operation is reported as an error envelope by
    /// [`call`](Self::call).
    pub fn set_params_json(&mut self, raw: Value) -> Result<&mut Self, SessionError> {
        self.install(Params::Mapping(raw))
    }

    fn install(&mut self, params: Params) -> Result<&mut Self, SessionError> {
        match self.state {
            SessionState::Idle | SessionState::Configured => {
                self.params = Some(params);
                self.state = SessionState::Configured;
                Ok(self)
            }
            state => Err(SessionError::illegal(state.name(), "set_params")),
        }
    }

    /// Connect and read timeout for subsequent calls
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Return raw engine bodies with debug info instead of normalized results
    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    pub fn save(&mut self) -> Result<&mut Self, SessionError> {
        self.select(Operation::Save)
    }

    pub fn update_doc(&mut self) -> Result<&mut Self, SessionError> {
        self.select(Operation::Update)
    }

    pub fn del_doc(&mut self) -> Result<&mut Self, SessionError> {
        self.select(Operation::Delete)
    }

    pub fn get_doc(&mut self) -> Result<&mut Self, SessionError> {
        self.select(Operation::Get)
    }

    pub fn search(&mut self) -> Result<&mut Self, SessionError> {
        self.select(Operation::Search(SearchMode::Plain))
    }

    /// Search ranked by the specification's scoring rules
    pub fn self_sort_search(&mut self) -> Result<&mut Self, SessionError> {
        self.select(Operation::Search(SearchMode::Scored))
    }

    pub fn multi_key_search(&mut self) -> Result<&mut Self, SessionError> {
        self.select(Operation::Search(SearchMode::MultiKeyword))
    }

    /// Selecting again before `call` replaces the earlier choice.
    fn select(&mut self, operation: Operation) -> Result<&mut Self, SessionError> {
        match self.state {
            SessionState::Configured | SessionState::Selected(_) => {
                self.state = SessionState::Selected(operation);
                Ok(self)
            }
            state => Err(SessionError::illegal(state.name(), operation.name())),
        }
    }

    /// Execute the selected operation.
    ///
    /// Specification problems never reach the transport; they come back as
    /// `Ok` with an error envelope. Transport failures are returned as errors.
    pub async fn call(&mut self) -> Result<ResultEnvelope, SessionError> {
        let operation = match self.state {
            SessionState::Selected(operation) => operation,
            state => return Err(SessionError::illegal(state.name(), "call")),
        };
        let (Some(host), Some(params)) = (&self.host, &self.params) else {
            return Err(SessionError::illegal(self.state.name(), "call"));
        };
        self.state = SessionState::Executed;

        let prepared = params
            .resolve(operation)
            .and_then(|spec| prepare(host, &spec, operation).map(|prepared| (spec, prepared)));
        let (spec, prepared) = match prepared {
            Ok(ok) => ok,
            Err(e) => {
                warn!(operation = operation.name(), error = %e, "Rejected specification");
                let debug_info = DebugInfo {
                    params: params.raw(),
                    compiled_document: Value::Null,
                };
                return Ok(ResultEnvelope::error(e.to_string(), debug_info));
            }
        };

        let request = TransportRequest::from_prepared(&prepared, self.timeout)?;
        debug!(verb = %request.verb, uri = %request.uri, "Executing request");

        let started = Instant::now();
        let raw = self.transport.execute(request).await?;
        info!(
            operation = operation.name(),
            uri = %prepared.uri,
            bytes = raw.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request completed"
        );

        if self.debug {
            let debug_info = DebugInfo {
                params: params.raw(),
                compiled_document: prepared.body.unwrap_or(Value::Null),
            };
            return Ok(ResponseNormalizer::debug(&raw, debug_info));
        }

        Ok(ResponseNormalizer::normalize(&raw, &operation, &spec))
    }

    /// Drop the specification, selection and debug flag. Host, timeout and
    /// transport are kept.
    pub fn clear(&mut self) -> &mut Self {
        self.params = None;
        self.debug = false;
        self.state = if self.host.is_some() {
            SessionState::Idle
        } else {
            SessionState::Unconfigured
        };
        self
    }
}
