//! Error types for specification compilation, transport and session use

use thiserror::Error;

/// The caller supplied an invalid or incomplete specification.
///
/// These are detected while compiling or validating and never reach the
/// transport. A [`Session`](crate::session::Session) turns them into an error
/// envelope instead of returning them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("unsupported operator")]
    UnsupportedOperator(String),

    #[error("unsupported match type: {0}")]
    UnsupportedMatchType(String),

    #[error("IN requires array value")]
    InRequiresArray,

    #[error("NOT IN requires array value")]
    NotInRequiresArray,

    #[error("BETWEEN requires two-element array value")]
    BetweenRequiresPair,

    #[error("missing geo fields")]
    MissingGeoFields,

    #[error("geo sort missing fields")]
    GeoSortMissingFields,

    #[error("dynamic sort missing script")]
    DynamicSortMissingScript,

    #[error("aggColumns required")]
    AggColumnsRequired,

    #[error("rules required")]
    RulesRequired,

    #[error("rule missing fields")]
    RuleMissingFields,

    #[error("invalid rule operator")]
    InvalidRuleOperator,

    #[error("index/type required for create")]
    CreateTargetRequired,

    #[error("index/type/id required for update")]
    UpdateTargetRequired,

    #[error("index/type/id required for delete")]
    DeleteTargetRequired,

    #[error("index/type/id required for get")]
    GetTargetRequired,

    #[error("index/type required")]
    IndexTypeRequired,

    #[error("invalid specification: {0}")]
    Malformed(String),

    #[error("invalid host: {0}")]
    InvalidHost(String),
}

/// Failure reported by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by the session state machine.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} while session is {state}")]
    IllegalTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SessionError {
    pub(crate) fn illegal(state: &'static str, action: &'static str) -> Self {
        Self::IllegalTransition { state, action }
    }
}
