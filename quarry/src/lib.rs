//! Declarative search specifications compiled to Elasticsearch query DSL
//!
//! A caller describes a request as a [`QuerySpecification`]: target
//! index/type, filters, sort directives, keyword search, scoring rules,
//! grouping, highlighting and pagination. This crate compiles it into the
//! wire document the engine expects, derives the URI and verb for the chosen
//! operation, and normalizes the engine's response into a stable shape.
//!
//! # Operations
//!
//! - `save` - create or replace a document (`PUT` with id, `POST` without)
//! - `update_doc` - partial update via `/_update`
//! - `del_doc` / `get_doc` - single document by id
//! - `search` - keyword match plus filters under a `filtered` query
//! - `self_sort_search` - `function_score` with weighted rules
//! - `multi_key_search` - one multi-field match per keyword
//!
//! # Example
//!
//! ```no_run
//! # async fn run<T: quarry::Transport>(transport: T) -> Result<(), quarry::SessionError> {
//! use quarry::{HostEndpoint, QuerySpecification, Session};
//! use serde_json::json;
//!
//! let host = HostEndpoint::new("localhost", 9200).expect("valid host");
//! let mut session = Session::with_host(transport, host);
//! let result = session
//!     .set_params_json(json!({"index": "books", "type": "book", "keyword": "dune"}))?
//!     .search()?
//!     .call()
//!     .await?;
//! if let Some(msg) = result.error_msg() {
//!     eprintln!("{}", msg);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The network is behind the [`Transport`] trait; `quarry-http` provides the
//! reqwest implementation.

pub mod compile;
pub mod config;
pub mod error;
pub mod query;
pub mod request;
pub mod response;
pub mod session;
pub mod spec;
pub mod transport;

pub use compile::{QueryAssembler, SearchMode};
pub use config::Config;
pub use error::{SessionError, SpecError, TransportError};
pub use request::{prepare, HostEndpoint, Operation, PreparedRequest, Verb};
pub use response::{DebugInfo, ResponseNormalizer, ResultEnvelope, SearchResults};
pub use session::{Session, SessionState};
pub use spec::QuerySpecification;
pub use transport::{Transport, TransportRequest};

pub type Result<T> = std::result::Result<T, SpecError>;
