//! Compilers from specification fragments to query DSL
//!
//! Each compiler is a pure function over borrowed input. The
//! [`QueryAssembler`] selects a search shape and merges the cross-cutting
//! directives in a fixed order.

pub mod aggregation;
pub mod assembler;
pub mod filter;
pub mod keyword;
pub mod sort;

pub use aggregation::AggregationCompiler;
pub use assembler::{QueryAssembler, SearchMode};
pub use filter::FilterCompiler;
pub use keyword::KeywordCompiler;
pub use sort::SortCompiler;
