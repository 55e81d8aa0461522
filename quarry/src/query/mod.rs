//! Wire-format query DSL

pub mod types;

pub use types::*;
