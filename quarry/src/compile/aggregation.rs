//! Group-by columns to terms aggregations

use crate::error::SpecError;
use crate::query::types::{Aggregation, TermsAgg};
use crate::spec::AggColumn;
use std::collections::BTreeMap;

/// Bucket count when the caller gives no `aggSize`
pub const DEFAULT_AGG_SIZE: usize = 10;

pub struct AggregationCompiler;

impl AggregationCompiler {
    /// One terms aggregation per column, keyed by column name. A repeated
    /// column overwrites the earlier entry.
    pub fn compile(
        columns: &[AggColumn],
        size: Option<usize>,
    ) -> Result<BTreeMap<String, Aggregation>, SpecError> {
        if columns.is_empty() {
            return Err(SpecError::AggColumnsRequired);
        }

        let size = size.unwrap_or(DEFAULT_AGG_SIZE);
        let mut aggs = BTreeMap::new();

        for column in columns {
            let order_field = column
                .group_order_field
                .clone()
                .unwrap_or_else(|| "_count".to_string());
            let direction = column
                .direction
                .clone()
                .unwrap_or_else(|| "desc".to_string());

            aggs.insert(
                column.column.clone(),
                Aggregation {
                    terms: TermsAgg {
                        field: column.column.clone(),
                        order: BTreeMap::from([(order_field, direction)]),
                        size,
                    },
                },
            );
        }

        Ok(aggs)
    }
}
