//! Elasticsearch Query DSL types
//!
//! These types represent the subset of the engine's query DSL that the
//! compilers emit. Map-valued clauses use `BTreeMap` so that the serialized
//! document is identical for identical input.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Root search request body
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SearchBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggs: Option<BTreeMap<String, Aggregation>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortClause>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(default, rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<String>>,
}

/// Query clauses
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// Bool query (must, should, must_not)
    Bool(BoolQuery),

    /// Term query (exact match, not analyzed)
    Term(BTreeMap<String, Value>),

    /// Range query
    Range(BTreeMap<String, RangeParams>),

    /// Match query (analyzed full-text)
    Match(BTreeMap<String, Value>),

    /// Match phrase query
    MatchPhrase(BTreeMap<String, Value>),

    /// Match phrase prefix query
    MatchPhrasePrefix(BTreeMap<String, Value>),

    /// Terms matched as a bool of terms, last one as a prefix
    MatchBoolPrefix(BTreeMap<String, Value>),

    /// Multi-match across multiple fields
    MultiMatch(MultiMatchQuery),

    /// Distance from a point
    GeoDistance(GeoDistanceQuery),

    /// Inside a rectangle
    GeoBoundingBox(BTreeMap<String, BoundingBox>),

    /// Query plus filter wrapper
    Filtered(FilteredQuery),

    /// Query rescored by weighted functions
    FunctionScore(FunctionScoreQuery),
}

impl Query {
    pub fn term(field: &str, value: Value) -> Self {
        Query::Term(BTreeMap::from([(field.to_string(), value)]))
    }

    pub fn range_gt(field: &str, value: Value) -> Self {
        Query::Range(BTreeMap::from([(
            field.to_string(),
            RangeParams {
                gt: Some(value),
                lt: None,
            },
        )]))
    }

    pub fn range_lt(field: &str, value: Value) -> Self {
        Query::Range(BTreeMap::from([(
            field.to_string(),
            RangeParams {
                gt: None,
                lt: Some(value),
            },
        )]))
    }

    /// A nested bool that matches when any of `clauses` matches
    pub fn any_of(clauses: Vec<Query>) -> Self {
        Query::Bool(BoolQuery {
            should: clauses,
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BoolQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Query>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Query>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Query>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<i64>,
}

impl BoolQuery {
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RangeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MultiMatchQuery {
    pub query: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub match_type: Option<String>,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeoDistanceQuery {
    /// Distance with unit suffix, e.g. `5km`
    pub distance: String,
    /// Keyed by the geo-point field name
    #[serde(flatten)]
    pub point: BTreeMap<String, GeoPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BoundingBox {
    pub top_left: GeoPoint,
    pub bottom_right: GeoPoint,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FilteredQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Box<Query>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Box<Query>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FunctionScoreQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Box<Query>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Box<Query>>,
    pub functions: Vec<ScoreFunction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScoreFunction {
    pub weight: f64,
    pub filter: Query,
}

/// Highlighting configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Highlight {
    pub pre_tags: Vec<String>,
    pub post_tags: Vec<String>,
    pub fields: Map<String, Value>,
}

/// Sort clause, one entry of the `sort` array
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SortClause {
    Script {
        #[serde(rename = "_script")]
        script: ScriptSort,
    },
    GeoDistance {
        #[serde(rename = "_geo_distance")]
        geo_distance: GeoDistanceSort,
    },
    Field(BTreeMap<String, FieldSort>),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FieldSort {
    pub order: String,
    pub ignore_unmapped: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScriptSort {
    #[serde(rename = "type")]
    pub sort_type: String,
    pub script: Script,
    pub order: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Script {
    pub inline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeoDistanceSort {
    pub order: String,
    pub unit: String,
    #[serde(flatten)]
    pub point: BTreeMap<String, GeoPoint>,
    pub distance_type: String,
    pub mode: String,
}

/// Aggregation entry; only `terms` is emitted
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Aggregation {
    pub terms: TermsAgg,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TermsAgg {
    pub field: String,
    pub order: BTreeMap<String, String>,
    pub size: usize,
}
