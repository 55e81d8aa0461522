//! Response normalization
//!
//! Engine responses are reshaped into a [`ResultEnvelope`]. Searches become
//! `{total, time, data, groups?}`, document operations pass the parsed body
//! through, and failures before the transport produce an error envelope with
//! the same `total`/`time`/`data` keys so callers can read them uniformly.

use crate::request::Operation;
use crate::spec::QuerySpecification;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Normalized result handed back to callers. Check
/// [`error_msg`](Self::error_msg) before reading anything else.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultEnvelope {
    Hits(SearchResults),
    Document(Value),
    Debug(Value),
    Error(ErrorEnvelope),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub total: u64,
    /// Engine-reported execution time in milliseconds
    pub time: u64,
    pub data: Vec<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<BTreeMap<String, Vec<Value>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub debug_info: DebugInfo,
    pub total: u64,
    pub time: u64,
    pub data: Vec<Map<String, Value>>,
    pub error_msg: String,
}

/// The caller's specification and the document compiled from it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub params: Value,
    pub compiled_document: Value,
}

impl ResultEnvelope {
    pub fn error(message: impl Into<String>, debug_info: DebugInfo) -> Self {
        ResultEnvelope::Error(ErrorEnvelope {
            debug_info,
            total: 0,
            time: 0,
            data: Vec::new(),
            error_msg: message.into(),
        })
    }

    pub fn error_msg(&self) -> Option<&str> {
        match self {
            ResultEnvelope::Error(err) => Some(&err.error_msg),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error_msg().is_some()
    }

    /// Total hits; zero for anything but a search result
    pub fn total(&self) -> u64 {
        match self {
            ResultEnvelope::Hits(results) => results.total,
            _ => 0,
        }
    }

    pub fn data(&self) -> &[Map<String, Value>] {
        match self {
            ResultEnvelope::Hits(results) => &results.data,
            ResultEnvelope::Error(err) => &err.data,
            _ => &[],
        }
    }

    pub fn groups(&self) -> Option<&BTreeMap<String, Vec<Value>>> {
        match self {
            ResultEnvelope::Hits(results) => results.groups.as_ref(),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSearchResponse {
    took: u64,
    hits: Option<RawHits>,
    aggregations: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHits {
    total: RawTotal,
    hits: Option<Vec<RawHit>>,
}

/// Older engines report a bare count, newer ones `{value, relation}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTotal {
    Count(u64),
    Object { value: u64 },
}

impl Default for RawTotal {
    fn default() -> Self {
        RawTotal::Count(0)
    }
}

impl RawTotal {
    fn value(&self) -> u64 {
        match self {
            RawTotal::Count(n) | RawTotal::Object { value: n } => *n,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHit {
    #[serde(rename = "_id")]
    id: Value,
    #[serde(rename = "_score")]
    score: Value,
    #[serde(rename = "_source")]
    source: Map<String, Value>,
    highlight: Option<Map<String, Value>>,
    sort: Option<Value>,
}

pub struct ResponseNormalizer;

impl ResponseNormalizer {
    /// Reshape a raw engine response for `operation`
    pub fn normalize(raw: &[u8], operation: &Operation, spec: &QuerySpecification) -> ResultEnvelope {
        if operation.is_search() {
            ResultEnvelope::Hits(Self::search(raw, spec))
        } else {
            ResultEnvelope::Document(parse_or_null(raw))
        }
    }

    /// Raw parsed body with `debugInfo` attached
    pub fn debug(raw: &[u8], debug_info: DebugInfo) -> ResultEnvelope {
        let mut body = match parse_or_null(raw) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let info = serde_json::to_value(&debug_info).unwrap_or(Value::Null);
        body.insert("debugInfo".to_string(), info);
        ResultEnvelope::Debug(Value::Object(body))
    }

    fn search(raw: &[u8], spec: &QuerySpecification) -> SearchResults {
        let response: RawSearchResponse = match serde_json::from_slice(raw) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Unreadable search response, treating as empty");
                return SearchResults::default();
            }
        };

        let mut results = match response.hits {
            Some(RawHits {
                total,
                hits: Some(hits),
            }) => SearchResults {
                total: total.value(),
                time: response.took,
                data: hits.into_iter().map(|hit| Self::map_hit(hit, spec)).collect(),
                groups: None,
            },
            _ => SearchResults::default(),
        };

        if spec.need_group_by {
            results.groups = response
                .aggregations
                .as_ref()
                .map(|aggregations| Self::map_groups(aggregations, spec));
        }

        results
    }

    fn map_hit(hit: RawHit, spec: &QuerySpecification) -> Map<String, Value> {
        let mut doc = hit.source;

        if let (Some(field), Some(highlight)) = (spec.highlight_field(), &hit.highlight) {
            if let Some(fragment) = highlight
                .get(field)
                .and_then(|fragments| fragments.get(0))
            {
                doc.insert(field.to_string(), fragment.clone());
            }
        }

        doc.insert("_id".to_string(), hit.id);

        let score = match hit.sort {
            Some(sort) if spec.is_sorted() => sort,
            _ => hit.score,
        };
        doc.insert("_score".to_string(), score);

        doc
    }

    fn map_groups(
        aggregations: &Map<String, Value>,
        spec: &QuerySpecification,
    ) -> BTreeMap<String, Vec<Value>> {
        spec.agg_columns
            .iter()
            .flatten()
            .map(|agg| {
                let buckets = aggregations
                    .get(&agg.column)
                    .and_then(|result| result.get("buckets"))
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                (agg.column.clone(), buckets)
            })
            .collect()
    }
}

fn parse_or_null(raw: &[u8]) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(raw).unwrap_or_else(|e| {
        warn!(error = %e, "Unreadable response body");
        Value::Null
    })
}
