//! Caller-facing search specification
//!
//! A [`QuerySpecification`] is the declarative request a caller hands over:
//! target index and type, filters, sort directives, keyword search, scoring
//! rules, grouping, highlighting, pagination and projection. It deserializes
//! from the camelCase mapping clients already send. For writes the same
//! mapping, minus its addressing keys, is the document body.

use crate::error::SpecError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Root specification for one request
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuerySpecification {
    pub index: Option<String>,

    #[serde(rename = "type")]
    pub doc_type: Option<String>,

    #[serde(deserialize_with = "deserialize_id")]
    pub id: Option<String>,

    /// Field-level predicates, compiled in order
    pub filters: Vec<FilterPredicate>,

    /// Minimum number of `should` clauses that must match
    pub min_num: Option<i64>,

    pub geo: Option<GeoParameter>,

    /// Sort directives; list order is tie-break order
    pub sort: Vec<SortDirective>,

    pub keyword: Option<Keyword>,

    /// Fields searched by `keyword` when `searchType` is given
    pub columns: Option<Vec<String>>,

    pub search_type: Option<String>,

    /// Forces prefix-phrase matching for multi-field keyword search
    pub is_en: bool,

    /// Scoring rules for function-score search
    pub rules: Option<Vec<ScoreRule>>,

    pub score_mode: Option<String>,

    pub need_group_by: bool,

    pub agg_columns: Option<Vec<AggColumn>>,

    pub agg_size: Option<usize>,

    #[serde(rename = "highLight")]
    pub high_light: bool,

    pub high_class: Option<String>,

    pub high_fields: Option<Map<String, Value>>,

    pub from: Option<u64>,

    pub size: Option<u64>,

    /// Explicit `_source` projection
    #[serde(alias = "_source")]
    pub source: Option<Vec<String>>,

    /// Document body for create/replace and update: the caller's mapping
    /// minus [`TARGET_KEYS`]. Search keys are part of it.
    #[serde(skip)]
    pub document: Map<String, Value>,
}

/// Keys that address the document or steer the compiler and are never
/// written into it
pub const TARGET_KEYS: [&str; 4] = ["index", "type", "id", "isEn"];

/// Only the addressing part of a mapping
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Target {
    index: Option<String>,
    #[serde(rename = "type")]
    doc_type: Option<String>,
    #[serde(deserialize_with = "deserialize_id")]
    id: Option<String>,
}

fn document_body(mapping: &Value) -> Map<String, Value> {
    mapping
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(key, _)| !TARGET_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}

impl QuerySpecification {
    /// Specification targeting `index` / `doc_type`
    pub fn new(index: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            index: Some(index.into()),
            doc_type: Some(doc_type.into()),
            ..Default::default()
        }
    }

    /// Parse a search specification from its JSON mapping. Every search key
    /// must have the right shape.
    pub fn from_json(value: Value) -> Result<Self, SpecError> {
        let document = document_body(&value);
        let mut spec: Self =
            serde_json::from_value(value).map_err(|e| SpecError::Malformed(e.to_string()))?;
        spec.document = document;
        Ok(spec)
    }

    /// Parse a mapping for a document operation. Only `index`, `type` and
    /// `id` are read; everything else is document data, even keys that share
    /// a name with a search key.
    pub fn from_document_json(value: Value) -> Result<Self, SpecError> {
        let document = document_body(&value);
        let target: Target =
            serde_json::from_value(value).map_err(|e| SpecError::Malformed(e.to_string()))?;
        Ok(Self {
            index: target.index,
            doc_type: target.doc_type,
            id: target.id,
            document,
            ..Default::default()
        })
    }

    /// The mapping this specification was built from, document keys included
    pub fn to_mapping(&self) -> Value {
        let mut mapping = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        mapping.retain(|_, value| !value.is_null());
        for (key, value) in &self.document {
            mapping.insert(key.clone(), value.clone());
        }
        Value::Object(mapping)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_filter(mut self, predicate: FilterPredicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn with_sort(mut self, directive: SortDirective) -> Self {
        self.sort.push(directive);
        self
    }

    /// Add a document field for create/replace or update
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.document.insert(key.into(), value.into());
        self
    }

    /// True when the filter compiler has anything to do
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty() || self.geo.is_some()
    }

    pub fn is_sorted(&self) -> bool {
        !self.sort.is_empty()
    }

    pub fn min_should_match(&self) -> i64 {
        self.min_num.unwrap_or(1)
    }

    /// Highlighting needs the flag, a class and at least the field map
    pub fn wants_highlight(&self) -> bool {
        self.high_light && self.high_class.is_some() && self.high_fields.is_some()
    }

    /// The single field whose fragment replaces the stored value in results
    pub fn highlight_field(&self) -> Option<&str> {
        if !self.wants_highlight() {
            return None;
        }
        self.high_fields
            .as_ref()
            .and_then(|fields| fields.keys().next())
            .map(String::as_str)
    }

    pub(crate) fn target(&self) -> Option<(&str, &str)> {
        let index = self.index.as_deref().filter(|s| !s.is_empty())?;
        let doc_type = self.doc_type.as_deref().filter(|s| !s.is_empty())?;
        Some((index, doc_type))
    }

    pub(crate) fn target_with_id(&self) -> Option<(&str, &str, &str)> {
        let (index, doc_type) = self.target()?;
        let id = self.id.as_deref().filter(|s| !s.is_empty())?;
        Some((index, doc_type, id))
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Text(String),
        Number(u64),
    }

    Ok(Option::<IdRepr>::deserialize(deserializer)?.map(|id| match id {
        IdRepr::Text(s) => s,
        IdRepr::Number(n) => n.to_string(),
    }))
}

/// Free-text keyword: a single string or a list of keywords
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Keyword {
    One(String),
    Many(Vec<String>),
}

impl Keyword {
    pub fn terms(&self) -> Vec<&str> {
        match self {
            Keyword::One(s) => vec![s.as_str()],
            Keyword::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Keyword::One(_) => 1,
            Keyword::Many(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for Keyword {
    fn from(s: &str) -> Self {
        Keyword::One(s.to_string())
    }
}

/// One field-level predicate
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FilterPredicate {
    pub field: String,

    #[serde(alias = "type")]
    pub operator: FilterOp,

    #[serde(default)]
    pub value: Value,

    /// Compile `=` as a full-text match instead of an exact term
    #[serde(default, rename = "termQuery")]
    pub term_query: bool,

    /// Full-text clause used with `termQuery`: `match` (default),
    /// `match_phrase`, `match_phrase_prefix` or `match_bool_prefix`
    #[serde(default)]
    pub match_type: Option<String>,
}

impl FilterPredicate {
    pub fn new(field: impl Into<String>, operator: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            term_query: false,
            match_type: None,
        }
    }

    /// `=` predicate compiled as a full-text clause of `match_type`
    pub fn full_text(field: impl Into<String>, value: impl Into<Value>, match_type: &str) -> Self {
        Self {
            term_query: true,
            match_type: Some(match_type.to_string()),
            ..Self::new(field, FilterOp::Eq, value)
        }
    }
}

/// Filter operator tokens
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum FilterOp {
    Between,
    NotBetween,
    Gt,
    Lt,
    Eq,
    Ne,
    In,
    NotIn,
    /// Any token outside the supported set; rejected at compile time
    Unsupported(String),
}

impl FilterOp {
    pub fn parse(token: &str) -> Self {
        match token.trim().to_lowercase().as_str() {
            "between" => FilterOp::Between,
            "not_between" => FilterOp::NotBetween,
            ">" => FilterOp::Gt,
            "<" => FilterOp::Lt,
            "=" => FilterOp::Eq,
            "!=" => FilterOp::Ne,
            "in" => FilterOp::In,
            "not in" | "not_in" => FilterOp::NotIn,
            _ => FilterOp::Unsupported(token.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FilterOp::Between => "between",
            FilterOp::NotBetween => "not_between",
            FilterOp::Gt => ">",
            FilterOp::Lt => "<",
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::In => "in",
            FilterOp::NotIn => "not in",
            FilterOp::Unsupported(token) => token,
        }
    }
}

impl From<String> for FilterOp {
    fn from(token: String) -> Self {
        FilterOp::parse(&token)
    }
}

impl From<FilterOp> for String {
    fn from(op: FilterOp) -> Self {
        op.as_str().to_string()
    }
}

/// Radius magnitude, given as a number or as text such as `"5"`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Distance {
    Number(f64),
    Text(String),
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::Number(n) => write!(f, "{}", n),
            Distance::Text(s) => f.write_str(s.trim()),
        }
    }
}

/// Geo constraint: radius from a point, or a bounding box when `need_box` is set
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeoParameter {
    pub attr: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub distance: Option<Distance>,
    pub unit: Option<String>,
    pub need_box: bool,
    pub left_top_lat: Option<f64>,
    pub left_top_lon: Option<f64>,
    pub right_bottom_lat: Option<f64>,
    pub right_bottom_lon: Option<f64>,
}

impl GeoParameter {
    pub fn radius(attr: &str, lat: f64, lon: f64, distance: f64, unit: &str) -> Self {
        Self {
            attr: Some(attr.to_string()),
            lat: Some(lat),
            lon: Some(lon),
            distance: Some(Distance::Number(distance)),
            unit: Some(unit.to_string()),
            ..Default::default()
        }
    }

    pub fn bounding_box(attr: &str, top_left: (f64, f64), bottom_right: (f64, f64)) -> Self {
        Self {
            attr: Some(attr.to_string()),
            need_box: true,
            left_top_lat: Some(top_left.0),
            left_top_lon: Some(top_left.1),
            right_bottom_lat: Some(bottom_right.0),
            right_bottom_lon: Some(bottom_right.1),
            ..Default::default()
        }
    }
}

/// One sort directive
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirective {
    /// Plain field sort
    Public(PublicSort),
    /// Scripted sort
    Dynamic(DynamicSort),
    /// Distance from a point
    Geo(GeoSort),
}

impl SortDirective {
    pub fn field(field: &str, order: &str) -> Self {
        SortDirective::Public(PublicSort {
            sort_field: field.to_string(),
            order: order.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PublicSort {
    #[serde(rename = "sortField")]
    pub sort_field: String,
    #[serde(default = "default_order")]
    pub order: String,
}

fn default_order() -> String {
    "asc".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DynamicSort {
    pub script: Option<String>,
    pub order: Option<String>,
    pub params: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoSort {
    pub attr: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub unit: Option<String>,
    /// Sort order, `asc` when absent
    pub sort: Option<String>,
}

/// Custom scoring rule for function-score search
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoreRule {
    pub field: Option<String>,
    #[serde(alias = "type")]
    pub operator: Option<FilterOp>,
    pub value: Option<Value>,
    pub weight: Option<f64>,
}

/// Group-by request for one column
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AggColumn {
    #[serde(rename = "aggColumns")]
    pub column: String,
    #[serde(default, rename = "groupOrderField")]
    pub group_order_field: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

impl AggColumn {
    pub fn new(column: &str) -> Self {
        Self {
            column: column.to_string(),
            group_order_field: None,
            direction: None,
        }
    }
}
