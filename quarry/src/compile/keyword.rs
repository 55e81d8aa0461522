//! Free-text keyword search to match clauses

use crate::query::types::{MultiMatchQuery, Query};
use crate::spec::Keyword;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::collections::BTreeMap;

/// Field searched by a bare keyword with no explicit search type
pub const DEFAULT_QUERY_FIELD: &str = "_all";

/// Multi-match type forced by the phrase-prefix flag
pub const PHRASE_PREFIX: &str = "phrase_prefix";

pub struct KeywordCompiler;

impl KeywordCompiler {
    /// Compile a keyword search.
    ///
    /// With both `search_type` and `columns` this is a `multi_match` over the
    /// columns; with no `search_type` it is a `match` on the default field.
    /// `phrase_prefix` overrides whatever type the caller asked for.
    pub fn compile(
        keyword: &Keyword,
        columns: Option<&[String]>,
        search_type: Option<&str>,
        phrase_prefix: bool,
    ) -> Option<Query> {
        let text = decode(&keyword.terms().join(" "));

        match (search_type, columns) {
            (Some(search_type), Some(columns)) => Some(Self::multi_match(
                text,
                columns,
                Some(search_type),
                phrase_prefix,
            )),
            (None, _) => Some(Query::Match(BTreeMap::from([(
                DEFAULT_QUERY_FIELD.to_string(),
                Value::String(text),
            )]))),
            (Some(_), None) => None,
        }
    }

    /// One `multi_match` per keyword, in keyword order
    pub fn compile_each(
        keyword: &Keyword,
        columns: &[String],
        search_type: Option<&str>,
        phrase_prefix: bool,
    ) -> Vec<Query> {
        keyword
            .terms()
            .into_iter()
            .map(|term| Self::multi_match(decode(term), columns, search_type, phrase_prefix))
            .collect()
    }

    fn multi_match(
        text: String,
        columns: &[String],
        search_type: Option<&str>,
        phrase_prefix: bool,
    ) -> Query {
        let match_type = if phrase_prefix {
            Some(PHRASE_PREFIX.to_string())
        } else {
            search_type.map(str::to_string)
        };

        Query::MultiMatch(MultiMatchQuery {
            query: text,
            match_type,
            fields: columns.to_vec(),
        })
    }
}

/// Form-style URL decoding: `+` is a space, `%XX` is a byte
fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
