//! Assembles one of the three search shapes plus cross-cutting directives

use super::aggregation::AggregationCompiler;
use super::filter::FilterCompiler;
use super::keyword::KeywordCompiler;
use super::sort::SortCompiler;
use crate::error::SpecError;
use crate::query::types::{
    BoolQuery, FilteredQuery, FunctionScoreQuery, Highlight, Query, ScoreFunction, SearchBody,
};
use crate::spec::{FilterOp, QuerySpecification, ScoreRule};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which top-level query shape to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Keyword match and filters under a `filtered` query
    Plain,
    /// Keyword match and filters under `function_score` with custom rules
    Scored,
    /// Filters plus one multi-field match per keyword in a `bool` query
    MultiKeyword,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Plain => "plain",
            SearchMode::Scored => "scored",
            SearchMode::MultiKeyword => "multi_keyword",
        }
    }
}

pub struct QueryAssembler;

impl QueryAssembler {
    /// Compile `spec` into a complete search body for `mode`
    pub fn assemble(spec: &QuerySpecification, mode: SearchMode) -> Result<SearchBody, SpecError> {
        let query = match mode {
            SearchMode::Plain => Self::plain(spec)?,
            SearchMode::Scored => Some(Self::scored(spec)?),
            SearchMode::MultiKeyword => Some(Self::multi_keyword(spec)?),
        };

        let mut body = SearchBody {
            query,
            ..Default::default()
        };
        Self::merge_directives(spec, &mut body)?;

        debug!(mode = mode.as_str(), "Assembled search body");
        Ok(body)
    }

    fn filter_tree(spec: &QuerySpecification) -> Result<Option<BoolQuery>, SpecError> {
        if !spec.has_filters() {
            return Ok(None);
        }
        FilterCompiler::compile(&spec.filters, spec.geo.as_ref(), spec.min_should_match()).map(Some)
    }

    fn keyword_clause(spec: &QuerySpecification) -> Option<Query> {
        let keyword = spec.keyword.as_ref()?;
        KeywordCompiler::compile(
            keyword,
            spec.columns.as_deref(),
            spec.search_type.as_deref(),
            spec.is_en,
        )
    }

    fn plain(spec: &QuerySpecification) -> Result<Option<Query>, SpecError> {
        let query = Self::keyword_clause(spec);
        let filter = Self::filter_tree(spec)?;

        if query.is_none() && filter.is_none() {
            return Ok(None);
        }

        Ok(Some(Query::Filtered(FilteredQuery {
            query: query.map(Box::new),
            filter: filter.map(|tree| Box::new(Query::Bool(tree))),
        })))
    }

    fn scored(spec: &QuerySpecification) -> Result<Query, SpecError> {
        // Function score only takes a query for an explicit multi-field search.
        let query = match (&spec.search_type, &spec.columns) {
            (Some(_), Some(_)) => Self::keyword_clause(spec),
            _ => None,
        };
        let filter = Self::filter_tree(spec)?;
        let rules = spec.rules.as_deref().ok_or(SpecError::RulesRequired)?;
        let functions = Self::score_functions(rules)?;

        Ok(Query::FunctionScore(FunctionScoreQuery {
            query: query.map(Box::new),
            filter: filter.map(|tree| Box::new(Query::Bool(tree))),
            functions,
            score_mode: spec.score_mode.clone(),
        }))
    }

    fn score_functions(rules: &[ScoreRule]) -> Result<Vec<ScoreFunction>, SpecError> {
        rules
            .iter()
            .map(|rule| {
                let (Some(field), Some(operator), Some(value), Some(weight)) =
                    (&rule.field, &rule.operator, &rule.value, rule.weight)
                else {
                    return Err(SpecError::RuleMissingFields);
                };

                let filter = match operator {
                    FilterOp::Gt => Query::range_gt(field, value.clone()),
                    FilterOp::Lt => Query::range_lt(field, value.clone()),
                    FilterOp::Eq => Query::term(field, value.clone()),
                    _ => return Err(SpecError::InvalidRuleOperator),
                };

                Ok(ScoreFunction { weight, filter })
            })
            .collect()
    }

    fn multi_keyword(spec: &QuerySpecification) -> Result<Query, SpecError> {
        let mut tree = Self::filter_tree(spec)?.unwrap_or_default();

        if let (Some(keyword), Some(columns)) = (&spec.keyword, &spec.columns) {
            let clauses = KeywordCompiler::compile_each(
                keyword,
                columns,
                spec.search_type.as_deref(),
                spec.is_en,
            );

            if keyword.len() == 1 {
                tree.must.extend(clauses);
            } else if !clauses.is_empty() {
                tree.should.extend(clauses);
                if tree.minimum_should_match.is_none() {
                    tree.minimum_should_match = Some(spec.min_should_match().max(1));
                }
            }
        }

        Ok(Query::Bool(tree))
    }

    /// Highlight, aggregations, from, sort, size, then `_source`
    fn merge_directives(spec: &QuerySpecification, body: &mut SearchBody) -> Result<(), SpecError> {
        if let (true, Some(class), Some(fields)) =
            (spec.high_light, &spec.high_class, &spec.high_fields)
        {
            body.highlight = Some(Highlight {
                pre_tags: vec![format!("<span class=\"{}\">", class)],
                post_tags: vec!["</span>".to_string()],
                fields: fields.clone(),
            });
        }

        if spec.need_group_by {
            let columns = spec.agg_columns.as_deref().unwrap_or(&[]);
            body.aggs = Some(AggregationCompiler::compile(columns, spec.agg_size)?);
        }

        body.from = spec.from;

        if spec.is_sorted() {
            body.sort = SortCompiler::compile(&spec.sort)?;
        }

        body.size = spec.size;

        body.source = spec.source.clone().filter(|columns| !columns.is_empty());

        Ok(())
    }
}
