//! Filter predicates to bool clause tree

use crate::error::SpecError;
use crate::query::types::{BoolQuery, BoundingBox, GeoDistanceQuery, GeoPoint, Query};
use crate::spec::{FilterOp, FilterPredicate, GeoParameter};
use serde_json::Value;
use std::collections::BTreeMap;

/// Compiles field-level predicates and an optional geo constraint
pub struct FilterCompiler;

impl FilterCompiler {
    /// Compile `predicates` in order, then append the geo constraint as a
    /// final `must` clause.
    ///
    /// `min_should_match` is written when an `in` predicate is present.
    pub fn compile(
        predicates: &[FilterPredicate],
        geo: Option<&GeoParameter>,
        min_should_match: i64,
    ) -> Result<BoolQuery, SpecError> {
        let mut tree = BoolQuery::default();

        for predicate in predicates {
            Self::compile_predicate(&mut tree, predicate, min_should_match)?;
        }

        if let Some(geo) = geo {
            tree.must.push(Self::compile_geo(geo)?);
        }

        Ok(tree)
    }

    fn compile_predicate(
        tree: &mut BoolQuery,
        predicate: &FilterPredicate,
        min_should_match: i64,
    ) -> Result<(), SpecError> {
        let field = predicate.field.as_str();
        let value = &predicate.value;

        match &predicate.operator {
            FilterOp::Between => {
                let (low, high) = bounds(value)?;
                tree.must.push(Query::range_gt(field, low.clone()));
                tree.must.push(Query::range_lt(field, high.clone()));
                // Ranges are exclusive; a document equal to the lower bound
                // still matches through this alternative.
                tree.should
                    .push(Query::any_of(vec![Query::term(field, low.clone())]));
            }

            FilterOp::NotBetween => {
                let (low, high) = bounds(value)?;
                // Shares the outer should list with every other alternative.
                tree.should.push(Query::any_of(vec![
                    Query::range_lt(field, low.clone()),
                    Query::range_gt(field, high.clone()),
                ]));
            }

            FilterOp::Gt => {
                tree.must.push(Query::range_gt(field, value.clone()));
                tree.should
                    .push(Query::any_of(vec![Query::term(field, value.clone())]));
            }

            FilterOp::Lt => {
                tree.must.push(Query::range_lt(field, value.clone()));
            }

            FilterOp::Eq => {
                let clause = if predicate.term_query {
                    Self::full_text(field, value, predicate.match_type.as_deref())?
                } else {
                    Query::term(field, value.clone())
                };
                tree.must.push(clause);
            }

            FilterOp::Ne => {
                tree.must_not.push(Query::term(field, value.clone()));
            }

            FilterOp::In => {
                let values = non_empty_array(value).ok_or(SpecError::InRequiresArray)?;
                let terms = values
                    .iter()
                    .map(|v| Query::term(field, v.clone()))
                    .collect();
                tree.should.push(Query::any_of(terms));
                tree.minimum_should_match = Some(min_should_match);
            }

            FilterOp::NotIn => {
                let values = non_empty_array(value).ok_or(SpecError::NotInRequiresArray)?;
                tree.must_not
                    .extend(values.iter().map(|v| Query::term(field, v.clone())));
            }

            FilterOp::Unsupported(token) => {
                return Err(SpecError::UnsupportedOperator(token.clone()));
            }
        }

        Ok(())
    }

    fn full_text(field: &str, value: &Value, match_type: Option<&str>) -> Result<Query, SpecError> {
        let clause = BTreeMap::from([(field.to_string(), value.clone())]);
        match match_type.unwrap_or("match") {
            "match" => Ok(Query::Match(clause)),
            "match_phrase" => Ok(Query::MatchPhrase(clause)),
            "match_phrase_prefix" => Ok(Query::MatchPhrasePrefix(clause)),
            "match_bool_prefix" => Ok(Query::MatchBoolPrefix(clause)),
            other => Err(SpecError::UnsupportedMatchType(other.to_string())),
        }
    }

    fn compile_geo(geo: &GeoParameter) -> Result<Query, SpecError> {
        let attr = geo.attr.as_deref().ok_or(SpecError::MissingGeoFields)?;

        if geo.need_box {
            let (Some(top), Some(left), Some(bottom), Some(right)) = (
                geo.left_top_lat,
                geo.left_top_lon,
                geo.right_bottom_lat,
                geo.right_bottom_lon,
            ) else {
                return Err(SpecError::MissingGeoFields);
            };

            let bbox = BoundingBox {
                top_left: GeoPoint { lat: top, lon: left },
                bottom_right: GeoPoint {
                    lat: bottom,
                    lon: right,
                },
            };
            return Ok(Query::GeoBoundingBox(BTreeMap::from([(attr.to_string(), bbox)])));
        }

        let (Some(lat), Some(lon), Some(distance), Some(unit)) =
            (geo.lat, geo.lon, geo.distance.as_ref(), geo.unit.as_deref())
        else {
            return Err(SpecError::MissingGeoFields);
        };

        Ok(Query::GeoDistance(GeoDistanceQuery {
            distance: format!("{}{}", distance, unit),
            point: BTreeMap::from([(attr.to_string(), GeoPoint { lat, lon })]),
        }))
    }
}

fn bounds(value: &Value) -> Result<(&Value, &Value), SpecError> {
    match value.as_array().map(Vec::as_slice) {
        Some([low, high]) => Ok((low, high)),
        _ => Err(SpecError::BetweenRequiresPair),
    }
}

fn non_empty_array(value: &Value) -> Option<&Vec<Value>> {
    value.as_array().filter(|values| !values.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(predicates: &[FilterPredicate]) -> Value {
        let tree = FilterCompiler::compile(predicates, None, 1).unwrap();
        serde_json::to_value(Query::Bool(tree)).unwrap()
    }

    #[test]
    fn test_between() {
        let out = compile(&[FilterPredicate::new("age", FilterOp::Between, json!([18, 30]))]);
        assert_eq!(
            out,
            json!({"bool": {
                "must": [
                    {"range": {"age": {"gt": 18}}},
                    {"range": {"age": {"lt": 30}}}
                ],
                "should": [{"bool": {"should": [{"term": {"age": 18}}]}}]
            }})
        );
    }

    #[test]
    fn test_between_requires_pair() {
        for value in [json!(5), json!([1]), json!([1, 2, 3])] {
            let err = FilterCompiler::compile(
                &[FilterPredicate::new("age", FilterOp::Between, value)],
                None,
                1,
            )
            .unwrap_err();
            assert_eq!(err, SpecError::BetweenRequiresPair);
        }
    }

    #[test]
    fn test_not_between_joins_outer_should() {
        let out = compile(&[
            FilterPredicate::new("price", FilterOp::Gt, json!(10)),
            FilterPredicate::new("age", FilterOp::NotBetween, json!([18, 30])),
        ]);
        assert_eq!(
            out["bool"]["should"],
            json!([
                {"bool": {"should": [{"term": {"price": 10}}]}},
                {"bool": {"should": [
                    {"range": {"age": {"lt": 18}}},
                    {"range": {"age": {"gt": 30}}}
                ]}}
            ])
        );
        assert_eq!(out["bool"]["must"], json!([{"range": {"price": {"gt": 10}}}]));
    }

    #[test]
    fn test_not_between_requires_pair() {
        for value in [json!("18-30"), json!([18]), json!({"low": 18, "high": 30})] {
            let err = FilterCompiler::compile(
                &[FilterPredicate::new("age", FilterOp::NotBetween, value)],
                None,
                1,
            )
            .unwrap_err();
            assert_eq!(err, SpecError::BetweenRequiresPair);
        }
    }

    #[test]
    fn test_lt_only_must() {
        let out = compile(&[FilterPredicate::new("age", FilterOp::Lt, json!(65))]);
        assert_eq!(out, json!({"bool": {"must": [{"range": {"age": {"lt": 65}}}]}}));
    }

    #[test]
    fn test_eq_term_and_full_text() {
        let out = compile(&[
            FilterPredicate::new("status", FilterOp::Eq, json!("active")),
            FilterPredicate::full_text("title", json!("rust book"), "match_phrase"),
        ]);
        assert_eq!(
            out["bool"]["must"],
            json!([
                {"term": {"status": "active"}},
                {"match_phrase": {"title": "rust book"}}
            ])
        );
    }

    #[test]
    fn test_term_query_defaults_to_match() {
        let mut p = FilterPredicate::new("title", FilterOp::Eq, json!("rust"));
        p.term_query = true;
        let out = compile(&[p]);
        assert_eq!(out["bool"]["must"], json!([{"match": {"title": "rust"}}]));
    }

    #[test]
    fn test_unknown_match_type() {
        let p = FilterPredicate::full_text("title", json!("x"), "fuzzy");
        let err = FilterCompiler::compile(&[p], None, 1).unwrap_err();
        assert_eq!(err, SpecError::UnsupportedMatchType("fuzzy".into()));
    }

    #[test]
    fn test_match_bool_prefix() {
        let out = compile(&[FilterPredicate::full_text("title", json!("rust bo"), "match_bool_prefix")]);
        assert_eq!(out["bool"]["must"], json!([{"match_bool_prefix": {"title": "rust bo"}}]));
    }

    #[test]
    fn test_ne_must_not() {
        let out = compile(&[FilterPredicate::new("deleted", FilterOp::Ne, json!(true))]);
        assert_eq!(out, json!({"bool": {"must_not": [{"term": {"deleted": true}}]}}));
    }

    #[test]
    fn test_in_sets_minimum_should_match() {
        let tree = FilterCompiler::compile(
            &[FilterPredicate::new("tag", FilterOp::In, json!([1, 2, 3]))],
            None,
            2,
        )
        .unwrap();
        assert_eq!(tree.minimum_should_match, Some(2));
        assert_eq!(
            serde_json::to_value(&tree.should).unwrap(),
            json!([{"bool": {"should": [
                {"term": {"tag": 1}},
                {"term": {"tag": 2}},
                {"term": {"tag": 3}}
            ]}}])
        );
    }

    #[test]
    fn test_in_requires_array() {
        for value in [json!(1), json!("a"), json!([])] {
            let err =
                FilterCompiler::compile(&[FilterPredicate::new("tag", FilterOp::In, value)], None, 1)
                    .unwrap_err();
            assert_eq!(err, SpecError::InRequiresArray);
        }
    }

    #[test]
    fn test_not_in() {
        let out = compile(&[FilterPredicate::new("tag", FilterOp::NotIn, json!(["a", "b"]))]);
        assert_eq!(
            out,
            json!({"bool": {"must_not": [{"term": {"tag": "a"}}, {"term": {"tag": "b"}}]}})
        );

        let err = FilterCompiler::compile(
            &[FilterPredicate::new("tag", FilterOp::NotIn, json!("a"))],
            None,
            1,
        )
        .unwrap_err();
        assert_eq!(err, SpecError::NotInRequiresArray);
    }

    #[test]
    fn test_not_in_rejects_empty_array() {
        let err = FilterCompiler::compile(
            &[FilterPredicate::new("tag", FilterOp::NotIn, json!([]))],
            None,
            1,
        )
        .unwrap_err();
        assert_eq!(err, SpecError::NotInRequiresArray);
    }

    #[test]
    fn test_unsupported_operator() {
        let err = FilterCompiler::compile(
            &[FilterPredicate::new("x", FilterOp::parse("like"), json!(1))],
            None,
            1,
        )
        .unwrap_err();
        assert_eq!(err, SpecError::UnsupportedOperator("like".into()));
    }

    #[test]
    fn test_geo_distance_appended_last() {
        let geo = GeoParameter::radius("location", 31.2, 121.5, 5.0, "km");
        let tree = FilterCompiler::compile(
            &[FilterPredicate::new("open", FilterOp::Eq, json!(true))],
            Some(&geo),
            1,
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&tree.must).unwrap(),
            json!([
                {"term": {"open": true}},
                {"geo_distance": {"distance": "5km", "location": {"lat": 31.2, "lon": 121.5}}}
            ])
        );
    }

    #[test]
    fn test_geo_distance_given_as_text() {
        let geo: GeoParameter = serde_json::from_value(json!({
            "attr": "location", "lat": 31.2, "lon": 121.5, "distance": "5", "unit": "km"
        }))
        .unwrap();
        let tree = FilterCompiler::compile(&[], Some(&geo), 1).unwrap();
        assert_eq!(
            serde_json::to_value(&tree.must).unwrap(),
            json!([{"geo_distance": {"distance": "5km", "location": {"lat": 31.2, "lon": 121.5}}}])
        );
    }

    #[test]
    fn test_geo_bounding_box() {
        let geo = GeoParameter::bounding_box("location", (40.0, -74.5), (39.5, -73.0));
        let tree = FilterCompiler::compile(&[], Some(&geo), 1).unwrap();
        assert_eq!(
            serde_json::to_value(&tree.must).unwrap(),
            json!([{"geo_bounding_box": {"location": {
                "top_left": {"lat": 40.0, "lon": -74.5},
                "bottom_right": {"lat": 39.5, "lon": -73.0}
            }}}])
        );
    }

    #[test]
    fn test_geo_missing_fields() {
        let mut geo = GeoParameter::radius("location", 1.0, 2.0, 5.0, "km");
        geo.unit = None;
        assert_eq!(
            FilterCompiler::compile(&[], Some(&geo), 1).unwrap_err(),
            SpecError::MissingGeoFields
        );

        let mut bbox = GeoParameter::bounding_box("location", (1.0, 2.0), (0.0, 3.0));
        bbox.right_bottom_lon = None;
        assert_eq!(
            FilterCompiler::compile(&[], Some(&bbox), 1).unwrap_err(),
            SpecError::MissingGeoFields
        );

        let mut no_attr = GeoParameter::radius("location", 1.0, 2.0, 5.0, "km");
        no_attr.attr = None;
        assert_eq!(
            FilterCompiler::compile(&[], Some(&no_attr), 1).unwrap_err(),
            SpecError::MissingGeoFields
        );
    }

    #[test]
    fn test_compile_is_deterministic() {
        let predicates = vec![
            FilterPredicate::new("age", FilterOp::Between, json!([18, 30])),
            FilterPredicate::new("tag", FilterOp::In, json!(["x", "y"])),
            FilterPredicate::new("state", FilterOp::Ne, json!("gone")),
        ];
        let geo = GeoParameter::radius("loc", 1.0, 2.0, 3.0, "mi");
        let first = serde_json::to_string(&FilterCompiler::compile(&predicates, Some(&geo), 1).unwrap()).unwrap();
        let second = serde_json::to_string(&FilterCompiler::compile(&predicates, Some(&geo), 1).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
