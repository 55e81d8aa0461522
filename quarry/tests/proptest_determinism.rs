//! Property tests: compiling the same specification twice yields
//! byte-identical documents, whatever the filters and sort directives are.

use proptest::prelude::*;
use quarry::compile::{QueryAssembler, SearchMode};
use quarry::QuerySpecification;
use serde_json::{json, Value};

fn field() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn filter() -> impl Strategy<Value = Value> {
    prop_oneof![
        (field(), any::<i32>()).prop_map(|(f, v)| json!({"field": f, "type": "=", "value": v})),
        (field(), any::<i32>()).prop_map(|(f, v)| json!({"field": f, "type": "!=", "value": v})),
        (field(), any::<i32>()).prop_map(|(f, v)| json!({"field": f, "type": ">", "value": v})),
        (field(), any::<i32>(), any::<i32>())
            .prop_map(|(f, a, b)| json!({"field": f, "type": "between", "value": [a, b]})),
        (field(), prop::collection::vec(any::<i32>(), 1..4))
            .prop_map(|(f, v)| json!({"field": f, "type": "in", "value": v})),
        (field(), prop::collection::vec(field(), 1..4))
            .prop_map(|(f, v)| json!({"field": f, "type": "not in", "value": v})),
    ]
}

fn sort() -> impl Strategy<Value = Value> {
    prop_oneof![
        (field(), prop_oneof![Just("ASC"), Just("desc")])
            .prop_map(|(f, o)| json!({"public": {"sortField": f, "order": o}})),
        (-90.0f64..90.0, -180.0f64..180.0)
            .prop_map(|(lat, lon)| json!({"geo": {"attr": "loc", "lat": lat, "lon": lon, "unit": "km"}})),
    ]
}

fn specification() -> impl Strategy<Value = Value> {
    (
        prop::collection::vec(filter(), 0..6),
        prop::collection::vec(sort(), 0..3),
        prop::option::of("[a-z]{1,10}"),
        prop::option::of(prop::collection::vec(field(), 1..4)),
        0u64..100,
    )
        .prop_map(|(filters, sort, keyword, agg, size)| {
            let mut spec = json!({
                "index": "idx",
                "type": "doc",
                "filters": filters,
                "sort": sort,
                "size": size,
                "minNum": 1
            });
            if let Some(keyword) = keyword {
                spec["keyword"] = json!(keyword);
            }
            if let Some(columns) = agg {
                spec["needGroupBy"] = json!(true);
                spec["aggColumns"] = columns
                    .iter()
                    .map(|c| json!({"aggColumns": c}))
                    .collect::<Vec<_>>()
                    .into();
            }
            spec
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_compile_is_deterministic(raw in specification()) {
        let spec = QuerySpecification::from_json(raw.clone()).unwrap();
        let again = QuerySpecification::from_json(raw).unwrap();

        for mode in [SearchMode::Plain, SearchMode::MultiKeyword] {
            let first = serde_json::to_string(&QueryAssembler::assemble(&spec, mode).unwrap()).unwrap();
            let second = serde_json::to_string(&QueryAssembler::assemble(&again, mode).unwrap()).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn test_public_sort_always_lowercase(raw in specification()) {
        let spec = QuerySpecification::from_json(raw).unwrap();
        let body = serde_json::to_value(QueryAssembler::assemble(&spec, SearchMode::Plain).unwrap()).unwrap();
        for clause in body["sort"].as_array().into_iter().flatten() {
            for (key, sort) in clause.as_object().unwrap() {
                if key != "_geo_distance" && key != "_script" {
                    let order = sort["order"].as_str().unwrap();
                    prop_assert_eq!(order, order.to_lowercase());
                }
            }
        }
    }
}
