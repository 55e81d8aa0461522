//! Sort directives to the `sort` array

use crate::error::SpecError;
use crate::query::types::{FieldSort, GeoDistanceSort, GeoPoint, Script, ScriptSort, SortClause};
use crate::spec::{DynamicSort, GeoSort, PublicSort, SortDirective};
use std::collections::BTreeMap;

pub struct SortCompiler;

impl SortCompiler {
    /// Compile directives in caller order. Any invalid directive aborts the
    /// whole compile; no partial sort array is produced.
    pub fn compile(directives: &[SortDirective]) -> Result<Vec<SortClause>, SpecError> {
        directives
            .iter()
            .map(|directive| match directive {
                SortDirective::Public(public) => Ok(Self::field(public)),
                SortDirective::Dynamic(dynamic) => Self::script(dynamic),
                SortDirective::Geo(geo) => Self::geo_distance(geo),
            })
            .collect()
    }

    fn field(public: &PublicSort) -> SortClause {
        SortClause::Field(BTreeMap::from([(
            public.sort_field.clone(),
            FieldSort {
                order: public.order.to_lowercase(),
                ignore_unmapped: true,
            },
        )]))
    }

    fn script(dynamic: &DynamicSort) -> Result<SortClause, SpecError> {
        let inline = dynamic
            .script
            .clone()
            .ok_or(SpecError::DynamicSortMissingScript)?;

        Ok(SortClause::Script {
            script: ScriptSort {
                sort_type: "number".to_string(),
                script: Script {
                    inline,
                    params: dynamic.params.clone().filter(|p| !p.is_empty()),
                },
                order: dynamic.order.clone().unwrap_or_else(|| "asc".to_string()),
            },
        })
    }

    fn geo_distance(geo: &GeoSort) -> Result<SortClause, SpecError> {
        let (Some(attr), Some(lat), Some(lon), Some(unit)) =
            (geo.attr.as_deref(), geo.lat, geo.lon, geo.unit.as_deref())
        else {
            return Err(SpecError::GeoSortMissingFields);
        };

        Ok(SortClause::GeoDistance {
            geo_distance: GeoDistanceSort {
                order: geo.sort.clone().unwrap_or_else(|| "asc".to_string()),
                unit: unit.to_string(),
                point: BTreeMap::from([(attr.to_string(), GeoPoint { lat, lon })]),
                distance_type: "sloppy_arc".to_string(),
                mode: "min".to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn compile(directives: Value) -> Result<Value, SpecError> {
        let directives: Vec<SortDirective> = serde_json::from_value(directives).unwrap();
        SortCompiler::compile(&directives).map(|s| serde_json::to_value(s).unwrap())
    }

    #[test]
    fn test_public_order_lowercased() {
        let out = compile(json!([{"public": {"sortField": "price", "order": "DESC"}}])).unwrap();
        assert_eq!(out, json!([{"price": {"order": "desc", "ignore_unmapped": true}}]));
    }

    #[test]
    fn test_dynamic_with_params() {
        let out = compile(json!([{"dynamic": {
            "script": "doc['price'].value * factor",
            "order": "desc",
            "params": {"factor": 2}
        }}]))
        .unwrap();
        assert_eq!(
            out,
            json!([{"_script": {
                "type": "number",
                "script": {"inline": "doc['price'].value * factor", "params": {"factor": 2}},
                "order": "desc"
            }}])
        );
    }

    #[test]
    fn test_dynamic_empty_params_omitted() {
        let out = compile(json!([{"dynamic": {"script": "1", "params": {}}}])).unwrap();
        assert_eq!(out[0]["_script"]["script"], json!({"inline": "1"}));
        assert_eq!(out[0]["_script"]["order"], "asc");
    }

    #[test]
    fn test_dynamic_missing_script() {
        let err = compile(json!([{"dynamic": {"order": "asc"}}])).unwrap_err();
        assert_eq!(err, SpecError::DynamicSortMissingScript);
    }

    #[test]
    fn test_geo_distance_sort() {
        let out = compile(json!([{"geo": {
            "attr": "location", "lat": 31.0, "lon": 121.0, "unit": "km"
        }}]))
        .unwrap();
        assert_eq!(
            out,
            json!([{"_geo_distance": {
                "order": "asc",
                "unit": "km",
                "location": {"lat": 31.0, "lon": 121.0},
                "distance_type": "sloppy_arc",
                "mode": "min"
            }}])
        );
    }

    #[test]
    fn test_geo_missing_fields_aborts_everything() {
        let err = compile(json!([
            {"public": {"sortField": "price", "order": "asc"}},
            {"geo": {"attr": "location", "lat": 31.0, "unit": "km"}}
        ]))
        .unwrap_err();
        assert_eq!(err, SpecError::GeoSortMissingFields);
    }

    #[test]
    fn test_order_preserved() {
        let out = compile(json!([
            {"geo": {"attr": "loc", "lat": 1.0, "lon": 2.0, "unit": "m", "sort": "desc"}},
            {"public": {"sortField": "b", "order": "asc"}},
            {"public": {"sortField": "a", "order": "asc"}}
        ]))
        .unwrap();
        assert!(out[0].get("_geo_distance").is_some());
        assert!(out[1].get("b").is_some());
        assert!(out[2].get("a").is_some());
        assert_eq!(out[0]["_geo_distance"]["order"], "desc");
    }
}
