use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use gremgraph::gremlin::{DefaultValue, ParameterBinder};
use gremgraph::models::{Decimal, ElementType, Param, Vertex, WireCodec};
use gremgraph::BindingReason;
use serde_json::json;
use uuid::Uuid;

fn args(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_rich_parameters_are_normalised() {
    let declared = args(&["id", "since", "price", "token", "owner", "kind", "tags"]);
    let no_defaults: Vec<(String, DefaultValue)> = Vec::new();
    let binder = ParameterBinder {
        method: "search",
        args: &declared,
        defaults: &no_defaults,
        classmethod: false,
    };
    let token = Uuid::parse_str("6f1c8a52-2f7e-4c1b-9d3a-0e5b7c9d1f20").unwrap();
    let user = ElementType::vertex("PowerUser").build();
    let mut tags = BTreeMap::new();
    tags.insert("primary".to_string(), Param::from("rust"));

    let params = binder
        .bind(
            Some(&json!(7)),
            vec![
                Param::from(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
                Param::from(Decimal::parse("19.90").unwrap()),
                Param::from(token),
                Param::from(&Vertex::new("v1", "user")),
                Param::from(&user),
                Param::from(tags),
            ],
            Vec::new(),
            &WireCodec,
        )
        .unwrap();

    assert_eq!(
        params.as_map(),
        json!({
            "id": 7,
            "since": 1704164645.0,
            "price": "19.90",
            "token": "6f1c8a52-2f7e-4c1b-9d3a-0e5b7c9d1f20",
            "owner": "v1",
            "kind": "power_user",
            "tags": {"primary": "rust"}
        })
        .as_object()
        .unwrap()
    );
}

#[test]
fn test_producer_default_runs_per_bind() {
    let declared = args(&["created"]);
    let defaults = vec![(
        "created".to_string(),
        DefaultValue::Producer(std::sync::Arc::new(|| Param::from("now"))),
    )];
    let binder = ParameterBinder {
        method: "touch",
        args: &declared,
        defaults: &defaults,
        classmethod: true,
    };

    let params = binder.bind(None, Vec::new(), Vec::new(), &WireCodec).unwrap();
    assert_eq!(params.get("created"), Some(&json!("now")));
}

#[test]
fn test_keyword_for_positional_slot_is_duplicate() {
    let declared = args(&["id", "limit"]);
    let no_defaults: Vec<(String, DefaultValue)> = Vec::new();
    let binder = ParameterBinder {
        method: "friends",
        args: &declared,
        defaults: &no_defaults,
        classmethod: false,
    };

    let err = binder
        .bind(
            Some(&json!(1)),
            Vec::new(),
            vec![("id".to_string(), Param::from(2))],
            &WireCodec,
        )
        .unwrap_err();
    assert_eq!(
        err.binding_reason(),
        Some(&BindingReason::Duplicate("id".to_string()))
    );

    let err = binder
        .bind(
            Some(&json!(1)),
            Vec::new(),
            vec![("depth".to_string(), Param::from(2))],
            &WireCodec,
        )
        .unwrap_err();
    assert_eq!(
        err.binding_reason(),
        Some(&BindingReason::Unexpected("depth".to_string()))
    );
    assert_eq!(
        err.to_string(),
        "friends() got an unexpected keyword argument 'depth'"
    );
}
