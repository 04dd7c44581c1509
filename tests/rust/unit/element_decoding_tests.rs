use gremgraph::models::{Element, GraphValue, WireCodec};
use gremgraph::OgmError;
use serde_json::json;

#[test]
fn test_path_like_result_mixes_elements_and_scalars() {
    let result = GraphValue::from_wire(json!([
        {
            "user": {"id": 1, "label": "user", "type": "vertex",
                     "properties": {"joined": [{"id": 10, "value": 1704164645.0}]}},
            "via": {"id": "e7", "label": "follows", "type": "edge",
                    "outV": 1, "inV": 2, "outVLabel": "user", "inVLabel": "user"},
            "weight": 0.5
        }
    ]))
    .unwrap();

    let GraphValue::List(rows) = result else {
        panic!("expected a list");
    };
    let GraphValue::Map(row) = &rows[0] else {
        panic!("expected a mapping");
    };

    let user = row["user"].as_element().unwrap();
    assert_eq!(user.label(), "user");
    let joined = user.datetime("joined", &WireCodec).unwrap().unwrap();
    assert_eq!(joined.timestamp(), 1704164645);
    assert_eq!(user.datetime("missing", &WireCodec).unwrap(), None);

    let edge = row["via"].as_element().cloned().unwrap().into_edge().unwrap();
    assert_eq!(edge.out_v, json!(1));
    assert_eq!(edge.in_v_label.as_deref(), Some("user"));
    assert_eq!(row["weight"].as_scalar(), Some(&json!(0.5)));
}

#[test]
fn test_multi_valued_vertex_property_becomes_list() {
    let element = GraphValue::from_wire(json!({
        "id": 3, "label": "user", "type": "vertex",
        "properties": {"alias": [{"id": 1, "value": "a"}, {"id": 2, "value": "b"}]}
    }))
    .unwrap()
    .into_element()
    .unwrap();
    assert_eq!(element.properties()["alias"], json!(["a", "b"]));
}

#[test]
fn test_edge_without_endpoints_is_rejected() {
    let err = GraphValue::from_wire(json!({"id": 1, "label": "x", "type": "edge"})).unwrap_err();
    assert!(matches!(err, OgmError::Deserialization(_)));
}

#[test]
fn test_wrong_kind_conversion() {
    let element = GraphValue::from_wire(json!({"id": 1, "label": "user", "type": "vertex"}))
        .unwrap()
        .into_element()
        .unwrap();
    assert!(matches!(element, Element::Vertex(_)));
    assert!(element.into_edge().is_err());
}
