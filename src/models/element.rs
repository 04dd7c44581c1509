//! Graph elements returned by the server
//!
//! Any wire mapping carrying both an `id` and a `type` marker is a graph
//! element. The server sends GraphSON-shaped objects:
//!
//! ```text
//! {"id": 1, "type": "vertex", "label": "user",
//!  "properties": {"name": [{"id": 7, "value": "Alice"}]}}
//!
//! {"id": 9, "type": "edge", "label": "follows", "outV": 1, "inV": 2,
//!  "properties": {"since": 2014}}
//! ```
//!
//! Vertex properties arrive as lists of vertex-property objects; a single
//! value collapses to that value, several to a list of values.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::codec::PropertyCodec;
use super::param::Decimal;
use crate::errors::{OgmError, Result};

/// Anything with a server-assigned identity.
pub trait Identified {
    fn id(&self) -> &Value;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: Value,
    pub label: String,
    pub properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: Value,
    pub label: String,
    /// Id of the source vertex.
    pub out_v: Value,
    /// Id of the target vertex.
    pub in_v: Value,
    pub out_v_label: Option<String>,
    pub in_v_label: Option<String>,
    pub properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Vertex(Vertex),
    Edge(Edge),
}

impl Vertex {
    pub fn new(id: impl Into<Value>, label: impl Into<String>) -> Self {
        Vertex {
            id: id.into(),
            label: label.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

impl Edge {
    pub fn new(
        id: impl Into<Value>,
        label: impl Into<String>,
        out_v: impl Into<Value>,
        in_v: impl Into<Value>,
    ) -> Self {
        Edge {
            id: id.into(),
            label: label.into(),
            out_v: out_v.into(),
            in_v: in_v.into(),
            out_v_label: None,
            in_v_label: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

impl Identified for Vertex {
    fn id(&self) -> &Value {
        &self.id
    }
}

impl Identified for Edge {
    fn id(&self) -> &Value {
        &self.id
    }
}

impl Identified for Element {
    fn id(&self) -> &Value {
        match self {
            Element::Vertex(v) => &v.id,
            Element::Edge(e) => &e.id,
        }
    }
}

impl Element {
    /// True when `value` is a mapping with both an identity and a type marker.
    pub fn is_element_mapping(value: &Map<String, Value>) -> bool {
        value.contains_key("id") && value.contains_key("type")
    }

    /// Build a typed element from its wire mapping.
    pub fn from_wire(mut value: Map<String, Value>) -> Result<Element> {
        let id = value
            .remove("id")
            .ok_or_else(|| OgmError::Deserialization("element without 'id'".to_string()))?;
        let kind = match value.remove("type") {
            Some(Value::String(kind)) => kind,
            other => {
                return Err(OgmError::Deserialization(format!(
                    "element {} has a non-text type marker: {:?}",
                    id, other
                )))
            }
        };
        let label = match value.remove("label") {
            Some(Value::String(label)) => label,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        match kind.as_str() {
            "vertex" => Ok(Element::Vertex(Vertex {
                id,
                label,
                properties: vertex_properties(value.remove("properties"))?,
            })),
            "edge" => {
                let out_v = value.remove("outV").ok_or_else(|| {
                    OgmError::Deserialization(format!("edge {} without 'outV'", id))
                })?;
                let in_v = value.remove("inV").ok_or_else(|| {
                    OgmError::Deserialization(format!("edge {} without 'inV'", id))
                })?;
                Ok(Element::Edge(Edge {
                    id,
                    label,
                    out_v,
                    in_v,
                    out_v_label: text_field(value.remove("outVLabel")),
                    in_v_label: text_field(value.remove("inVLabel")),
                    properties: edge_properties(value.remove("properties"))?,
                }))
            }
            other => Err(OgmError::Deserialization(format!(
                "unknown element type '{}' for element {}",
                other, id
            ))),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Element::Vertex(v) => &v.label,
            Element::Edge(e) => &e.label,
        }
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        match self {
            Element::Vertex(v) => &v.properties,
            Element::Edge(e) => &e.properties,
        }
    }

    pub fn into_vertex(self) -> Result<Vertex> {
        match self {
            Element::Vertex(v) => Ok(v),
            Element::Edge(e) => Err(OgmError::Deserialization(format!(
                "expected a vertex, got edge {}",
                e.id
            ))),
        }
    }

    pub fn into_edge(self) -> Result<Edge> {
        match self {
            Element::Edge(e) => Ok(e),
            Element::Vertex(v) => Err(OgmError::Deserialization(format!(
                "expected an edge, got vertex {}",
                v.id
            ))),
        }
    }

    /// Decode a date/time property through `codec`.
    pub fn datetime(&self, key: &str, codec: &dyn PropertyCodec) -> Result<Option<DateTime<Utc>>> {
        self.decode(key, |v| codec.datetime_from_wire(v))
    }

    /// Decode a decimal property through `codec`.
    pub fn decimal(&self, key: &str, codec: &dyn PropertyCodec) -> Result<Option<Decimal>> {
        self.decode(key, |v| codec.decimal_from_wire(v))
    }

    /// Decode a UUID property through `codec`.
    pub fn uuid(&self, key: &str, codec: &dyn PropertyCodec) -> Result<Option<Uuid>> {
        self.decode(key, |v| codec.uuid_from_wire(v))
    }

    fn decode<T>(&self, key: &str, decode: impl FnOnce(&Value) -> Result<T>) -> Result<Option<T>> {
        match self.properties().get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => decode(value).map(Some),
        }
    }
}

fn text_field(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn edge_properties(value: Option<Value>) -> Result<BTreeMap<String, Value>> {
    match value {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => Ok(map.into_iter().collect()),
        Some(other) => Err(OgmError::Deserialization(format!(
            "element properties must be a mapping, got {}",
            other
        ))),
    }
}

fn vertex_properties(value: Option<Value>) -> Result<BTreeMap<String, Value>> {
    let properties = edge_properties(value)?;
    Ok(properties
        .into_iter()
        .map(|(key, value)| (key, collapse_vertex_property(value)))
        .collect())
}

// [{"id": .., "value": x}] -> x ; several entries -> [x, y, ..]
fn collapse_vertex_property(value: Value) -> Value {
    match value {
        Value::Array(entries)
            if !entries.is_empty()
                && entries
                    .iter()
                    .all(|e| e.as_object().is_some_and(|m| m.contains_key("value"))) =>
        {
            let mut values: Vec<Value> = entries
                .into_iter()
                .filter_map(|e| match e {
                    Value::Object(mut m) => m.remove("value"),
                    _ => None,
                })
                .collect();
            if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            }
        }
        other => other,
    }
}

/// A deserialized query result.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphValue {
    Element(Element),
    List(Vec<GraphValue>),
    Map(BTreeMap<String, GraphValue>),
    /// Null, boolean, number or string.
    Scalar(Value),
}

impl GraphValue {
    /// Recursively turn wire values into graph values: element mappings
    /// become typed elements, other mappings and sequences are processed
    /// element-wise, everything else passes through.
    pub fn from_wire(value: Value) -> Result<GraphValue> {
        match value {
            Value::Object(map) if Element::is_element_mapping(&map) => {
                Element::from_wire(map).map(GraphValue::Element)
            }
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| GraphValue::from_wire(v).map(|v| (k, v)))
                .collect::<Result<BTreeMap<_, _>>>()
                .map(GraphValue::Map),
            Value::Array(items) => items
                .into_iter()
                .map(GraphValue::from_wire)
                .collect::<Result<Vec<_>>>()
                .map(GraphValue::List),
            scalar => Ok(GraphValue::Scalar(scalar)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, GraphValue::Scalar(Value::Null))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            GraphValue::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            GraphValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_element(self) -> Result<Element> {
        match self {
            GraphValue::Element(e) => Ok(e),
            other => Err(OgmError::Deserialization(format!(
                "expected a graph element, got {:?}",
                other
            ))),
        }
    }
}
