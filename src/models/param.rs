//! Call argument values
//!
//! [`Param`] is what callers hand to a query method or entity factory.
//! Besides plain JSON values it can carry things the wire cannot express
//! directly (graph elements, element types, date/times, decimals, UUIDs);
//! [`normalize`](crate::gremlin::binder::normalize) reduces those to wire
//! primitives before dispatch.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

use super::element::{Edge, Element, Vertex};
use super::element_type::ElementType;
use crate::errors::{OgmError, Result};

lazy_static! {
    static ref DECIMAL_LITERAL: Regex =
        Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("valid decimal regex");
}

/// Named entity parameters (vertex/edge properties).
pub type PropertyMap = BTreeMap<String, Param>;

/// An exact decimal number kept in its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal(String);

impl Decimal {
    /// Parse a decimal literal such as `1.00`, `-3`, `.5` or `2e10`.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if DECIMAL_LITERAL.is_match(trimmed) {
            Ok(Decimal(trimmed.to_string()))
        } else {
            Err(OgmError::Codec(format!("'{}' is not a decimal literal", text)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A query or entity parameter before normalisation.
#[derive(Debug, Clone)]
pub enum Param {
    /// Any JSON value; passed through unchanged.
    Value(Value),
    List(Vec<Param>),
    Map(BTreeMap<String, Param>),
    /// A graph element; sent as its id.
    Entity(Element),
    /// An element type; sent as its label.
    Type(Arc<ElementType>),
    DateTime(DateTime<Utc>),
    Decimal(Decimal),
    Uuid(Uuid),
}

impl Param {
    pub fn null() -> Self {
        Param::Value(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Param::Value(Value::Null))
    }

    /// The text of a plain string parameter.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Param::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for Param {
    fn from(value: Value) -> Self {
        Param::Value(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Value(Value::String(value))
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Value(Value::Bool(value))
    }
}

impl From<i32> for Param {
    fn from(value: i32) -> Self {
        Param::Value(Value::from(value))
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Value(Value::from(value))
    }
}

impl From<u64> for Param {
    fn from(value: u64) -> Self {
        Param::Value(Value::from(value))
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        // Non-finite floats have no JSON form and become null, as in serde_json.
        Param::Value(Value::from(value))
    }
}

impl From<Uuid> for Param {
    fn from(value: Uuid) -> Self {
        Param::Uuid(value)
    }
}

impl From<DateTime<Utc>> for Param {
    fn from(value: DateTime<Utc>) -> Self {
        Param::DateTime(value)
    }
}

impl From<NaiveDateTime> for Param {
    fn from(value: NaiveDateTime) -> Self {
        Param::DateTime(value.and_utc())
    }
}

impl From<Decimal> for Param {
    fn from(value: Decimal) -> Self {
        Param::Decimal(value)
    }
}

impl From<&Vertex> for Param {
    fn from(value: &Vertex) -> Self {
        Param::Entity(Element::Vertex(value.clone()))
    }
}

impl From<&Edge> for Param {
    fn from(value: &Edge) -> Self {
        Param::Entity(Element::Edge(value.clone()))
    }
}

impl From<Element> for Param {
    fn from(value: Element) -> Self {
        Param::Entity(value)
    }
}

impl From<&Arc<ElementType>> for Param {
    fn from(value: &Arc<ElementType>) -> Self {
        Param::Type(Arc::clone(value))
    }
}

impl<T: Into<Param>> From<Vec<T>> for Param {
    fn from(values: Vec<T>) -> Self {
        Param::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_else(Param::null)
    }
}

impl<T: Into<Param>> From<BTreeMap<String, T>> for Param {
    fn from(values: BTreeMap<String, T>) -> Self {
        Param::Map(values.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}
