//! Parameter binding
//!
//! Maps a call's positional and keyword arguments onto the argument names a
//! query function declares, then reduces every value to a wire primitive.
//! Binding happens synchronously, before anything is dispatched, so every
//! failure here is an immediate `Err`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::connection::QueryOptions;
use crate::errors::{BindingReason, OgmError, Result};
use crate::models::codec::PropertyCodec;
use crate::models::element::Identified;
use crate::models::param::Param;

/// Bound query parameters, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterSet(Map<String, Value>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// A default for an argument the caller may leave out.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Param),
    /// Evaluated anew on every call.
    Producer(Arc<dyn Fn() -> Param + Send + Sync>),
}

impl DefaultValue {
    fn produce(&self) -> Param {
        match self {
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Producer(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Arguments of one query-method call.
#[derive(Debug, Clone, Default)]
pub struct Call {
    pub positional: Vec<Param>,
    /// Keyword arguments in caller order.
    pub keywords: Vec<(String, Param)>,
    pub options: QueryOptions,
}

impl Call {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Param>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Param>) -> Self {
        self.keywords.push((name.into(), value.into()));
        self
    }

    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }
}

pub struct ParameterBinder<'a> {
    /// Attribute name used in error messages.
    pub method: &'a str,
    pub args: &'a [String],
    pub defaults: &'a [(String, DefaultValue)],
    /// Class-level methods take no implicit instance id.
    pub classmethod: bool,
}

impl ParameterBinder<'_> {
    pub fn bind(
        &self,
        instance: Option<&Value>,
        positional: Vec<Param>,
        keywords: Vec<(String, Param)>,
        codec: &dyn PropertyCodec,
    ) -> Result<ParameterSet> {
        let mut positional = positional;
        if !self.classmethod {
            match instance {
                Some(id) => positional.insert(0, Param::Value(id.clone())),
                None => {
                    let first = self.args.first().map(String::as_str).unwrap_or("id");
                    return Err(self.error(BindingReason::Missing(first.to_string())));
                }
            }
        }

        let given = positional.len() + keywords.len();
        if given > self.args.len() {
            return Err(self.error(BindingReason::TooMany {
                expected: self.args.len(),
                given,
            }));
        }

        let mut bound: HashMap<&str, Param> = self
            .defaults
            .iter()
            .map(|(name, default)| (name.as_str(), default.produce()))
            .collect();

        let mut remaining: Vec<&str> = self.args.iter().map(String::as_str).collect();
        for value in positional {
            let name = remaining.remove(0);
            bound.insert(name, value);
        }

        for (name, value) in keywords {
            match remaining.iter().position(|r| *r == name) {
                Some(i) => {
                    let declared = remaining.remove(i);
                    bound.insert(declared, value);
                }
                // Filled positionally, or by a default outside the arg list.
                None if bound.contains_key(name.as_str())
                    || self.args.iter().any(|arg| *arg == name) =>
                {
                    return Err(self.error(BindingReason::Duplicate(name)))
                }
                None => return Err(self.error(BindingReason::Unexpected(name))),
            }
        }

        if let Some(missing) = remaining.iter().find(|name| !bound.contains_key(*name)) {
            return Err(self.error(BindingReason::Missing(missing.to_string())));
        }

        let mut params = ParameterSet::new();
        for name in self.args {
            if let Some(value) = bound.remove(name.as_str()) {
                params.insert(name.clone(), normalize(value, codec)?);
            }
        }
        // Defaults naming no declared argument still travel with the query.
        for (name, _) in self.defaults {
            if let Some(value) = bound.remove(name.as_str()) {
                params.insert(name.clone(), normalize(value, codec)?);
            }
        }
        Ok(params)
    }

    fn error(&self, reason: BindingReason) -> OgmError {
        OgmError::binding(self.method, reason)
    }
}

/// Reduce a parameter to wire primitives.
pub fn normalize(param: Param, codec: &dyn PropertyCodec) -> Result<Value> {
    match param {
        Param::Value(v) => Ok(v),
        Param::List(items) => items
            .into_iter()
            .map(|item| normalize(item, codec))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Param::Map(entries) => entries
            .into_iter()
            .map(|(k, v)| normalize(v, codec).map(|v| (k, v)))
            .collect::<Result<Map<_, _>>>()
            .map(Value::Object),
        Param::Entity(element) => Ok(element.id().clone()),
        Param::Type(element_type) => Ok(Value::String(element_type.label().to_string())),
        Param::DateTime(when) => codec.datetime_to_wire(&when),
        Param::Decimal(decimal) => codec.decimal_to_wire(&decimal),
        Param::Uuid(id) => codec.uuid_to_wire(&id),
    }
}
