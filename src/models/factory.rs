//! Entity creation
//!
//! The relationship engine never builds vertices or edges itself; it asks
//! the [`EntityFactory`] selected for the target type. The default factory
//! turns the request into an `addV` / `addE` traversal and reads the created
//! element back through the scalar pipeline.

use std::sync::Arc;

use serde_json::Value;

use super::element::{Edge, Element, Identified, Vertex};
use super::element_type::ElementType;
use super::param::{Param, PropertyMap};
use crate::connection::dispatcher::QueryDispatcher;
use crate::connection::QueryOptions;
use crate::deferred::Deferred;
use crate::errors::{OgmError, Result};
use crate::gremlin::binder::{normalize, ParameterSet};
use crate::gremlin::pipeline;
use crate::models::element::GraphValue;

#[cfg_attr(test, mockall::automock)]
pub trait EntityFactory: Send + Sync {
    /// Create a vertex of `vertex_type` carrying `params` as properties.
    fn create_vertex(&self, vertex_type: &ElementType, params: PropertyMap) -> Deferred<Vertex>;

    /// Create an edge of `edge_type` from `out_v` to `in_v`.
    fn create_edge(
        &self,
        edge_type: &ElementType,
        out_v: &Vertex,
        in_v: &Vertex,
        params: PropertyMap,
    ) -> Deferred<Edge>;
}

/// Creates entities by dispatching traversals.
pub struct DispatchEntityFactory {
    dispatcher: Arc<QueryDispatcher>,
}

impl DispatchEntityFactory {
    pub fn new(dispatcher: Arc<QueryDispatcher>) -> Self {
        DispatchEntityFactory { dispatcher }
    }

    fn run(&self, script: String, bindings: ParameterSet) -> Result<Deferred<Element>> {
        let stream = self
            .dispatcher
            .dispatch(script, bindings, None, QueryOptions::default())?;
        Ok(pipeline::scalar(stream).map(|created| match created {
            Some(GraphValue::Element(element)) => Ok(element),
            Some(other) => Err(OgmError::Deserialization(format!(
                "creation returned a non-element result: {:?}",
                other
            ))),
            None => Err(OgmError::Deserialization(
                "creation returned no element".to_string(),
            )),
        }))
    }

    // Appends `.property(k0, v0)...` and binds each key/value pair.
    fn property_steps(
        &self,
        script: &mut String,
        bindings: &mut ParameterSet,
        params: PropertyMap,
    ) -> Result<()> {
        let codec = self.dispatcher.codec();
        for (i, (key, value)) in params.into_iter().enumerate() {
            if value.is_null() {
                continue;
            }
            let (k, v) = (format!("k{}", i), format!("v{}", i));
            script.push_str(&format!(".property({}, {})", k, v));
            bindings.insert(k, Value::String(key));
            bindings.insert(v, normalize(value, codec)?);
        }
        Ok(())
    }
}

impl EntityFactory for DispatchEntityFactory {
    fn create_vertex(&self, vertex_type: &ElementType, params: PropertyMap) -> Deferred<Vertex> {
        let mut script = "g.addV(vlabel)".to_string();
        let mut bindings = ParameterSet::new();
        bindings.insert("vlabel", Value::String(vertex_type.label().to_string()));

        let created = self
            .property_steps(&mut script, &mut bindings, params)
            .and_then(|_| self.run(script, bindings));
        match created {
            Ok(deferred) => deferred.map(Element::into_vertex),
            Err(e) => Deferred::failed(e),
        }
    }

    fn create_edge(
        &self,
        edge_type: &ElementType,
        out_v: &Vertex,
        in_v: &Vertex,
        params: PropertyMap,
    ) -> Deferred<Edge> {
        let mut script = "g.V(src).as('src').V(dst).addE(elabel).from('src')".to_string();
        let mut bindings = ParameterSet::new();
        bindings.insert("src", out_v.id().clone());
        bindings.insert("dst", in_v.id().clone());
        bindings.insert("elabel", Value::String(edge_type.label().to_string()));

        let created = self
            .property_steps(&mut script, &mut bindings, params)
            .and_then(|_| self.run(script, bindings));
        match created {
            Ok(deferred) => deferred.map(Element::into_edge),
            Err(e) => Deferred::failed(e),
        }
    }
}

/// Property map from `(name, value)` pairs.
pub fn properties<K, V, I>(pairs: I) -> PropertyMap
where
    K: Into<String>,
    V: Into<Param>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
