//! Relationship schemas
//!
//! A [`RelationshipSchema`] declares which edge types may connect its owning
//! vertex to which vertex types, and in which direction. Once bound to a
//! concrete vertex it can read the related edges and vertices and create a
//! new related vertex together with the connecting edge.
//!
//! Creation is two-phase: the vertex first, then the edge. If the edge
//! fails the new vertex stays in the graph; the failure is logged with its
//! id and delivered through the returned deferred.

use std::sync::{Arc, OnceLock};

use serde_json::Value;

use super::Direction;
use crate::connection::dispatcher::QueryDispatcher;
use crate::connection::QueryOptions;
use crate::deferred::Deferred;
use crate::errors::{OgmError, Result};
use crate::gremlin::binder::ParameterSet;
use crate::gremlin::pipeline;
use crate::models::element::{Edge, Element, GraphValue, Identified, Vertex};
use crate::models::element_type::{ElementKind, ElementType, TypeRef, TypeRegistry};
use crate::models::param::{Param, PropertyMap};

#[derive(Debug)]
struct AllowedTypes {
    edges: Vec<Arc<ElementType>>,
    vertices: Vec<Arc<ElementType>>,
}

#[derive(Debug, Clone)]
pub struct RelationshipSchema {
    direction: Direction,
    edge_refs: Vec<TypeRef>,
    vertex_refs: Vec<TypeRef>,
    registry: Arc<TypeRegistry>,
    // Shared by every copy of one declaration.
    allowed: Arc<OnceLock<AllowedTypes>>,
    owner: OnceLock<Vertex>,
}

/// Parameters of [`RelationshipSchema::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub edge_params: PropertyMap,
    pub vertex_params: PropertyMap,
    /// Defaults to the first declared edge type.
    pub edge_type: Option<TypeRef>,
    /// Defaults to the first declared vertex type.
    pub vertex_type: Option<TypeRef>,
}

impl CreateRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edge_param(mut self, name: impl Into<String>, value: impl Into<Param>) -> Self {
        self.edge_params.insert(name.into(), value.into());
        self
    }

    pub fn vertex_param(mut self, name: impl Into<String>, value: impl Into<Param>) -> Self {
        self.vertex_params.insert(name.into(), value.into());
        self
    }

    pub fn edge_type(mut self, edge_type: impl Into<TypeRef>) -> Self {
        self.edge_type = Some(edge_type.into());
        self
    }

    pub fn vertex_type(mut self, vertex_type: impl Into<TypeRef>) -> Self {
        self.vertex_type = Some(vertex_type.into());
        self
    }
}

impl RelationshipSchema {
    pub fn new<E, V>(
        direction: Direction,
        edge_types: E,
        vertex_types: V,
        registry: Arc<TypeRegistry>,
    ) -> Self
    where
        E: IntoIterator,
        E::Item: Into<TypeRef>,
        V: IntoIterator,
        V::Item: Into<TypeRef>,
    {
        RelationshipSchema {
            direction,
            edge_refs: edge_types.into_iter().map(Into::into).collect(),
            vertex_refs: vertex_types.into_iter().map(Into::into).collect(),
            registry,
            allowed: Arc::new(OnceLock::new()),
            owner: OnceLock::new(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn owner(&self) -> Option<&Vertex> {
        self.owner.get()
    }

    /// Attach the owning vertex. Binding again to the same vertex is a
    /// no-op; binding to another one fails.
    pub fn bind(&self, vertex: Vertex) -> Result<()> {
        let id = vertex.id.clone();
        match self.owner.set(vertex) {
            Ok(()) => Ok(()),
            Err(_) if self.owner.get().map(|v| &v.id) == Some(&id) => Ok(()),
            Err(_) => Err(OgmError::Relationship(format!(
                "already bound to vertex {}, cannot bind to {}",
                self.owner.get().map(|v| v.id.to_string()).unwrap_or_default(),
                id
            ))),
        }
    }

    /// A copy of this declaration bound to `vertex`.
    pub fn for_vertex(&self, vertex: Vertex) -> RelationshipSchema {
        let owner = OnceLock::new();
        let _ = owner.set(vertex);
        RelationshipSchema {
            owner,
            ..self.clone()
        }
    }

    /// True when both types are among the declared ones.
    pub fn allowed(&self, edge_type: &ElementType, vertex_type: &ElementType) -> bool {
        match self.allowed_types() {
            Ok(allowed) => {
                allowed.edges.iter().any(|e| **e == *edge_type)
                    && allowed.vertices.iter().any(|v| **v == *vertex_type)
            }
            Err(e) => {
                log::warn!("Relationship types could not be resolved: {}", e);
                false
            }
        }
    }

    /// Edges between the owner and vertices of the declared types.
    pub fn edges(
        &self,
        dispatcher: &QueryDispatcher,
        limit: Option<u64>,
    ) -> Result<Deferred<Vec<Edge>>> {
        let owner = self.require_owner()?;
        let allowed = self.allowed_types()?;
        let (mut script, mut bindings) = self.edge_traversal(owner, allowed);
        append_limit(&mut script, &mut bindings, limit);

        let stream = dispatcher.dispatch(script, bindings, None, QueryOptions::default())?;
        Ok(pipeline::elements(stream).map(|result| collect_elements(result, Element::into_edge)))
    }

    /// Vertices at the far end of the declared edges.
    pub fn vertices(
        &self,
        dispatcher: &QueryDispatcher,
        limit: Option<u64>,
    ) -> Result<Deferred<Vec<Vertex>>> {
        let owner = self.require_owner()?;
        let allowed = self.allowed_types()?;
        let (mut script, mut bindings) = self.edge_traversal(owner, allowed);
        script.push_str(&format!(
            ".{}().hasLabel(*vlabels)",
            self.direction.vertex_step()
        ));
        bindings.insert("vlabels", labels(&allowed.vertices));
        append_limit(&mut script, &mut bindings, limit);

        let stream = dispatcher.dispatch(script, bindings, None, QueryOptions::default())?;
        Ok(pipeline::elements(stream).map(|result| collect_elements(result, Element::into_vertex)))
    }

    /// Create a related vertex and the edge joining it to the owner,
    /// resolving to `(edge, vertex)`.
    pub fn create(&self, request: CreateRequest) -> Result<Deferred<(Edge, Vertex)>> {
        self.create_with(request, |edge, vertex| Ok((edge, vertex)))
    }

    /// As [`create`](Self::create), passing the created pair through
    /// `transform`.
    pub fn create_with<T, F>(&self, request: CreateRequest, transform: F) -> Result<Deferred<T>>
    where
        T: Send + 'static,
        F: FnOnce(Edge, Vertex) -> Result<T> + Send + 'static,
    {
        let owner = self.require_owner()?.clone();
        let allowed = self.allowed_types()?;

        let edge_type = match &request.edge_type {
            Some(r) => r.resolve(&self.registry)?,
            None => first_declared(&allowed.edges, "edge")?,
        };
        let vertex_type = match &request.vertex_type {
            Some(r) => r.resolve(&self.registry)?,
            None => first_declared(&allowed.vertices, "vertex")?,
        };
        if !self.allowed(&edge_type, &vertex_type) {
            return Err(OgmError::SchemaViolation {
                edge: edge_type.name().to_string(),
                direction: self.direction.to_string(),
                vertex: vertex_type.name().to_string(),
            });
        }

        let vertex_factory = self.registry.factory_for(&vertex_type)?;
        let edge_factory = self.registry.factory_for(&edge_type)?;
        let direction = self.direction;
        let CreateRequest {
            edge_params,
            vertex_params,
            ..
        } = request;

        log::debug!(
            "Creating {} vertex related to {} via {} ({})",
            vertex_type.name(),
            owner.id,
            edge_type.name(),
            direction
        );
        let created = vertex_factory
            .create_vertex(&vertex_type, vertex_params)
            .and_then(move |vertex| {
                let (out_v, in_v) = match direction {
                    Direction::In => (&vertex, &owner),
                    Direction::Out | Direction::Both => (&owner, &vertex),
                };
                let orphan = vertex.id.clone();
                let edge = edge_factory
                    .create_edge(&edge_type, out_v, in_v, edge_params)
                    .map_err(move |e| {
                        log::warn!(
                            "Edge creation failed, vertex {} was left in place: {}",
                            orphan,
                            e
                        );
                        e
                    });
                edge.map(move |edge| transform(edge, vertex))
            });
        Ok(created)
    }

    fn require_owner(&self) -> Result<&Vertex> {
        self.owner
            .get()
            .ok_or_else(|| OgmError::Relationship("no vertex instantiated".to_string()))
    }

    fn allowed_types(&self) -> Result<&AllowedTypes> {
        if let Some(allowed) = self.allowed.get() {
            return Ok(allowed);
        }
        // Concurrent first uses compute the same sets; the first one stored wins.
        let resolved = AllowedTypes {
            edges: self.resolve_refs(&self.edge_refs, ElementKind::Edge)?,
            vertices: self.resolve_refs(&self.vertex_refs, ElementKind::Vertex)?,
        };
        Ok(self.allowed.get_or_init(|| resolved))
    }

    fn resolve_refs(&self, refs: &[TypeRef], kind: ElementKind) -> Result<Vec<Arc<ElementType>>> {
        let mut types = Vec::with_capacity(refs.len());
        for r in refs {
            let element_type = r.resolve(&self.registry)?;
            if element_type.kind() != kind {
                log::warn!(
                    "Relationship constraint '{}' is not a {} type and will be ignored",
                    element_type.name(),
                    kind
                );
                continue;
            }
            types.push(element_type);
        }
        Ok(types)
    }

    fn edge_traversal(&self, owner: &Vertex, allowed: &AllowedTypes) -> (String, ParameterSet) {
        let script = format!("g.V(vid).{}(*elabels)", self.direction.edge_step());
        let mut bindings = ParameterSet::new();
        bindings.insert("vid", owner.id().clone());
        bindings.insert("elabels", labels(&allowed.edges));
        (script, bindings)
    }
}

fn labels(types: &[Arc<ElementType>]) -> Value {
    Value::Array(
        types
            .iter()
            .map(|t| Value::String(t.label().to_string()))
            .collect(),
    )
}

fn append_limit(script: &mut String, bindings: &mut ParameterSet, limit: Option<u64>) {
    if let Some(limit) = limit {
        script.push_str(".limit(lim)");
        bindings.insert("lim", Value::from(limit));
    }
}

fn first_declared(types: &[Arc<ElementType>], kind: &str) -> Result<Arc<ElementType>> {
    types.first().cloned().ok_or_else(|| {
        OgmError::Relationship(format!("relationship declares no {} types", kind))
    })
}

fn collect_elements<T>(result: GraphValue, convert: fn(Element) -> Result<T>) -> Result<Vec<T>> {
    match result {
        GraphValue::List(items) => items
            .into_iter()
            .map(|item| match item {
                GraphValue::Element(element) => convert(element),
                other => Err(OgmError::Shape(format!(
                    "expected graph elements, got {:?}",
                    other
                ))),
            })
            .collect(),
        GraphValue::Element(element) => convert(element).map(|e| vec![e]),
        value if value.is_null() => Ok(Vec::new()),
        other => Err(OgmError::Shape(format!(
            "expected a sequence of graph elements, got {:?}",
            other
        ))),
    }
}
