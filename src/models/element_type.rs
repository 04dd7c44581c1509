//! Element type declarations and the by-name type registry
//!
//! An [`ElementType`] is the registration-time description of a vertex or
//! edge class: its label, where its query sources live, the query methods
//! attached to it and the factory that creates its instances. Types refer
//! to each other through [`TypeRef`], which can name a type that is only
//! registered later; [`TypeRegistry`] is the indirection table those names
//! are resolved against.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::factory::EntityFactory;
use crate::errors::{OgmError, Result};
use crate::gremlin::method::{BoundMethod, MethodOwner, QueryMethod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Vertex,
    Edge,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Vertex => f.write_str("vertex"),
            ElementKind::Edge => f.write_str("edge"),
        }
    }
}

pub struct ElementType {
    name: String,
    label: String,
    kind: ElementKind,
    source_dir: Option<PathBuf>,
    methods: BTreeMap<String, Arc<QueryMethod>>,
    factory: Option<Arc<dyn EntityFactory>>,
}

impl ElementType {
    /// Start declaring a vertex type.
    pub fn vertex(name: impl Into<String>) -> ElementTypeBuilder {
        ElementTypeBuilder::new(name.into(), ElementKind::Vertex)
    }

    /// Start declaring an edge type.
    pub fn edge(name: impl Into<String>) -> ElementTypeBuilder {
        ElementTypeBuilder::new(name.into(), ElementKind::Edge)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn is_vertex(&self) -> bool {
        self.kind == ElementKind::Vertex
    }

    pub fn is_edge(&self) -> bool {
        self.kind == ElementKind::Edge
    }

    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_deref()
    }

    pub fn factory(&self) -> Option<&Arc<dyn EntityFactory>> {
        self.factory.as_ref()
    }

    /// Names of the query methods attached to this type.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// The class-level bound method registered under `name`.
    pub fn method(&self, name: &str) -> Option<BoundMethod> {
        self.methods
            .get(name)
            .map(|descriptor| BoundMethod::new(Arc::clone(descriptor)))
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementType")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("source_dir", &self.source_dir)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

/// Two types are the same declaration when name and kind match.
impl PartialEq for ElementType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

impl Eq for ElementType {}

pub struct ElementTypeBuilder {
    name: String,
    kind: ElementKind,
    label: Option<String>,
    source_dir: Option<PathBuf>,
    methods: BTreeMap<String, QueryMethod>,
    factory: Option<Arc<dyn EntityFactory>>,
}

impl ElementTypeBuilder {
    fn new(name: String, kind: ElementKind) -> Self {
        ElementTypeBuilder {
            name,
            kind,
            label: None,
            source_dir: None,
            methods: BTreeMap::new(),
            factory: None,
        }
    }

    /// Override the label; defaults to the snake_case form of the name.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Directory that relative query-source paths are resolved against.
    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    /// Attach a query method under the attribute `name`.
    pub fn method(mut self, name: impl Into<String>, method: QueryMethod) -> Self {
        self.methods.insert(name.into(), method);
        self
    }

    pub fn factory(mut self, factory: Arc<dyn EntityFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Finish the declaration, configuring every attached method with its
    /// owner.
    pub fn build(self) -> Arc<ElementType> {
        let label = self.label.unwrap_or_else(|| snake_case(&self.name));
        let owner = MethodOwner {
            type_name: self.name.clone(),
            label: label.clone(),
            source_dir: self.source_dir.clone(),
        };

        let methods = self
            .methods
            .into_iter()
            .map(|(attr, method)| {
                method.configure(owner.clone(), &attr);
                (attr, Arc::new(method))
            })
            .collect();

        Arc::new(ElementType {
            name: self.name,
            label,
            kind: self.kind,
            source_dir: self.source_dir,
            methods,
            factory: self.factory,
        })
    }
}

/// `FollowsUser` -> `follows_user`
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else {
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
            out.push(ch);
        }
    }
    out
}

/// A reference to an element type, either direct or by registered name.
#[derive(Debug, Clone)]
pub enum TypeRef {
    Type(Arc<ElementType>),
    Named(String),
}

impl TypeRef {
    pub fn resolve(&self, registry: &TypeRegistry) -> Result<Arc<ElementType>> {
        match self {
            TypeRef::Type(t) => Ok(Arc::clone(t)),
            TypeRef::Named(name) => registry.resolve(name),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeRef::Type(t) => t.name(),
            TypeRef::Named(name) => name,
        }
    }
}

impl From<Arc<ElementType>> for TypeRef {
    fn from(value: Arc<ElementType>) -> Self {
        TypeRef::Type(value)
    }
}

impl From<&Arc<ElementType>> for TypeRef {
    fn from(value: &Arc<ElementType>) -> Self {
        TypeRef::Type(Arc::clone(value))
    }
}

impl From<&str> for TypeRef {
    fn from(value: &str) -> Self {
        TypeRef::Named(value.to_string())
    }
}

impl From<String> for TypeRef {
    fn from(value: String) -> Self {
        TypeRef::Named(value)
    }
}

/// Element types keyed by name, plus the fallback entity factory.
#[derive(Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<String, Arc<ElementType>>>,
    default_factory: RwLock<Option<Arc<dyn EntityFactory>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `element_type` under its name, replacing any earlier entry.
    pub fn register(&self, element_type: Arc<ElementType>) {
        let mut types = self.types.write().unwrap_or_else(|e| e.into_inner());
        log::debug!(
            "Registered {} type '{}' (label '{}')",
            element_type.kind(),
            element_type.name(),
            element_type.label()
        );
        types.insert(element_type.name().to_string(), element_type);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<ElementType>> {
        let types = self.types.read().unwrap_or_else(|e| e.into_inner());
        types
            .get(name)
            .cloned()
            .ok_or_else(|| OgmError::lookup(name, "the type registry"))
    }

    pub fn len(&self) -> usize {
        self.types.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_default_factory(&self, factory: Arc<dyn EntityFactory>) {
        *self
            .default_factory
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(factory);
    }

    /// The factory creating instances of `element_type`: its own, else the
    /// registry default.
    pub fn factory_for(&self, element_type: &ElementType) -> Result<Arc<dyn EntityFactory>> {
        if let Some(factory) = element_type.factory() {
            return Ok(Arc::clone(factory));
        }
        self.default_factory
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| {
                OgmError::lookup(
                    format!("entity factory for '{}'", element_type.name()),
                    "the type registry",
                )
            })
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types = self.types.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<_> = types.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}
