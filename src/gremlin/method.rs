//! Query method descriptors
//!
//! A [`QueryMethod`] declares that an element type exposes a Groovy
//! function as a method. It goes through two one-time steps:
//!
//! 1. **configure**: when the owning [`ElementType`](crate::models::ElementType)
//!    is built, the descriptor learns its owner, attribute name and source
//!    path.
//! 2. **resolve**: on first use the source file is parsed and the function's
//!    argument names, body and imports are captured.
//!
//! Both steps happen at most once. Resolved state is shared read-only by
//! every call through every [`BoundMethod`] on the descriptor.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use serde_json::Value;

use super::binder::{Call, DefaultValue, ParameterBinder};
use super::loader::{FileSourceLoader, QuerySourceLoader};
use super::pipeline::{self, StreamResult};
use super::source::GroovyImport;
use super::table::Table;
use crate::connection::dispatcher::QueryDispatcher;
use crate::connection::QueryOptions;
use crate::deferred::Deferred;
use crate::errors::{BindingReason, OgmError, Result};
use crate::models::element::{GraphValue, Identified};
use crate::models::param::Param;

/// The element type a descriptor is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodOwner {
    pub type_name: String,
    pub label: String,
    pub source_dir: Option<PathBuf>,
}

#[derive(Debug)]
struct MethodSetup {
    owner: MethodOwner,
    attr_name: String,
    method_name: String,
    source_path: PathBuf,
}

/// What resolution captured from the query source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub method_name: String,
    pub args: Vec<String>,
    pub body: String,
    /// Import statements: the file's own, then the declared extras.
    pub imports: Vec<String>,
    pub source_path: PathBuf,
}

impl ResolvedQuery {
    /// Imports, a newline, then the function body.
    pub fn script(&self) -> String {
        format!("{}\n{}", self.imports.join("\n"), self.body)
    }
}

pub struct QueryMethod {
    path: Option<PathBuf>,
    method_name: Option<String>,
    classmethod: bool,
    defaults: Vec<(String, DefaultValue)>,
    transaction: bool,
    extra_imports: Vec<String>,
    loader: Arc<dyn QuerySourceLoader>,
    setup: OnceLock<MethodSetup>,
    resolved: OnceLock<ResolvedQuery>,
    resolving: Mutex<()>,
}

impl Default for QueryMethod {
    fn default() -> Self {
        QueryMethod {
            path: None,
            method_name: None,
            classmethod: false,
            defaults: Vec::new(),
            transaction: true,
            extra_imports: Vec::new(),
            loader: Arc::new(FileSourceLoader),
            setup: OnceLock::new(),
            resolved: OnceLock::new(),
            resolving: Mutex::new(()),
        }
    }
}

impl QueryMethod {
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    /// Query source file; relative paths resolve against the owner's
    /// source directory.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Function name in the source file, when it differs from the attribute.
    pub fn method_name(mut self, name: impl Into<String>) -> Self {
        self.method_name = Some(name.into());
        self
    }

    pub fn classmethod(mut self, classmethod: bool) -> Self {
        self.classmethod = classmethod;
        self
    }

    pub fn default(mut self, name: impl Into<String>, value: impl Into<Param>) -> Self {
        self.defaults
            .push((name.into(), DefaultValue::Value(value.into())));
        self
    }

    pub fn default_with<F>(mut self, name: impl Into<String>, producer: F) -> Self
    where
        F: Fn() -> Param + Send + Sync + 'static,
    {
        self.defaults
            .push((name.into(), DefaultValue::Producer(Arc::new(producer))));
        self
    }

    pub fn transaction(mut self, transaction: bool) -> Self {
        self.transaction = transaction;
        self
    }

    /// Extra import, e.g. `java.util.UUID`.
    pub fn import(mut self, import: impl Into<String>) -> Self {
        self.extra_imports.push(import.into());
        self
    }

    pub fn loader(mut self, loader: Arc<dyn QuerySourceLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Attach to `owner` under `attr_name`. Returns false if already
    /// configured, leaving the first configuration in place.
    pub fn configure(&self, owner: MethodOwner, attr_name: &str) -> bool {
        if self.setup.get().is_some() {
            return false;
        }

        let source_path = match (&self.path, &owner.source_dir) {
            (Some(path), _) if path.is_absolute() => path.clone(),
            (Some(path), Some(dir)) => dir.join(path),
            (Some(path), None) => path.clone(),
            (None, dir) => {
                let file = format!("{}.groovy", owner.label);
                dir.as_ref().map_or_else(|| PathBuf::from(&file), |d| d.join(&file))
            }
        };
        let setup = MethodSetup {
            method_name: self
                .method_name
                .clone()
                .unwrap_or_else(|| attr_name.to_string()),
            attr_name: attr_name.to_string(),
            source_path,
            owner,
        };
        log::debug!(
            "Configured query method {}.{} -> {}::{}",
            setup.owner.type_name,
            setup.attr_name,
            setup.source_path.display(),
            setup.method_name
        );
        self.setup.set(setup).is_ok()
    }

    pub fn is_configured(&self) -> bool {
        self.setup.get().is_some()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    pub fn owner(&self) -> Option<&MethodOwner> {
        self.setup.get().map(|s| &s.owner)
    }

    /// Attribute name, or the function name before configuration.
    pub fn attr_name(&self) -> &str {
        match self.setup.get() {
            Some(setup) => &setup.attr_name,
            None => self.method_name.as_deref().unwrap_or(""),
        }
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.setup.get().map(|s| s.source_path.as_path())
    }

    pub fn is_classmethod(&self) -> bool {
        self.classmethod
    }

    pub fn is_transaction(&self) -> bool {
        self.transaction
    }

    pub fn defaults(&self) -> &[(String, DefaultValue)] {
        &self.defaults
    }

    /// Load the query source on first call; later calls return the same
    /// state.
    pub fn resolve(&self) -> Result<&ResolvedQuery> {
        if let Some(resolved) = self.resolved.get() {
            return Ok(resolved);
        }

        let _guard = self.resolving.lock().unwrap_or_else(|e| e.into_inner());
        // Another caller may have finished while we waited.
        if let Some(resolved) = self.resolved.get() {
            return Ok(resolved);
        }

        let setup = self.setup.get().ok_or_else(|| {
            OgmError::lookup(self.attr_name(), "any registered element type")
        })?;
        let file = self.loader.parse(&setup.source_path)?;
        let function = file.function(&setup.method_name).ok_or_else(|| {
            OgmError::lookup(&setup.method_name, setup.source_path.display().to_string())
        })?;

        let mut seen = HashSet::new();
        for arg in &function.args {
            if !seen.insert(arg.as_str()) {
                return Err(OgmError::binding(
                    &setup.attr_name,
                    BindingReason::DuplicateDeclaration(arg.clone()),
                ));
            }
        }

        let imports: Vec<String> = file
            .imports
            .iter()
            .map(|import| import.statement.clone())
            .chain(
                self.extra_imports
                    .iter()
                    .map(|extra| GroovyImport::new(extra.as_str(), false).statement),
            )
            .collect();

        log::info!(
            "Resolved {}.{} from {} ({} args)",
            setup.owner.label,
            setup.method_name,
            setup.source_path.display(),
            function.args.len()
        );
        Ok(self.resolved.get_or_init(|| ResolvedQuery {
            method_name: setup.method_name.clone(),
            args: function.args.clone(),
            body: function.body.clone(),
            imports,
            source_path: setup.source_path.clone(),
        }))
    }
}

impl fmt::Debug for QueryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryMethod")
            .field("path", &self.path)
            .field("method_name", &self.method_name)
            .field("classmethod", &self.classmethod)
            .field("defaults", &self.defaults)
            .field("transaction", &self.transaction)
            .field("extra_imports", &self.extra_imports)
            .field("configured", &self.is_configured())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// A query method, optionally bound to an element instance.
#[derive(Debug, Clone)]
pub struct BoundMethod {
    descriptor: Arc<QueryMethod>,
    instance: Option<Value>,
}

impl BoundMethod {
    pub fn new(descriptor: Arc<QueryMethod>) -> Self {
        BoundMethod {
            descriptor,
            instance: None,
        }
    }

    /// Bind to `element`, whose id becomes the implicit first argument.
    pub fn on(&self, element: &impl Identified) -> BoundMethod {
        BoundMethod {
            descriptor: Arc::clone(&self.descriptor),
            instance: Some(element.id().clone()),
        }
    }

    pub fn descriptor(&self) -> &Arc<QueryMethod> {
        &self.descriptor
    }

    fn dispatch(&self, dispatcher: &QueryDispatcher, call: Call) -> Result<StreamResult> {
        let resolved = self.descriptor.resolve()?;
        let method = self.descriptor.attr_name();
        let Call {
            positional,
            mut keywords,
            options,
        } = call;

        let options = options.or(QueryOptions::extract(method, &mut keywords)?);
        let bindings = ParameterBinder {
            method,
            args: &resolved.args,
            defaults: self.descriptor.defaults(),
            classmethod: self.descriptor.is_classmethod(),
        }
        .bind(
            self.instance.as_ref(),
            positional,
            keywords,
            dispatcher.codec(),
        )?;

        let label = self
            .descriptor
            .owner()
            .map(|o| o.label.as_str())
            .unwrap_or("");
        log::debug!(
            "{}.{}: dispatching with {} bindings",
            label,
            resolved.method_name,
            bindings.len()
        );
        dispatcher.dispatch(resolved.script(), bindings, None, options)
    }

    /// Dispatch and hand back the unread result stream.
    pub fn raw(&self, dispatcher: &QueryDispatcher, call: Call) -> Result<StreamResult> {
        self.dispatch(dispatcher, call).map(pipeline::raw)
    }

    /// Dispatch and deserialize graph elements in the result.
    pub fn elements(&self, dispatcher: &QueryDispatcher, call: Call) -> Result<Deferred<GraphValue>> {
        self.dispatch(dispatcher, call).map(pipeline::elements)
    }

    /// Dispatch and expect a single value.
    pub fn scalar(
        &self,
        dispatcher: &QueryDispatcher,
        call: Call,
    ) -> Result<Deferred<Option<GraphValue>>> {
        self.dispatch(dispatcher, call).map(pipeline::scalar)
    }

    pub fn tabular(&self, dispatcher: &QueryDispatcher, call: Call) -> Result<Deferred<Table>> {
        self.dispatch(dispatcher, call).map(pipeline::tabular)
    }
}
