//! Application wiring
//!
//! [`GraphApp`] ties a validated [`ClientConfig`] to a dispatcher over an
//! injected connection pool and to the type registry, and installs the
//! dispatching entity factory as the registry default.

use std::path::Path;
use std::sync::Arc;

use crate::config::{ClientConfig, ConfigError};
use crate::connection::dispatcher::QueryDispatcher;
use crate::connection::ConnectionPool;
use crate::deferred::Deferred;
use crate::models::element_type::{ElementType, TypeRef, TypeRegistry};
use crate::models::factory::DispatchEntityFactory;
use crate::relationships::{Direction, RelationshipSchema};

pub struct GraphApp {
    config: ClientConfig,
    dispatcher: Arc<QueryDispatcher>,
    registry: Arc<TypeRegistry>,
}

impl GraphApp {
    pub fn new(config: ClientConfig, pool: Arc<dyn ConnectionPool>) -> Result<Self, ConfigError> {
        config.check()?;

        let dispatcher = Arc::new(
            QueryDispatcher::new(Some(pool))
                .with_graph_name(config.graph_name.clone())
                .with_traversal_source(config.traversal_source.clone()),
        );
        let registry = Arc::new(TypeRegistry::new());
        registry.set_default_factory(Arc::new(DispatchEntityFactory::new(Arc::clone(
            &dispatcher,
        ))));

        log::info!(
            "Graph app ready for {} (graph '{}', traversal source '{}', pool size {})",
            config.url,
            config.graph_name,
            config.traversal_source,
            config.pool_size
        );
        Ok(GraphApp {
            config,
            dispatcher,
            registry,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<QueryDispatcher> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Make `element_type` resolvable by name.
    pub fn register(&self, element_type: Arc<ElementType>) -> Arc<ElementType> {
        self.registry.register(Arc::clone(&element_type));
        element_type
    }

    /// Declare a relationship whose type references resolve through this
    /// app's registry.
    pub fn relationship<E, V>(&self, direction: Direction, edge_types: E, vertex_types: V) -> RelationshipSchema
    where
        E: IntoIterator,
        E::Item: Into<TypeRef>,
        V: IntoIterator,
        V::Item: Into<TypeRef>,
    {
        RelationshipSchema::new(direction, edge_types, vertex_types, Arc::clone(&self.registry))
    }

    /// A query-source directory under the configured root.
    pub fn source_dir(&self, dir: impl AsRef<Path>) -> std::path::PathBuf {
        self.config.source_path(dir.as_ref())
    }

    /// Close the default pool.
    pub fn tear_down(&self) -> Deferred<()> {
        log::info!("Tearing down graph app for {}", self.config.url);
        match self.dispatcher.default_pool() {
            Some(pool) => pool.close(),
            None => Deferred::resolved(()),
        }
    }
}
