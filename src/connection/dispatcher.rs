//! Asynchronous query dispatch
//!
//! [`QueryDispatcher::dispatch`] resolves which pool serves a call, builds
//! the [`QueryRequest`] and chains the two asynchronous stages:
//!
//! ```text
//! acquire() ──ok──> connection.send(request) ──ok──> stream
//!     │                     │
//!     └──err──> failed      └──err──> failed
//! ```
//!
//! Exactly one acquire is issued per dispatch. Returning the connection to
//! the pool after the stream completes is the pool's job.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use super::{ConnectionPool, QueryOptions, QueryRequest, ResultHandler, ResultStream};
use crate::deferred::Deferred;
use crate::errors::{OgmError, Result};
use crate::gremlin::binder::ParameterSet;
use crate::models::codec::{PropertyCodec, WireCodec};

pub const DEFAULT_GRAPH_NAME: &str = "graph";
pub const DEFAULT_TRAVERSAL_SOURCE: &str = "g";

pub struct QueryDispatcher {
    default_pool: Option<Arc<dyn ConnectionPool>>,
    named_pools: HashMap<String, Arc<dyn ConnectionPool>>,
    graph_name: String,
    traversal_source: String,
    codec: Arc<dyn PropertyCodec>,
}

impl QueryDispatcher {
    pub fn new(default_pool: Option<Arc<dyn ConnectionPool>>) -> Self {
        QueryDispatcher {
            default_pool,
            named_pools: HashMap::new(),
            graph_name: DEFAULT_GRAPH_NAME.to_string(),
            traversal_source: DEFAULT_TRAVERSAL_SOURCE.to_string(),
            codec: Arc::new(WireCodec),
        }
    }

    pub fn with_graph_name(mut self, name: impl Into<String>) -> Self {
        self.graph_name = name.into();
        self
    }

    pub fn with_traversal_source(mut self, source: impl Into<String>) -> Self {
        self.traversal_source = source.into();
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn PropertyCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Make `pool` selectable through the `pool` keyword.
    pub fn with_pool(mut self, name: impl Into<String>, pool: Arc<dyn ConnectionPool>) -> Self {
        self.named_pools.insert(name.into(), pool);
        self
    }

    pub fn codec(&self) -> &dyn PropertyCodec {
        self.codec.as_ref()
    }

    pub fn default_pool(&self) -> Option<&Arc<dyn ConnectionPool>> {
        self.default_pool.as_ref()
    }

    pub fn graph_name(&self) -> &str {
        &self.graph_name
    }

    pub fn traversal_source(&self) -> &str {
        &self.traversal_source
    }

    /// Submit `script` and return the eventual result stream.
    ///
    /// Fails synchronously when no pool can serve the call; every later
    /// failure arrives through the returned deferred.
    pub fn dispatch(
        &self,
        script: impl Into<String>,
        bindings: ParameterSet,
        handler: Option<ResultHandler>,
        options: QueryOptions,
    ) -> Result<Deferred<Box<dyn ResultStream>>> {
        let pool = self.resolve_pool(&options)?;

        let mut aliases = BTreeMap::new();
        aliases.insert(
            "graph".to_string(),
            options
                .graph_name
                .unwrap_or_else(|| self.graph_name.clone()),
        );
        aliases.insert(
            "g".to_string(),
            options
                .traversal_source
                .unwrap_or_else(|| self.traversal_source.clone()),
        );

        let request = QueryRequest {
            script: script.into(),
            bindings,
            aliases,
            handler,
            request_id: options.request_id.unwrap_or_else(Uuid::new_v4),
        };
        log::debug!(
            "Dispatching request {} with aliases {:?}",
            request.request_id,
            request.aliases
        );

        Ok(pool.acquire().and_then(move |conn| conn.send(request)))
    }

    fn resolve_pool(&self, options: &QueryOptions) -> Result<Arc<dyn ConnectionPool>> {
        if let Some(pool) = &options.pool {
            return Ok(Arc::clone(pool));
        }
        if let Some(name) = &options.pool_name {
            return self
                .named_pools
                .get(name)
                .cloned()
                .ok_or_else(|| OgmError::Connection(format!("no connection pool named '{}'", name)));
        }
        match &self.default_pool {
            Some(pool) => {
                log::debug!("No pool requested, using the default pool");
                Ok(Arc::clone(pool))
            }
            None => Err(OgmError::Connection(
                "no connection pool available".to_string(),
            )),
        }
    }
}

impl fmt::Debug for QueryDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pools: Vec<_> = self.named_pools.keys().collect();
        pools.sort();
        f.debug_struct("QueryDispatcher")
            .field("default_pool", &self.default_pool.is_some())
            .field("named_pools", &pools)
            .field("graph_name", &self.graph_name)
            .field("traversal_source", &self.traversal_source)
            .finish()
    }
}
