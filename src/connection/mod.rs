//! Connection pool contract
//!
//! The client never owns a transport. It consumes a pool that hands out
//! connections, a connection that accepts a [`QueryRequest`] and answers
//! with a [`ResultStream`], and a stream that yields result messages until
//! exhausted. Every step is asynchronous and returns a [`Deferred`].
//!
//! Connection release, timeouts and retries belong to the pool.

pub mod dispatcher;
pub mod memory;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::deferred::Deferred;
use crate::errors::{BindingReason, OgmError, Result};
use crate::gremlin::binder::ParameterSet;
use crate::models::param::Param;

/// Keyword arguments that configure dispatch instead of binding to the query.
pub const RESERVED_KEYWORDS: [&str; 5] = [
    "graph_name",
    "traversal_source",
    "pool",
    "request_id",
    "future_class",
];

/// Transforms every message of a result stream.
pub type ResultHandler = Arc<dyn Fn(Value) -> Value + Send + Sync>;

#[cfg_attr(test, mockall::automock)]
pub trait ConnectionPool: Send + Sync {
    /// Hand out a connection once one is available.
    fn acquire(&self) -> Deferred<Arc<dyn Connection>>;

    /// Release every pooled connection.
    fn close(&self) -> Deferred<()> {
        Deferred::resolved(())
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Connection: Send + Sync {
    /// Submit a request; resolves once the server has accepted it.
    fn send(&self, request: QueryRequest) -> Deferred<Box<dyn ResultStream>>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ResultStream: Send {
    /// The next message, or `None` once the stream is exhausted.
    fn read(&mut self) -> Deferred<Option<Value>>;

    /// Apply `handler` to every later message, after earlier handlers.
    fn add_handler(&mut self, handler: ResultHandler);
}

/// One script submission.
#[derive(Clone)]
pub struct QueryRequest {
    pub script: String,
    pub bindings: ParameterSet,
    /// `graph` / `g` names the server should alias.
    pub aliases: BTreeMap<String, String>,
    pub handler: Option<ResultHandler>,
    pub request_id: Uuid,
}

impl fmt::Debug for QueryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRequest")
            .field("script", &self.script)
            .field("bindings", &self.bindings)
            .field("aliases", &self.aliases)
            .field("handler", &self.handler.is_some())
            .field("request_id", &self.request_id)
            .finish()
    }
}

/// Per-call dispatch configuration.
#[derive(Clone, Default)]
pub struct QueryOptions {
    pub graph_name: Option<String>,
    pub traversal_source: Option<String>,
    /// A pool used instead of the dispatcher's pools.
    pub pool: Option<Arc<dyn ConnectionPool>>,
    /// A pool registered on the dispatcher under this name.
    pub pool_name: Option<String>,
    pub request_id: Option<Uuid>,
}

impl QueryOptions {
    pub fn graph_name(mut self, name: impl Into<String>) -> Self {
        self.graph_name = Some(name.into());
        self
    }

    pub fn traversal_source(mut self, source: impl Into<String>) -> Self {
        self.traversal_source = Some(source.into());
        self
    }

    pub fn pool(mut self, pool: Arc<dyn ConnectionPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn pool_name(mut self, name: impl Into<String>) -> Self {
        self.pool_name = Some(name.into());
        self
    }

    pub fn request_id(mut self, id: Uuid) -> Self {
        self.request_id = Some(id);
        self
    }

    /// Remove reserved keywords from `keywords` and turn them into options.
    pub fn extract(method: &str, keywords: &mut Vec<(String, Param)>) -> Result<QueryOptions> {
        let mut options = QueryOptions::default();
        let mut kept = Vec::with_capacity(keywords.len());

        for (name, value) in keywords.drain(..) {
            if !RESERVED_KEYWORDS.contains(&name.as_str()) {
                kept.push((name, value));
                continue;
            }
            if value.is_null() {
                continue;
            }
            match name.as_str() {
                "graph_name" => options.graph_name = Some(text_option(method, &name, &value)?),
                "traversal_source" => {
                    options.traversal_source = Some(text_option(method, &name, &value)?)
                }
                "pool" => options.pool_name = Some(text_option(method, &name, &value)?),
                "request_id" => options.request_id = Some(uuid_option(method, &value)?),
                _ => log::debug!("{}(): ignoring reserved keyword '{}'", method, name),
            }
        }

        *keywords = kept;
        Ok(options)
    }

    /// Fields set on `self` win; unset ones fall back to `extracted`.
    pub fn or(self, extracted: QueryOptions) -> QueryOptions {
        QueryOptions {
            graph_name: self.graph_name.or(extracted.graph_name),
            traversal_source: self.traversal_source.or(extracted.traversal_source),
            pool: self.pool.or(extracted.pool),
            pool_name: self.pool_name.or(extracted.pool_name),
            request_id: self.request_id.or(extracted.request_id),
        }
    }
}

impl fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("graph_name", &self.graph_name)
            .field("traversal_source", &self.traversal_source)
            .field("pool", &self.pool.is_some())
            .field("pool_name", &self.pool_name)
            .field("request_id", &self.request_id)
            .finish()
    }
}

fn invalid_control(method: &str, keyword: &str, detail: impl Into<String>) -> OgmError {
    OgmError::binding(
        method,
        BindingReason::InvalidControl {
            keyword: keyword.to_string(),
            detail: detail.into(),
        },
    )
}

fn text_option(method: &str, keyword: &str, value: &Param) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid_control(method, keyword, "must be a string"))
}

fn uuid_option(method: &str, value: &Param) -> Result<Uuid> {
    match value {
        Param::Uuid(id) => Ok(*id),
        Param::Value(Value::String(text)) => Uuid::parse_str(text)
            .map_err(|e| invalid_control(method, "request_id", format!("is not a UUID: {}", e))),
        _ => Err(invalid_control(
            method,
            "request_id",
            "must be a UUID or UUID string",
        )),
    }
}

/// Drain `stream` into one value.
///
/// No messages resolve to null and a single message to itself. Several
/// messages are concatenated when all of them are arrays, otherwise
/// collected into an array.
pub fn read_all(mut stream: Box<dyn ResultStream>) -> Deferred<Value> {
    Deferred::new(async move {
        let mut messages = Vec::new();
        while let Some(message) = stream.read().await? {
            messages.push(message);
        }
        Ok(combine(messages))
    })
}

fn combine(mut messages: Vec<Value>) -> Value {
    match messages.len() {
        0 => Value::Null,
        1 => messages.remove(0),
        _ if messages.iter().all(Value::is_array) => Value::Array(
            messages
                .into_iter()
                .flat_map(|m| match m {
                    Value::Array(items) => items,
                    other => vec![other],
                })
                .collect(),
        ),
        _ => Value::Array(messages),
    }
}
