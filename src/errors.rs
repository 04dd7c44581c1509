//! # Error Types
//!
//! One error enum covers the whole client: binding and resolution failures
//! raised before any asynchronous work starts, and the failures delivered
//! later through a [`Deferred`](crate::deferred::Deferred).
//!
//! ## Error Categories
//!
//! - **Binding**: call arguments that do not fit a query method's declaration
//! - **Lookup**: a named query, element type or factory that does not exist
//! - **Schema**: an edge/vertex pair a relationship does not permit
//! - **Result shape**: scalar cardinality and tabular shape mismatches
//! - **Connection / transport**: pool resolution and wire failures
//!
//! Use the helper constructors so messages carry the method or location:
//!
//! ```ignore
//! OgmError::binding("friends", BindingReason::Unexpected("limt".into()))
//! OgmError::lookup("friends", "queries/user.groovy")
//! ```

use thiserror::Error;

/// Alias for Results returning [`OgmError`].
pub type Result<T> = std::result::Result<T, OgmError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OgmError {
    #[error("{method}() {reason}")]
    Binding {
        method: String,
        reason: BindingReason,
    },

    #[error("'{name}' wasn't found in {location}")]
    Lookup { name: String, location: String },

    #[error("Not a valid relationship setup: {vertex} <-{direction}-[{edge}]")]
    SchemaViolation {
        edge: String,
        direction: String,
        vertex: String,
    },

    #[error("Query requires a single value to be returned ({count} returned)")]
    Cardinality { count: usize },

    #[error("Unexpected result shape: {0}")]
    Shape(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Relationship error: {0}")]
    Relationship(String),

    #[error("Failed to parse query source '{path}' at line {line}: {message}")]
    SourceParse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("Failed to read query source '{path}': {message}")]
    SourceRead { path: String, message: String },

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Why a call's arguments could not be bound to a query method.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindingReason {
    #[error("takes {expected} args, {given} given")]
    TooMany { expected: usize, given: usize },

    #[error("got an unexpected keyword argument '{0}'")]
    Unexpected(String),

    #[error("got multiple values for keyword argument '{0}'")]
    Duplicate(String),

    #[error("missing required argument '{0}'")]
    Missing(String),

    #[error("'{0}' defined more than once in query method arguments")]
    DuplicateDeclaration(String),

    #[error("reserved keyword '{keyword}' {detail}")]
    InvalidControl { keyword: String, detail: String },
}

impl OgmError {
    /// Create a binding error for `method`.
    pub fn binding(method: impl Into<String>, reason: BindingReason) -> Self {
        OgmError::Binding {
            method: method.into(),
            reason,
        }
    }

    /// Create a lookup error for `name`, naming where it was searched for.
    pub fn lookup(name: impl Into<String>, location: impl Into<String>) -> Self {
        OgmError::Lookup {
            name: name.into(),
            location: location.into(),
        }
    }

    /// The binding reason, if this is a binding error.
    pub fn binding_reason(&self) -> Option<&BindingReason> {
        match self {
            OgmError::Binding { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for OgmError {
    fn from(err: serde_json::Error) -> Self {
        OgmError::Deserialization(err.to_string())
    }
}
