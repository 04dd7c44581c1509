//! Gremgraph - asynchronous object-graph mapping for Gremlin servers
//!
//! This crate maps element types onto a remote graph database through:
//! - Query methods backed by Groovy functions, resolved lazily from source files
//! - Parameter binding and normalisation to wire primitives
//! - Deferred dispatch over an injected connection pool
//! - Result pipelines (raw, elements, scalar, tabular)
//! - Relationship schemas with constrained two-phase creation

pub mod app;
pub mod config;
pub mod connection;
pub mod deferred;
pub mod errors;
pub mod gremlin;
pub mod models;
pub mod relationships;

pub use app::GraphApp;
pub use deferred::Deferred;
pub use errors::{BindingReason, OgmError, Result};
