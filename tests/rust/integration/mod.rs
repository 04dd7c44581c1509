//! Integration tests - query methods and relationships driven end to end
//!
//! Query sources are real Groovy files in temporary directories; the graph
//! server is replaced by the in-memory connection pool.

mod query_method_tests;
mod relationship_tests;
