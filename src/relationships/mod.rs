pub mod relationship;

use std::fmt;

pub use relationship::{CreateRequest, RelationshipSchema};

/// Which way edges point, seen from the owning vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Out,
    In,
    Both,
}

impl Direction {
    /// Traversal step from the owner to its edges.
    pub fn edge_step(self) -> &'static str {
        match self {
            Direction::Out => "outE",
            Direction::In => "inE",
            Direction::Both => "bothE",
        }
    }

    /// Step from those edges to the vertex at the far end.
    pub fn vertex_step(self) -> &'static str {
        match self {
            Direction::Out => "inV",
            Direction::In => "outV",
            Direction::Both => "otherV",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Out => f.write_str("OUT"),
            Direction::In => f.write_str("IN"),
            Direction::Both => f.write_str("BOTH"),
        }
    }
}
