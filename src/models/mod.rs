pub mod codec;
pub mod element;
pub mod element_type;
pub mod factory;
pub mod param;

pub use codec::{PropertyCodec, WireCodec};
pub use element::{Edge, Element, GraphValue, Identified, Vertex};
pub use element_type::{ElementKind, ElementType, TypeRef, TypeRegistry};
pub use factory::{DispatchEntityFactory, EntityFactory};
pub use param::{Decimal, Param, PropertyMap};
