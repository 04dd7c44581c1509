pub mod binder;
pub mod loader;
pub mod method;
pub mod pipeline;
pub mod source;
pub mod table;

pub use binder::{Call, DefaultValue, ParameterBinder, ParameterSet};
pub use loader::{FileSourceLoader, QuerySourceLoader};
pub use method::{BoundMethod, MethodOwner, QueryMethod, ResolvedQuery};
pub use source::{parse_source, GroovyImport, SourceFile, SourceFunction};
pub use table::{Row, Table};
