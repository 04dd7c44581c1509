use std::path::Path;

use super::source::{parse_source, SourceFile};
use crate::errors::{OgmError, Result};

/// Turns a query-source path into its parsed definitions.
pub trait QuerySourceLoader: Send + Sync {
    fn parse(&self, path: &Path) -> Result<SourceFile>;
}

/// Reads and parses query sources from the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSourceLoader;

impl QuerySourceLoader for FileSourceLoader {
    fn parse(&self, path: &Path) -> Result<SourceFile> {
        let text = std::fs::read_to_string(path).map_err(|e| OgmError::SourceRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        parse_source(&text).map_err(|e| OgmError::SourceParse {
            path: path.display().to_string(),
            line: e.line,
            message: e.message,
        })
    }
}
