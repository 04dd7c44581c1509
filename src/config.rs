use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unsupported URL scheme in '{0}' (expected ws, wss, http or https)")]
    Scheme(String),
}

/// Client configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Gremlin server URL
    #[validate(length(min = 1, message = "URL cannot be empty"))]
    pub url: String,

    /// Maximum number of pooled connections (1-4096)
    #[validate(range(
        min = 1,
        max = 4096,
        message = "Pool size must be between 1 and 4096"
    ))]
    pub pool_size: u32,

    pub username: Option<String>,

    pub password: Option<String>,

    /// Server-side graph aliased as `graph`
    #[validate(length(min = 1, message = "Graph name cannot be empty"))]
    pub graph_name: String,

    /// Server-side traversal source aliased as `g`
    #[validate(length(min = 1, message = "Traversal source cannot be empty"))]
    pub traversal_source: String,

    /// Base directory for relative query-source paths
    pub query_source_root: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8182".to_string(),
            pool_size: 256,
            username: None,
            password: None,
            graph_name: "graph".to_string(),
            traversal_source: "g".to_string(),
            query_source_root: None,
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            url: env::var("GREMGRAPH_URL").unwrap_or_else(|_| "ws://localhost:8182".to_string()),
            pool_size: parse_env_var("GREMGRAPH_POOL_SIZE", "256")?,
            username: env::var("GREMGRAPH_USERNAME").ok(),
            password: env::var("GREMGRAPH_PASSWORD").ok(),
            graph_name: env::var("GREMGRAPH_GRAPH_NAME").unwrap_or_else(|_| "graph".to_string()),
            traversal_source: env::var("GREMGRAPH_TRAVERSAL_SOURCE")
                .unwrap_or_else(|_| "g".to_string()),
            query_source_root: env::var("GREMGRAPH_QUERY_SOURCE_ROOT").ok().map(PathBuf::from),
        };

        config.check()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.check()?;
        Ok(config)
    }

    /// Merge with another configuration (`other` wins; optional fields it
    /// leaves unset are kept)
    pub fn merge(&mut self, other: Self) {
        self.url = other.url;
        self.pool_size = other.pool_size;
        self.username = other.username.or(self.username.take());
        self.password = other.password.or(self.password.take());
        self.graph_name = other.graph_name;
        self.traversal_source = other.traversal_source;
        self.query_source_root = other.query_source_root.or(self.query_source_root.take());
    }

    /// Field validation plus the URL scheme check
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.scheme().map(|_| ())
    }

    /// URL scheme, lowercased
    pub fn scheme(&self) -> Result<String, ConfigError> {
        let scheme = self
            .url
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .ok_or_else(|| ConfigError::Scheme(self.url.clone()))?;
        match scheme.as_str() {
            "ws" | "wss" | "http" | "https" => Ok(scheme),
            _ => Err(ConfigError::Scheme(self.url.clone())),
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self.scheme().as_deref(), Ok("wss") | Ok("https"))
    }

    /// Resolve a query-source path against `query_source_root`
    pub fn source_path(&self, path: &Path) -> PathBuf {
        match &self.query_source_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
