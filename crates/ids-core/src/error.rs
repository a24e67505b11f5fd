//! Error types for the rule compiler engine

use thiserror::Error;

use crate::schema::SchemaDialect;
use crate::stages::RibaStage;

/// Errors raised while compiling rules or synthesizing fixtures
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The schema has no entity type of that name in the active dialect.
    /// Always a configuration bug in the rulebook or the catalog.
    #[error("unsupported entity type '{name}' in {dialect}")]
    UnsupportedType {
        name: String,
        dialect: SchemaDialect,
    },

    #[error("invalid target stage {0}: target must be a single stage from Stage1 to Stage6")]
    InvalidTargetStage(RibaStage),

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("fixture error: {0}")]
    Fixture(String),

    #[error("output sink failed: {0}")]
    Sink(String),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, GeneratorError>;

impl GeneratorError {
    pub fn unsupported(name: impl Into<String>, dialect: SchemaDialect) -> Self {
        Self::UnsupportedType {
            name: name.into(),
            dialect,
        }
    }
}
