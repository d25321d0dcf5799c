use crate::config::ConfigError;
use crate::validate::ValidationErrors;
use thiserror::Error;

/// Top-level error type for the dragon-values library.
///
/// Validation failures found while resolving input are data
/// ([`Resolution::errors`](crate::Resolution)); they only become an
/// [`Error::Validation`] through [`Schema::attempt`](crate::Schema::attempt).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("dependency cycle detected at '{key}'")]
    DependencyCycle { key: String },

    #[error("invalid path '{path}'")]
    InvalidPath { path: String },

    #[error("cyclic value at '{path}' cannot be materialized")]
    CyclicValue { path: String },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}
