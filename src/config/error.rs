use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("required preferences file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read preferences file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse preferences file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid preferences: {0}")]
    DeserializeError(#[from] toml::de::Error),

    #[error("environment separator must not be empty")]
    EmptySeparator,
}
