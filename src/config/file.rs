//! TOML file source.

use std::path::{Path, PathBuf};

use super::source::{Layer, PreferenceSource};
use super::ConfigError;

/// Loads a TOML document from disk.
///
/// A required file that doesn't exist is an error; a missing optional file
/// contributes nothing.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    required: bool,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required,
        }
    }
}

impl PreferenceSource for FileSource {
    fn layers(&self) -> Result<Vec<Layer>, ConfigError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if self.required {
                    return Err(ConfigError::FileNotFound(self.path.clone()));
                }
                tracing::debug!(path = %self.path.display(), "optional preferences file missing");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(ConfigError::ReadError {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        let table = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(vec![Layer::document(table)])
    }
}
