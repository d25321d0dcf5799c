use serde::{Deserialize, Serialize};

use super::{ConfigError, PreferencesBuilder};

/// Options that apply to a whole resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Preferences {
    /// Stop at the first validation error instead of collecting all of them.
    pub abort_early: bool,
    /// Let constraints convert compatible values, such as `"2"` to `2`.
    pub convert: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            abort_early: false,
            convert: true,
        }
    }
}

impl Preferences {
    pub fn builder() -> PreferencesBuilder {
        PreferencesBuilder::default()
    }

    /// Parses preferences from a single TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn with_abort_early(mut self, abort_early: bool) -> Self {
        self.abort_early = abort_early;
        self
    }

    pub fn with_convert(mut self, convert: bool) -> Self {
        self.convert = convert;
        self
    }
}
