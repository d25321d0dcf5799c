//! Preferences and their loading.

mod builder;
mod env;
mod error;
mod file;
mod preferences;
mod source;

pub use builder::PreferencesBuilder;
pub use env::EnvSource;
pub use error::ConfigError;
pub use file::FileSource;
pub use preferences::Preferences;
pub use source::{Layer, PreferenceSource};
