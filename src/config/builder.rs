use std::path::Path;

use super::env::EnvSource;
use super::file::FileSource;
use super::source::{merge_layer, PreferenceSource};
use super::{ConfigError, Preferences};

/// Loads [`Preferences`] from layered sources.
///
/// Sources are merged in registration order, later ones overriding earlier
/// ones. Keys no source sets keep their defaults.
///
/// ```no_run
/// use dragon_values::Preferences;
///
/// // defaults -> file -> env overrides
/// let prefs = Preferences::builder()
///     .with_file("config/values.toml", false)
///     .with_env("VALUES", "__")
///     .build()?;
/// # Ok::<(), dragon_values::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct PreferencesBuilder {
    sources: Vec<Box<dyn PreferenceSource>>,
}

impl PreferencesBuilder {
    /// Adds a TOML file. A missing file fails the build only if `required`.
    pub fn with_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required))
    }

    /// Adds environment variables named `<prefix><separator><KEY>`.
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix, separator))
    }

    pub fn with_source(mut self, source: impl PreferenceSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn build(self) -> Result<Preferences, ConfigError> {
        let mut merged = toml::Table::new();

        for source in &self.sources {
            for layer in source.layers()? {
                merge_layer(&mut merged, &layer.path, layer.value);
            }
        }

        let prefs: Preferences = toml::Value::Table(merged).try_into()?;
        tracing::debug!(
            sources = self.sources.len(),
            abort_early = prefs.abort_early,
            convert = prefs.convert,
            "loaded preferences"
        );
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Layer;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Debug)]
    struct Fixed(Vec<(&'static str, toml::Value)>);

    impl PreferenceSource for Fixed {
        fn layers(&self) -> Result<Vec<Layer>, ConfigError> {
            Ok(self
                .0
                .iter()
                .map(|(key, value)| Layer::at(vec![key.to_string()], value.clone()))
                .collect())
        }
    }

    fn prefs_file(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{text}").unwrap();
        file
    }

    #[test]
    fn test_no_sources_gives_defaults() {
        let prefs = Preferences::builder().build().unwrap();
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn test_later_sources_override_earlier() {
        let file = prefs_file("abort_early = true\nconvert = false");

        let prefs = Preferences::builder()
            .with_file(file.path(), true)
            .with_source(Fixed(vec![("convert", toml::Value::Boolean(true))]))
            .build()
            .unwrap();

        assert!(prefs.abort_early);
        assert!(prefs.convert);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = prefs_file("abort_early = false");
        std::env::set_var("DRAGON_VALUES_TEST_LAYER__ABORT_EARLY", "true");

        let prefs = Preferences::builder()
            .with_file(file.path(), true)
            .with_env("DRAGON_VALUES_TEST_LAYER", "__")
            .build()
            .unwrap();

        std::env::remove_var("DRAGON_VALUES_TEST_LAYER__ABORT_EARLY");
        assert!(prefs.abort_early);
    }

    #[test]
    fn test_optional_missing_file_is_skipped() {
        let prefs = Preferences::builder()
            .with_file("/nonexistent/path/prefs.toml", false)
            .build()
            .unwrap();
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let file = prefs_file("abort_early = true\nabortEarly = true");

        let result = Preferences::builder().with_file(file.path(), true).build();
        assert!(matches!(result, Err(ConfigError::DeserializeError(_))));
    }

    #[test]
    fn test_wrong_types_are_rejected() {
        let result = Preferences::builder()
            .with_source(Fixed(vec![("convert", toml::Value::String("often".into()))]))
            .build();
        assert!(matches!(result, Err(ConfigError::DeserializeError(_))));
    }
}
