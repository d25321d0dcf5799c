use toml::Value;

use super::source::{Layer, PreferenceSource};
use super::ConfigError;

/// Reads preferences from environment variables.
///
/// `PREFIX<sep>ABORT_EARLY=true` becomes `abort_early = true`; further
/// separators split the name into nested keys. Values are coerced to a
/// boolean, integer or float when they look like one.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator: separator.into(),
        }
    }

    fn layers_from(&self, vars: impl IntoIterator<Item = (String, String)>) -> Result<Vec<Layer>, ConfigError> {
        if self.separator.is_empty() {
            return Err(ConfigError::EmptySeparator);
        }

        let prefix = format!("{}{}", self.prefix, self.separator);
        let layers = vars
            .into_iter()
            .filter_map(|(key, value)| {
                let rest = key.strip_prefix(&prefix)?;
                if rest.is_empty() {
                    return None;
                }
                let path = rest
                    .split(self.separator.as_str())
                    .map(str::to_lowercase)
                    .collect();
                Some(Layer::at(path, coerce_value(&value)))
            })
            .collect();

        Ok(layers)
    }
}

impl PreferenceSource for EnvSource {
    fn layers(&self) -> Result<Vec<Layer>, ConfigError> {
        self.layers_from(std::env::vars())
    }
}

fn coerce_value(raw: &str) -> Value {
    match raw.to_ascii_lowercase().as_str() {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        _ => {}
    }

    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(integer) = raw.parse() {
            return Value::Integer(integer);
        }
    }

    match raw.contains('.').then(|| raw.parse::<f64>()) {
        Some(Ok(float)) => Value::Float(float),
        _ => Value::String(raw.to_string()),
    }
}
