//! The validator contract and the result of resolving a node.
//!
//! Constraint checking is delegated to [`Validator`] implementations. The
//! engine hands each one a value, the localized [`Scope`] of the node being
//! resolved and the active [`Preferences`], and only ever looks at the
//! returned [`Resolution`] as a value plus an opaque list of errors.

use std::fmt;

use serde::Serialize;
use serde_json::{Number, Value};

use crate::config::Preferences;
use crate::path::{display_path, Key, Path};
use crate::scope::Scope;

/// A single validation failure.
///
/// `path` is relative to the node that reported it until the engine passes it
/// upward; every level prepends its own keys, so errors returned from a
/// top-level call carry their full location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub path: Path,
    pub code: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Prepends `prefix` to the error's path.
    pub fn within(mut self, prefix: &[Key]) -> Self {
        self.path.splice(0..0, prefix.iter().cloned());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} [{}]", self.message, self.code)
        } else {
            write!(
                f,
                "'{}': {} [{}]",
                display_path(&self.path),
                self.message,
                self.code
            )
        }
    }
}

/// A non-empty list of validation failures, as returned by
/// [`Schema::attempt`](crate::Schema::attempt).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn first(&self) -> Option<&ValidationError> {
        self.0.first()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// A possibly partial value together with the errors found producing it.
///
/// `value` is `None` when the node resolved to nothing; such a node is
/// stripped from its container. An empty `errors` list means success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub value: Option<Value>,
    pub errors: Vec<ValidationError>,
}

impl Resolution {
    pub fn new(value: Option<Value>, errors: Vec<ValidationError>) -> Self {
        Self { value, errors }
    }

    pub fn value(value: Value) -> Self {
        Self::new(Some(value), Vec::new())
    }

    pub fn undefined() -> Self {
        Self::default()
    }

    pub fn failed(error: ValidationError) -> Self {
        Self::new(None, vec![error])
    }

    pub(crate) fn from_lookup(lookup: Result<Option<Value>, ValidationError>) -> Self {
        match lookup {
            Ok(value) => Self::new(value, Vec::new()),
            Err(error) => Self::failed(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<Option<Value>, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(self.value)
        } else {
            Err(ValidationErrors(self.errors))
        }
    }
}

/// Checks, and possibly converts, a resolved value.
pub trait Validator: fmt::Debug + Send + Sync {
    fn validate(&self, value: Option<Value>, scope: &Scope<'_>, prefs: &Preferences) -> Resolution;
}

/// Basic type constraints.
///
/// Undefined values pass every constraint untouched; presence is checked by
/// [`SchemaBuilder::required`](crate::SchemaBuilder::required).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Any,
    /// Numbers; numeric strings are converted when `convert` is on.
    Number,
    String,
    /// Booleans; `"true"` and `"false"` are converted when `convert` is on.
    Boolean,
    Array,
    Object,
}

impl Constraint {
    fn code(self) -> &'static str {
        match self {
            Constraint::Any => "any.base",
            Constraint::Number => "number.base",
            Constraint::String => "string.base",
            Constraint::Boolean => "boolean.base",
            Constraint::Array => "array.base",
            Constraint::Object => "object.base",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Constraint::Any => "any value",
            Constraint::Number => "a number",
            Constraint::String => "a string",
            Constraint::Boolean => "a boolean",
            Constraint::Array => "an array",
            Constraint::Object => "an object",
        }
    }

    fn reject(self, value: Value) -> Resolution {
        Resolution::new(
            Some(value),
            vec![ValidationError::new(
                self.code(),
                format!("must be {}", self.describe()),
            )],
        )
    }
}

impl Validator for Constraint {
    fn validate(&self, value: Option<Value>, _scope: &Scope<'_>, prefs: &Preferences) -> Resolution {
        let Some(value) = value else {
            return Resolution::undefined();
        };

        match (*self, value) {
            (Constraint::Any, value) => Resolution::value(value),
            (Constraint::Number, value @ Value::Number(_)) => Resolution::value(value),
            (Constraint::Number, Value::String(text)) if prefs.convert => match parse_number(&text) {
                Some(number) => Resolution::value(Value::Number(number)),
                None => self.reject(Value::String(text)),
            },
            (Constraint::String, value @ Value::String(_)) => Resolution::value(value),
            (Constraint::Boolean, value @ Value::Bool(_)) => Resolution::value(value),
            (Constraint::Boolean, Value::String(text)) if prefs.convert => {
                if text.eq_ignore_ascii_case("true") {
                    Resolution::value(Value::Bool(true))
                } else if text.eq_ignore_ascii_case("false") {
                    Resolution::value(Value::Bool(false))
                } else {
                    self.reject(Value::String(text))
                }
            }
            (Constraint::Array, value @ Value::Array(_)) => Resolution::value(value),
            (Constraint::Object, value @ Value::Object(_)) => Resolution::value(value),
            (constraint, value) => constraint.reject(value),
        }
    }
}

fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();

    if looks_like_integer(text) {
        if let Ok(integer) = text.parse::<i64>() {
            return Some(integer.into());
        }
    }

    text.parse::<f64>().ok().and_then(Number::from_f64)
}

fn looks_like_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
