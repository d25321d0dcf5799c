//! Resolution of configuration values against runtime parameters.
//!
//! A [`Schema`] describes how to build a configuration value: plain data
//! mixed with [`Reference`]s, [`Expression`]s and nested schemas, each
//! resolved against the input parameters or against sibling values, then
//! validated and optionally re-mapped through a [`When`] or [`Mapping`].
//!
//! ```
//! use dragon_values::{Mapping, Node, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::value(Node::map([
//!     ("host", Node::reference("$host")),
//!     ("port", Node::schema(Schema::number().param("port").build()?)),
//!     (
//!         "tls",
//!         Node::schema(
//!             Schema::param("env")
//!                 .into_map(Mapping::new().entry("prod", json!(true)).entry("$default", json!(false)))
//!                 .build()?,
//!         ),
//!     ),
//! ]))
//! .build()?;
//!
//! let config = schema.attempt(&json!({"host": "db", "port": "5432", "env": "prod"}))?;
//! assert_eq!(config, Some(json!({"host": "db", "port": 5432, "tls": true})));
//! # Ok::<(), dragon_values::Error>(())
//! ```

pub mod conditional;
pub mod config;
mod error;
pub mod path;
pub mod reference;
pub mod schema;
pub mod scope;
pub mod sort;
pub mod traverse;
pub mod validate;
pub mod value;

pub use conditional::{Case, MapKey, Mapping, Matcher, When, DEFAULT_KEY};
pub use config::{ConfigError, Preferences, PreferencesBuilder};
pub use error::Error;
pub use path::{Key, Path};
pub use reference::{Anchor, Evaluator, Expression, Reference};
pub use schema::{Schema, SchemaBuilder};
pub use scope::Scope;
pub use validate::{Constraint, Resolution, ValidationError, ValidationErrors, Validator};
pub use value::{Node, Registration, Term, TermKind, ValueTree};
