//! Schemas: a value source plus the stages applied to what it produces.
//!
//! Stages run in a fixed order:
//!
//! 1. **source**: the subject under validation, a literal, a value tree, a
//!    reference or an expression
//! 2. **default**: resolved when the source produced nothing
//! 3. **validator**: checks and possibly converts the value; errors end
//!    the pipeline
//! 4. **required**: rejects an undefined value
//! 5. **conditional**: maps the value through a [`When`]
//! 6. **strip**: drops the value from its container
//!
//! Every stage after the source runs even when the value is undefined, so a
//! default or a conditional can still produce one.
//!
//! ```
//! use dragon_values::{Node, Reference, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::value(Node::map([
//!     ("port", Node::schema(Schema::number().param("port").default(json!(8080)).build()?)),
//!     ("url", Node::reference(Reference::sibling("port"))),
//! ]))
//! .build()?;
//!
//! let value = schema.attempt(&json!({"port": "9000"}))?;
//! assert_eq!(value, Some(json!({"port": 9000, "url": 9000})));
//! # Ok::<(), dragon_values::Error>(())
//! ```

use std::sync::Arc;

use serde_json::Value;

use crate::conditional::{Conditional, Mapping, When};
use crate::config::Preferences;
use crate::path::display_path;
use crate::reference::{Expression, Reference};
use crate::scope::Scope;
use crate::validate::{Constraint, Resolution, ValidationError, Validator};
use crate::value::{Node, Registration, ValueTree};
use crate::Error;

#[derive(Debug, Clone)]
enum Source {
    Input,
    Literal(Value),
    Tree(ValueTree),
    Reference(Reference),
    Expression(Expression),
}

/// A compiled schema.
#[derive(Debug, Clone)]
pub struct Schema {
    source: Source,
    validator: Option<Arc<dyn Validator>>,
    default: Option<ValueTree>,
    conditional: Option<Conditional>,
    required: bool,
    strip: bool,
}

impl Schema {
    /// Starts a schema that validates its subject without a type constraint.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn any() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn number() -> SchemaBuilder {
        Self::builder().constraint(Constraint::Number)
    }

    pub fn string() -> SchemaBuilder {
        Self::builder().constraint(Constraint::String)
    }

    pub fn boolean() -> SchemaBuilder {
        Self::builder().constraint(Constraint::Boolean)
    }

    pub fn array() -> SchemaBuilder {
        Self::builder().constraint(Constraint::Array)
    }

    pub fn object() -> SchemaBuilder {
        Self::builder().constraint(Constraint::Object)
    }

    /// A schema producing the resolved value tree `node`.
    pub fn value(node: impl Into<Node>) -> SchemaBuilder {
        Self::builder().value(node)
    }

    /// A schema reading `path` from the input parameters.
    pub fn param(path: &str) -> SchemaBuilder {
        Self::builder().param(path)
    }

    /// A schema returning `value` as is, without resolving or validating it.
    pub fn literal(value: impl Into<Value>) -> SchemaBuilder {
        Self::builder().literal(value)
    }

    /// Terminals discovered in the schema's value tree, in declaration order.
    pub fn registrations(&self) -> &[Registration] {
        match &self.source {
            Source::Tree(tree) => tree.registrations(),
            _ => &[],
        }
    }

    /// Resolves the schema against `input`, collecting every error.
    ///
    /// # Errors
    ///
    /// Validation failures are returned inside the [`Resolution`]. `Err` is
    /// reserved for structural problems such as a resolved value that
    /// contains itself.
    pub fn resolve(&self, input: &Value, prefs: &Preferences) -> Result<Resolution, Error> {
        let scope = Scope::new(input, prefs);
        let resolution = self.validate(&scope)?;
        tracing::debug!(errors = resolution.errors.len(), "resolved schema");
        Ok(resolution)
    }

    /// Resolves the schema against `input`, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] holding the first validation error.
    pub fn attempt(&self, input: &Value) -> Result<Option<Value>, Error> {
        let prefs = Preferences::default().with_abort_early(true);
        Ok(self.resolve(input, &prefs)?.into_result()?)
    }

    pub(crate) fn validate(&self, scope: &Scope<'_>) -> Result<Resolution, Error> {
        let prefs = scope.prefs();
        tracing::trace!(path = %display_path(scope.path()), "validating schema");

        let Resolution {
            mut value,
            mut errors,
        } = match &self.source {
            Source::Literal(value) => return Ok(Resolution::value(value.clone())),
            Source::Input => Resolution::new(scope.subject().cloned(), Vec::new()),
            Source::Tree(tree) => tree.resolve(scope)?,
            Source::Reference(reference) => Resolution::from_lookup(reference.resolve(scope)),
            Source::Expression(expression) => Resolution::from_lookup(expression.evaluate(scope)),
        };

        if !errors.is_empty() && prefs.abort_early {
            return Ok(Resolution::new(value, errors));
        }

        if value.is_none() {
            if let Some(default) = &self.default {
                let resolution = default.resolve(scope)?;
                value = resolution.value;
                errors.extend(resolution.errors);
                if !errors.is_empty() && prefs.abort_early {
                    return Ok(Resolution::new(value, errors));
                }
            }
        }

        if let Some(validator) = &self.validator {
            let checked = validator.validate(value, scope, prefs);
            value = checked.value;
            if !checked.errors.is_empty() {
                errors.extend(checked.errors);
                return Ok(Resolution::new(value, errors));
            }
        }

        if self.required && value.is_none() {
            errors.push(ValidationError::new("any.required", "is required"));
            return Ok(Resolution::new(value, errors));
        }

        if let Some(conditional) = &self.conditional {
            let mapped = conditional.apply(value, scope)?;
            value = mapped.value;
            errors.extend(mapped.errors);
        }

        if self.strip {
            value = None;
        }

        Ok(Resolution::new(value, errors))
    }

    /// References this schema makes outside of itself, seen from its own
    /// position. Used to order it among its siblings.
    pub(crate) fn outer_references(&self) -> Vec<Reference> {
        let mut references = match &self.source {
            Source::Input | Source::Literal(_) => Vec::new(),
            Source::Tree(tree) => tree.escaping_references(),
            Source::Reference(reference) => reference.escape_from(0).into_iter().collect(),
            Source::Expression(expression) => expression
                .references()
                .iter()
                .filter_map(|reference| reference.escape_from(0))
                .collect(),
        };

        if let Some(default) = &self.default {
            references.extend(default.escaping_references());
        }
        if let Some(conditional) = &self.conditional {
            references.extend(conditional.escaping_references());
        }
        references
    }
}

/// Builds a [`Schema`]. Value trees are compiled by [`SchemaBuilder::build`].
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct SchemaBuilder {
    source: Option<Pending>,
    validator: Option<Arc<dyn Validator>>,
    default: Option<Node>,
    when: Option<When>,
    required: bool,
    strip: bool,
}

#[derive(Debug)]
enum Pending {
    Literal(Value),
    Tree(Node),
    Reference(Reference),
    Expression(Expression),
}

impl SchemaBuilder {
    fn new() -> Self {
        Self {
            source: None,
            validator: None,
            default: None,
            when: None,
            required: false,
            strip: false,
        }
    }

    /// Produces the value by resolving `node` instead of reading the subject.
    pub fn value(mut self, node: impl Into<Node>) -> Self {
        self.source = Some(Pending::Tree(node.into()));
        self
    }

    pub fn param(self, path: &str) -> Self {
        self.reference(Reference::root(path))
    }

    pub fn reference(mut self, reference: impl Into<Reference>) -> Self {
        self.source = Some(Pending::Reference(reference.into()));
        self
    }

    pub fn expression(mut self, expression: Expression) -> Self {
        self.source = Some(Pending::Expression(expression));
        self
    }

    /// Returns `value` unchanged; every other stage is skipped.
    pub fn literal(mut self, value: impl Into<Value>) -> Self {
        self.source = Some(Pending::Literal(value.into()));
        self
    }

    pub fn constraint(self, constraint: Constraint) -> Self {
        self.validator(constraint)
    }

    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Resolved in place of an undefined value.
    pub fn default(mut self, node: impl Into<Node>) -> Self {
        self.default = Some(node.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn strip(mut self) -> Self {
        self.strip = true;
        self
    }

    pub fn into_when(mut self, when: When) -> Self {
        self.when = Some(when);
        self
    }

    pub fn into_map(self, mapping: impl Into<Mapping>) -> Self {
        self.into_when(mapping.into().into_when())
    }

    /// # Errors
    ///
    /// Returns [`Error::DependencyCycle`] when a value tree references
    /// itself in a cycle.
    pub fn build(self) -> Result<Schema, Error> {
        let source = match self.source {
            None => Source::Input,
            Some(Pending::Literal(value)) => Source::Literal(value),
            Some(Pending::Tree(node)) => Source::Tree(ValueTree::compile(node)?),
            Some(Pending::Reference(reference)) => Source::Reference(reference),
            Some(Pending::Expression(expression)) => Source::Expression(expression),
        };

        Ok(Schema {
            source,
            validator: self.validator,
            default: self.default.map(ValueTree::compile).transpose()?,
            conditional: self.when.map(When::compile).transpose()?,
            required: self.required,
            strip: self.strip,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditional::{Case, MapKey, DEFAULT_KEY};
    use crate::path::Key;
    use crate::value::TermKind;
    use serde_json::json;

    fn sum_of_numbers(args: &[Option<Value>]) -> Result<Option<Value>, String> {
        let total = args
            .iter()
            .map(|arg| arg.as_ref().and_then(Value::as_i64).ok_or("not a number"))
            .sum::<Result<i64, _>>()?;
        Ok(Some(json!(total)))
    }

    fn field(name: &str) -> Key {
        Key::from(name)
    }

    #[test]
    fn test_value_schema() {
        let schema = Schema::value(json!(4)).build().unwrap();
        assert_eq!(schema.attempt(&json!({})).unwrap(), Some(json!(4)));
    }

    #[test]
    fn test_number_schema_converts() {
        let subject = Schema::number().build().unwrap();
        assert_eq!(subject.attempt(&json!("4")).unwrap(), Some(json!(4)));

        let valued = Schema::number().value(json!(1)).build().unwrap();
        assert_eq!(valued.attempt(&json!({})).unwrap(), Some(json!(1)));

        let text = Schema::number().value("2").build().unwrap();
        assert_eq!(text.attempt(&json!({})).unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_param() {
        let schema = Schema::param("x").build().unwrap();
        assert_eq!(schema.attempt(&json!({"x": 5})).unwrap(), Some(json!(5)));
    }

    #[test]
    fn test_literal_skips_every_stage() {
        let schema = Schema::number()
            .literal(json!({"not": "a number"}))
            .required()
            .strip()
            .build()
            .unwrap();
        assert_eq!(
            schema.attempt(&json!({})).unwrap(),
            Some(json!({"not": "a number"}))
        );
    }

    #[test]
    fn test_root_references_read_pristine_input() {
        let schema = Schema::value(Node::map([
            ("y", Node::reference("$x")),
            ("z", Node::map([("w", Node::reference("$a.b"))])),
        ]))
        .build()
        .unwrap();

        let value = schema.attempt(&json!({"x": 5, "a": {"b": 10}})).unwrap();
        assert_eq!(value, Some(json!({"y": 5, "z": {"w": 10}})));
    }

    #[test]
    fn test_nested_value_schemas_see_root_input() {
        let schema = Schema::value(Node::map([
            ("x", Node::literal(1)),
            (
                "y",
                Node::map([(
                    "z",
                    Node::schema(Schema::value(Node::reference("$x")).build().unwrap()),
                )]),
            ),
            (
                "w",
                Node::schema(Schema::value(Node::reference("$a.b")).build().unwrap()),
            ),
        ]))
        .build()
        .unwrap();

        let value = schema.attempt(&json!({"x": 5, "a": {"b": 10}})).unwrap();
        assert_eq!(value, Some(json!({"x": 1, "y": {"z": 5}, "w": 10})));
    }

    #[test]
    fn test_level_and_root_references_differ() {
        let schema = Schema::value(Node::map([
            ("x", Node::literal(1)),
            (
                "y",
                Node::map([
                    (
                        "z",
                        Node::schema(Schema::value(Node::reference("/x")).build().unwrap()),
                    ),
                    (
                        "w",
                        Node::schema(Schema::value(Node::reference("$x")).build().unwrap()),
                    ),
                ]),
            ),
        ]))
        .build()
        .unwrap();

        let value = schema.attempt(&json!({"x": 5, "a": {"b": 10}})).unwrap();
        assert_eq!(value, Some(json!({"x": 1, "y": {"z": 1, "w": 5}})));
    }

    #[test]
    fn test_expression_over_ancestor_and_input() {
        let sum = Expression::new(
            "^x + $a.b",
            [Reference::parse("^x"), Reference::parse("$a.b")],
            sum_of_numbers,
        );
        let schema = Schema::value(Node::map([
            ("x", Node::literal(1)),
            (
                "y",
                Node::map([("z", Node::schema(Schema::builder().expression(sum).build().unwrap()))]),
            ),
        ]))
        .build()
        .unwrap();

        let value = schema.attempt(&json!({"x": 5, "a": {"b": 10}})).unwrap();
        assert_eq!(value, Some(json!({"x": 1, "y": {"z": 11}})));
    }

    #[test]
    fn test_default_reads_resolved_sibling() {
        let schema = Schema::value(Node::map([
            (
                "z",
                Node::map([
                    ("w", Node::schema(Schema::param("a.b").build().unwrap())),
                    (
                        "aa",
                        Node::schema(
                            Schema::param("a.c")
                                .default(Reference::level(0, "y"))
                                .build()
                                .unwrap(),
                        ),
                    ),
                ]),
            ),
            ("y", Node::schema(Schema::param("x").build().unwrap())),
        ]))
        .build()
        .unwrap();

        let value = schema.attempt(&json!({"x": 5, "a": {"b": 10}})).unwrap();
        assert_eq!(value, Some(json!({"z": {"w": 10, "aa": 5}, "y": 5})));
    }

    #[test]
    fn test_dependency_ordering_regardless_of_declaration() {
        let orders = [["a", "b", "c"], ["c", "b", "a"], ["b", "c", "a"]];

        for order in orders {
            let entries = order.map(|name| {
                let node = match name {
                    "a" => Node::reference("b"),
                    "b" => Node::reference("c"),
                    _ => Node::literal(5),
                };
                (name, node)
            });
            let schema = Schema::value(Node::map(entries)).build().unwrap();

            let value = schema.attempt(&json!({})).unwrap();
            assert_eq!(value, Some(json!({"a": 5, "b": 5, "c": 5})));
        }
    }

    #[test]
    fn test_cycle_is_a_build_error() {
        let result = Schema::value(Node::map([
            ("a", Node::reference("b")),
            ("b", Node::reference("a")),
        ]))
        .build();

        assert!(matches!(result, Err(Error::DependencyCycle { .. })));
    }

    #[test]
    fn test_cycle_through_nested_schemas() {
        let result = Schema::value(Node::map([
            (
                "a",
                Node::schema(Schema::value(Node::reference("b")).build().unwrap()),
            ),
            (
                "b",
                Node::schema(Schema::any().default(Reference::sibling("a")).build().unwrap()),
            ),
        ]))
        .build();

        assert!(matches!(result, Err(Error::DependencyCycle { .. })));
    }

    #[test]
    fn test_strip_in_mappings_and_sequences() {
        let stripped = || Node::schema(Schema::any().strip().build().unwrap());
        let schema = Schema::value(Node::map([
            ("kept", Node::literal("yes")),
            ("gone", stripped()),
            (
                "list",
                Node::seq([Node::literal("item1"), stripped(), Node::literal("item3")]),
            ),
        ]))
        .build()
        .unwrap();

        let value = schema.attempt(&json!({})).unwrap().unwrap();
        assert_eq!(value, json!({"kept": "yes", "list": ["item1", "item3"]}));
        assert!(value.get("gone").is_none());
    }

    #[test]
    fn test_abort_early_returns_first_error_only() {
        let schema = Schema::value(Node::map([
            ("ok", Node::literal(1)),
            (
                "a",
                Node::schema(Schema::number().value("one").build().unwrap()),
            ),
            (
                "b",
                Node::schema(Schema::number().value("two").build().unwrap()),
            ),
        ]))
        .build()
        .unwrap();

        let early = schema
            .resolve(&json!({}), &Preferences::default().with_abort_early(true))
            .unwrap();
        assert_eq!(early.errors.len(), 1);
        assert_eq!(early.errors[0].path, vec![field("a")]);
        assert_eq!(early.value, Some(json!({"ok": 1})));

        let full = schema.resolve(&json!({}), &Preferences::default()).unwrap();
        assert_eq!(full.errors.len(), 2);
        assert_eq!(full.errors[0].path, vec![field("a")]);
        assert_eq!(full.errors[1].path, vec![field("b")]);
        assert_eq!(full.errors[1].code, "number.base");

        let error = schema.attempt(&json!({})).unwrap_err();
        match error {
            Error::Validation(errors) => assert_eq!(errors.0.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nested_error_paths_are_full() {
        let schema = Schema::value(Node::map([(
            "server",
            Node::map([("port", Node::schema(Schema::number().param("port").build().unwrap()))]),
        )]))
        .build()
        .unwrap();

        let resolution = schema
            .resolve(&json!({"port": "http"}), &Preferences::default())
            .unwrap();
        assert_eq!(resolution.errors[0].path, vec![field("server"), field("port")]);
        assert_eq!(resolution.errors[0].to_string(), "'server.port': must be a number [number.base]");
    }

    #[test]
    fn test_required() {
        let schema = Schema::param("missing").required().build().unwrap();
        let resolution = schema.resolve(&json!({}), &Preferences::default()).unwrap();
        assert_eq!(resolution.errors[0].code, "any.required");

        let defaulted = Schema::param("missing")
            .default(json!("fallback"))
            .required()
            .build()
            .unwrap();
        assert_eq!(defaulted.attempt(&json!({})).unwrap(), Some(json!("fallback")));
    }

    #[test]
    fn test_into_when_with_params() {
        let schema = Schema::value(Node::map([
            (
                "x",
                Node::schema(
                    Schema::param("a")
                        .into_when(
                            When::new()
                                .case(Case::new(json!(1)).then(Node::schema(Schema::value("one").build().unwrap())))
                                .otherwise(Node::literal(json!(null))),
                        )
                        .build()
                        .unwrap(),
                ),
            ),
            (
                "y",
                Node::map([(
                    "z",
                    Node::schema(
                        Schema::value("twelve")
                            .into_when(
                                When::new()
                                    .case(Case::new("twelve").then(Node::schema(Schema::param("c").build().unwrap())))
                                    .otherwise(Node::literal(json!(null))),
                            )
                            .build()
                            .unwrap(),
                    ),
                )]),
            ),
            (
                "w",
                Node::schema(
                    Schema::array()
                        .value(Node::seq([
                            Node::literal("item1"),
                            Node::schema(
                                Schema::param("a")
                                    .into_when(
                                        When::new()
                                            .case(Case::new(json!(2)).then(Node::literal("item2")))
                                            .otherwise(Node::schema(Schema::any().strip().build().unwrap())),
                                    )
                                    .build()
                                    .unwrap(),
                            ),
                            Node::literal("item3"),
                        ]))
                        .build()
                        .unwrap(),
                ),
            ),
        ]))
        .build()
        .unwrap();

        let value = schema
            .attempt(&json!({"a": 1, "b": "twelve", "c": ["s", "e", "e"]}))
            .unwrap();
        assert_eq!(
            value,
            Some(json!({"x": "one", "y": {"z": ["s", "e", "e"]}, "w": ["item1", "item3"]}))
        );
    }

    #[test]
    fn test_into_without_matching_case_strips() {
        let schema = Schema::value(Node::map([(
            "x",
            Node::schema(
                Schema::param("a")
                    .into_when(When::new().case(Case::new(json!(2)).then(Node::literal("one"))))
                    .build()
                    .unwrap(),
            ),
        )]))
        .build()
        .unwrap();

        assert_eq!(schema.attempt(&json!({"a": 1})).unwrap(), Some(json!({})));
    }

    #[test]
    fn test_into_with_param_matcher() {
        let schema = Schema::value(Node::map([(
            "x",
            Node::schema(
                Schema::param("a")
                    .into_when(
                        When::new()
                            .case(Case::new(Reference::root("c")).then(Node::schema(Schema::param("b").build().unwrap())))
                            .otherwise(Node::literal(json!(null))),
                    )
                    .build()
                    .unwrap(),
            ),
        )]))
        .build()
        .unwrap();

        let value = schema.attempt(&json!({"a": 1, "b": "two", "c": 1})).unwrap();
        assert_eq!(value, Some(json!({"x": "two"})));
    }

    #[test]
    fn test_into_map_default_fallback() {
        let build = |mapping: Mapping| {
            Schema::value(Node::map([(
                "v",
                Node::schema(Schema::param("a").into_map(mapping).build().unwrap()),
            )]))
            .build()
            .unwrap()
        };
        let plain = || Mapping::new().entry("one", json!(1)).entry("two", json!(2));

        let schema = build(plain());
        assert_eq!(schema.attempt(&json!({"a": "one"})).unwrap(), Some(json!({"v": 1})));
        assert_eq!(schema.attempt(&json!({"a": "three"})).unwrap(), Some(json!({})));

        let with_sentinel = build(plain().entry(DEFAULT_KEY, json!(0)));
        assert_eq!(with_sentinel.attempt(&json!({"a": "three"})).unwrap(), Some(json!({"v": 0})));

        let with_marker = build(plain().fallback(json!(0)).entry(DEFAULT_KEY, json!(-1)));
        assert_eq!(with_marker.attempt(&json!({"a": "three"})).unwrap(), Some(json!({"v": 0})));
    }

    #[test]
    fn test_mapped_targets_resolve_references() {
        let mapping = Mapping::from(vec![
            (MapKey::Value(json!("env")), Node::reference("$settings.env")),
            (MapKey::Default, Node::reference("$settings.fallback")),
        ]);
        let schema = Schema::param("source").into_map(mapping).build().unwrap();

        let input = json!({"source": "env", "settings": {"env": "prod", "fallback": "dev"}});
        assert_eq!(schema.attempt(&input).unwrap(), Some(json!("prod")));

        let input = json!({"source": "file", "settings": {"fallback": "dev"}});
        assert_eq!(schema.attempt(&input).unwrap(), Some(json!("dev")));

        // a target that resolves to nothing strips
        let input = json!({"source": "env", "settings": {}});
        assert_eq!(schema.attempt(&input).unwrap(), None);
    }

    #[test]
    fn test_conditional_target_orders_after_sibling() {
        let schema = Schema::value(Node::map([
            (
                "mode",
                Node::schema(
                    Schema::param("kind")
                        .into_when(When::new().otherwise(Node::reference("label")))
                        .build()
                        .unwrap(),
                ),
            ),
            ("label", Node::reference("$name")),
        ]))
        .build()
        .unwrap();

        let value = schema.attempt(&json!({"kind": "x", "name": "primary"})).unwrap();
        assert_eq!(value, Some(json!({"mode": "primary", "label": "primary"})));
    }

    #[test]
    fn test_registrations() {
        let schema = Schema::value(Node::map([
            ("a", Node::reference("$a")),
            ("b", Node::schema(Schema::param("b").build().unwrap())),
            ("c", Node::literal(1)),
        ]))
        .build()
        .unwrap();

        let kinds: Vec<_> = schema
            .registrations()
            .iter()
            .map(|registration| (registration.path.clone(), registration.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (vec![field("a")], TermKind::Reference),
                (vec![field("b")], TermKind::Schema),
            ]
        );
        assert!(Schema::param("x").build().unwrap().registrations().is_empty());
    }

    #[test]
    fn test_custom_validator_sees_scope() {
        #[derive(Debug)]
        struct KeyEcho;

        impl Validator for KeyEcho {
            fn validate(&self, _value: Option<Value>, scope: &Scope<'_>, _prefs: &Preferences) -> Resolution {
                Resolution::value(json!(scope.key().map(ToString::to_string)))
            }
        }

        let schema = Schema::value(Node::map([(
            "name",
            Node::schema(Schema::any().validator(KeyEcho).build().unwrap()),
        )]))
        .build()
        .unwrap();

        assert_eq!(schema.attempt(&json!({})).unwrap(), Some(json!({"name": "name"})));
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let schema = Schema::value(Node::map([
            ("b", Node::reference("a")),
            ("a", Node::reference("$a")),
        ]))
        .build()
        .unwrap();

        let input = json!({"a": [1, 2]});
        let first = schema.resolve(&input, &Preferences::default()).unwrap();
        let second = schema.resolve(&input, &Preferences::default()).unwrap();
        assert_eq!(first, second);
        assert_eq!(input, json!({"a": [1, 2]}));
    }
}
