//! Conditional re-mapping of resolved values.
//!
//! A [`When`] compares a discriminator against a list of cases and resolves
//! the `then` node of the first one that matches, falling back to
//! `otherwise`. A branch without a node strips the value: a missing mapping
//! omits the key instead of passing the original through.
//!
//! [`Mapping`] is the table form of the same thing, for discrete
//! value-to-value maps.

use indexmap::IndexMap;
use serde_json::Value;

use crate::path::{parse_path, reach, Path};
use crate::reference::Reference;
use crate::schema::Schema;
use crate::scope::Scope;
use crate::validate::{Resolution, ValidationError};
use crate::value::{Node, ValueTree};
use crate::Error;

/// The string key that marks the fallback entry of a [`Mapping`].
pub const DEFAULT_KEY: &str = "$default";

/// How a case decides whether it applies.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Resolves the node and compares the result with the discriminator.
    Equals(Node),
    /// Validates the discriminator; matches when there are no errors.
    Schema(Schema),
}

impl From<Value> for Matcher {
    fn from(value: Value) -> Self {
        Matcher::Equals(Node::literal(value))
    }
}

impl From<&str> for Matcher {
    fn from(text: &str) -> Self {
        Matcher::Equals(Node::literal(text))
    }
}

impl From<Reference> for Matcher {
    fn from(reference: Reference) -> Self {
        Matcher::Equals(Node::reference(reference))
    }
}

impl From<Schema> for Matcher {
    fn from(schema: Schema) -> Self {
        Matcher::Schema(schema)
    }
}

#[derive(Debug, Clone)]
pub struct Case {
    is: Matcher,
    then: Option<Node>,
}

impl Case {
    pub fn new(is: impl Into<Matcher>) -> Self {
        Self {
            is: is.into(),
            then: None,
        }
    }

    pub fn then(mut self, node: impl Into<Node>) -> Self {
        self.then = Some(node.into());
        self
    }
}

/// An ordered list of cases plus a fallback.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct When {
    subject: Option<Path>,
    cases: Vec<Case>,
    otherwise: Option<Node>,
}

impl When {
    /// Cases are compared against the resolved value itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cases are compared against the value at `path` inside the resolved
    /// value.
    pub fn on(path: &str) -> Self {
        Self {
            subject: Some(parse_path(path)),
            ..Self::default()
        }
    }

    pub fn case(mut self, case: Case) -> Self {
        self.cases.push(case);
        self
    }

    pub fn otherwise(mut self, node: impl Into<Node>) -> Self {
        self.otherwise = Some(node.into());
        self
    }

    pub(crate) fn compile(self) -> Result<Conditional, Error> {
        let branches = self
            .cases
            .into_iter()
            .map(|case| {
                let is = match case.is {
                    Matcher::Equals(node) => Compiled::Equals(ValueTree::compile(node)?),
                    Matcher::Schema(schema) => Compiled::Schema(Box::new(schema)),
                };
                let then = case.then.map(ValueTree::compile).transpose()?;
                Ok(Branch { is, then })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Conditional {
            subject: self.subject,
            branches,
            otherwise: self.otherwise.map(ValueTree::compile).transpose()?,
        })
    }
}

#[derive(Debug, Clone)]
enum Compiled {
    Equals(ValueTree),
    Schema(Box<Schema>),
}

#[derive(Debug, Clone)]
struct Branch {
    is: Compiled,
    then: Option<ValueTree>,
}

enum Verdict {
    Match,
    Miss,
    Failed(Vec<ValidationError>),
}

impl Compiled {
    fn check(&self, discriminator: Option<&Value>, scope: &Scope<'_>) -> Result<Verdict, Error> {
        match self {
            Compiled::Equals(tree) => {
                let resolution = tree.resolve(scope)?;
                if !resolution.is_ok() {
                    return Ok(Verdict::Failed(resolution.errors));
                }
                Ok(if resolution.value.as_ref() == discriminator {
                    Verdict::Match
                } else {
                    Verdict::Miss
                })
            }
            Compiled::Schema(schema) => {
                let nested = scope.nest("is", discriminator);
                let resolution = schema.validate(&nested)?;
                Ok(if resolution.is_ok() {
                    Verdict::Match
                } else {
                    Verdict::Miss
                })
            }
        }
    }

    fn references(&self) -> Vec<Reference> {
        match self {
            Compiled::Equals(tree) => tree.escaping_references(),
            Compiled::Schema(schema) => schema.outer_references(),
        }
    }
}

/// A compiled [`When`], attached to a schema.
#[derive(Debug, Clone)]
pub(crate) struct Conditional {
    subject: Option<Path>,
    branches: Vec<Branch>,
    otherwise: Option<ValueTree>,
}

impl Conditional {
    /// Maps `value` through the first matching branch.
    ///
    /// Matcher errors end the mapping; they are returned together with the
    /// unmapped value.
    pub(crate) fn apply(&self, value: Option<Value>, scope: &Scope<'_>) -> Result<Resolution, Error> {
        let discriminator = match &self.subject {
            Some(path) => value.as_ref().and_then(|value| reach(value, path)).cloned(),
            None => value.clone(),
        };

        let mut selected = None;
        for (index, branch) in self.branches.iter().enumerate() {
            match branch.is.check(discriminator.as_ref(), scope)? {
                Verdict::Match => {
                    tracing::trace!(case = index, "conditional matched");
                    selected = Some(&branch.then);
                    break;
                }
                Verdict::Miss => {}
                Verdict::Failed(errors) => return Ok(Resolution::new(value, errors)),
            }
        }

        let target = selected.unwrap_or(&self.otherwise);
        match target {
            Some(tree) => tree.resolve(scope),
            None => Ok(Resolution::undefined()),
        }
    }

    /// References made by matchers and branches that reach outside of them.
    pub(crate) fn escaping_references(&self) -> Vec<Reference> {
        let mut references = Vec::new();
        for branch in &self.branches {
            references.extend(branch.is.references());
            if let Some(tree) = &branch.then {
                references.extend(tree.escaping_references());
            }
        }
        if let Some(tree) = &self.otherwise {
            references.extend(tree.escaping_references());
        }
        references
    }
}

/// Keys of a [`Mapping`].
#[derive(Debug, Clone, PartialEq)]
pub enum MapKey {
    Value(Value),
    /// The fallback entry. Takes precedence over a [`DEFAULT_KEY`] entry.
    Default,
}

/// A discrete value-to-value map.
///
/// ```
/// use dragon_values::{Mapping, Schema};
/// use serde_json::json;
///
/// let schema = Schema::param("a")
///     .into_map(Mapping::new().entry("one", json!(1)).entry("two", json!(2)))
///     .build()?;
///
/// assert_eq!(schema.attempt(&json!({"a": "two"}))?, Some(json!(2)));
/// assert_eq!(schema.attempt(&json!({"a": "three"}))?, None);
/// # Ok::<(), dragon_values::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Mapping {
    entries: Vec<(MapKey, Node)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, key: impl Into<Value>, node: impl Into<Node>) -> Self {
        self.entries.push((MapKey::Value(key.into()), node.into()));
        self
    }

    pub fn fallback(mut self, node: impl Into<Node>) -> Self {
        self.entries.push((MapKey::Default, node.into()));
        self
    }

    /// Turns the table into equality cases, in entry order.
    pub fn into_when(self) -> When {
        let mut marker = None;
        let mut sentinel = None;
        let mut when = When::new();

        for (key, node) in self.entries {
            match key {
                MapKey::Default => marker = Some(node),
                MapKey::Value(Value::String(name)) if name == DEFAULT_KEY => sentinel = Some(node),
                MapKey::Value(value) => {
                    when = when.case(Case::new(Matcher::Equals(Node::literal(value))).then(node));
                }
            }
        }

        match marker.or(sentinel) {
            Some(node) => when.otherwise(node),
            None => when,
        }
    }
}

impl From<Vec<(MapKey, Node)>> for Mapping {
    fn from(entries: Vec<(MapKey, Node)>) -> Self {
        Self { entries }
    }
}

impl From<Vec<(Value, Node)>> for Mapping {
    fn from(entries: Vec<(Value, Node)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, node)| (MapKey::Value(key), node))
                .collect(),
        }
    }
}

impl From<IndexMap<String, Node>> for Mapping {
    fn from(entries: IndexMap<String, Node>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, node)| (MapKey::Value(Value::String(key)), node))
                .collect(),
        }
    }
}

impl From<serde_json::Map<String, Value>> for Mapping {
    fn from(entries: serde_json::Map<String, Value>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, value)| (MapKey::Value(Value::String(key)), Node::from(value)))
                .collect(),
        }
    }
}
