//! References and expressions resolved against a [`Scope`].
//!
//! A [`Reference`] pairs an [`Anchor`] with a path. The anchor chooses where
//! the walk starts:
//!
//! - [`Anchor::Root`] starts at the original input, whatever the nesting
//!   depth of the reference.
//! - [`Anchor::Relative`] starts at an enclosing container, counted upward
//!   from the reference; `Relative(1)` is the container holding the
//!   reference, so its paths name siblings.
//! - [`Anchor::Level`] starts at a container counted downward from the
//!   outermost value root; `Level(0)` is that root. Trees nested in other
//!   trees share it.
//!
//! References can also be written as strings, see [`Reference::parse`].
//!
//! A missing target resolves to undefined. Only an anchor that points past
//! the available ancestors is an error.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use crate::path::{display_path, parse_path, reach, Key, Path};
use crate::scope::Scope;
use crate::validate::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    Root,
    Relative(usize),
    Level(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    anchor: Anchor,
    path: Path,
}

impl Reference {
    pub fn new(anchor: Anchor, path: Path) -> Self {
        Self { anchor, path }
    }

    /// A reference into the original input.
    pub fn root(path: &str) -> Self {
        Self::new(Anchor::Root, parse_path(path))
    }

    /// A reference to a sibling of the referencing node.
    pub fn sibling(path: &str) -> Self {
        Self::relative(1, path)
    }

    /// A reference starting `up` containers above the referencing node.
    pub fn relative(up: usize, path: &str) -> Self {
        Self::new(Anchor::Relative(up), parse_path(path))
    }

    /// A reference starting `level` containers below the outermost value root.
    pub fn level(level: usize, path: &str) -> Self {
        Self::new(Anchor::Level(level), parse_path(path))
    }

    /// Parses the string form of a reference.
    ///
    /// | Form | Meaning |
    /// |---|---|
    /// | `$a.b` | `a.b` in the original input |
    /// | `/a.b` | `a.b` from the outermost value root |
    /// | `@2/a.b` | `a.b` from the container two levels below the root |
    /// | `a.b` | `a.b` among the siblings |
    /// | `^a.b` | `a.b` one container further up; every `^` adds a level |
    pub fn parse(text: &str) -> Self {
        if let Some(rest) = text.strip_prefix('$') {
            return Self::root(rest);
        }
        if let Some(rest) = text.strip_prefix('/') {
            return Self::level(0, rest);
        }
        if let Some((level, rest)) = text
            .strip_prefix('@')
            .and_then(|rest| rest.split_once('/'))
            .and_then(|(level, rest)| level.parse().ok().map(|level| (level, rest)))
        {
            return Self::level(level, rest);
        }

        let rest = text.trim_start_matches('^');
        Self::relative(text.len() - rest.len() + 1, rest)
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn path(&self) -> &[Key] {
        &self.path
    }

    /// Looks the reference up.
    ///
    /// # Errors
    ///
    /// Returns a `ref.ancestor` error when the anchor points past the
    /// ancestors available in `scope`.
    pub fn resolve(&self, scope: &Scope<'_>) -> Result<Option<Value>, ValidationError> {
        if self.anchor == Anchor::Root {
            return Ok(reach(scope.original(), &self.path).cloned());
        }

        let frame = scope.frame(self.anchor).ok_or_else(|| {
            ValidationError::new(
                "ref.ancestor",
                format!("reference '{self}' points past the outermost ancestor"),
            )
        })?;

        frame.read(&self.path).map_err(|error| {
            ValidationError::new(
                "ref.unresolvable",
                format!("reference '{self}' cannot be read: {error}"),
            )
        })
    }

    /// The path this reference reads, seen from a node at `position` of the
    /// same value tree. `None` when the reference leaves the tree.
    ///
    /// Level anchors are only meaningful here when the tree is the outermost
    /// one.
    pub(crate) fn target_from(&self, position: &[Key]) -> Option<Path> {
        let base = match self.anchor {
            Anchor::Root => return None,
            Anchor::Relative(up) if up >= 1 && up <= position.len() => {
                &position[..position.len() - up]
            }
            Anchor::Level(level) if level < position.len() => &position[..level],
            _ => return None,
        };

        let mut target = base.to_vec();
        target.extend(self.path.iter().cloned());
        Some(target)
    }

    /// Re-expresses a reference made `depth` levels inside a nested value
    /// tree as seen from the position of that tree, if it reaches outside it.
    pub(crate) fn escape_from(&self, depth: usize) -> Option<Reference> {
        match self.anchor {
            Anchor::Relative(up) if up > depth => {
                Some(Self::new(Anchor::Relative(up - depth), self.path.clone()))
            }
            Anchor::Level(_) => Some(self.clone()),
            _ => None,
        }
    }
}

impl From<&str> for Reference {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl FromStr for Reference {
    type Err = Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(text))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = display_path(&self.path);
        match self.anchor {
            Anchor::Root => write!(f, "${path}"),
            Anchor::Level(0) => write!(f, "/{path}"),
            Anchor::Level(level) => write!(f, "@{level}/{path}"),
            Anchor::Relative(up) => {
                for _ in 1..up {
                    f.write_str("^")?;
                }
                f.write_str(&path)
            }
        }
    }
}

/// Computes a value from the resolved arguments of an [`Expression`].
///
/// Any `Fn(&[Option<Value>]) -> Result<Option<Value>, String>` qualifies. An
/// `Err` message is reported as an `expression.eval` validation error.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, args: &[Option<Value>]) -> Result<Option<Value>, String>;
}

impl<F> Evaluator for F
where
    F: Fn(&[Option<Value>]) -> Result<Option<Value>, String> + Send + Sync,
{
    fn evaluate(&self, args: &[Option<Value>]) -> Result<Option<Value>, String> {
        self(args)
    }
}

/// A formula over one or more references.
///
/// The references are resolved in order and handed to the evaluator.
#[derive(Clone)]
pub struct Expression {
    label: String,
    references: Vec<Reference>,
    evaluator: Arc<dyn Evaluator>,
}

impl Expression {
    pub fn new<F>(label: impl Into<String>, references: impl IntoIterator<Item = Reference>, formula: F) -> Self
    where
        F: Fn(&[Option<Value>]) -> Result<Option<Value>, String> + Send + Sync + 'static,
    {
        Self::with_evaluator(label, references, Arc::new(formula))
    }

    pub fn with_evaluator(
        label: impl Into<String>,
        references: impl IntoIterator<Item = Reference>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Self {
        Self {
            label: label.into(),
            references: references.into_iter().collect(),
            evaluator,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn evaluate(&self, scope: &Scope<'_>) -> Result<Option<Value>, ValidationError> {
        let args = self
            .references
            .iter()
            .map(|reference| reference.resolve(scope))
            .collect::<Result<Vec<_>, _>>()?;

        self.evaluator.evaluate(&args).map_err(|message| {
            ValidationError::new(
                "expression.eval",
                format!("expression '{}' failed: {message}", self.label),
            )
        })
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("label", &self.label)
            .field("references", &self.references)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preferences;
    use serde_json::json;

    #[test]
    fn test_parse_forms() {
        assert_eq!(Reference::parse("$a.b"), Reference::root("a.b"));
        assert_eq!(Reference::parse("/x"), Reference::level(0, "x"));
        assert_eq!(Reference::parse("@2/x"), Reference::level(2, "x"));
        assert_eq!(Reference::parse("x"), Reference::sibling("x"));
        assert_eq!(Reference::parse("^^x.y"), Reference::relative(3, "x.y"));
        assert_eq!("^x".parse::<Reference>(), Ok(Reference::relative(2, "x")));
        assert_eq!(
            Reference::parse(&format!("@{}/x", usize::MAX)),
            Reference::level(usize::MAX, "x")
        );
    }

    #[test]
    fn test_display_matches_parse() {
        for text in ["$a.b", "/x", "@2/x", "x", "^^x.y"] {
            assert_eq!(Reference::parse(text).to_string(), text);
        }
    }

    #[test]
    fn test_target_from() {
        let position = vec![Key::from("z"), Key::from("w")];
        assert_eq!(
            Reference::sibling("aa").target_from(&position),
            Some(vec![Key::from("z"), Key::from("aa")])
        );
        assert_eq!(
            Reference::relative(2, "y").target_from(&position),
            Some(vec![Key::from("y")])
        );
        assert_eq!(
            Reference::level(0, "y").target_from(&position),
            Some(vec![Key::from("y")])
        );
        assert_eq!(Reference::relative(3, "y").target_from(&position), None);
        assert_eq!(Reference::root("y").target_from(&position), None);
    }

    #[test]
    fn test_escape_from() {
        assert_eq!(
            Reference::relative(3, "x").escape_from(2),
            Some(Reference::relative(1, "x"))
        );
        assert_eq!(Reference::relative(2, "x").escape_from(2), None);
        assert_eq!(
            Reference::level(0, "x").escape_from(0),
            Some(Reference::level(0, "x"))
        );
        assert_eq!(
            Reference::level(0, "x").escape_from(3),
            Some(Reference::level(0, "x"))
        );
        assert_eq!(Reference::root("x").escape_from(0), None);
    }

    #[test]
    fn test_root_reference_reads_original_input() {
        let input = json!({"a": {"b": 10}});
        let prefs = Preferences::default();
        let scope = Scope::new(&input, &prefs);

        assert_eq!(Reference::root("a.b").resolve(&scope), Ok(Some(json!(10))));
        assert_eq!(Reference::root("a.c").resolve(&scope), Ok(None));
    }

    #[test]
    fn test_relative_reference_without_ancestors_fails() {
        let input = json!({});
        let prefs = Preferences::default();
        let scope = Scope::new(&input, &prefs);

        let error = Reference::sibling("x").resolve(&scope).unwrap_err();
        assert_eq!(error.code, "ref.ancestor");
    }

    #[test]
    fn test_expression_evaluates_over_references() {
        let input = json!({"x": 5, "a": {"b": 10}});
        let prefs = Preferences::default();
        let scope = Scope::new(&input, &prefs);

        let sum = Expression::new(
            "x + a.b",
            [Reference::root("x"), Reference::root("a.b")],
            |args: &[Option<Value>]| {
                let total = args
                    .iter()
                    .map(|arg| arg.as_ref().and_then(Value::as_i64).ok_or("not a number"))
                    .sum::<Result<i64, _>>()?;
                Ok(Some(json!(total)))
            },
        );

        assert_eq!(sum.evaluate(&scope), Ok(Some(json!(15))));
    }

    #[test]
    fn test_expression_failure_is_a_validation_error() {
        let input = json!({});
        let prefs = Preferences::default();
        let scope = Scope::new(&input, &prefs);

        let failing = Expression::new("broken", [], |_: &[Option<Value>]| {
            Err("no luck".to_string())
        });

        let error = failing.evaluate(&scope).unwrap_err();
        assert_eq!(error.code, "expression.eval");
        assert!(error.message.contains("no luck"));
    }
}
