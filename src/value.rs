//! Value trees and the resolution engine.
//!
//! A value tree mixes plain data with terminals: references, expressions and
//! nested schemas. [`ValueTree::compile`] discovers the terminals once and
//! fixes the order they are resolved in, so that a terminal reading a sibling
//! always runs after that sibling regardless of declaration order.
//!
//! Resolving a tree writes each terminal's result back into a copy-on-write
//! workspace over the compiled tree. Later terminals see earlier results
//! through their ancestor frames, while root references keep reading the
//! original input. A terminal resolving to nothing is removed from its
//! container.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use crate::path::{display_path, overlaps, Key, Path};
use crate::reference::{Anchor, Expression, Reference};
use crate::schema::Schema;
use crate::scope::{Frame, Scope};
use crate::sort::Sorter;
use crate::traverse::{find_paths, materialize, set_shallow, Arena, Entry, NodeId, Store, Update, Workspace};
use crate::validate::Resolution;
use crate::Error;

/// A leaf of a value tree.
#[derive(Debug, Clone)]
pub enum Term {
    /// Returned as is; objects and arrays inside are not looked into.
    Literal(Value),
    Reference(Reference),
    Expression(Expression),
    Schema(Box<Schema>),
}

/// The kinds of terminal registered when a tree is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Reference,
    Expression,
    Schema,
}

impl Term {
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Term::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// `None` for literals, which need no resolution.
    pub fn kind(&self) -> Option<TermKind> {
        match self {
            Term::Literal(_) => None,
            Term::Reference(_) => Some(TermKind::Reference),
            Term::Expression(_) => Some(TermKind::Expression),
            Term::Schema(_) => Some(TermKind::Schema),
        }
    }

    /// References this term reads from its own position.
    pub(crate) fn dependencies(&self) -> Vec<Reference> {
        match self {
            Term::Literal(_) => Vec::new(),
            Term::Reference(reference) => vec![reference.clone()],
            Term::Expression(expression) => expression.references().to_vec(),
            Term::Schema(schema) => schema.outer_references(),
        }
    }

    pub(crate) fn resolve(&self, scope: &Scope<'_>) -> Result<Resolution, Error> {
        match self {
            Term::Literal(value) => Ok(Resolution::value(value.clone())),
            Term::Reference(reference) => Ok(Resolution::from_lookup(reference.resolve(scope))),
            Term::Expression(expression) => Ok(Resolution::from_lookup(expression.evaluate(scope))),
            Term::Schema(schema) => schema.validate(scope),
        }
    }
}

/// The authoring form of a value tree.
///
/// `Node::from(Value)` turns objects and arrays into composite nodes so that
/// terminals can be placed anywhere inside; [`Node::literal`] keeps a whole
/// value opaque instead.
#[derive(Debug, Clone)]
pub enum Node {
    Term(Term),
    Map(Vec<(String, Node)>),
    Seq(Vec<Node>),
}

impl Node {
    pub fn literal(value: impl Into<Value>) -> Self {
        Node::Term(Term::Literal(value.into()))
    }

    pub fn reference(reference: impl Into<Reference>) -> Self {
        Node::Term(Term::Reference(reference.into()))
    }

    pub fn expression(expression: Expression) -> Self {
        Node::Term(Term::Expression(expression))
    }

    pub fn schema(schema: Schema) -> Self {
        Node::Term(Term::Schema(Box::new(schema)))
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Self {
        Node::Map(
            entries
                .into_iter()
                .map(|(name, node)| (name.into(), node))
                .collect(),
        )
    }

    pub fn seq(items: impl IntoIterator<Item = Node>) -> Self {
        Node::Seq(items.into_iter().collect())
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Node::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
            Value::Array(items) => Node::Seq(items.into_iter().map(Node::from).collect()),
            scalar => Node::Term(Term::Literal(scalar)),
        }
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::literal(text)
    }
}

impl From<Term> for Node {
    fn from(term: Term) -> Self {
        Node::Term(term)
    }
}

impl From<Reference> for Node {
    fn from(reference: Reference) -> Self {
        Node::reference(reference)
    }
}

impl From<Expression> for Node {
    fn from(expression: Expression) -> Self {
        Node::expression(expression)
    }
}

impl From<Schema> for Node {
    fn from(schema: Schema) -> Self {
        Node::schema(schema)
    }
}

/// A terminal discovered at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub path: Path,
    pub kind: TermKind,
}

/// A compiled value tree.
#[derive(Debug, Clone)]
pub struct ValueTree {
    arena: Arena<Term>,
    root: NodeId,
    registrations: Vec<Registration>,
    order: Vec<Path>,
    /// Order when the tree is the outermost one, where level references
    /// land inside it. Holds the cycle key if that order does not exist.
    rooted_order: Result<Vec<Path>, String>,
}

impl ValueTree {
    /// Compiles a node into a tree and fixes the resolution order of its
    /// terminals.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DependencyCycle`] when terminals reference each other
    /// in a cycle.
    pub fn compile(node: impl Into<Node>) -> Result<Self, Error> {
        let mut arena = Arena::new();
        let root = insert_node(&mut arena, node.into());

        let mut terminals = find_paths(&arena, root, |entry: &Entry<Term>, _: &[Key]| {
            matches!(entry, Entry::Leaf(term) if term.kind().is_some())
        });
        // declaration order
        terminals.reverse();

        let registrations = terminals
            .iter()
            .filter_map(|path| {
                let kind = term_at(&arena, root, path)?.kind()?;
                Some(Registration {
                    path: path.clone(),
                    kind,
                })
            })
            .collect();

        let order = dependency_order(&arena, root, &terminals, false)?;
        let rooted_order = match dependency_order(&arena, root, &terminals, true) {
            Ok(rooted) => Ok(rooted),
            Err(Error::DependencyCycle { key }) => Err(key),
            Err(other) => return Err(other),
        };
        tracing::debug!(terminals = terminals.len(), "compiled value tree");

        Ok(Self {
            arena,
            root,
            registrations,
            order,
            rooted_order,
        })
    }

    /// Terminals in declaration order.
    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// Terminal paths in the order they are resolved when the tree is nested
    /// in another one.
    pub fn order(&self) -> &[Path] {
        &self.order
    }

    /// References made inside the tree that reach outside of it, expressed
    /// from the tree's own position.
    pub(crate) fn escaping_references(&self) -> Vec<Reference> {
        self.registrations
            .iter()
            .filter_map(|registration| {
                term_at(&self.arena, self.root, &registration.path)
                    .map(|term| (registration.path.len(), term))
            })
            .flat_map(|(depth, term)| {
                term.dependencies()
                    .into_iter()
                    .filter_map(move |reference| reference.escape_from(depth))
            })
            .collect()
    }

    /// Resolves every terminal in dependency order.
    ///
    /// Errors from a terminal are prefixed with its path. With `abort_early`
    /// the first failing terminal ends the pass and the partially resolved
    /// value is returned; the failing terminal and the unresolved ones are
    /// left out of it.
    ///
    /// A tree resolved without ancestors is the outermost one, so level
    /// references count from its root and take part in its ordering. A
    /// cycle through level references is reported here, before any terminal
    /// is resolved.
    pub(crate) fn resolve(&self, scope: &Scope<'_>) -> Result<Resolution, Error> {
        let order = if scope.ancestors().is_empty() {
            self.rooted_order
                .as_ref()
                .map_err(|key| Error::DependencyCycle { key: key.clone() })?
        } else {
            &self.order
        };

        let mut workspace = Workspace::new(&self.arena);
        let mut clones = HashSet::new();
        let mut root = Some(self.root);
        let mut errors = Vec::new();
        let mut stripped = Vec::new();

        for path in order {
            let (Some(current), Some(term)) = (root, term_at(&self.arena, self.root, path)) else {
                continue;
            };

            let resolution = {
                let frames = ancestors(&workspace, current, path)?;
                let local = scope.localize(path, frames);
                tracing::trace!(path = %display_path(local.path()), "resolving terminal");
                term.resolve(&local)?
            };

            let failed = !resolution.is_ok();
            errors.extend(resolution.errors.into_iter().map(|error| error.within(path)));

            if failed && scope.prefs().abort_early {
                let value = match root {
                    Some(id) => snapshot(&workspace, id)?,
                    None => None,
                };
                return Ok(Resolution::new(value, errors));
            }

            match resolution.value {
                Some(value) => {
                    root = set_shallow(
                        &mut workspace,
                        current,
                        path,
                        Update::Set(Entry::Leaf(Term::Literal(value))),
                        &mut clones,
                    )?;
                }
                // Removal waits until the end so sequence indices of the
                // remaining terminals stay valid.
                None => stripped.push(path.clone()),
            }
        }

        stripped.sort();
        for path in stripped.iter().rev() {
            if let Some(current) = root {
                root = set_shallow(&mut workspace, current, path, Update::Strip, &mut clones)?;
            }
        }

        let value = match root {
            Some(id) => snapshot(&workspace, id)?,
            None => None,
        };
        Ok(Resolution::new(value, errors))
    }
}

fn insert_node(arena: &mut Arena<Term>, node: Node) -> NodeId {
    match node {
        Node::Term(term) => arena.insert(Entry::Leaf(term)),
        Node::Map(entries) => {
            let children = entries
                .into_iter()
                .map(|(name, child)| (name, insert_node(arena, child)))
                .collect();
            arena.insert(Entry::Map(children))
        }
        Node::Seq(items) => {
            let children = items
                .into_iter()
                .map(|child| insert_node(arena, child))
                .collect();
            arena.insert(Entry::Seq(children))
        }
    }
}

fn term_at<'t, S>(store: &'t S, root: NodeId, path: &[Key]) -> Option<&'t Term>
where
    S: Store<Term> + ?Sized,
{
    let mut current = root;
    for key in path {
        current = store.entry(current).child(key)?;
    }
    match store.entry(current) {
        Entry::Leaf(term) => Some(term),
        _ => None,
    }
}

/// The containers enclosing `path`, innermost first.
fn ancestors<'w>(store: &'w dyn Store<Term>, root: NodeId, path: &[Key]) -> Result<Vec<Frame<'w>>, Error> {
    let mut frames = Vec::with_capacity(path.len());
    let mut current = root;

    for key in path {
        frames.push(Frame::new(store, current));
        current = store
            .entry(current)
            .child(key)
            .ok_or_else(|| Error::InvalidPath {
                path: display_path(path),
            })?;
    }

    frames.reverse();
    Ok(frames)
}

fn snapshot(store: &dyn Store<Term>, root: NodeId) -> Result<Option<Value>, Error> {
    materialize(store, root, &|term: &Term| term.as_literal().cloned())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TerminalPath(Path);

impl fmt::Display for TerminalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_path(&self.0))
    }
}

/// Orders terminals so that each one follows every terminal it reads.
///
/// Level references only point into this tree when it is the outermost one,
/// so they add edges only when `rooted` is set.
fn dependency_order(
    arena: &Arena<Term>,
    root: NodeId,
    terminals: &[Path],
    rooted: bool,
) -> Result<Vec<Path>, Error> {
    let mut sorter = Sorter::new();

    for path in terminals {
        let Some(term) = term_at(arena, root, path) else {
            continue;
        };

        let after: Vec<TerminalPath> = term
            .dependencies()
            .iter()
            .filter(|reference| rooted || !matches!(reference.anchor(), Anchor::Level(_)))
            .filter_map(|reference| reference.target_from(path))
            .flat_map(|target| {
                terminals
                    .iter()
                    .filter(move |other| *other != path && overlaps(other, &target))
                    .cloned()
            })
            .map(TerminalPath)
            .collect();

        sorter.add(TerminalPath(path.clone()), after);
    }

    Ok(sorter.sort()?.into_iter().map(|terminal| terminal.0).collect())
}
