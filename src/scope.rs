//! The resolution context threaded through every recursive call.
//!
//! A [`Scope`] is built by the top-level call and only ever derived from,
//! never mutated: [`Scope::localize`] steps into a child node and
//! [`Scope::nest`] opens a sub-validation for a different subject. The
//! original input stays reachable from every derived scope so that root
//! references always read pristine data.

use std::fmt;

use serde_json::Value;

use crate::config::Preferences;
use crate::path::{reach, Key, Path};
use crate::reference::Anchor;
use crate::traverse::{materialize, Entry, NodeId, Store};
use crate::value::Term;
use crate::Error;

/// An enclosing container of the node being resolved.
///
/// Frames point into the working tree of a resolution pass, so they see
/// siblings that were already resolved.
#[derive(Clone, Copy)]
pub struct Frame<'a> {
    store: &'a dyn Store<Term>,
    id: NodeId,
}

impl<'a> Frame<'a> {
    pub fn new(store: &'a dyn Store<Term>, id: NodeId) -> Self {
        Self { store, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Reads the value at `path` below this container.
    ///
    /// Nodes that are not resolved yet read as undefined.
    pub fn read(&self, path: &[Key]) -> Result<Option<Value>, Error> {
        let mut current = self.id;

        for (depth, key) in path.iter().enumerate() {
            let entry = self.store.entry(current);
            if let Entry::Leaf(term) = entry {
                return Ok(term
                    .as_literal()
                    .and_then(|value| reach(value, &path[depth..]))
                    .cloned());
            }
            match entry.child(key) {
                Some(child) => current = child,
                None => return Ok(None),
            }
        }

        materialize(self.store, current, &|term: &Term| term.as_literal().cloned())
    }
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Scope<'a> {
    original: &'a Value,
    subject: Option<&'a Value>,
    /// Innermost first.
    frames: Vec<Frame<'a>>,
    path: Path,
    context: Vec<String>,
    prefs: &'a Preferences,
}

impl<'a> Scope<'a> {
    /// The scope of a top-level call; the input is both the original and the
    /// subject under validation.
    pub fn new(original: &'a Value, prefs: &'a Preferences) -> Self {
        Self {
            original,
            subject: Some(original),
            frames: Vec::new(),
            path: Vec::new(),
            context: Vec::new(),
            prefs,
        }
    }

    /// The untouched top-level input.
    pub fn original(&self) -> &'a Value {
        self.original
    }

    /// The value a schema without a value source validates.
    pub fn subject(&self) -> Option<&'a Value> {
        self.subject
    }

    pub fn path(&self) -> &[Key] {
        &self.path
    }

    pub fn key(&self) -> Option<&Key> {
        self.path.last()
    }

    /// Labels of the nested validations this scope sits in.
    pub fn context(&self) -> &[String] {
        &self.context
    }

    pub fn prefs(&self) -> &'a Preferences {
        self.prefs
    }

    pub fn ancestors(&self) -> &[Frame<'a>] {
        &self.frames
    }

    /// Derives the scope of a node at `path` below the current node.
    ///
    /// `ancestors` are the containers between the current node and the new
    /// one, innermost first.
    pub fn localize<'b>(&'b self, path: &[Key], ancestors: Vec<Frame<'b>>) -> Scope<'b> {
        let mut frames = ancestors;
        frames.reserve(self.frames.len());
        for frame in &self.frames {
            frames.push(*frame);
        }

        let mut full_path = self.path.clone();
        full_path.extend(path.iter().cloned());

        Scope {
            original: self.original,
            subject: self.subject,
            frames,
            path: full_path,
            context: self.context.clone(),
            prefs: self.prefs,
        }
    }

    /// Opens a named sub-validation of `subject`, keeping the path and the
    /// ancestors of the current node.
    pub fn nest<'b>(&'b self, label: &str, subject: Option<&'b Value>) -> Scope<'b> {
        let mut frames = Vec::with_capacity(self.frames.len());
        for frame in &self.frames {
            frames.push(*frame);
        }

        let mut context = self.context.clone();
        context.push(label.to_string());

        Scope {
            original: self.original,
            subject,
            frames,
            path: self.path.clone(),
            context,
            prefs: self.prefs,
        }
    }

    /// The frame an anchor starts from.
    ///
    /// Level anchors count down from the outermost frame, the root of the
    /// value being resolved.
    pub(crate) fn frame(&self, anchor: Anchor) -> Option<Frame<'a>> {
        match anchor {
            Anchor::Root => None,
            Anchor::Relative(up) => up
                .checked_sub(1)
                .and_then(|index| self.frames.get(index))
                .copied(),
            Anchor::Level(level) => {
                let index = self.frames.len().checked_sub(level.checked_add(1)?)?;
                self.frames.get(index).copied()
            }
        }
    }
}
