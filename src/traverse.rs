//! Tree storage and traversal.
//!
//! Trees are kept in an append-only [`Arena`] of [`Entry`] values addressed by
//! [`NodeId`]. Because children are referenced by id, a container may be shared
//! between several parents or even contain itself; [`find_paths`] and
//! [`materialize`] guard against both.
//!
//! Updates never touch existing entries in place. [`set_shallow`] copies the
//! containers along the updated path (once per pass, tracked by a clone set)
//! and writes only into those copies, so the original tree stays intact and
//! untouched branches are shared by id.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;

use crate::path::{display_path, Key, Path};
use crate::Error;

/// Identity of an entry inside a [`Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// One node of a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry<T> {
    Leaf(T),
    Map(IndexMap<String, NodeId>),
    Seq(Vec<NodeId>),
}

impl<T> Entry<T> {
    /// Looks up a direct child.
    pub fn child(&self, key: &Key) -> Option<NodeId> {
        match self {
            Entry::Leaf(_) => None,
            Entry::Map(map) => map.get(key.as_field().as_ref()).copied(),
            Entry::Seq(items) => key.as_index().and_then(|index| items.get(index)).copied(),
        }
    }

    /// Lists direct children in insertion (mappings) or index (sequences) order.
    pub fn children(&self) -> Vec<(Key, NodeId)> {
        match self {
            Entry::Leaf(_) => Vec::new(),
            Entry::Map(map) => map
                .iter()
                .map(|(name, id)| (Key::Field(name.clone()), *id))
                .collect(),
            Entry::Seq(items) => items
                .iter()
                .enumerate()
                .map(|(index, id)| (Key::Index(index), *id))
                .collect(),
        }
    }

    pub fn is_container(&self) -> bool {
        !matches!(self, Entry::Leaf(_))
    }
}

/// Read access to tree entries.
pub trait Store<T> {
    /// Returns the entry behind `id`.
    ///
    /// Ids are only ever handed out by the store itself, so a missing entry is
    /// a programming error and panics.
    fn entry(&self, id: NodeId) -> &Entry<T>;
}

/// Append and copy-on-write access to tree entries.
pub trait StoreMut<T>: Store<T> {
    fn push(&mut self, entry: Entry<T>) -> NodeId;

    /// Mutable access to an entry, `None` if the entry is frozen.
    fn entry_mut(&mut self, id: NodeId) -> Option<&mut Entry<T>>;
}

/// Append-only entry storage.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds an entry and returns its id.
    pub fn insert(&mut self, entry: Entry<T>) -> NodeId {
        self.entries.push(entry);
        NodeId(self.entries.len() - 1)
    }

    /// Makes `child` reachable from `parent` under `key`.
    ///
    /// The child may already be reachable elsewhere, including from itself,
    /// which is how shared and cyclic structures are built.
    pub fn link(&mut self, parent: NodeId, key: impl Into<Key>, child: NodeId) -> Result<(), Error> {
        let key = key.into();
        let path = [key.clone()];
        write_child(self, parent, &key, Some(child), &path)
    }
}

impl Arena<Value> {
    /// Splits a plain value into entries, objects and arrays becoming containers.
    pub fn insert_value(&mut self, value: &Value) -> NodeId {
        match value {
            Value::Object(map) => {
                let children = map
                    .iter()
                    .map(|(name, child)| (name.clone(), self.insert_value(child)))
                    .collect();
                self.insert(Entry::Map(children))
            }
            Value::Array(items) => {
                let children = items.iter().map(|item| self.insert_value(item)).collect();
                self.insert(Entry::Seq(children))
            }
            scalar => self.insert(Entry::Leaf(scalar.clone())),
        }
    }
}

impl<T> Store<T> for Arena<T> {
    fn entry(&self, id: NodeId) -> &Entry<T> {
        &self.entries[id.0]
    }
}

impl<T> StoreMut<T> for Arena<T> {
    fn push(&mut self, entry: Entry<T>) -> NodeId {
        self.insert(entry)
    }

    fn entry_mut(&mut self, id: NodeId) -> Option<&mut Entry<T>> {
        self.entries.get_mut(id.0)
    }
}

/// A writable overlay on top of a frozen arena.
///
/// Ids below the base length read from the base; everything pushed during the
/// overlay's lifetime lives in the overlay and is the only thing that can be
/// mutated.
#[derive(Debug)]
pub struct Workspace<'a, T> {
    base: &'a Arena<T>,
    local: Vec<Entry<T>>,
}

impl<'a, T> Workspace<'a, T> {
    pub fn new(base: &'a Arena<T>) -> Self {
        Self {
            base,
            local: Vec::new(),
        }
    }
}

impl<T> Store<T> for Workspace<'_, T> {
    fn entry(&self, id: NodeId) -> &Entry<T> {
        match id.0.checked_sub(self.base.len()) {
            Some(local) => &self.local[local],
            None => self.base.entry(id),
        }
    }
}

impl<T> StoreMut<T> for Workspace<'_, T> {
    fn push(&mut self, entry: Entry<T>) -> NodeId {
        self.local.push(entry);
        NodeId(self.base.len() + self.local.len() - 1)
    }

    fn entry_mut(&mut self, id: NodeId) -> Option<&mut Entry<T>> {
        let local = id.0.checked_sub(self.base.len())?;
        self.local.get_mut(local)
    }
}

/// Finds the paths of all entries matching `predicate`.
///
/// The walk is depth-first. A matching entry is recorded and its children are
/// not visited. Containers are visited at most once, so shared branches are
/// walked a single time and links back into an already visited container are
/// skipped. Paths come out with later siblings first, so deeper matches in a
/// later branch precede shallower matches in an earlier one, and sequence
/// indices arrive in descending order.
pub fn find_paths<T, S, F>(store: &S, root: NodeId, mut predicate: F) -> Vec<Path>
where
    S: Store<T> + ?Sized,
    F: FnMut(&Entry<T>, &[Key]) -> bool,
{
    let mut seen = HashSet::new();
    let mut paths = Vec::new();
    let mut stack = vec![(Vec::new(), root)];

    while let Some((path, id)) = stack.pop() {
        let entry = store.entry(id);

        if entry.is_container() && seen.contains(&id) {
            continue;
        }

        if predicate(entry, &path) {
            paths.push(path);
            continue;
        }

        if !entry.is_container() {
            continue;
        }

        seen.insert(id);

        for (key, child) in entry.children() {
            if !seen.contains(&child) {
                let mut child_path = path.clone();
                child_path.push(key);
                stack.push((child_path, child));
            }
        }
    }

    paths
}

/// The write performed by [`set_shallow`].
#[derive(Debug, Clone, PartialEq)]
pub enum Update<T> {
    Set(Entry<T>),
    /// Removes the key; sequence elements are removed without leaving a hole.
    Strip,
}

/// Copy-on-write update of the entry at `path`.
///
/// Containers on the path are copied unless they are already in `clones`,
/// which collects every copy made so that repeated calls within one pass
/// share a single lineage. Returns the id of the updated root, or `None` when
/// the root itself was stripped.
pub fn set_shallow<T, S>(
    store: &mut S,
    root: NodeId,
    path: &[Key],
    update: Update<T>,
    clones: &mut HashSet<NodeId>,
) -> Result<Option<NodeId>, Error>
where
    T: Clone,
    S: StoreMut<T> + ?Sized,
{
    let Some((last, parents)) = path.split_last() else {
        return Ok(match update {
            Update::Set(entry) => Some(store.push(entry)),
            Update::Strip => None,
        });
    };

    let new_root = clone_once(store, root, clones);
    let mut current = new_root;

    for key in parents {
        let child = store
            .entry(current)
            .child(key)
            .ok_or_else(|| Error::InvalidPath {
                path: display_path(path),
            })?;
        let copy = clone_once(store, child, clones);
        write_child(store, current, key, Some(copy), path)?;
        current = copy;
    }

    let child = match update {
        Update::Set(entry) => Some(store.push(entry)),
        Update::Strip => None,
    };
    write_child(store, current, last, child, path)?;

    Ok(Some(new_root))
}

fn clone_once<T, S>(store: &mut S, id: NodeId, clones: &mut HashSet<NodeId>) -> NodeId
where
    T: Clone,
    S: StoreMut<T> + ?Sized,
{
    if clones.contains(&id) {
        return id;
    }
    let copy = store.entry(id).clone();
    let copy = store.push(copy);
    clones.insert(copy);
    copy
}

fn write_child<T, S>(
    store: &mut S,
    parent: NodeId,
    key: &Key,
    child: Option<NodeId>,
    path: &[Key],
) -> Result<(), Error>
where
    S: StoreMut<T> + ?Sized,
{
    let invalid = || Error::InvalidPath {
        path: display_path(path),
    };

    match store.entry_mut(parent).ok_or_else(invalid)? {
        Entry::Map(map) => match child {
            Some(id) => {
                map.insert(key.as_field().into_owned(), id);
            }
            None => {
                map.shift_remove(key.as_field().as_ref());
            }
        },
        Entry::Seq(items) => {
            let index = key.as_index().ok_or_else(invalid)?;
            match child {
                Some(id) if index < items.len() => items[index] = id,
                Some(id) if index == items.len() => items.push(id),
                None if index < items.len() => {
                    items.remove(index);
                }
                _ => return Err(invalid()),
            }
        }
        Entry::Leaf(_) => return Err(invalid()),
    }

    Ok(())
}

/// Builds a plain value from the tree rooted at `root`.
///
/// `leaf` converts leaf payloads; leaves it maps to `None` are left out of
/// their container. Shared branches are copied into every place they occur,
/// while a container reachable from itself cannot be represented and fails
/// with [`Error::CyclicValue`].
pub fn materialize<T, S>(
    store: &S,
    root: NodeId,
    leaf: &dyn Fn(&T) -> Option<Value>,
) -> Result<Option<Value>, Error>
where
    S: Store<T> + ?Sized,
{
    let mut active = Vec::new();
    let mut path = Vec::new();
    build(store, root, leaf, &mut active, &mut path)
}

fn build<T, S>(
    store: &S,
    id: NodeId,
    leaf: &dyn Fn(&T) -> Option<Value>,
    active: &mut Vec<NodeId>,
    path: &mut Path,
) -> Result<Option<Value>, Error>
where
    S: Store<T> + ?Sized,
{
    match store.entry(id) {
        Entry::Leaf(payload) => Ok(leaf(payload)),
        Entry::Map(map) => {
            enter(active, id, path)?;
            let mut out = serde_json::Map::new();
            for (name, child) in map {
                path.push(Key::Field(name.clone()));
                if let Some(value) = build(store, *child, leaf, active, path)? {
                    out.insert(name.clone(), value);
                }
                path.pop();
            }
            active.pop();
            Ok(Some(Value::Object(out)))
        }
        Entry::Seq(items) => {
            enter(active, id, path)?;
            let mut out = Vec::with_capacity(items.len());
            for (index, child) in items.iter().enumerate() {
                path.push(Key::Index(index));
                if let Some(value) = build(store, *child, leaf, active, path)? {
                    out.push(value);
                }
                path.pop();
            }
            active.pop();
            Ok(Some(Value::Array(out)))
        }
    }
}

fn enter(active: &mut Vec<NodeId>, id: NodeId, path: &[Key]) -> Result<(), Error> {
    if active.contains(&id) {
        return Err(Error::CyclicValue {
            path: display_path(path),
        });
    }
    active.push(id);
    Ok(())
}
