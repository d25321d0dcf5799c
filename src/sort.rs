//! Stable topological ordering of named items.
//!
//! Each item may declare names it must come after. [`Sorter::sort`] returns an
//! order in which every item follows its dependencies, keeping registration
//! order between items that are not related. Names in an `after` list that
//! were never registered are ignored.
//!
//! ```
//! use dragon_values::sort::Sorter;
//!
//! let mut sorter = Sorter::new();
//! sorter.add("a", ["b"]);
//! sorter.add("b", ["c"]);
//! sorter.add("c", []);
//!
//! assert_eq!(sorter.sort().unwrap(), vec!["c", "b", "a"]);
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use crate::Error;

#[derive(Debug, Clone)]
struct Item<K> {
    name: K,
    after: Vec<K>,
}

/// Collects items with their `after` constraints.
#[derive(Debug, Clone)]
pub struct Sorter<K> {
    items: Vec<Item<K>>,
}

impl<K> Default for Sorter<K> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<K> Sorter<K>
where
    K: Clone + Eq + Hash + fmt::Display,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name`, to be placed after every name in `after`.
    pub fn add(&mut self, name: K, after: impl IntoIterator<Item = K>) {
        self.items.push(Item {
            name,
            after: after.into_iter().collect(),
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Produces the ordering.
    ///
    /// Among the items whose dependencies are all placed, the earliest
    /// registered one is placed next.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DependencyCycle`] naming an item on the cycle when no
    /// valid order exists.
    pub fn sort(&self) -> Result<Vec<K>, Error> {
        let index: HashMap<&K, usize> = self
            .items
            .iter()
            .enumerate()
            .map(|(position, item)| (&item.name, position))
            .collect();

        let mut depends_on: Vec<HashSet<usize>> = Vec::with_capacity(self.items.len());
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.items.len()];

        for (position, item) in self.items.iter().enumerate() {
            let deps: HashSet<usize> = item
                .after
                .iter()
                .filter_map(|name| index.get(name).copied())
                .filter(|&dep| dep != position)
                .collect();
            for &dep in &deps {
                dependents[dep].push(position);
            }
            depends_on.push(deps);
        }

        let mut remaining: Vec<usize> = depends_on.iter().map(HashSet::len).collect();
        let mut ready: BTreeSet<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, &count)| count == 0)
            .map(|(position, _)| position)
            .collect();

        let mut order = Vec::with_capacity(self.items.len());
        let mut placed = vec![false; self.items.len()];

        while let Some(next) = ready.pop_first() {
            placed[next] = true;
            order.push(self.items[next].name.clone());
            for &dependent in &dependents[next] {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() < self.items.len() {
            let on_cycle = find_cycle_member(&depends_on, &placed);
            let key = self.items[on_cycle].name.to_string();
            tracing::debug!(%key, "dependency cycle");
            return Err(Error::DependencyCycle { key });
        }

        Ok(order)
    }
}

/// Walks unplaced dependencies from the first unplaced item until an item
/// repeats; that item lies on a cycle.
fn find_cycle_member(depends_on: &[HashSet<usize>], placed: &[bool]) -> usize {
    let mut current = placed.iter().position(|&done| !done).unwrap_or(0);
    let mut visited = HashSet::new();

    while visited.insert(current) {
        let next = depends_on[current]
            .iter()
            .copied()
            .filter(|&dep| !placed[dep])
            .min();
        match next {
            Some(dep) => current = dep,
            None => break,
        }
    }

    current
}
