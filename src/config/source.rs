use toml::{Table, Value};

use super::ConfigError;

/// A value contributed by a source, to be merged at `path`.
#[derive(Debug, Clone)]
pub struct Layer {
    pub path: Vec<String>,
    pub value: Value,
}

impl Layer {
    /// A whole document merged at the top level.
    pub fn document(table: Table) -> Self {
        Self {
            path: Vec::new(),
            value: Value::Table(table),
        }
    }

    pub fn at(path: Vec<String>, value: Value) -> Self {
        Self { path, value }
    }
}

/// Something preferences can be loaded from.
///
/// Layers from later sources override those of earlier ones.
pub trait PreferenceSource: Send + Sync + std::fmt::Debug {
    fn layers(&self) -> Result<Vec<Layer>, ConfigError>;
}

/// Merges `value` into `table` at `path`, creating intermediate tables.
///
/// Tables are merged recursively; any other value replaces what was there.
pub fn merge_layer(table: &mut Table, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        if let Value::Table(overlay) = value {
            deep_merge(table, overlay);
        }
        return;
    };

    if rest.is_empty() {
        match (table.get_mut(first), value) {
            (Some(Value::Table(base)), Value::Table(overlay)) => deep_merge(base, overlay),
            (_, value) => {
                table.insert(first.clone(), value);
            }
        }
        return;
    }

    if !matches!(table.get(first), Some(Value::Table(_))) {
        table.insert(first.clone(), Value::Table(Table::new()));
    }
    if let Some(Value::Table(nested)) = table.get_mut(first) {
        merge_layer(nested, rest, value);
    }
}

fn deep_merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(base_table)), Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
