use std::collections::BTreeMap;

use super::Value;
use super::world::{Exit, Location, Region};

/// Entity bindings visible to `name` lookups while evaluating a rule.
///
/// A rule decorating a location can refer to `location.name` or
/// `region.name`; the engine binds those objects here. Paths are
/// dot-separated and create nested maps as needed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalContext {
    data: BTreeMap<String, Value>,
}

impl EvalContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value at a dot-separated path. Creates intermediate nested maps as needed.
    #[must_use]
    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.insert(path, value.into());
        self
    }

    /// Insert a value at a dot-separated path (mutable reference version).
    pub fn insert(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        Self::insert_recursive(&mut self.data, &segments, value);
    }

    /// Look up a value by dot-separated path. Intermediate paths return the
    /// nested map.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.data.get(segments.next()?)?;
        for segment in segments {
            match current {
                Value::Map(fields) => current = fields.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bindings for a rule attached to a region.
    pub(crate) fn for_region(region: &Region) -> Self {
        Self::new().with_region(region)
    }

    /// Bindings for a rule attached to an exit of `region`.
    pub(crate) fn for_exit(region: &Region, exit: &Exit) -> Self {
        Self::new()
            .with_region(region)
            .set("exit.name", exit.name.as_str())
            .set("exit.parent_region", region.name.as_str())
            .set("exit.connected_region", exit.target.as_str())
    }

    /// Bindings for a rule attached to a location of `region`.
    pub(crate) fn for_location(region: &Region, location: &Location) -> Self {
        Self::new()
            .with_region(region)
            .set("location.name", location.name.as_str())
            .set("location.parent_region", region.name.as_str())
    }

    fn with_region(self, region: &Region) -> Self {
        let flags: Vec<Value> = region.flags.iter().map(|f| Value::from(f.as_str())).collect();
        self.set("region.name", region.name.as_str())
            .set("region.flags", Value::List(flags))
    }

    fn insert_recursive(map: &mut BTreeMap<String, Value>, segments: &[&str], value: Value) {
        match segments {
            [] => {}
            [last] => {
                map.insert((*last).to_owned(), value);
            }
            [first, rest @ ..] => {
                let entry = map
                    .entry((*first).to_owned())
                    .or_insert_with(|| Value::Map(BTreeMap::new()));
                if !matches!(entry, Value::Map(_)) {
                    *entry = Value::Map(BTreeMap::new());
                }
                if let Value::Map(nested) = entry {
                    Self::insert_recursive(nested, rest, value);
                }
            }
        }
    }
}
