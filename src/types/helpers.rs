use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::snapshot::StateSnapshot;
use super::value::Value;

/// A game-specific rule helper: `(snapshot, args) -> value`.
pub type HelperFn = dyn Fn(&dyn StateSnapshot, &[Value]) -> Value + Send + Sync;

/// Per-game table of helper functions, looked up by name at evaluation time.
///
/// A registry is injected into a [`LogicEngine`](crate::LogicEngine); there is
/// no global registration. Evaluating an unregistered name fails safe to `false`.
#[derive(Clone, Default)]
pub struct HelperRegistry {
    helpers: HashMap<String, Arc<HelperFn>>,
}

impl HelperRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a helper, replacing any previous helper of the same name.
    #[must_use]
    pub fn with<F>(mut self, name: &str, helper: F) -> Self
    where
        F: Fn(&dyn StateSnapshot, &[Value]) -> Value + Send + Sync + 'static,
    {
        self.register(name, helper);
        self
    }

    /// Register a helper (mutable reference version).
    pub fn register<F>(&mut self, name: &str, helper: F)
    where
        F: Fn(&dyn StateSnapshot, &[Value]) -> Value + Send + Sync + 'static,
    {
        self.helpers.insert(name.to_owned(), Arc::new(helper));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HelperFn> {
        self.helpers.get(name).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }
}

impl fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.helpers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("HelperRegistry")
            .field("helpers", &names)
            .finish()
    }
}
