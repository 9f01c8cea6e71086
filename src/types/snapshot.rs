use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

use super::Value;

/// Read-only view of game state consulted by rule evaluation.
///
/// The engine only ever calls these queries; any conforming implementation
/// (a tracker's live state, a test double) can be substituted for the
/// bundled [`Snapshot`].
pub trait StateSnapshot {
    fn has_item(&self, item: &str) -> bool {
        self.count_item(item) > 0
    }

    fn count_item(&self, item: &str) -> i64;

    /// Count for a group the world graph does not define itself.
    fn count_group(&self, group: &str) -> i64;

    fn has_flag(&self, flag: &str) -> bool;

    fn get_setting(&self, name: &str) -> Option<Value>;

    fn is_region_reachable(&self, region: &str) -> bool;

    fn is_location_checked(&self, location: &str) -> bool;
}

/// An immutable state snapshot: inventory counts, flags, settings,
/// previously computed region reachability and checked locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    #[serde(deserialize_with = "non_negative_counts")]
    items: HashMap<String, i64>,
    #[serde(deserialize_with = "non_negative_counts")]
    groups: HashMap<String, i64>,
    flags: HashSet<String>,
    settings: HashMap<String, Value>,
    regions: HashSet<String>,
    checked: HashSet<String>,
}

impl Snapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the held count of an item. Negative counts are stored as zero.
    #[must_use]
    pub fn with_item(mut self, item: &str, count: i64) -> Self {
        self.set_item(item, count);
        self
    }

    #[must_use]
    pub fn with_group_count(mut self, group: &str, count: i64) -> Self {
        self.groups.insert(group.to_owned(), count.max(0));
        self
    }

    #[must_use]
    pub fn with_flag(mut self, flag: &str) -> Self {
        self.flags.insert(flag.to_owned());
        self
    }

    #[must_use]
    pub fn with_setting(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.settings.insert(name.to_owned(), value.into());
        self
    }

    /// Mark a region as reachable in the prior-reachability map.
    #[must_use]
    pub fn with_region(mut self, region: &str) -> Self {
        self.regions.insert(region.to_owned());
        self
    }

    #[must_use]
    pub fn with_regions<'a>(mut self, regions: impl IntoIterator<Item = &'a str>) -> Self {
        self.regions.extend(regions.into_iter().map(str::to_owned));
        self
    }

    #[must_use]
    pub fn with_checked(mut self, location: &str) -> Self {
        self.checked.insert(location.to_owned());
        self
    }

    /// Set the held count of an item (mutable reference version).
    pub fn set_item(&mut self, item: &str, count: i64) {
        self.items.insert(item.to_owned(), count.max(0));
    }
}

fn non_negative_counts<'de, D>(deserializer: D) -> Result<HashMap<String, i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let counts = HashMap::<String, i64>::deserialize(deserializer)?;
    Ok(counts
        .into_iter()
        .map(|(name, count)| (name, count.max(0)))
        .collect())
}

impl StateSnapshot for Snapshot {
    fn count_item(&self, item: &str) -> i64 {
        self.items.get(item).copied().unwrap_or(0)
    }

    fn count_group(&self, group: &str) -> i64 {
        self.groups.get(group).copied().unwrap_or(0)
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    fn get_setting(&self, name: &str) -> Option<Value> {
        self.settings.get(name).cloned()
    }

    fn is_region_reachable(&self, region: &str) -> bool {
        self.regions.contains(region)
    }

    fn is_location_checked(&self, location: &str) -> bool {
        self.checked.contains(location)
    }
}

/// Delegates to a base snapshot but answers region reachability from a
/// caller-supplied predicate.
///
/// The reachability engine uses this to expose "reachable so far" during a
/// pass; the transition analyzer uses it to scope region references to a path.
pub(crate) struct RegionOverlay<'a> {
    base: &'a dyn StateSnapshot,
    reachable: &'a dyn Fn(&str) -> bool,
}

impl<'a> RegionOverlay<'a> {
    pub(crate) fn new(base: &'a dyn StateSnapshot, reachable: &'a dyn Fn(&str) -> bool) -> Self {
        Self { base, reachable }
    }
}

impl StateSnapshot for RegionOverlay<'_> {
    fn has_item(&self, item: &str) -> bool {
        self.base.has_item(item)
    }

    fn count_item(&self, item: &str) -> i64 {
        self.base.count_item(item)
    }

    fn count_group(&self, group: &str) -> i64 {
        self.base.count_group(group)
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.base.has_flag(flag)
    }

    fn get_setting(&self, name: &str) -> Option<Value> {
        self.base.get_setting(name)
    }

    fn is_region_reachable(&self, region: &str) -> bool {
        (self.reachable)(region)
    }

    fn is_location_checked(&self, location: &str) -> bool {
        self.base.is_location_checked(location)
    }
}
