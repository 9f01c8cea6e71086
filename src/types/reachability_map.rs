use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// One "this exit unlocked this region" decision made by the fixpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockRecord {
    pub region: String,
    pub from: String,
    pub exit: String,
    /// 1-based pass in which the region became reachable.
    pub pass: usize,
}

/// Region and location accessibility computed from one snapshot.
///
/// Returned by [`LogicEngine::reachability()`](crate::LogicEngine::reachability).
/// Regions absent from the map (dangling exit targets, unknown names) are
/// unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use]
pub struct ReachabilityMap {
    regions: BTreeMap<String, bool>,
    locations: BTreeMap<String, bool>,
    trace: Vec<UnlockRecord>,
    passes: usize,
    converged: bool,
}

impl ReachabilityMap {
    pub(crate) fn new(
        regions: BTreeMap<String, bool>,
        locations: BTreeMap<String, bool>,
        trace: Vec<UnlockRecord>,
        passes: usize,
        converged: bool,
    ) -> Self {
        Self {
            regions,
            locations,
            trace,
            passes,
            converged,
        }
    }

    #[must_use]
    pub fn is_region_reachable(&self, region: &str) -> bool {
        self.regions.get(region).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn is_location_accessible(&self, location: &str) -> bool {
        self.locations.get(location).copied().unwrap_or(false)
    }

    /// Every region of the world graph with its reachability.
    #[must_use]
    pub fn regions(&self) -> &BTreeMap<String, bool> {
        &self.regions
    }

    /// Every location of the world graph with its accessibility.
    #[must_use]
    pub fn locations(&self) -> &BTreeMap<String, bool> {
        &self.locations
    }

    /// Unlock decisions in the order they were made.
    #[must_use]
    pub fn trace(&self) -> &[UnlockRecord] {
        &self.trace
    }

    /// The decision that made `region` reachable. `None` for start regions
    /// and unreachable regions.
    #[must_use]
    pub fn unlock_record(&self, region: &str) -> Option<&UnlockRecord> {
        self.trace.iter().find(|record| record.region == region)
    }

    /// Number of full passes the fixpoint ran, including the final quiet one.
    #[must_use]
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// `false` only if the pass bound stopped the fixpoint while regions were
    /// still changing.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn reachable_regions(&self) -> impl Iterator<Item = &str> {
        self.regions
            .iter()
            .filter(|&(_, &reachable)| reachable)
            .map(|(name, _)| name.as_str())
    }

    pub fn accessible_locations(&self) -> impl Iterator<Item = &str> {
        self.locations
            .iter()
            .filter(|&(_, &accessible)| accessible)
            .map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn reachable_region_count(&self) -> usize {
        self.reachable_regions().count()
    }

    #[must_use]
    pub fn accessible_location_count(&self) -> usize {
        self.accessible_locations().count()
    }

    /// Reachable region names, for seeding the prior-reachability map of a
    /// later [`Snapshot`](crate::Snapshot).
    #[must_use]
    pub fn to_snapshot_regions(&self) -> Vec<&str> {
        self.reachable_regions().collect()
    }
}

impl fmt::Display for ReachabilityMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} regions reachable, {}/{} locations accessible, {} passes",
            self.reachable_region_count(),
            self.regions.len(),
            self.accessible_location_count(),
            self.locations.len(),
            self.passes,
        )?;
        if !self.converged {
            write!(f, " (not converged)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReachabilityMap {
        let regions = [("Menu", true), ("Cave", true), ("Tower", false)]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect();
        let locations = [("Chest", true), ("Altar", false)]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect();
        let trace = vec![UnlockRecord {
            region: "Cave".into(),
            from: "Menu".into(),
            exit: "Cave Entrance".into(),
            pass: 1,
        }];
        ReachabilityMap::new(regions, locations, trace, 2, true)
    }

    #[test]
    fn lookups() {
        let map = sample();
        assert!(map.is_region_reachable("Cave"));
        assert!(!map.is_region_reachable("Tower"));
        assert!(!map.is_region_reachable("Nowhere"));
        assert!(map.is_location_accessible("Chest"));
        assert!(!map.is_location_accessible("Altar"));
        assert_eq!(map.reachable_region_count(), 2);
        assert_eq!(map.accessible_location_count(), 1);
        assert_eq!(map.to_snapshot_regions(), vec!["Cave", "Menu"]);
    }

    #[test]
    fn unlock_record_lookup() {
        let map = sample();
        assert_eq!(map.unlock_record("Cave").unwrap().exit, "Cave Entrance");
        assert!(map.unlock_record("Menu").is_none());
    }

    #[test]
    fn display() {
        assert_eq!(
            sample().to_string(),
            "2/3 regions reachable, 1/2 locations accessible, 2 passes"
        );
    }
}
