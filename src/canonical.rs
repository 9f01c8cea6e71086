use crate::types::{CanonicalPath, CanonicalStep, ReachabilityMap, WorldGraph};

/// Rebuild a path to `target` from the fixpoint's unlock trace.
///
/// Follows each region's unlock record back to a start region. Returns
/// `None` for start regions, unreachable regions and regions without a
/// record.
pub(crate) fn canonical_path(
    world: &WorldGraph,
    map: &ReachabilityMap,
    target: &str,
) -> Option<CanonicalPath> {
    if world.is_start_region(target) || !map.is_region_reachable(target) {
        return None;
    }

    let mut steps = Vec::new();
    let mut current = target;
    while !world.is_start_region(current) {
        // Each region is unlocked at most once, so a longer walk means a
        // malformed trace.
        if steps.len() >= map.trace().len() {
            log::debug!("unlock trace for '{target}' does not lead to a start region");
            return None;
        }
        let record = map.unlock_record(current)?;
        steps.push(CanonicalStep {
            from: record.from.clone(),
            to: record.region.clone(),
            exit: record.exit.clone(),
        });
        current = &record.from;
    }
    steps.reverse();

    let regions = steps
        .first()
        .map(|step| step.from.clone())
        .into_iter()
        .chain(steps.iter().map(|step| step.to.clone()))
        .collect();
    Some(CanonicalPath { regions, steps })
}
