use std::collections::BTreeMap;

use crate::evaluate::Evaluator;
use crate::types::{
    EvalContext, ReachabilityMap, RegionOverlay, StateSnapshot, UnlockRecord, WorldGraph,
};

/// Region/location reachability by pass-bounded fixpoint.
///
/// Start regions are seeded; each pass scans every reachable region's exits
/// in declaration order and marks a target reachable when the exit rule and
/// all of the target's region-level rules hold. `is_region_reachable`
/// queries inside rules see the regions decided so far, including those
/// decided earlier in the same pass. A pass that changes nothing ends the
/// loop; each non-final pass adds at least one region, so `region_count + 1`
/// passes always suffice.
pub(crate) fn compute(
    world: &WorldGraph,
    evaluator: &Evaluator<'_>,
    state: &dyn StateSnapshot,
) -> ReachabilityMap {
    let region_count = world.regions.len();
    let mut reachable = vec![false; region_count];
    for &start in &world.start {
        reachable[start] = true;
    }

    let max_passes = region_count + 1;
    let mut trace = Vec::new();
    let mut passes = 0;
    let mut converged = false;

    while passes < max_passes {
        passes += 1;
        let mut changed = false;
        for (src, region) in world.regions.iter().enumerate() {
            if !reachable[src] {
                continue;
            }
            for exit in &region.exits {
                let Some(&dst) = world.region_indices.get(exit.target.as_str()) else {
                    continue;
                };
                if reachable[dst] {
                    continue;
                }
                let opens = {
                    let so_far = |name: &str| {
                        world
                            .region_indices
                            .get(name)
                            .is_some_and(|&idx| reachable[idx])
                    };
                    let overlay = RegionOverlay::new(state, &so_far);
                    let target = &world.regions[dst];
                    evaluator.check_opt(
                        exit.rule.as_ref(),
                        &overlay,
                        &EvalContext::for_exit(region, exit),
                    ) && target.rules.iter().all(|rule| {
                        evaluator.check(rule, &overlay, &EvalContext::for_region(target))
                    })
                };
                if opens {
                    log::trace!(
                        "pass {passes}: '{}' unlocked by '{}' from '{}'",
                        exit.target,
                        exit.name,
                        region.name
                    );
                    reachable[dst] = true;
                    changed = true;
                    trace.push(UnlockRecord {
                        region: exit.target.clone(),
                        from: region.name.clone(),
                        exit: exit.name.clone(),
                        pass: passes,
                    });
                }
            }
        }
        log::debug!(
            "reachability pass {passes}: {} of {region_count} regions reachable",
            reachable.iter().filter(|&&r| r).count()
        );
        if !changed {
            converged = true;
            break;
        }
    }

    if !converged {
        log::warn!("reachability stopped after {passes} passes without converging");
    }

    let final_state = |name: &str| {
        world
            .region_indices
            .get(name)
            .is_some_and(|&idx| reachable[idx])
    };
    let overlay = RegionOverlay::new(state, &final_state);
    let mut locations = BTreeMap::new();
    for (idx, region) in world.regions.iter().enumerate() {
        for location in &region.locations {
            let accessible = reachable[idx]
                && evaluator.check_opt(
                    location.rule.as_ref(),
                    &overlay,
                    &EvalContext::for_location(region, location),
                );
            locations.insert(location.name.clone(), accessible);
        }
    }

    let regions = world
        .regions
        .iter()
        .zip(&reachable)
        .map(|(region, &r)| (region.name.clone(), r))
        .collect();

    ReachabilityMap::new(regions, locations, trace, passes, converged)
}
