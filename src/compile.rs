use std::collections::{HashMap, HashSet};

use crate::types::{GraphError, Region, WorldDocument, WorldGraph};

pub(crate) fn compile(document: WorldDocument) -> Result<WorldGraph, GraphError> {
    let WorldDocument {
        start_regions,
        item_groups,
        mut regions,
    } = document;

    let region_indices = index_regions(&regions)?;
    check_exits(&regions)?;
    let location_regions = index_locations(&mut regions)?;
    let start = resolve_start(&start_regions, &region_indices)?;

    let mut incoming = vec![Vec::new(); regions.len()];
    let mut dangling = Vec::new();
    for (src, region) in regions.iter().enumerate() {
        for (exit_idx, exit) in region.exits.iter().enumerate() {
            match region_indices.get(exit.target.as_str()) {
                Some(&dst) => incoming[dst].push((src, exit_idx)),
                None => {
                    log::warn!(
                        "exit '{}' in region '{}' targets undefined region '{}'; treating it as unreachable",
                        exit.name,
                        region.name,
                        exit.target
                    );
                    dangling.push((src, exit_idx));
                }
            }
        }
    }

    Ok(WorldGraph {
        regions,
        region_indices,
        start,
        item_groups,
        incoming,
        dangling,
        location_regions,
    })
}

fn index_regions(regions: &[Region]) -> Result<HashMap<String, usize>, GraphError> {
    let mut indices = HashMap::with_capacity(regions.len());
    for (idx, region) in regions.iter().enumerate() {
        if region.name.is_empty() {
            return Err(GraphError::EmptyRegionName);
        }
        if indices.insert(region.name.clone(), idx).is_some() {
            return Err(GraphError::DuplicateRegion {
                name: region.name.clone(),
            });
        }
    }
    Ok(indices)
}

fn check_exits(regions: &[Region]) -> Result<(), GraphError> {
    for region in regions {
        let mut seen = HashSet::new();
        for exit in &region.exits {
            if !seen.insert(exit.name.as_str()) {
                return Err(GraphError::DuplicateExit {
                    name: exit.name.clone(),
                    region: region.name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Location names are global; parent region names are filled in here.
fn index_locations(regions: &mut [Region]) -> Result<HashMap<String, usize>, GraphError> {
    let mut indices = HashMap::new();
    for (idx, region) in regions.iter_mut().enumerate() {
        for location in &mut region.locations {
            if indices.insert(location.name.clone(), idx).is_some() {
                return Err(GraphError::DuplicateLocation {
                    name: location.name.clone(),
                    region: region.name.clone(),
                });
            }
            location.region.clone_from(&region.name);
        }
    }
    Ok(indices)
}

fn resolve_start(
    start_regions: &[String],
    region_indices: &HashMap<String, usize>,
) -> Result<Vec<usize>, GraphError> {
    if start_regions.is_empty() {
        return Err(GraphError::NoStartRegion);
    }
    let mut start = Vec::with_capacity(start_regions.len());
    for name in start_regions {
        let &idx = region_indices
            .get(name.as_str())
            .ok_or_else(|| GraphError::UndefinedStartRegion {
                region: name.clone(),
            })?;
        if !start.contains(&idx) {
            start.push(idx);
        }
    }
    Ok(start)
}
