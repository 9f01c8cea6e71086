use std::ops::ControlFlow;
use std::time::Instant;

use crate::types::{
    SearchBudget, SearchOutcome, SearchProgress, SearchStatus, SearchStep, WorldGraph,
};

struct Frame {
    region: usize,
    /// Distinct successor regions in exit declaration order.
    successors: Vec<usize>,
    next: usize,
}

/// Budgeted enumeration of simple paths from the start regions to a target.
///
/// Structural only: exit rules are ignored. Work happens in chunks of
/// `chunk_size` edge expansions; the time budget is checked between chunks,
/// so a host can interleave [`step()`](Self::step) with its own work and
/// cancellation latency stays bounded by the chunk size.
///
/// # Example
///
/// ```
/// use logicmap::{PathSearch, SearchBudget, SearchStatus, WorldBuilder};
///
/// let world = WorldBuilder::new()
///     .start("Menu")
///     .region("Menu", |r| r.exit("Door", "Hall", None))
///     .region("Hall", |r| r)
///     .compile()
///     .unwrap();
/// let outcome = PathSearch::new(&world, "Hall", SearchBudget::default()).run();
/// assert_eq!(outcome.status, SearchStatus::Complete);
/// assert_eq!(outcome.paths, vec![vec!["Menu".to_string(), "Hall".to_string()]]);
/// ```
pub struct PathSearch<'w> {
    world: &'w WorldGraph,
    target: Option<usize>,
    budget: SearchBudget,
    chunk_size: usize,
    stack: Vec<Frame>,
    on_path: Vec<bool>,
    next_start: usize,
    paths: Vec<Vec<String>>,
    iterations: usize,
    started: Instant,
    finished: Option<SearchStatus>,
}

impl<'w> PathSearch<'w> {
    #[must_use]
    pub fn new(world: &'w WorldGraph, target: &str, budget: SearchBudget) -> Self {
        let target_idx = world.region_indices.get(target).copied();
        if target_idx.is_none() {
            log::debug!("path search target '{target}' is not a region");
        }
        Self {
            world,
            target: target_idx,
            budget,
            chunk_size: 64,
            stack: Vec::new(),
            on_path: vec![false; world.regions.len()],
            next_start: 0,
            paths: Vec::new(),
            iterations: 0,
            started: Instant::now(),
            finished: None,
        }
    }

    /// Edge expansions per [`step()`](Self::step). Zero is treated as one.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    #[must_use]
    pub fn progress(&self) -> SearchProgress {
        SearchProgress {
            iterations: self.iterations,
            paths_found: self.paths.len(),
            depth: self.stack.len(),
            elapsed: self.started.elapsed(),
        }
    }

    /// Run one chunk of work. Once `Done` is returned, later calls return
    /// the same outcome.
    pub fn step(&mut self) -> SearchStep {
        if self.finished.is_none() {
            self.finished = self.run_chunk();
        }
        match self.finished {
            Some(status) => SearchStep::Done(self.outcome(status)),
            None => SearchStep::Pending(self.progress()),
        }
    }

    /// Stop now, keeping the paths found so far.
    pub fn cancel(&mut self) -> SearchOutcome {
        let status = *self.finished.get_or_insert(SearchStatus::Cancelled);
        self.outcome(status)
    }

    /// Drive the search to the end without interruption.
    pub fn run(self) -> SearchOutcome {
        self.run_with(|_| ControlFlow::Continue(()))
    }

    /// Drive the search, calling `hook` between chunks. Returning
    /// `ControlFlow::Break` cancels it.
    pub fn run_with<F>(mut self, mut hook: F) -> SearchOutcome
    where
        F: FnMut(&SearchProgress) -> ControlFlow<()>,
    {
        loop {
            match self.step() {
                SearchStep::Done(outcome) => return outcome,
                SearchStep::Pending(progress) => {
                    if hook(&progress).is_break() {
                        return self.cancel();
                    }
                }
            }
        }
    }

    fn run_chunk(&mut self) -> Option<SearchStatus> {
        let Some(target) = self.target else {
            return Some(SearchStatus::Complete);
        };
        if self.paths.len() >= self.budget.max_paths {
            return Some(SearchStatus::PathLimit);
        }
        if self.started.elapsed() >= self.budget.max_analysis_time() {
            log::warn!(
                "path search timed out after {} iterations with {} paths",
                self.iterations,
                self.paths.len()
            );
            return Some(SearchStatus::TimedOut);
        }

        let mut work = 0;
        while work < self.chunk_size {
            let Some(frame) = self.stack.last_mut() else {
                let Some(&start) = self.world.start.get(self.next_start) else {
                    return Some(SearchStatus::Complete);
                };
                self.next_start += 1;
                if start == target {
                    self.record(&[], start);
                    if self.paths.len() >= self.budget.max_paths {
                        return Some(SearchStatus::PathLimit);
                    }
                } else {
                    self.push(start);
                }
                continue;
            };
            let Some(&next) = frame.successors.get(frame.next) else {
                let region = frame.region;
                self.stack.pop();
                self.on_path[region] = false;
                continue;
            };
            if self.iterations >= self.budget.max_iterations {
                return Some(SearchStatus::IterationLimit);
            }
            frame.next += 1;
            self.iterations += 1;
            work += 1;

            if self.on_path[next] {
                continue;
            }
            if next == target {
                let prefix: Vec<usize> = self.stack.iter().map(|f| f.region).collect();
                self.record(&prefix, next);
                if self.paths.len() >= self.budget.max_paths {
                    return Some(SearchStatus::PathLimit);
                }
            } else {
                self.push(next);
            }
        }
        None
    }

    fn push(&mut self, region: usize) {
        let mut successors: Vec<usize> = Vec::new();
        for exit in &self.world.regions[region].exits {
            if let Some(&dst) = self.world.region_indices.get(exit.target.as_str()) {
                if !successors.contains(&dst) {
                    successors.push(dst);
                }
            }
        }
        self.on_path[region] = true;
        self.stack.push(Frame {
            region,
            successors,
            next: 0,
        });
    }

    fn record(&mut self, prefix: &[usize], target: usize) {
        let path = prefix
            .iter()
            .chain(std::iter::once(&target))
            .map(|&idx| self.world.regions[idx].name.clone())
            .collect();
        self.paths.push(path);
    }

    fn outcome(&self, status: SearchStatus) -> SearchOutcome {
        SearchOutcome {
            status,
            paths: self.paths.clone(),
            iterations: self.iterations,
            elapsed: self.started.elapsed(),
        }
    }
}
