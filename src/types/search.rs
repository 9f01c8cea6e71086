use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The three independent caps on a path search. Whichever triggers first wins.
///
/// Deserializes from JSON with missing fields taking their defaults. Values
/// are used as given; clamping belongs to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchBudget {
    /// Stop once this many simple paths have been found.
    pub max_paths: usize,
    /// Ceiling on individual edge expansions.
    pub max_iterations: usize,
    /// Wall-clock ceiling in milliseconds, checked between chunks.
    pub max_analysis_time_ms: u64,
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            max_paths: 100,
            max_iterations: 1000,
            max_analysis_time_ms: 10_000,
        }
    }
}

impl SearchBudget {
    #[must_use]
    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn with_max_analysis_time(mut self, limit: Duration) -> Self {
        self.max_analysis_time_ms = limit.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn max_analysis_time(&self) -> Duration {
        Duration::from_millis(self.max_analysis_time_ms)
    }
}

/// How region-reachability references inside exit rules are answered while
/// analyzing a path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionScope {
    /// Only regions on the path up to the transition count as reachable.
    #[default]
    PathPrefix,
    /// Use the full reachability map.
    Global,
}

/// Settings for the on-demand explanation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub budget: SearchBudget,
    /// Edge expansions per work unit between budget checks.
    pub chunk_size: usize,
    pub region_scope: RegionScope,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            budget: SearchBudget::default(),
            chunk_size: 64,
            region_scope: RegionScope::default(),
        }
    }
}

impl AnalysisConfig {
    #[must_use]
    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn with_region_scope(mut self, region_scope: RegionScope) -> Self {
        self.region_scope = region_scope;
        self
    }
}

/// Why a path search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// Every simple path was enumerated.
    Complete,
    PathLimit,
    IterationLimit,
    TimedOut,
    Cancelled,
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchStatus::Complete => "complete",
            SearchStatus::PathLimit => "path limit reached",
            SearchStatus::IterationLimit => "iteration limit reached",
            SearchStatus::TimedOut => "timed out",
            SearchStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Progress observed between chunks of a running search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchProgress {
    pub iterations: usize,
    pub paths_found: usize,
    /// Regions on the current partial path.
    pub depth: usize,
    pub elapsed: Duration,
}

/// Result of a path search. Partial results carry whatever was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use]
pub struct SearchOutcome {
    pub status: SearchStatus,
    /// Simple paths in discovery order, start to target inclusive.
    pub paths: Vec<Vec<String>>,
    pub iterations: usize,
    pub elapsed: Duration,
}

impl SearchOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == SearchStatus::Complete
    }

    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.status == SearchStatus::TimedOut
    }
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} paths, {} iterations, {:?})",
            self.status,
            self.paths.len(),
            self.iterations,
            self.elapsed
        )
    }
}

/// One call's worth of search work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStep {
    Pending(SearchProgress),
    Done(SearchOutcome),
}
