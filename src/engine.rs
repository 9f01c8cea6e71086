use std::sync::Arc;

use crate::evaluate::Evaluator;
use crate::pathfind::PathSearch;
use crate::transition::{self, Scope};
use crate::types::{
    AnalysisConfig, CanonicalPath, ClassifiedNode, Diagnostics, EvalContext, HelperRegistry,
    PathAnalysis, ReachabilityMap, RegionReport, RegionScope, ReportStatus, Rule, SearchBudget,
    SearchOutcome, StateSnapshot, Value, WorldGraph,
};

/// The explicit context every engine operation runs in: a compiled world
/// graph, the helper registry of one game and the diagnostic counters.
///
/// `LogicEngine` is `Send + Sync`; share it behind `Arc` and call it from
/// any thread. Every operation is a pure function of its arguments apart
/// from the diagnostic counters.
///
/// # Example
///
/// ```
/// use logicmap::{LogicEngine, Snapshot, WorldBuilder, has};
///
/// let world = WorldBuilder::new()
///     .start("Menu")
///     .region("Menu", |r| r.exit("Cave Entrance", "Cave", Some(has("Lantern"))))
///     .region("Cave", |r| r)
///     .compile()
///     .unwrap();
/// let engine = LogicEngine::new(world);
///
/// let map = engine.reachability(&Snapshot::new());
/// assert!(!map.is_region_reachable("Cave"));
///
/// let map = engine.reachability(&Snapshot::new().with_item("Lantern", 1));
/// assert!(map.is_region_reachable("Cave"));
/// ```
#[derive(Debug)]
pub struct LogicEngine {
    world: Arc<WorldGraph>,
    helpers: HelperRegistry,
    diagnostics: Diagnostics,
}

impl LogicEngine {
    #[must_use]
    pub fn new(world: impl Into<Arc<WorldGraph>>) -> Self {
        Self {
            world: world.into(),
            helpers: HelperRegistry::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Replace the helper registry.
    #[must_use]
    pub fn with_helpers(mut self, helpers: HelperRegistry) -> Self {
        self.helpers = helpers;
        self
    }

    #[must_use]
    pub fn world(&self) -> &WorldGraph {
        &self.world
    }

    /// Shared handle to the world graph, for building sibling engines.
    #[must_use]
    pub fn world_arc(&self) -> Arc<WorldGraph> {
        Arc::clone(&self.world)
    }

    #[must_use]
    pub fn helpers(&self) -> &HelperRegistry {
        &self.helpers
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Regions named by `can_reach` checks on the exits into `target` and
    /// on its region rules.
    fn entry_region_refs(&self, target: &str) -> Vec<&str> {
        let exit_rules = self
            .world
            .incoming_exits(target)
            .into_iter()
            .filter_map(|(_, exit)| exit.rule.as_ref());
        let region_rules = self.world.region(target).into_iter().flat_map(|r| &r.rules);
        let mut refs: Vec<&str> = exit_rules
            .chain(region_rules)
            .flat_map(Rule::referenced_regions)
            .collect();
        refs.sort_unstable();
        refs.dedup();
        refs
    }

    fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.world, &self.helpers, &self.diagnostics)
    }

    /// Evaluate a rule with no entity bindings.
    pub fn evaluate(&self, rule: &Rule, state: &dyn StateSnapshot) -> Value {
        self.evaluator().evaluate(rule, state, &EvalContext::new())
    }

    /// Evaluate a rule with entity bindings such as `location.name`.
    pub fn evaluate_in(&self, rule: &Rule, state: &dyn StateSnapshot, ctx: &EvalContext) -> Value {
        self.evaluator().evaluate(rule, state, ctx)
    }

    /// Evaluate a rule and coerce the result to a boolean.
    #[must_use]
    pub fn evaluate_bool(&self, rule: &Rule, state: &dyn StateSnapshot) -> bool {
        self.evaluate(rule, state).truthy()
    }

    pub fn reachability(&self, state: &dyn StateSnapshot) -> ReachabilityMap {
        crate::reachability::compute(&self.world, &self.evaluator(), state)
    }

    /// A resumable search for simple paths to `target`.
    #[must_use]
    pub fn path_search(&self, target: &str, config: &AnalysisConfig) -> PathSearch<'_> {
        PathSearch::new(&self.world, target, config.budget).with_chunk_size(config.chunk_size)
    }

    /// Run a path search to completion.
    pub fn find_paths(&self, target: &str, budget: SearchBudget) -> SearchOutcome {
        PathSearch::new(&self.world, target, budget).run()
    }

    /// Evaluate each transition of a path and classify its rules.
    ///
    /// With [`RegionScope::Global`] the reachability map is computed first.
    #[must_use]
    pub fn analyze_path<S: AsRef<str>>(
        &self,
        path: &[S],
        state: &dyn StateSnapshot,
        scope: RegionScope,
    ) -> PathAnalysis {
        let evaluator = self.evaluator();
        match scope {
            RegionScope::PathPrefix => {
                transition::analyze_path(&self.world, &evaluator, state, path, Scope::PathPrefix)
            }
            RegionScope::Global => {
                let map = crate::reachability::compute(&self.world, &evaluator, state);
                transition::analyze_path(&self.world, &evaluator, state, path, Scope::Global(&map))
            }
        }
    }

    /// Classify every node of a rule as a blocker or requirement.
    #[must_use]
    pub fn classify(&self, rule: &Rule, state: &dyn StateSnapshot) -> ClassifiedNode {
        transition::classify(&self.evaluator(), rule, state, &EvalContext::new())
    }

    /// Rebuild the path the fixpoint used to reach `target`.
    #[must_use]
    pub fn canonical_path(&self, map: &ReachabilityMap, target: &str) -> Option<CanonicalPath> {
        crate::canonical::canonical_path(&self.world, map, target)
    }

    /// Explain why `target` is or is not reachable.
    ///
    /// Computes reachability, searches for simple paths within the budget,
    /// analyzes each path and flags a discrepancy when the region is
    /// reachable but no viable path was found. Discrepancies carry a
    /// canonical path rebuilt from the fixpoint trace.
    pub fn explain(
        &self,
        target: &str,
        state: &dyn StateSnapshot,
        config: &AnalysisConfig,
    ) -> RegionReport {
        if !self.world.contains_region(target) {
            return RegionReport {
                target: target.to_owned(),
                status: ReportStatus::UnknownRegion,
                reachable: false,
                search: None,
                analyses: Vec::new(),
                canonical: None,
            };
        }

        let evaluator = self.evaluator();
        let map = crate::reachability::compute(&self.world, &evaluator, state);
        let reachable = map.is_region_reachable(target);
        if self.world.is_start_region(target) {
            return RegionReport {
                target: target.to_owned(),
                status: ReportStatus::StartRegion,
                reachable,
                search: None,
                analyses: Vec::new(),
                canonical: None,
            };
        }

        let search = self.path_search(target, config).run();
        let scope = match config.region_scope {
            RegionScope::PathPrefix => Scope::PathPrefix,
            RegionScope::Global => Scope::Global(&map),
        };
        let analyses: Vec<PathAnalysis> = search
            .paths
            .iter()
            .map(|path| {
                transition::analyze_path(&self.world, &evaluator, state, path.as_slice(), scope)
            })
            .collect();
        let any_viable = analyses.iter().any(|a| a.viable);

        let (status, canonical) = match (reachable, any_viable) {
            (true, true) => (ReportStatus::Reachable, None),
            (true, false) => {
                let canonical = self.canonical_path(&map, target);
                log::warn!(
                    "'{target}' is reachable but none of {} paths is viable (search {}); canonical path: {}; entry rules ask about {:?}",
                    analyses.len(),
                    search.status,
                    canonical
                        .as_ref()
                        .map_or_else(|| "none".to_owned(), ToString::to_string),
                    self.entry_region_refs(target)
                );
                (ReportStatus::Discrepancy, canonical)
            }
            (false, true) => {
                log::debug!(
                    "'{target}' is unreachable but a path is viable under {:?} scope; entry rules ask about {:?}",
                    config.region_scope,
                    self.entry_region_refs(target)
                );
                (ReportStatus::Unreachable, None)
            }
            (false, false) => (ReportStatus::Unreachable, None),
        };

        RegionReport {
            target: target.to_owned(),
            status,
            reachable,
            search: Some(search),
            analyses,
            canonical,
        }
    }
}
