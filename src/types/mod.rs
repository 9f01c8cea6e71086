mod context;
mod diagnostics;
mod error;
mod helpers;
mod reachability_map;
mod report;
mod rule;
mod search;
mod snapshot;
mod value;
mod world;

pub use context::EvalContext;
pub use diagnostics::{DiagnosticCounts, Diagnostics};
pub use error::GraphError;
pub use helpers::{HelperFn, HelperRegistry};
pub use reachability_map::{ReachabilityMap, UnlockRecord};
pub use report::{
    CanonicalPath, CanonicalStep, Classification, ClassifiedNode, ExitCheck, PathAnalysis,
    RegionReport, ReportStatus, Tier, Transition,
};
pub(crate) use rule::is_region_method;
pub use rule::{
    CompareOp, Operand, Rule, all, any, can_reach, compare, constant, count, group, has, helper,
    name, state_method,
};
pub use search::{
    AnalysisConfig, RegionScope, SearchBudget, SearchOutcome, SearchProgress, SearchStatus,
    SearchStep,
};
pub(crate) use snapshot::RegionOverlay;
pub use snapshot::{Snapshot, StateSnapshot};
pub use value::Value;
pub use world::{Exit, Location, Region, RegionBuilder, WorldBuilder, WorldDocument, WorldGraph};
