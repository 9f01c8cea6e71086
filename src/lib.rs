//! Access-rule evaluation and reachability analysis for game world graphs.
//!
//! A world is a directed graph of regions joined by rule-gated exits, with
//! checkable locations inside regions. Given a [`StateSnapshot`] of the
//! player's inventory, flags and settings, [`LogicEngine`] answers:
//!
//! - which regions and locations are reachable ([`LogicEngine::reachability`]),
//! - which simple paths lead to a region ([`PathSearch`]),
//! - which rules block each step of a path ([`LogicEngine::analyze_path`]),
//! - why a region is or is not reachable ([`LogicEngine::explain`]).
//!
//! Rules are loaded from JSON documents ([`WorldGraph::from_json`]), built
//! in code ([`WorldBuilder`], [`has`], [`count`], ...) or parsed from a small
//! text syntax ([`parse_rule`]).

mod canonical;
mod compile;
mod engine;
mod error;
mod evaluate;
mod parse;
mod pathfind;
mod reachability;
#[cfg(feature = "binary-cache")]
mod serial;
mod transition;
mod types;

pub use engine::LogicEngine;
pub use error::LogicError;
pub use parse::{ParseError, parse_rule};
pub use pathfind::PathSearch;
#[cfg(feature = "binary-cache")]
pub use serial::{DeserializeError, SerializeError};
pub use types::{
    AnalysisConfig, CanonicalPath, CanonicalStep, Classification, ClassifiedNode, CompareOp,
    DiagnosticCounts, Diagnostics, EvalContext, Exit, ExitCheck, GraphError, HelperFn,
    HelperRegistry, Location, Operand, PathAnalysis, ReachabilityMap, Region, RegionBuilder,
    RegionReport, RegionScope, ReportStatus, Rule, SearchBudget, SearchOutcome, SearchProgress,
    SearchStatus, SearchStep, Snapshot, StateSnapshot, Tier, Transition, UnlockRecord, Value,
    WorldBuilder, WorldDocument, WorldGraph, all, any, can_reach, compare, constant, count, group,
    has, helper, name, state_method,
};
