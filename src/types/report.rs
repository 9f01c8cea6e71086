use std::fmt;

use serde::Serialize;

use super::search::SearchOutcome;

/// How decisive a node is for the outcome of its enclosing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Primary,
    Secondary,
    Tertiary,
}

/// Blocker/requirement classification of one rule node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    PrimaryBlocker,
    SecondaryBlocker,
    TertiaryBlocker,
    PrimaryRequirement,
    SecondaryRequirement,
    TertiaryRequirement,
}

impl Classification {
    /// Failing nodes are blockers, passing nodes requirements.
    #[must_use]
    pub fn new(passed: bool, tier: Tier) -> Self {
        match (passed, tier) {
            (false, Tier::Primary) => Classification::PrimaryBlocker,
            (false, Tier::Secondary) => Classification::SecondaryBlocker,
            (false, Tier::Tertiary) => Classification::TertiaryBlocker,
            (true, Tier::Primary) => Classification::PrimaryRequirement,
            (true, Tier::Secondary) => Classification::SecondaryRequirement,
            (true, Tier::Tertiary) => Classification::TertiaryRequirement,
        }
    }

    #[must_use]
    pub fn is_blocker(self) -> bool {
        matches!(
            self,
            Classification::PrimaryBlocker
                | Classification::SecondaryBlocker
                | Classification::TertiaryBlocker
        )
    }

    #[must_use]
    pub fn tier(self) -> Tier {
        match self {
            Classification::PrimaryBlocker | Classification::PrimaryRequirement => Tier::Primary,
            Classification::SecondaryBlocker | Classification::SecondaryRequirement => {
                Tier::Secondary
            }
            Classification::TertiaryBlocker | Classification::TertiaryRequirement => {
                Tier::Tertiary
            }
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::PrimaryBlocker => "primary blocker",
            Classification::SecondaryBlocker => "secondary blocker",
            Classification::TertiaryBlocker => "tertiary blocker",
            Classification::PrimaryRequirement => "primary requirement",
            Classification::SecondaryRequirement => "secondary requirement",
            Classification::TertiaryRequirement => "tertiary requirement",
        };
        f.write_str(s)
    }
}

/// A rule node with its outcome and classification. Mirrors the rule tree;
/// only `and`, `or` and `not` nodes have children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedNode {
    /// The node in text rule syntax.
    pub label: String,
    pub node_type: String,
    pub passed: bool,
    pub classification: Classification,
    pub children: Vec<ClassifiedNode>,
}

impl ClassifiedNode {
    /// Depth-first iterator over this node and its descendants.
    pub fn iter(&self) -> impl Iterator<Item = &ClassifiedNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// Leaf nodes carrying the given classification.
    pub fn leaves_with(
        &self,
        classification: Classification,
    ) -> impl Iterator<Item = &ClassifiedNode> {
        self.iter()
            .filter(move |n| n.children.is_empty() && n.classification == classification)
    }
}

/// One exit of a transition and whether its rule holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitCheck {
    pub exit: String,
    pub accessible: bool,
    /// `None` for unconditional exits.
    pub rule: Option<ClassifiedNode>,
}

/// Aggregate traversability of every exit between two adjacent path regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub exits: Vec<ExitCheck>,
    /// Region-level rules of `to`; all must hold.
    pub region_rules: Vec<ClassifiedNode>,
    /// True when any exit is accessible and every region rule holds.
    pub accessible: bool,
}

/// Per-transition analysis of one candidate path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathAnalysis {
    pub regions: Vec<String>,
    pub transitions: Vec<Transition>,
    /// True when every transition is accessible.
    pub viable: bool,
}

impl PathAnalysis {
    /// The first transition that cannot be traversed.
    #[must_use]
    pub fn first_blocked(&self) -> Option<&Transition> {
        self.transitions.iter().find(|t| !t.accessible)
    }

    /// Every classified node on the path with the given classification.
    pub fn nodes_with(
        &self,
        classification: Classification,
    ) -> impl Iterator<Item = &ClassifiedNode> {
        self.transitions
            .iter()
            .flat_map(|t| {
                t.exits
                    .iter()
                    .filter_map(|e| e.rule.as_ref())
                    .chain(t.region_rules.iter())
            })
            .flat_map(|node| node.iter())
            .filter(move |n| n.classification == classification)
    }
}

impl fmt::Display for PathAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.regions.join(" -> "))?;
        if self.viable {
            write!(f, " (viable)")
        } else {
            write!(f, " (blocked)")
        }
    }
}

/// One exit taken by a canonical path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalStep {
    pub from: String,
    pub to: String,
    pub exit: String,
}

/// A path rebuilt from the reachability fixpoint's own unlock decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalPath {
    pub regions: Vec<String>,
    pub steps: Vec<CanonicalStep>,
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.steps.first() else {
            return write!(f, "{}", self.regions.join(" -> "));
        };
        write!(f, "{}", first.from)?;
        for step in &self.steps {
            write!(f, " -[{}]-> {}", step.exit, step.to)?;
        }
        Ok(())
    }
}

/// Overall verdict of [`LogicEngine::explain()`](crate::LogicEngine::explain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    StartRegion,
    /// Reachable, with at least one viable path found.
    Reachable,
    Unreachable,
    /// Reachable according to the fixpoint, but no viable path was found.
    Discrepancy,
    UnknownRegion,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReportStatus::StartRegion => "start region",
            ReportStatus::Reachable => "reachable",
            ReportStatus::Unreachable => "unreachable",
            ReportStatus::Discrepancy => "discrepancy",
            ReportStatus::UnknownRegion => "unknown region",
        };
        f.write_str(s)
    }
}

/// Explanation of why one region is or is not reachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use]
pub struct RegionReport {
    pub target: String,
    pub status: ReportStatus,
    /// The fixpoint's verdict for the target.
    pub reachable: bool,
    /// `None` when no search was needed.
    pub search: Option<SearchOutcome>,
    pub analyses: Vec<PathAnalysis>,
    /// Present only for discrepancies.
    pub canonical: Option<CanonicalPath>,
}

impl RegionReport {
    #[must_use]
    pub fn is_discrepancy(&self) -> bool {
        self.status == ReportStatus::Discrepancy
    }

    /// Unreachable according to the fixpoint, yet some analyzed path is
    /// viable. Happens when exit rules test region reachability negatively
    /// and the analysis scope sees fewer regions than the fixpoint did.
    #[must_use]
    pub fn is_scope_disagreement(&self) -> bool {
        !self.reachable
            && self.status == ReportStatus::Unreachable
            && self.viable_paths().next().is_some()
    }

    pub fn viable_paths(&self) -> impl Iterator<Item = &PathAnalysis> {
        self.analyses.iter().filter(|a| a.viable)
    }
}

impl fmt::Display for RegionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.status)?;
        if let Some(search) = &self.search {
            write!(
                f,
                ", {} of {} paths viable, search {}",
                self.viable_paths().count(),
                self.analyses.len(),
                search.status
            )?;
        }
        if let Some(canonical) = &self.canonical {
            write!(f, ", canonical {canonical}")?;
        }
        Ok(())
    }
}
