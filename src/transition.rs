use crate::evaluate::Evaluator;
use crate::types::{
    Classification, ClassifiedNode, EvalContext, ExitCheck, PathAnalysis, ReachabilityMap,
    RegionOverlay, Rule, StateSnapshot, Tier, Transition, WorldGraph,
};

/// Which regions count as reachable when a transition's rules ask.
#[derive(Clone, Copy)]
pub(crate) enum Scope<'a> {
    /// Regions on the path up to and including the transition's source.
    PathPrefix,
    Global(&'a ReachabilityMap),
}

/// Evaluate every transition of `path` and classify the rules involved.
pub(crate) fn analyze_path<S: AsRef<str>>(
    world: &WorldGraph,
    evaluator: &Evaluator<'_>,
    state: &dyn StateSnapshot,
    path: &[S],
    scope: Scope<'_>,
) -> PathAnalysis {
    let regions: Vec<String> = path.iter().map(|r| r.as_ref().to_owned()).collect();
    let transitions: Vec<Transition> = regions
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let prefix = &regions[..=i];
            let reachable = |name: &str| match scope {
                Scope::PathPrefix => prefix.iter().any(|r| r == name),
                Scope::Global(map) => map.is_region_reachable(name),
            };
            let overlay = RegionOverlay::new(state, &reachable);
            analyze_transition(world, evaluator, &overlay, &pair[0], &pair[1])
        })
        .collect();
    let viable = transitions.iter().all(|t| t.accessible);
    PathAnalysis {
        regions,
        transitions,
        viable,
    }
}

fn analyze_transition(
    world: &WorldGraph,
    evaluator: &Evaluator<'_>,
    state: &dyn StateSnapshot,
    from: &str,
    to: &str,
) -> Transition {
    let Some(source) = world.region(from) else {
        return blocked(from, to);
    };
    let Some(target) = world.region(to) else {
        return blocked(from, to);
    };

    let exits: Vec<_> = source.exits.iter().filter(|e| e.target == to).collect();
    let outcomes: Vec<bool> = exits
        .iter()
        .map(|exit| {
            evaluator.check_opt(
                exit.rule.as_ref(),
                state,
                &EvalContext::for_exit(source, exit),
            )
        })
        .collect();
    let any_exit = outcomes.iter().any(|&ok| ok);

    let region_ctx = EvalContext::for_region(target);
    let rule_outcomes: Vec<bool> = target
        .rules
        .iter()
        .map(|rule| evaluator.check(rule, state, &region_ctx))
        .collect();
    let all_rules = rule_outcomes.iter().all(|&ok| ok);

    // Exits are alternatives; region rules are conjuncts.
    let exit_checks = exits
        .iter()
        .enumerate()
        .map(|(i, exit)| {
            let accessible = outcomes[i];
            let rule = exit.rule.as_ref().map(|rule| {
                let tier = sibling_tier(Junction::Or, accessible, any_exit, &others(&outcomes, i));
                Classifier {
                    evaluator,
                    state,
                    ctx: &EvalContext::for_exit(source, exit),
                }
                .node(rule, accessible, tier)
            });
            ExitCheck {
                exit: exit.name.clone(),
                accessible,
                rule,
            }
        })
        .collect();
    let region_rules = target
        .rules
        .iter()
        .enumerate()
        .map(|(i, rule)| {
            let passed = rule_outcomes[i];
            let tier = sibling_tier(Junction::And, passed, all_rules, &others(&rule_outcomes, i));
            Classifier {
                evaluator,
                state,
                ctx: &region_ctx,
            }
            .node(rule, passed, tier)
        })
        .collect();

    Transition {
        from: from.to_owned(),
        to: to.to_owned(),
        exits: exit_checks,
        region_rules,
        accessible: any_exit && all_rules,
    }
}

fn blocked(from: &str, to: &str) -> Transition {
    Transition {
        from: from.to_owned(),
        to: to.to_owned(),
        exits: Vec::new(),
        region_rules: Vec::new(),
        accessible: false,
    }
}

/// Classify a standalone rule; the root is treated as decisive.
pub(crate) fn classify(
    evaluator: &Evaluator<'_>,
    rule: &Rule,
    state: &dyn StateSnapshot,
    ctx: &EvalContext,
) -> ClassifiedNode {
    let passed = evaluator.check(rule, state, ctx);
    Classifier {
        evaluator,
        state,
        ctx,
    }
    .node(rule, passed, Tier::Primary)
}

#[derive(Clone, Copy)]
enum Junction {
    And,
    Or,
}

/// Tier of a child given its own outcome, its parent's outcome and the
/// outcomes of its siblings.
fn sibling_tier(junction: Junction, passed: bool, parent_passed: bool, siblings: &[bool]) -> Tier {
    match (junction, passed) {
        (Junction::And, false) if siblings.iter().all(|&s| s) => Tier::Primary,
        (Junction::And, false) => Tier::Secondary,
        (Junction::And, true) if parent_passed => Tier::Primary,
        (Junction::And, true) => Tier::Tertiary,
        (Junction::Or, true) if siblings.iter().any(|&s| s) => Tier::Secondary,
        (Junction::Or, true) => Tier::Primary,
        (Junction::Or, false) if !parent_passed && siblings.is_empty() => Tier::Primary,
        (Junction::Or, false) => Tier::Tertiary,
    }
}

fn others(outcomes: &[bool], skip: usize) -> Vec<bool> {
    outcomes
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != skip)
        .map(|(_, &o)| o)
        .collect()
}

struct Classifier<'e, 'a> {
    evaluator: &'e Evaluator<'a>,
    state: &'e dyn StateSnapshot,
    ctx: &'e EvalContext,
}

impl Classifier<'_, '_> {
    /// A child is never more decisive than its parent.
    fn node(&self, rule: &Rule, passed: bool, tier: Tier) -> ClassifiedNode {
        let children = match rule {
            Rule::And { conditions } => self.junction(Junction::And, conditions, passed, tier),
            Rule::Or { conditions } => self.junction(Junction::Or, conditions, passed, tier),
            Rule::Not { condition } => vec![self.node(condition, !passed, tier)],
            _ => Vec::new(),
        };
        ClassifiedNode {
            label: rule.to_string(),
            node_type: rule.node_type().to_owned(),
            passed,
            classification: Classification::new(passed, tier),
            children,
        }
    }

    fn junction(
        &self,
        junction: Junction,
        conditions: &[Rule],
        parent_passed: bool,
        parent_tier: Tier,
    ) -> Vec<ClassifiedNode> {
        let outcomes: Vec<bool> = conditions
            .iter()
            .map(|c| self.evaluator.check(c, self.state, self.ctx))
            .collect();
        conditions
            .iter()
            .enumerate()
            .map(|(i, condition)| {
                let local = sibling_tier(junction, outcomes[i], parent_passed, &others(&outcomes, i));
                self.node(condition, outcomes[i], local.max(parent_tier))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Diagnostics, HelperRegistry, Snapshot};
    use crate::{WorldBuilder, can_reach, constant, has};

    fn classify_rule(rule: &Rule, state: &Snapshot) -> ClassifiedNode {
        let world = WorldBuilder::new()
            .start("Menu")
            .region("Menu", |r| r)
            .compile()
            .unwrap();
        let helpers = HelperRegistry::new();
        let diagnostics = Diagnostics::new();
        let evaluator = Evaluator::new(&world, &helpers, &diagnostics);
        classify(&evaluator, rule, state, &EvalContext::new())
    }

    fn child_classes(node: &ClassifiedNode) -> Vec<Classification> {
        node.children.iter().map(|c| c.classification).collect()
    }

    #[test]
    fn sole_failing_and_child_is_primary_blocker() {
        let rule = has("Bow").and(has("Arrows"));
        let node = classify_rule(&rule, &Snapshot::new().with_item("Bow", 1));
        assert_eq!(node.classification, Classification::PrimaryBlocker);
        assert_eq!(
            child_classes(&node),
            vec![
                Classification::TertiaryRequirement,
                Classification::PrimaryBlocker
            ]
        );
    }

    #[test]
    fn several_failing_and_children_are_secondary_blockers() {
        let rule = has("Bow").and(has("Arrows"));
        let node = classify_rule(&rule, &Snapshot::new());
        assert_eq!(
            child_classes(&node),
            vec![
                Classification::SecondaryBlocker,
                Classification::SecondaryBlocker
            ]
        );
    }

    #[test]
    fn passing_and_children_are_primary_requirements() {
        let rule = has("Bow").and(has("Arrows"));
        let state = Snapshot::new().with_item("Bow", 1).with_item("Arrows", 1);
        let node = classify_rule(&rule, &state);
        assert_eq!(node.classification, Classification::PrimaryRequirement);
        assert_eq!(
            child_classes(&node),
            vec![
                Classification::PrimaryRequirement,
                Classification::PrimaryRequirement
            ]
        );
    }

    #[test]
    fn or_alternatives() {
        let rule = has("Hookshot").or(has("Boots"));

        let one = classify_rule(&rule, &Snapshot::new().with_item("Boots", 1));
        assert_eq!(
            child_classes(&one),
            vec![
                Classification::TertiaryBlocker,
                Classification::PrimaryRequirement
            ]
        );

        let both = classify_rule(
            &rule,
            &Snapshot::new().with_item("Boots", 1).with_item("Hookshot", 1),
        );
        assert_eq!(
            child_classes(&both),
            vec![
                Classification::SecondaryRequirement,
                Classification::SecondaryRequirement
            ]
        );

        let none = classify_rule(&rule, &Snapshot::new());
        assert_eq!(none.classification, Classification::PrimaryBlocker);
        assert_eq!(
            child_classes(&none),
            vec![
                Classification::TertiaryBlocker,
                Classification::TertiaryBlocker
            ]
        );
    }

    #[test]
    fn nested_tier_never_exceeds_parent() {
        // The inner `and` is a secondary blocker, so its sole failing child
        // cannot be primary.
        let rule = has("A").and(has("B")).and(has("C").and(has("D")));
        let state = Snapshot::new().with_item("A", 1).with_item("C", 1);
        let node = classify_rule(&rule, &state);
        let inner = &node.children[2];
        assert_eq!(inner.classification, Classification::SecondaryBlocker);
        assert_eq!(
            child_classes(inner),
            vec![
                Classification::TertiaryRequirement,
                Classification::SecondaryBlocker
            ]
        );
    }

    #[test]
    fn not_passes_tier_through() {
        let rule = !has("Curse");
        let node = classify_rule(&rule, &Snapshot::new().with_item("Curse", 1));
        assert_eq!(node.classification, Classification::PrimaryBlocker);
        assert_eq!(
            child_classes(&node),
            vec![Classification::PrimaryRequirement]
        );
    }

    #[test]
    fn labels_use_text_syntax() {
        let node = classify_rule(&has("Bow"), &Snapshot::new());
        assert_eq!(node.label, r#"has("Bow")"#);
        assert_eq!(node.node_type, "item_check");
        assert!(node.children.is_empty());
    }

    fn gated_world() -> WorldGraph {
        WorldBuilder::new()
            .start("Menu")
            .region("Menu", |r| {
                r.exit("Locked Door", "Hall", Some(constant(false)))
                    .exit("Open Door", "Hall", None)
                    .exit("To Key", "KeyRoom", None)
            })
            .region("Hall", |r| r.exit("Vault Door", "Vault", Some(can_reach("KeyRoom"))))
            .region("KeyRoom", |r| r)
            .region("Vault", |r| r.rule(has("Vault Pass")))
            .compile()
            .unwrap()
    }

    fn analyze(world: &WorldGraph, path: &[&str], state: &Snapshot, scope: Scope<'_>) -> PathAnalysis {
        let helpers = HelperRegistry::new();
        let diagnostics = Diagnostics::new();
        let evaluator = Evaluator::new(world, &helpers, &diagnostics);
        analyze_path(world, &evaluator, state, path, scope)
    }

    #[test]
    fn parallel_exits_are_alternatives() {
        let world = gated_world();
        let analysis = analyze(&world, &["Menu", "Hall"], &Snapshot::new(), Scope::PathPrefix);
        assert!(analysis.viable);
        let transition = &analysis.transitions[0];
        assert_eq!(transition.exits.len(), 2);
        assert!(!transition.exits[0].accessible);
        assert!(transition.exits[1].accessible);
        assert!(transition.exits[1].rule.is_none());
        assert_eq!(
            transition.exits[0].rule.as_ref().unwrap().classification,
            Classification::TertiaryBlocker
        );
    }

    #[test]
    fn path_prefix_scope_hides_off_path_regions() {
        let world = gated_world();
        let state = Snapshot::new().with_item("Vault Pass", 1);
        let analysis = analyze(&world, &["Menu", "Hall", "Vault"], &state, Scope::PathPrefix);
        assert!(!analysis.viable);
        let blocked = analysis.first_blocked().unwrap();
        assert_eq!(blocked.from, "Hall");
        let rule = blocked.exits[0].rule.as_ref().unwrap();
        assert_eq!(rule.classification, Classification::PrimaryBlocker);
    }

    #[test]
    fn global_scope_uses_reachability_map() {
        let world = gated_world();
        let state = Snapshot::new().with_item("Vault Pass", 1);
        let helpers = HelperRegistry::new();
        let diagnostics = Diagnostics::new();
        let evaluator = Evaluator::new(&world, &helpers, &diagnostics);
        let map = crate::reachability::compute(&world, &evaluator, &state);
        let analysis = analyze_path(
            &world,
            &evaluator,
            &state,
            &["Menu", "Hall", "Vault"][..],
            Scope::Global(&map),
        );
        assert!(analysis.viable);
    }

    #[test]
    fn region_rules_gate_transitions() {
        let world = gated_world();
        let state = Snapshot::new();
        let helpers = HelperRegistry::new();
        let diagnostics = Diagnostics::new();
        let evaluator = Evaluator::new(&world, &helpers, &diagnostics);
        let map = crate::reachability::compute(&world, &evaluator, &state);
        let analysis = analyze_path(
            &world,
            &evaluator,
            &state,
            &["Menu", "Hall", "Vault"][..],
            Scope::Global(&map),
        );
        let last = &analysis.transitions[1];
        assert!(last.exits[0].accessible);
        assert!(!last.accessible);
        assert_eq!(
            last.region_rules[0].classification,
            Classification::PrimaryBlocker
        );
        let blockers: Vec<&str> = analysis
            .nodes_with(Classification::PrimaryBlocker)
            .map(|n| n.label.as_str())
            .collect();
        assert_eq!(blockers, vec![r#"has("Vault Pass")"#]);
    }

    #[test]
    fn unknown_region_on_path_blocks() {
        let world = gated_world();
        let analysis = analyze(&world, &["Menu", "Atlantis"], &Snapshot::new(), Scope::PathPrefix);
        assert!(!analysis.viable);
        assert!(analysis.transitions[0].exits.is_empty());
    }

    #[test]
    fn single_region_path_is_viable() {
        let world = gated_world();
        let analysis = analyze(&world, &["Menu"], &Snapshot::new(), Scope::PathPrefix);
        assert!(analysis.viable);
        assert!(analysis.transitions.is_empty());
    }
}
