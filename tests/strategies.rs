#![allow(dead_code)]

use logicmap::{Rule, Snapshot, WorldBuilder, WorldGraph, can_reach, constant, count, has, state_method};
use proptest::prelude::*;

// --- Fixed schema ---
// items   : "Lantern", "Key", "Hookshot", "Rupee" (counts 0..=3)
// flags   : "open_door", "rain"
// regions : "R0".."R{n-1}", with "R0" the only start region

pub const ITEMS: &[&str] = &["Lantern", "Key", "Hookshot", "Rupee"];
pub const FLAGS: &[&str] = &["open_door", "rain"];

pub fn region_name(idx: usize) -> String {
    format!("R{idx}")
}

/// Generate a snapshot that aligns with the fixed schema.
pub fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
    (
        prop::collection::vec(0_i64..=3, ITEMS.len()),
        prop::collection::vec(any::<bool>(), FLAGS.len()),
    )
        .prop_map(|(counts, flags)| {
            let snapshot = ITEMS
                .iter()
                .zip(counts)
                .fold(Snapshot::new(), |s, (item, n)| s.with_item(item, n));
            FLAGS
                .iter()
                .zip(flags)
                .filter(|&(_, set)| set)
                .fold(snapshot, |s, (flag, _)| s.with_flag(flag))
        })
}

/// Leaves that only read inventory and flags.
fn arb_state_leaf() -> impl Strategy<Value = Rule> {
    prop_oneof![
        prop::sample::select(ITEMS).prop_map(has),
        (prop::sample::select(ITEMS), 0_i64..=3).prop_map(|(item, n)| count(item, n)),
        prop::sample::select(FLAGS)
            .prop_map(|flag| state_method("has_flag", vec![flag.into()])),
        any::<bool>().prop_map(constant),
    ]
}

/// A rule tree over `region_count` regions.
///
/// Negation only wraps state leaves, so every generated rule is monotone in
/// region reachability: adding reachable regions never turns it false.
pub fn arb_rule(region_count: usize) -> impl Strategy<Value = Rule> {
    let leaf = prop_oneof![
        4 => arb_state_leaf(),
        1 => arb_state_leaf().prop_map(|rule| !rule),
        2 => (0..region_count).prop_map(|idx| can_reach(&region_name(idx))),
    ];
    leaf.prop_recursive(3, 12, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(logicmap::all),
            prop::collection::vec(inner, 0..3).prop_map(logicmap::any),
        ]
    })
}

/// A generated region: exits as `(target index, rule)`, location rules and
/// region-level rules. Target index `region_count` is a dangling exit.
#[derive(Debug, Clone)]
pub struct GenRegion {
    pub exits: Vec<(usize, Option<Rule>)>,
    pub locations: Vec<Option<Rule>>,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
pub struct GenWorld {
    pub regions: Vec<GenRegion>,
}

impl GenWorld {
    pub fn build(&self) -> WorldGraph {
        let mut builder = WorldBuilder::new().start("R0");
        for (idx, region) in self.regions.iter().enumerate() {
            let name = region_name(idx);
            builder = builder.region(&name, |mut r| {
                for (exit_idx, (target, rule)) in region.exits.iter().enumerate() {
                    let exit_name = format!("{name} exit {exit_idx}");
                    r = r.exit(&exit_name, &region_name(*target), rule.clone());
                }
                for (loc_idx, rule) in region.locations.iter().enumerate() {
                    r = r.location(&format!("{name} loc {loc_idx}"), rule.clone());
                }
                for rule in &region.rules {
                    r = r.rule(rule.clone());
                }
                r
            });
        }
        builder.compile().expect("generated worlds are valid")
    }
}

fn arb_region(region_count: usize) -> impl Strategy<Value = GenRegion> {
    (
        prop::collection::vec(
            (0..=region_count, prop::option::weighted(0.6, arb_rule(region_count))),
            0..4,
        ),
        prop::collection::vec(prop::option::of(arb_rule(region_count)), 0..3),
        prop::collection::vec(arb_rule(region_count), 0..=1),
    )
        .prop_map(|(exits, locations, rules)| GenRegion {
            exits,
            locations,
            rules,
        })
}

/// A world of 2..=7 regions with random exits, locations and region rules.
pub fn arb_world() -> impl Strategy<Value = GenWorld> {
    (2_usize..=7).prop_flat_map(|n| {
        prop::collection::vec(arb_region(n), n).prop_map(|regions| GenWorld { regions })
    })
}
