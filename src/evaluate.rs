use crate::types::{
    Diagnostics, EvalContext, HelperRegistry, Operand, Rule, StateSnapshot, Value, WorldGraph,
    is_region_method,
};

/// Tree-walking interpreter for access rules.
///
/// Pure with respect to (rule, snapshot, context): the only side effect is
/// bumping [`Diagnostics`] counters when a rule error is swallowed.
pub(crate) struct Evaluator<'a> {
    world: &'a WorldGraph,
    helpers: &'a HelperRegistry,
    diagnostics: &'a Diagnostics,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(
        world: &'a WorldGraph,
        helpers: &'a HelperRegistry,
        diagnostics: &'a Diagnostics,
    ) -> Self {
        Self {
            world,
            helpers,
            diagnostics,
        }
    }

    /// Evaluate a rule to a value.
    pub(crate) fn evaluate(
        &self,
        rule: &Rule,
        state: &dyn StateSnapshot,
        ctx: &EvalContext,
    ) -> Value {
        self.diagnostics.record_evaluation();
        self.eval(rule, state, ctx)
    }

    /// Evaluate a rule and coerce the result to a boolean.
    pub(crate) fn check(&self, rule: &Rule, state: &dyn StateSnapshot, ctx: &EvalContext) -> bool {
        self.evaluate(rule, state, ctx).truthy()
    }

    /// Like [`check`](Self::check), treating an absent rule as unconditional.
    pub(crate) fn check_opt(
        &self,
        rule: Option<&Rule>,
        state: &dyn StateSnapshot,
        ctx: &EvalContext,
    ) -> bool {
        rule.is_none_or(|rule| self.check(rule, state, ctx))
    }

    fn eval(&self, rule: &Rule, state: &dyn StateSnapshot, ctx: &EvalContext) -> Value {
        match rule {
            Rule::Constant { value } => value.clone(),
            Rule::ItemCheck { item } => match self.operand(item, state, ctx) {
                Value::String(item) => Value::Bool(state.has_item(&item)),
                other => self.mismatch("item_check", &other),
            },
            Rule::CountCheck { item, count } => {
                let Some(threshold) = self.threshold(count.as_ref(), state, ctx) else {
                    return Value::Bool(false);
                };
                match self.operand(item, state, ctx) {
                    Value::String(item) => Value::Bool(state.count_item(&item) >= threshold),
                    other => self.mismatch("count_check", &other),
                }
            }
            Rule::GroupCheck { group, count } => {
                let Some(threshold) = self.threshold(count.as_ref(), state, ctx) else {
                    return Value::Bool(false);
                };
                match self.operand(group, state, ctx) {
                    Value::String(group) => {
                        Value::Bool(self.group_count(&group, state) >= threshold)
                    }
                    other => self.mismatch("group_check", &other),
                }
            }
            Rule::Helper { name, args } => {
                let args = self.operands(args, state, ctx);
                self.call_helper(name, state, &args)
            }
            Rule::StateMethod { method, args } => {
                let args = self.operands(args, state, ctx);
                self.call_state_method(method, state, &args)
            }
            Rule::Attribute { object, attr } => match self.eval(object, state, ctx) {
                Value::Map(fields) => fields.get(attr).cloned().unwrap_or_default(),
                other => {
                    self.diagnostics.record_bad_accessor();
                    log::debug!("attribute '{attr}' read from {} value", other.type_name());
                    Value::None
                }
            },
            Rule::Subscript { value, index } => {
                let container = self.eval(value, state, ctx);
                let index = self.operand(index, state, ctx);
                self.subscript(&container, &index)
            }
            Rule::FunctionCall { function, args } => {
                let args_values = self.operands(args, state, ctx);
                self.call_function(function, state, &args_values)
            }
            Rule::Name { name } => self.resolve_name(name, state, ctx),
            Rule::And { conditions } => Value::Bool(
                conditions
                    .iter()
                    .all(|condition| self.eval(condition, state, ctx).truthy()),
            ),
            Rule::Or { conditions } => Value::Bool(
                conditions
                    .iter()
                    .any(|condition| self.eval(condition, state, ctx).truthy()),
            ),
            Rule::Not { condition } => Value::Bool(!self.eval(condition, state, ctx).truthy()),
            Rule::Compare { left, op, right } => {
                let left = self.operand(left, state, ctx);
                let right = self.operand(right, state, ctx);
                match left.compare(*op, &right) {
                    Some(result) => Value::Bool(result),
                    None => {
                        self.diagnostics.record_type_mismatch();
                        log::debug!(
                            "cannot compare {} {op} {}; treating as false",
                            left.type_name(),
                            right.type_name()
                        );
                        Value::Bool(false)
                    }
                }
            }
            Rule::Unknown => {
                self.diagnostics.record_unknown_node();
                log::debug!("unrecognized rule node; treating as false");
                Value::Bool(false)
            }
        }
    }

    fn operand(&self, operand: &Operand, state: &dyn StateSnapshot, ctx: &EvalContext) -> Value {
        match operand {
            Operand::Literal(value) => value.clone(),
            Operand::Rule(rule) => self.eval(rule, state, ctx),
        }
    }

    fn operands(
        &self,
        operands: &[Operand],
        state: &dyn StateSnapshot,
        ctx: &EvalContext,
    ) -> Vec<Value> {
        operands
            .iter()
            .map(|operand| self.operand(operand, state, ctx))
            .collect()
    }

    /// Count threshold; defaults to 1 when absent.
    fn threshold(
        &self,
        count: Option<&Operand>,
        state: &dyn StateSnapshot,
        ctx: &EvalContext,
    ) -> Option<i64> {
        let Some(count) = count else {
            return Some(1);
        };
        let value = self.operand(count, state, ctx);
        let threshold = value.as_int();
        if threshold.is_none() {
            self.mismatch("count threshold", &value);
        }
        threshold
    }

    fn group_count(&self, group: &str, state: &dyn StateSnapshot) -> i64 {
        match self.world.item_group(group) {
            Some(items) => items
                .iter()
                .map(|item| state.count_item(item))
                .fold(0, i64::saturating_add),
            None => state.count_group(group),
        }
    }

    fn mismatch(&self, what: &str, got: &Value) -> Value {
        self.diagnostics.record_type_mismatch();
        log::debug!("{what} expected a string, got {}; treating as false", got.type_name());
        Value::Bool(false)
    }

    fn call_helper(&self, name: &str, state: &dyn StateSnapshot, args: &[Value]) -> Value {
        match self.helpers.get(name) {
            Some(helper) => helper(state, args),
            None => {
                self.diagnostics.record_missing_helper();
                log::debug!("helper '{name}' is not registered; treating as false");
                Value::Bool(false)
            }
        }
    }

    /// Built-in snapshot methods first, then the helper registry.
    fn call_state_method(&self, method: &str, state: &dyn StateSnapshot, args: &[Value]) -> Value {
        let text = |i: usize| args.get(i).and_then(Value::as_str);
        let at_least = |i: usize| args.get(i).and_then(Value::as_int).unwrap_or(1);
        let result = match method {
            "has" => text(0).map(|item| Value::Bool(state.count_item(item) >= at_least(1))),
            "count" | "item_count" => text(0).map(|item| Value::Int(state.count_item(item))),
            "has_group" => {
                text(0).map(|group| Value::Bool(self.group_count(group, state) >= at_least(1)))
            }
            "count_group" => text(0).map(|group| Value::Int(self.group_count(group, state))),
            "has_flag" | "flag" => text(0).map(|flag| Value::Bool(state.has_flag(flag))),
            "setting" | "get_setting" => {
                text(0).map(|name| state.get_setting(name).unwrap_or_default())
            }
            m if is_region_method(m) => {
                text(0).map(|region| Value::Bool(state.is_region_reachable(region)))
            }
            "is_checked" | "is_location_checked" => {
                text(0).map(|location| Value::Bool(state.is_location_checked(location)))
            }
            "has_all" => list_arg(args).map(|items| {
                Value::Bool(
                    items
                        .iter()
                        .all(|item| item.as_str().is_some_and(|i| state.has_item(i))),
                )
            }),
            "has_any" => list_arg(args).map(|items| {
                Value::Bool(
                    items
                        .iter()
                        .any(|item| item.as_str().is_some_and(|i| state.has_item(i))),
                )
            }),
            _ => return self.call_helper(method, state, args),
        };
        result.unwrap_or_else(|| {
            self.diagnostics.record_type_mismatch();
            log::debug!("state method '{method}' called with unusable arguments");
            Value::Bool(false)
        })
    }

    /// `name(...)` calls a helper, `state.m(...)` a state method and
    /// `logic.h(...)`/`self.h(...)` a helper.
    fn call_function(&self, function: &Rule, state: &dyn StateSnapshot, args: &[Value]) -> Value {
        match function {
            Rule::Name { name } => self.call_helper(name, state, args),
            Rule::Attribute { object, attr } => match object.as_ref() {
                Rule::Name { name } if name == "state" => {
                    self.call_state_method(attr, state, args)
                }
                Rule::Name { name } if matches!(name.as_str(), "logic" | "self" | "world") => {
                    self.call_helper(attr, state, args)
                }
                _ => self.bad_call(function),
            },
            _ => self.bad_call(function),
        }
    }

    fn bad_call(&self, function: &Rule) -> Value {
        self.diagnostics.record_bad_accessor();
        log::debug!("'{function}' is not callable; treating as false");
        Value::Bool(false)
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn subscript(&self, container: &Value, index: &Value) -> Value {
        let found = match (container, index) {
            (Value::List(items), Value::Int(i)) => {
                let len = items.len() as i64;
                let i = if *i < 0 { len + i } else { *i };
                if (0..len).contains(&i) {
                    items.get(i as usize).cloned()
                } else {
                    None
                }
            }
            (Value::Map(fields), Value::String(key)) => fields.get(key).cloned(),
            _ => None,
        };
        found.unwrap_or_else(|| {
            self.diagnostics.record_bad_accessor();
            log::debug!(
                "cannot index {} with {}",
                container.type_name(),
                index.type_name()
            );
            Value::None
        })
    }

    /// Entity bindings first, then settings, then the literal names.
    fn resolve_name(&self, name: &str, state: &dyn StateSnapshot, ctx: &EvalContext) -> Value {
        if let Some(value) = ctx.get(name) {
            return value.clone();
        }
        if let Some(value) = state.get_setting(name) {
            return value;
        }
        match name {
            "True" | "true" => Value::Bool(true),
            "False" | "false" => Value::Bool(false),
            "None" | "none" => Value::None,
            _ => {
                self.diagnostics.record_bad_accessor();
                log::debug!("name '{name}' is unbound; treating as none");
                Value::None
            }
        }
    }
}

fn list_arg(args: &[Value]) -> Option<&[Value]> {
    match args {
        [Value::List(items)] => Some(items),
        [] => None,
        items => Some(items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CompareOp, Snapshot, WorldBuilder, can_reach, compare, constant, count, group, has,
        helper, name, state_method,
    };

    fn world() -> WorldGraph {
        WorldBuilder::new()
            .start("Menu")
            .group("Swords", ["Fighter Sword", "Master Sword"])
            .region("Menu", |r| r)
            .compile()
            .unwrap()
    }

    fn eval_with(rule: &Rule, state: &Snapshot, helpers: &HelperRegistry) -> (Value, Diagnostics) {
        let world = world();
        let diagnostics = Diagnostics::new();
        let value = Evaluator::new(&world, helpers, &diagnostics).evaluate(
            rule,
            state,
            &EvalContext::new(),
        );
        (value, diagnostics)
    }

    fn eval(rule: &Rule, state: &Snapshot) -> Value {
        eval_with(rule, state, &HelperRegistry::new()).0
    }

    #[test]
    fn constant_returns_literal() {
        assert_eq!(eval(&constant(7_i64), &Snapshot::new()), Value::Int(7));
        assert_eq!(eval(&constant(true), &Snapshot::new()), Value::Bool(true));
    }

    #[test]
    fn item_check() {
        let rule = has("Lantern");
        assert_eq!(eval(&rule, &Snapshot::new()), Value::Bool(false));
        assert_eq!(
            eval(&rule, &Snapshot::new().with_item("Lantern", 1)),
            Value::Bool(true)
        );
    }

    #[test]
    fn item_check_with_nested_expression() {
        let rule = has(name("weapon"));
        let state = Snapshot::new()
            .with_setting("weapon", "Hammer")
            .with_item("Hammer", 1);
        assert_eq!(eval(&rule, &state), Value::Bool(true));
    }

    #[test]
    fn count_check_threshold_and_default() {
        let rule = count("Rupee", 50);
        assert_eq!(
            eval(&rule, &Snapshot::new().with_item("Rupee", 49)),
            Value::Bool(false)
        );
        assert_eq!(
            eval(&rule, &Snapshot::new().with_item("Rupee", 50)),
            Value::Bool(true)
        );

        let default_one = Rule::CountCheck {
            item: "Bomb".into(),
            count: None,
        };
        assert_eq!(
            eval(&default_one, &Snapshot::new().with_item("Bomb", 1)),
            Value::Bool(true)
        );
    }

    #[test]
    fn group_check_sums_world_group() {
        let rule = group("Swords", 2);
        let one = Snapshot::new().with_item("Fighter Sword", 1);
        let two = one.clone().with_item("Master Sword", 1);
        assert_eq!(eval(&rule, &one), Value::Bool(false));
        assert_eq!(eval(&rule, &two), Value::Bool(true));
    }

    #[test]
    fn group_check_saturates_large_counts() {
        let rule = group("Swords", 1);
        let state = Snapshot::new()
            .with_item("Fighter Sword", i64::MAX)
            .with_item("Master Sword", 1);
        assert_eq!(eval(&rule, &state), Value::Bool(true));
    }

    #[test]
    fn group_check_falls_back_to_snapshot_group() {
        let rule = group("Medallions", 3);
        let state = Snapshot::new().with_group_count("Medallions", 3);
        assert_eq!(eval(&rule, &state), Value::Bool(true));
    }

    #[test]
    fn and_or_short_circuit() {
        let helpers = HelperRegistry::new().with("boom", |_, _| panic!("must not be called"));
        let and_rule = has("x").and(helper("boom", vec![]));
        let or_rule = constant(true).or(helper("boom", vec![]));
        assert_eq!(eval_with(&and_rule, &Snapshot::new(), &helpers).0, Value::Bool(false));
        assert_eq!(eval_with(&or_rule, &Snapshot::new(), &helpers).0, Value::Bool(true));
    }

    #[test]
    fn empty_and_is_true_empty_or_is_false() {
        assert_eq!(eval(&crate::all(vec![]), &Snapshot::new()), Value::Bool(true));
        assert_eq!(eval(&crate::any(vec![]), &Snapshot::new()), Value::Bool(false));
    }

    #[test]
    fn comparison_ops() {
        let state = Snapshot::new().with_setting("crystals", 7_i64);
        let cases = [
            (CompareOp::Eq, 7_i64, true),
            (CompareOp::Neq, 7, false),
            (CompareOp::Lt, 8, true),
            (CompareOp::Lte, 7, true),
            (CompareOp::Gt, 7, false),
            (CompareOp::Gte, 7, true),
        ];
        for (op, rhs, expected) in cases {
            let rule = compare(name("crystals"), op, rhs);
            assert_eq!(eval(&rule, &state), Value::Bool(expected), "failed for {op}");
        }
    }

    #[test]
    fn comparison_in_list() {
        let state = Snapshot::new().with_setting("mode", "open");
        let rule = compare(
            name("mode"),
            CompareOp::In,
            Operand::Literal(Value::from(vec!["open", "inverted"])),
        );
        assert_eq!(eval(&rule, &state), Value::Bool(true));
    }

    #[test]
    fn comparison_type_mismatch_is_false_and_counted() {
        let rule = compare("seven", CompareOp::Lt, 8_i64);
        let (value, diag) = eval_with(&rule, &Snapshot::new(), &HelperRegistry::new());
        assert_eq!(value, Value::Bool(false));
        assert_eq!(diag.snapshot().type_mismatches, 1);
    }

    #[test]
    fn unknown_node_is_false_and_counted() {
        let (value, diag) = eval_with(&Rule::Unknown, &Snapshot::new(), &HelperRegistry::new());
        assert_eq!(value, Value::Bool(false));
        assert_eq!(diag.snapshot().unknown_nodes, 1);
    }

    #[test]
    fn missing_helper_is_false_and_counted() {
        let (value, diag) = eval_with(
            &helper("can_lift_rocks", vec![]),
            &Snapshot::new(),
            &HelperRegistry::new(),
        );
        assert_eq!(value, Value::Bool(false));
        assert_eq!(diag.snapshot().missing_helpers, 1);
    }

    #[test]
    fn helper_receives_evaluated_args() {
        let helpers = HelperRegistry::new().with("enough", |state, args| {
            let n = args.first().and_then(Value::as_int).unwrap_or(0);
            Value::Bool(state.count_item("Heart") >= n)
        });
        let rule = helper("enough", vec![Operand::Rule(Box::new(name("hearts_needed")))]);
        let state = Snapshot::new()
            .with_setting("hearts_needed", 3_i64)
            .with_item("Heart", 3);
        assert_eq!(eval_with(&rule, &state, &helpers).0, Value::Bool(true));
    }

    #[test]
    fn builtin_state_methods() {
        let state = Snapshot::new()
            .with_item("Bow", 1)
            .with_item("Arrow", 2)
            .with_flag("agahnim")
            .with_region("Cave")
            .with_checked("Chest")
            .with_setting("goal", "ganon");
        let cases = [
            (state_method("has", vec!["Bow".into()]), Value::Bool(true)),
            (state_method("has", vec!["Arrow".into(), 3.into()]), Value::Bool(false)),
            (state_method("count", vec!["Arrow".into()]), Value::Int(2)),
            (state_method("has_flag", vec!["agahnim".into()]), Value::Bool(true)),
            (can_reach("Cave"), Value::Bool(true)),
            (state_method("is_checked", vec!["Chest".into()]), Value::Bool(true)),
            (state_method("setting", vec!["goal".into()]), Value::from("ganon")),
            (
                state_method("has_all", vec!["Bow".into(), "Arrow".into()]),
                Value::Bool(true),
            ),
            (
                state_method("has_any", vec!["Hookshot".into(), "Bow".into()]),
                Value::Bool(true),
            ),
            (state_method("count_group", vec!["Swords".into()]), Value::Int(0)),
        ];
        for (rule, expected) in cases {
            assert_eq!(eval(&rule, &state), expected, "failed for {rule}");
        }
    }

    #[test]
    fn state_method_falls_back_to_registry() {
        let helpers = HelperRegistry::new().with("can_fly", |_, _| Value::Bool(true));
        let rule = state_method("can_fly", vec![]);
        assert_eq!(eval_with(&rule, &Snapshot::new(), &helpers).0, Value::Bool(true));
    }

    #[test]
    fn function_call_dispatch() {
        let helpers = HelperRegistry::new().with("can_swim", |state, _| {
            Value::Bool(state.has_item("Flippers"))
        });
        let state = Snapshot::new().with_item("Flippers", 1);

        let via_name = Rule::FunctionCall {
            function: Box::new(name("can_swim")),
            args: vec![],
        };
        let via_state = Rule::FunctionCall {
            function: Box::new(Rule::Attribute {
                object: Box::new(name("state")),
                attr: "has".into(),
            }),
            args: vec!["Flippers".into()],
        };
        let via_logic = Rule::FunctionCall {
            function: Box::new(Rule::Attribute {
                object: Box::new(name("logic")),
                attr: "can_swim".into(),
            }),
            args: vec![],
        };
        for rule in [via_name, via_state, via_logic] {
            assert_eq!(eval_with(&rule, &state, &helpers).0, Value::Bool(true));
        }
    }

    #[test]
    fn attribute_and_subscript_read_context() {
        let world = world();
        let helpers = HelperRegistry::new();
        let diagnostics = Diagnostics::new();
        let evaluator = Evaluator::new(&world, &helpers, &diagnostics);
        let ctx = EvalContext::new()
            .set("location.name", "Cave Chest")
            .set("rewards", Value::from(vec!["Bow", "Hookshot"]));

        let attr = Rule::Attribute {
            object: Box::new(name("location")),
            attr: "name".into(),
        };
        assert_eq!(
            evaluator.evaluate(&attr, &Snapshot::new(), &ctx),
            Value::from("Cave Chest")
        );

        let last = Rule::Subscript {
            value: Box::new(name("rewards")),
            index: (-1_i64).into(),
        };
        assert_eq!(
            evaluator.evaluate(&last, &Snapshot::new(), &ctx),
            Value::from("Hookshot")
        );

        let out_of_range = Rule::Subscript {
            value: Box::new(name("rewards")),
            index: 5_i64.into(),
        };
        assert_eq!(evaluator.evaluate(&out_of_range, &Snapshot::new(), &ctx), Value::None);
        assert_eq!(diagnostics.snapshot().bad_accessors, 1);
    }

    #[test]
    fn unbound_names() {
        assert_eq!(eval(&name("True"), &Snapshot::new()), Value::Bool(true));
        assert_eq!(eval(&name("None"), &Snapshot::new()), Value::None);
        let (value, diag) = eval_with(&name("mystery"), &Snapshot::new(), &HelperRegistry::new());
        assert_eq!(value, Value::None);
        assert_eq!(diag.snapshot().bad_accessors, 1);
    }

    #[test]
    fn not_inverts_truthiness() {
        assert_eq!(eval(&!has("x"), &Snapshot::new()), Value::Bool(true));
    }

    #[test]
    fn evaluation_counter() {
        let (_, diag) = eval_with(&has("x").and(has("y")), &Snapshot::new(), &HelperRegistry::new());
        assert_eq!(diag.snapshot().evaluations, 1);
    }
}
