use std::fmt;
use std::ops::Not;

use serde::{Deserialize, Serialize};

use super::Value;

/// Comparison operators supported in rule expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "==", alias = "Eq")]
    Eq,
    #[serde(rename = "!=", alias = "NotEq")]
    Neq,
    #[serde(rename = ">", alias = "Gt")]
    Gt,
    #[serde(rename = ">=", alias = "GtE")]
    Gte,
    #[serde(rename = "<", alias = "Lt")]
    Lt,
    #[serde(rename = "<=", alias = "LtE")]
    Lte,
    #[serde(rename = "in", alias = "In")]
    In,
}

/// An access rule: the immutable tree guarding an exit, location or region.
///
/// Rule documents tag each node with a `"type"` field. Tags this crate does
/// not know deserialize to [`Rule::Unknown`], which always evaluates to
/// `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    Constant {
        value: Value,
    },
    ItemCheck {
        item: Operand,
    },
    CountCheck {
        item: Operand,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<Operand>,
    },
    GroupCheck {
        group: Operand,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<Operand>,
    },
    Helper {
        name: String,
        #[serde(default)]
        args: Vec<Operand>,
    },
    StateMethod {
        method: String,
        #[serde(default)]
        args: Vec<Operand>,
    },
    Attribute {
        object: Box<Rule>,
        attr: String,
    },
    Subscript {
        value: Box<Rule>,
        index: Operand,
    },
    FunctionCall {
        function: Box<Rule>,
        #[serde(default)]
        args: Vec<Operand>,
    },
    Name {
        name: String,
    },
    And {
        conditions: Vec<Rule>,
    },
    Or {
        conditions: Vec<Rule>,
    },
    Not {
        condition: Box<Rule>,
    },
    #[serde(alias = "comparison")]
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    #[serde(other)]
    Unknown,
}

/// An argument position that accepts either a literal or a nested rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Rule(Box<Rule>),
    Literal(Value),
}

impl Rule {
    /// The document tag of this node.
    #[must_use]
    pub fn node_type(&self) -> &'static str {
        match self {
            Rule::Constant { .. } => "constant",
            Rule::ItemCheck { .. } => "item_check",
            Rule::CountCheck { .. } => "count_check",
            Rule::GroupCheck { .. } => "group_check",
            Rule::Helper { .. } => "helper",
            Rule::StateMethod { .. } => "state_method",
            Rule::Attribute { .. } => "attribute",
            Rule::Subscript { .. } => "subscript",
            Rule::FunctionCall { .. } => "function_call",
            Rule::Name { .. } => "name",
            Rule::And { .. } => "and",
            Rule::Or { .. } => "or",
            Rule::Not { .. } => "not",
            Rule::Compare { .. } => "compare",
            Rule::Unknown => "unknown",
        }
    }

    /// Conjunction. Flattens into an existing `and` on the left.
    #[must_use]
    pub fn and(self, other: Rule) -> Rule {
        match self {
            Rule::And { mut conditions } => {
                conditions.push(other);
                Rule::And { conditions }
            }
            first => Rule::And {
                conditions: vec![first, other],
            },
        }
    }

    /// Disjunction. Flattens into an existing `or` on the left.
    #[must_use]
    pub fn or(self, other: Rule) -> Rule {
        match self {
            Rule::Or { mut conditions } => {
                conditions.push(other);
                Rule::Or { conditions }
            }
            first => Rule::Or {
                conditions: vec![first, other],
            },
        }
    }

    /// Region names this rule asks about through `can_reach`-style state
    /// methods with literal arguments.
    #[must_use]
    pub fn referenced_regions(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_region_refs(self, &mut out);
        out
    }
}

fn collect_region_refs<'a>(rule: &'a Rule, out: &mut Vec<&'a str>) {
    match rule {
        Rule::StateMethod { method, args } if is_region_method(method) => {
            if let Some(Operand::Literal(Value::String(region))) = args.first() {
                out.push(region);
            }
        }
        Rule::And { conditions } | Rule::Or { conditions } => {
            for condition in conditions {
                collect_region_refs(condition, out);
            }
        }
        Rule::Not { condition } => collect_region_refs(condition, out),
        _ => {}
    }
}

pub(crate) fn is_region_method(method: &str) -> bool {
    matches!(method, "can_reach" | "can_reach_region")
}

impl Not for Rule {
    type Output = Rule;

    fn not(self) -> Rule {
        Rule::Not {
            condition: Box::new(self),
        }
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Literal(v)
    }
}

impl From<Rule> for Operand {
    fn from(r: Rule) -> Self {
        Operand::Rule(Box::new(r))
    }
}

impl From<&str> for Operand {
    fn from(v: &str) -> Self {
        Operand::Literal(Value::from(v))
    }
}

impl From<String> for Operand {
    fn from(v: String) -> Self {
        Operand::Literal(Value::from(v))
    }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self {
        Operand::Literal(Value::Int(v))
    }
}

impl From<i32> for Operand {
    fn from(v: i32) -> Self {
        Operand::Literal(Value::from(v))
    }
}

impl From<bool> for Operand {
    fn from(v: bool) -> Self {
        Operand::Literal(Value::Bool(v))
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Neq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
            CompareOp::In => write!(f, "in"),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Rule(rule) => write!(f, "{rule}"),
            Operand::Literal(value) => write!(f, "{value}"),
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Operand]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

fn write_joined(f: &mut fmt::Formatter<'_>, conditions: &[Rule], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, condition) in conditions.iter().enumerate() {
        if i > 0 {
            write!(f, " {sep} ")?;
        }
        write!(f, "{condition}")?;
    }
    write!(f, ")")
}

/// Renders the rule in the text syntax accepted by [`parse_rule`](crate::parse::parse_rule).
impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Constant { value } => write!(f, "{value}"),
            Rule::ItemCheck { item } => write!(f, "has({item})"),
            Rule::CountCheck { item, count } => match count {
                Some(count) => write!(f, "count({item}, {count})"),
                None => write!(f, "count({item})"),
            },
            Rule::GroupCheck { group, count } => match count {
                Some(count) => write!(f, "group({group}, {count})"),
                None => write!(f, "group({group})"),
            },
            Rule::Helper { name, args } => {
                write!(f, "{name}(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Rule::StateMethod { method, args } => {
                write!(f, "state.{method}(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Rule::Attribute { object, attr } => write!(f, "{object}.{attr}"),
            Rule::Subscript { value, index } => write!(f, "{value}[{index}]"),
            Rule::FunctionCall { function, args } => {
                write!(f, "{function}(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Rule::Name { name } => write!(f, "{name}"),
            Rule::And { conditions } if conditions.is_empty() => write!(f, "true"),
            Rule::Or { conditions } if conditions.is_empty() => write!(f, "false"),
            Rule::And { conditions } => write_joined(f, conditions, "and"),
            Rule::Or { conditions } => write_joined(f, conditions, "or"),
            Rule::Not { condition } => write!(f, "not {condition}"),
            Rule::Compare { left, op, right } => write!(f, "({left} {op} {right})"),
            Rule::Unknown => write!(f, "<unknown>"),
        }
    }
}

#[must_use]
pub fn constant(value: impl Into<Value>) -> Rule {
    Rule::Constant {
        value: value.into(),
    }
}

/// `item_check`: true when at least one of `item` is held.
#[must_use]
pub fn has(item: impl Into<Operand>) -> Rule {
    Rule::ItemCheck { item: item.into() }
}

/// `count_check`: true when at least `count` of `item` are held.
#[must_use]
pub fn count(item: impl Into<Operand>, count: impl Into<Operand>) -> Rule {
    Rule::CountCheck {
        item: item.into(),
        count: Some(count.into()),
    }
}

/// `group_check`: true when the summed count of the group's items reaches `count`.
#[must_use]
pub fn group(name: impl Into<Operand>, count: impl Into<Operand>) -> Rule {
    Rule::GroupCheck {
        group: name.into(),
        count: Some(count.into()),
    }
}

#[must_use]
pub fn helper(name: &str, args: Vec<Operand>) -> Rule {
    Rule::Helper {
        name: name.to_owned(),
        args,
    }
}

#[must_use]
pub fn state_method(method: &str, args: Vec<Operand>) -> Rule {
    Rule::StateMethod {
        method: method.to_owned(),
        args,
    }
}

/// Shorthand for `state.can_reach(region)`.
#[must_use]
pub fn can_reach(region: &str) -> Rule {
    state_method("can_reach", vec![Operand::from(region)])
}

#[must_use]
pub fn name(name: &str) -> Rule {
    Rule::Name {
        name: name.to_owned(),
    }
}

#[must_use]
pub fn all(conditions: Vec<Rule>) -> Rule {
    Rule::And { conditions }
}

#[must_use]
pub fn any(conditions: Vec<Rule>) -> Rule {
    Rule::Or { conditions }
}

#[must_use]
pub fn compare(left: impl Into<Operand>, op: CompareOp, right: impl Into<Operand>) -> Rule {
    Rule::Compare {
        left: left.into(),
        op,
        right: right.into(),
    }
}
