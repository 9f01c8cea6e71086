use winnow::ascii::{dec_int, till_line_ending};
use winnow::combinator::{
    alt, cut_err, delimited, not, opt, preceded, repeat, separated, terminated,
};
use winnow::error::{ContextError, ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

use crate::{CompareOp, Operand, Rule, Value};

const RESERVED: &[&str] = &["and", "or", "not", "in", "true", "false", "none"];

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ('#', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A keyword not followed by an identifier character.
fn keyword<'i>(word: &'static str) -> impl Parser<&'i str, &'i str, ErrMode<ContextError>> {
    terminated(word, not(one_of(is_ident_char)))
}

// -- Identifiers ------------------------------------------------------------

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., is_ident_char),
    )
        .take()
        .verify(|s: &str| !RESERVED.contains(&s))
        .parse_next(input)
}

// -- Literals ---------------------------------------------------------------

fn string_literal(input: &mut &str) -> ModalResult<String> {
    let quote = one_of(['"', '\'']).parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = any.parse_next(input)?;
        match ch {
            c if c == quote => return Ok(s),
            '\\' => match any.parse_next(input)? {
                'n' => s.push('\n'),
                't' => s.push('\t'),
                c @ ('"' | '\'' | '\\') => s.push(c),
                other => {
                    s.push('\\');
                    s.push(other);
                }
            },
            c => s.push(c),
        }
    }
}

fn negative_number(input: &mut &str) -> ModalResult<Value> {
    let text = ('-', take_while(1.., |c: char| c.is_ascii_digit() || c == '.'))
        .take()
        .parse_next(input)?;
    if text.contains('.') {
        let f: f64 = text.parse().map_err(|_| ErrMode::from_input(input).cut())?;
        Ok(Value::Float(f))
    } else {
        let i: i64 = text.parse().map_err(|_| ErrMode::from_input(input).cut())?;
        Ok(Value::Int(i))
    }
}

fn float_literal(input: &mut &str) -> ModalResult<f64> {
    (
        take_while(1.., |c: char| c.is_ascii_digit()),
        '.',
        take_while(1.., |c: char| c.is_ascii_digit()),
    )
        .take()
        .try_map(|s: &str| s.parse::<f64>())
        .parse_next(input)
}

fn scalar(input: &mut &str) -> ModalResult<Value> {
    alt((
        string_literal.map(Value::String),
        keyword("true").value(Value::Bool(true)),
        keyword("false").value(Value::Bool(false)),
        keyword("none").value(Value::None),
        negative_number,
        float_literal.map(Value::Float),
        dec_int::<_, i64, _>.map(Value::Int),
    ))
    .parse_next(input)
}

fn list_literal(input: &mut &str) -> ModalResult<Value> {
    let items: Vec<Value> = delimited(
        ('[', ws),
        separated(0.., preceded(ws, literal), (ws, ',')),
        (ws, opt(','), ws, cut_err(']')),
    )
    .parse_next(input)?;
    Ok(Value::List(items))
}

fn literal(input: &mut &str) -> ModalResult<Value> {
    alt((list_literal, scalar))
        .context(StrContext::Expected(StrContextValue::Description("literal")))
        .parse_next(input)
}

// -- Calls ------------------------------------------------------------------

/// Literal rules in argument positions become plain literals.
fn operand(rule: Rule) -> Operand {
    match rule {
        Rule::Constant { value } => Operand::Literal(value),
        other => Operand::Rule(Box::new(other)),
    }
}

fn call_args(input: &mut &str) -> ModalResult<Vec<Operand>> {
    let args: Vec<Rule> = delimited(
        (ws, '(', ws),
        separated(0.., or_expr, (ws, ',')),
        (ws, cut_err(')')),
    )
    .parse_next(input)?;
    Ok(args.into_iter().map(operand).collect())
}

/// `has`, `count`, `group` and the state shorthands map to dedicated nodes;
/// any other name is a helper.
fn named_call(name: &str, mut args: Vec<Operand>) -> Option<Rule> {
    let rule = match (name, args.len()) {
        ("has", 1) => Rule::ItemCheck {
            item: args.remove(0),
        },
        ("has" | "count", 2) => Rule::CountCheck {
            count: args.pop(),
            item: args.remove(0),
        },
        ("count", 1) => Rule::CountCheck {
            item: args.remove(0),
            count: None,
        },
        ("group", 1 | 2) => {
            let count = if args.len() == 2 { args.pop() } else { None };
            Rule::GroupCheck {
                group: args.remove(0),
                count,
            }
        }
        ("flag", 1) => state_call("has_flag", args),
        ("setting", 1) => state_call("setting", args),
        ("region", 1) => state_call("can_reach", args),
        ("checked", 1) => state_call("is_checked", args),
        ("has" | "count" | "group" | "flag" | "setting" | "region" | "checked", _) => {
            return None;
        }
        (helper, _) => Rule::Helper {
            name: helper.to_owned(),
            args,
        },
    };
    Some(rule)
}

fn state_call(method: &str, args: Vec<Operand>) -> Rule {
    Rule::StateMethod {
        method: method.to_owned(),
        args,
    }
}

fn call_or_name(input: &mut &str) -> ModalResult<Rule> {
    let name = ident.parse_next(input)?;
    match opt(call_args).parse_next(input)? {
        Some(args) => named_call(name, args).ok_or_else(|| ErrMode::from_input(input).cut()),
        None => Ok(Rule::Name {
            name: name.to_owned(),
        }),
    }
}

// -- Expressions (precedence: or < and < not < comparison < postfix) --------

fn primary(input: &mut &str) -> ModalResult<Rule> {
    ws.parse_next(input)?;
    alt((
        delimited('(', or_expr, (ws, cut_err(')'))),
        literal.map(|value| Rule::Constant { value }),
        call_or_name,
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "expression",
    )))
    .parse_next(input)
}

enum Suffix {
    Attr(String, Option<Vec<Operand>>),
    Index(Rule),
    Call(Vec<Operand>),
}

fn suffix(input: &mut &str) -> ModalResult<Suffix> {
    ws.parse_next(input)?;
    alt((
        preceded(('.', ws), cut_err((ident, opt(call_args))))
            .map(|(attr, args)| Suffix::Attr(attr.to_owned(), args)),
        delimited('[', cut_err(or_expr), (ws, cut_err(']'))).map(Suffix::Index),
        call_args.map(Suffix::Call),
    ))
    .parse_next(input)
}

fn postfix(input: &mut &str) -> ModalResult<Rule> {
    let base = primary(input)?;
    let suffixes: Vec<Suffix> = repeat(0.., suffix).parse_next(input)?;
    Ok(suffixes.into_iter().fold(base, |object, suffix| match suffix {
        Suffix::Attr(method, Some(args)) if is_state(&object) => Rule::StateMethod { method, args },
        Suffix::Attr(attr, Some(args)) => Rule::FunctionCall {
            function: Box::new(Rule::Attribute {
                object: Box::new(object),
                attr,
            }),
            args,
        },
        Suffix::Attr(attr, None) => Rule::Attribute {
            object: Box::new(object),
            attr,
        },
        Suffix::Index(index) => Rule::Subscript {
            value: Box::new(object),
            index: operand(index),
        },
        Suffix::Call(args) => Rule::FunctionCall {
            function: Box::new(object),
            args,
        },
    }))
}

fn is_state(rule: &Rule) -> bool {
    matches!(rule, Rule::Name { name } if name == "state")
}

fn compare_op(input: &mut &str) -> ModalResult<CompareOp> {
    ws.parse_next(input)?;
    alt((
        ">=".value(CompareOp::Gte),
        ">".value(CompareOp::Gt),
        "<=".value(CompareOp::Lte),
        "<".value(CompareOp::Lt),
        "==".value(CompareOp::Eq),
        "!=".value(CompareOp::Neq),
        keyword("in").value(CompareOp::In),
    ))
    .parse_next(input)
}

fn comparison(input: &mut &str) -> ModalResult<Rule> {
    let left = postfix(input)?;
    match opt(compare_op).parse_next(input)? {
        Some(op) => {
            let right = cut_err(postfix).parse_next(input)?;
            Ok(Rule::Compare {
                left: operand(left),
                op,
                right: operand(right),
            })
        }
        None => Ok(left),
    }
}

fn unary(input: &mut &str) -> ModalResult<Rule> {
    ws.parse_next(input)?;
    if opt(keyword("not")).parse_next(input)?.is_some() {
        let inner = cut_err(unary).parse_next(input)?;
        Ok(Rule::Not {
            condition: Box::new(inner),
        })
    } else {
        comparison(input)
    }
}

fn and_expr(input: &mut &str) -> ModalResult<Rule> {
    let first = unary(input)?;
    let rest: Vec<Rule> =
        repeat(0.., preceded((ws, keyword("and")), cut_err(unary))).parse_next(input)?;
    Ok(join(first, rest, |conditions| Rule::And { conditions }))
}

fn or_expr(input: &mut &str) -> ModalResult<Rule> {
    let first = and_expr(input)?;
    let rest: Vec<Rule> =
        repeat(0.., preceded((ws, keyword("or")), cut_err(and_expr))).parse_next(input)?;
    Ok(join(first, rest, |conditions| Rule::Or { conditions }))
}

fn join(first: Rule, rest: Vec<Rule>, build: impl FnOnce(Vec<Rule>) -> Rule) -> Rule {
    if rest.is_empty() {
        first
    } else {
        let mut conditions = Vec::with_capacity(rest.len() + 1);
        conditions.push(first);
        conditions.extend(rest);
        build(conditions)
    }
}

// -- Top-level parser -------------------------------------------------------

pub fn rule(input: &mut &str) -> ModalResult<Rule> {
    let rule = or_expr(input)?;
    ws.parse_next(input)?;
    Ok(rule)
}

#[cfg(test)]
mod tests {
    use crate::parse::parse_rule;
    use crate::{
        all, any, can_reach, compare, constant, count, group, has, helper, name, state_method,
    };

    use super::*;

    #[test]
    fn parse_item_check() {
        assert_eq!(parse_rule(r#"has("Lantern")"#).unwrap(), has("Lantern"));
    }

    #[test]
    fn parse_count_forms() {
        assert_eq!(parse_rule(r#"count("Rupee", 50)"#).unwrap(), count("Rupee", 50));
        assert_eq!(parse_rule(r#"has("Rupee", 50)"#).unwrap(), count("Rupee", 50));
        assert_eq!(
            parse_rule(r#"count("Bomb")"#).unwrap(),
            Rule::CountCheck {
                item: "Bomb".into(),
                count: None
            }
        );
    }

    #[test]
    fn parse_group_check() {
        assert_eq!(parse_rule(r#"group("Swords", 2)"#).unwrap(), group("Swords", 2));
    }

    #[test]
    fn parse_state_shorthands() {
        assert_eq!(parse_rule(r#"region("Cave")"#).unwrap(), can_reach("Cave"));
        assert_eq!(
            parse_rule(r#"flag("agahnim")"#).unwrap(),
            state_method("has_flag", vec!["agahnim".into()])
        );
        assert_eq!(
            parse_rule(r#"checked("Chest")"#).unwrap(),
            state_method("is_checked", vec!["Chest".into()])
        );
    }

    #[test]
    fn parse_state_method_call() {
        assert_eq!(
            parse_rule(r#"state.has_any(["Bow", "Hookshot"])"#).unwrap(),
            state_method(
                "has_any",
                vec![Operand::Literal(Value::from(vec!["Bow", "Hookshot"]))]
            )
        );
    }

    #[test]
    fn parse_helper_call() {
        assert_eq!(
            parse_rule("can_lift_rocks()").unwrap(),
            helper("can_lift_rocks", vec![])
        );
        assert_eq!(
            parse_rule("enough_hearts(3)").unwrap(),
            helper("enough_hearts", vec![3.into()])
        );
    }

    #[test]
    fn wrong_builtin_arity_is_an_error() {
        assert!(parse_rule(r#"has("a", 1, 2)"#).is_err());
        assert!(parse_rule("region()").is_err());
    }

    #[test]
    fn parse_accessors() {
        let rule = parse_rule("location.name").unwrap();
        assert_eq!(
            rule,
            Rule::Attribute {
                object: Box::new(name("location")),
                attr: "name".into()
            }
        );

        let rule = parse_rule("rewards[0]").unwrap();
        assert_eq!(
            rule,
            Rule::Subscript {
                value: Box::new(name("rewards")),
                index: 0_i64.into()
            }
        );

        let rule = parse_rule("logic.can_swim()").unwrap();
        assert!(matches!(rule, Rule::FunctionCall { .. }));
    }

    #[test]
    fn parse_comparisons() {
        let ops = [
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Neq),
            (">", CompareOp::Gt),
            (">=", CompareOp::Gte),
            ("<", CompareOp::Lt),
            ("<=", CompareOp::Lte),
            ("in", CompareOp::In),
        ];
        for (sym, expected) in ops {
            let rule = parse_rule(&format!("crystals {sym} 7")).unwrap();
            assert_eq!(rule, compare(name("crystals"), expected, 7_i64), "failed for {sym}");
        }
    }

    #[test]
    fn parse_literals() {
        let cases = [
            ("42", Value::Int(42)),
            ("-5", Value::Int(-5)),
            ("3.5", Value::Float(3.5)),
            ("true", Value::Bool(true)),
            ("none", Value::None),
            ("'single'", Value::from("single")),
            (r#""a\"b""#, Value::from("a\"b")),
            ("[1, 2,]", Value::from(vec![1_i64, 2])),
        ];
        for (text, expected) in cases {
            assert_eq!(parse_rule(text).unwrap(), constant(expected), "failed for {text}");
        }
    }

    #[test]
    fn precedence_and_before_or() {
        let rule = parse_rule(r#"has("a") or has("b") and has("c")"#).unwrap();
        assert_eq!(rule, any(vec![has("a"), all(vec![has("b"), has("c")])]));
    }

    #[test]
    fn parentheses_group() {
        let rule = parse_rule(r#"(has("a") or has("b")) and has("c")"#).unwrap();
        assert_eq!(rule, all(vec![any(vec![has("a"), has("b")]), has("c")]));
    }

    #[test]
    fn not_binds_tighter_than_and() {
        let rule = parse_rule(r#"not has("a") and has("b")"#).unwrap();
        assert_eq!(rule, all(vec![!has("a"), has("b")]));
    }

    #[test]
    fn keywords_need_word_boundary() {
        let rule = parse_rule("android or order").unwrap();
        assert_eq!(rule, any(vec![name("android"), name("order")]));
    }

    #[test]
    fn comments_and_newlines() {
        let rule = parse_rule("# gate\nhas(\"Key\")\n  and has(\"Map\") # both\n").unwrap();
        assert_eq!(rule, all(vec![has("Key"), has("Map")]));
    }

    #[test]
    fn display_round_trips() {
        let rule = all(vec![
            has("Lantern"),
            any(vec![count("Rupee", 50), !can_reach("Cave")]),
            compare(name("mode"), CompareOp::In, Value::from(vec!["open", "swordless"])),
        ]);
        assert_eq!(parse_rule(&rule.to_string()).unwrap(), rule);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_rule("").is_err());
        assert!(parse_rule("has(").is_err());
        assert!(parse_rule(r#"has("a") and"#).is_err());
        assert!(parse_rule("a ==").is_err());
    }
}
