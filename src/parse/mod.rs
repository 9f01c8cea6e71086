mod error;
mod grammar;

pub use error::ParseError;

use crate::Rule;

/// Parse a rule written in the text syntax.
///
/// ```
/// use logicmap::{parse_rule, count, has};
///
/// let rule = parse_rule(r#"has("Lantern") and count("Rupee", 50)"#).unwrap();
/// assert_eq!(rule, has("Lantern").and(count("Rupee", 50)));
/// ```
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not valid rule syntax.
pub fn parse_rule(input: &str) -> Result<Rule, ParseError> {
    use winnow::Parser;
    grammar::rule
        .parse(input)
        .map_err(|e| ParseError::new(e.inner().to_string(), e.offset()))
}
