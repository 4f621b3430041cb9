//! Default property extraction policy over expressions.

use serde_json::Value;
use turnkit_core::{Expression, PropertyDisposer, PropertyEntry};

/// Name of the expression carrying extractable properties.
pub const PROPERTY_EXPRESSION: &str = "property";

/// Extracts entries from `property(...)` expressions.
///
/// The chain of first sub-expressions below `property` is walked: every
/// name except the innermost becomes a meaning and the innermost name is
/// the value. `property(address(city(Paris)))` yields meanings
/// `["address", "city"]` with value `"Paris"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionPropertyDisposer;

impl ExpressionPropertyDisposer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn extract_entry(expression: &Expression) -> Option<PropertyEntry> {
        let mut chain = Vec::new();
        let mut current = expression.sub_expressions.first()?;
        loop {
            chain.push(current.name.clone());
            match current.sub_expressions.first() {
                Some(next) => current = next,
                None => break,
            }
        }

        let value = chain.pop()?;
        if chain.is_empty() {
            return None;
        }
        Some(PropertyEntry::new(chain, Value::String(value)))
    }
}

impl PropertyDisposer for ExpressionPropertyDisposer {
    fn extract_properties(&self, expressions: &[Expression]) -> Vec<PropertyEntry> {
        expressions
            .iter()
            .filter(|expression| expression.name == PROPERTY_EXPRESSION)
            .filter_map(Self::extract_entry)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turnkit_core::ExpressionParser;
    use turnkit_expressions::TextExpressionParser;

    fn extract(text: &str) -> Vec<PropertyEntry> {
        let expressions = TextExpressionParser::new()
            .parse_expressions(text)
            .unwrap_or_else(|e| panic!("expressions should parse: {e}"));
        ExpressionPropertyDisposer::new().extract_properties(&expressions)
    }

    #[test]
    fn single_meaning() {
        assert_eq!(
            extract("property(city(Paris))"),
            vec![PropertyEntry::new(vec!["city".to_string()], json!("Paris"))]
        );
    }

    #[test]
    fn nested_meanings() {
        assert_eq!(
            extract("property(address(city(Paris)))"),
            vec![PropertyEntry::new(
                vec!["address".to_string(), "city".to_string()],
                json!("Paris")
            )]
        );
    }

    #[test]
    fn ignores_other_and_incomplete_expressions() {
        assert!(extract("greeting(hello), property, property(lonely)").is_empty());
    }

    #[test]
    fn keeps_input_order() {
        let entries = extract("property(a(1)), greeting(hi), property(b(2))");
        let values: Vec<&Value> = entries.iter().map(|e| &e.value).collect();
        assert_eq!(values, vec![&json!("1"), &json!("2")]);
    }
}
