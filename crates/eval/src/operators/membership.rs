//! The `in` operator. Membership is type-dependent: substring search for
//! strings, regex search for a regex against a string, element membership
//! for arrays, key presence for hashes, and instance checks for types
//! against container elements. Anything else is simply false.

use super::BinaryContext;
use crate::error::EvaluationError;
use crate::values::{self, Value};

pub fn evaluate(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    let left = values::dereference(&context.left).clone();
    let right = values::dereference(&context.right).clone();

    let result = match (&left, &right) {
        (Value::String(needle), Value::String(haystack)) => haystack
            .to_lowercase()
            .contains(&needle.to_lowercase()),
        (Value::Regex(regex), Value::String(subject)) => {
            if regex.pattern().is_empty() {
                true
            } else if let Some(captures) = regex.as_regex().captures(subject) {
                let groups = captures
                    .iter()
                    .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect();
                context.evaluator.context.set_matches(groups);
                true
            } else {
                false
            }
        }
        (Value::Type(type_), Value::Array(elements)) => elements
            .iter()
            .any(|element| values::is_instance(element, type_)),
        (Value::Regex(regex), Value::Array(elements)) => elements.iter().any(|element| {
            matches!(
                values::dereference(element),
                Value::String(s) if regex.as_regex().is_match(s)
            )
        }),
        (needle, Value::Array(elements)) => {
            elements.iter().any(|element| values::equals(needle, element))
        }
        (Value::Type(type_), Value::Hash(hash)) => hash
            .iter()
            .any(|(key, _)| values::is_instance(key, type_)),
        (needle, Value::Hash(hash)) => hash.contains_key(needle),
        _ => false,
    };
    Ok(Value::Boolean(result))
}
