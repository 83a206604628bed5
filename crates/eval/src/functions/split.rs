//! The `split` function: split a string by a string, regex, or `Regexp`
//! type. An empty pattern splits into characters.

use super::CallContext;
use crate::error::EvaluationError;
use crate::types::Type;
use crate::values::{self, Regex, Value};

pub fn call(context: &mut CallContext) -> Result<Value, EvaluationError> {
    context.check_argument_count(2)?;

    let subject = match values::dereference(&context.arguments[0]) {
        Value::String(s) => s.clone(),
        other => {
            return Err(context.error(
                context.position(0),
                format!(
                    "expected String for first argument but found {}.",
                    values::get_type(other)
                ),
            ))
        }
    };

    match values::dereference(&context.arguments[1]) {
        Value::String(pattern) => {
            if pattern.is_empty() {
                return Ok(split_characters(&subject));
            }
            // Empty pieces between separators are dropped
            let pieces = subject
                .split(pattern.as_str())
                .filter(|piece| !piece.is_empty())
                .map(|piece| Value::String(piece.to_string()))
                .collect();
            Ok(Value::Array(pieces))
        }
        Value::Regex(regex) => {
            if regex.pattern().is_empty() {
                return Ok(split_characters(&subject));
            }
            Ok(split_regex(&subject, regex))
        }
        Value::Type(Type::Regexp { pattern }) => {
            let pattern = pattern.clone().unwrap_or_default();
            if pattern.is_empty() {
                return Ok(split_characters(&subject));
            }
            let regex = Regex::new(&pattern).map_err(|e| {
                context.error(
                    context.position(1),
                    format!("invalid regular expression: {}", e),
                )
            })?;
            Ok(split_regex(&subject, &regex))
        }
        other => Err(context.error(
            context.position(1),
            format!(
                "expected String or Regexp for second argument but found {}.",
                values::get_type(other)
            ),
        )),
    }
}

fn split_characters(subject: &str) -> Value {
    Value::Array(
        subject
            .chars()
            .map(|c| Value::String(c.to_string()))
            .collect(),
    )
}

fn split_regex(subject: &str, regex: &Regex) -> Value {
    Value::Array(
        regex
            .as_regex()
            .split(subject)
            .map(|piece| Value::String(piece.to_string()))
            .collect(),
    )
}
