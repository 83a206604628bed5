//! The match operators `=~` and `!~`. The left operand must be a string;
//! the right is a regex or a string compiled as one. A successful match
//! binds the capture groups as `$0..$n` in the enclosing match scope.

use super::BinaryContext;
use crate::error::EvaluationError;
use crate::values::{self, Regex, Value};

pub fn match_op(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    Ok(Value::Boolean(matches(context)?))
}

pub fn not_match(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    Ok(Value::Boolean(!matches(context)?))
}

fn matches(context: &mut BinaryContext) -> Result<bool, EvaluationError> {
    // A type on the right is an instance check
    if let Value::Type(type_) = values::dereference(&context.right) {
        return Ok(values::is_instance(&context.left, type_));
    }

    let subject = match values::dereference(&context.left) {
        Value::String(s) => s.clone(),
        other => {
            return Err(context.left_error(format!(
                "expected String for match but found {}.",
                values::get_type(other)
            )))
        }
    };

    let regex = match values::dereference(&context.right) {
        Value::Regex(regex) => regex.clone(),
        Value::String(pattern) => Regex::new(pattern).map_err(|e| {
            context.right_error(format!("invalid regular expression: {}", e))
        })?,
        other => {
            return Err(context.right_error(format!(
                "expected Regexp or String for match but found {}.",
                values::get_type(other)
            )))
        }
    };

    match regex.as_regex().captures(&subject) {
        Some(captures) => {
            let groups = captures
                .iter()
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect();
            context.evaluator.context.set_matches(groups);
            Ok(true)
        }
        None => Ok(false),
    }
}
