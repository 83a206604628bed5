//! The `filter` function: keep the elements for which the lambda returns
//! true. Strings and integer ranges filter into arrays; hashes filter into
//! hashes.

use super::CallContext;
use crate::error::EvaluationError;
use crate::values::{self, Hash, Value};

pub fn call(context: &mut CallContext) -> Result<Value, EvaluationError> {
    context.check_argument_count(1)?;
    context.check_iteration_lambda()?;

    let argument = values::mutate(std::mem::replace(&mut context.arguments[0], Value::Undef));
    let pairs = context.lambda_parameter_count() == 2;

    match argument {
        Value::String(text) => {
            let mut result = Vec::new();
            for (i, c) in text.chars().enumerate() {
                let element = Value::String(c.to_string());
                let arguments = if pairs {
                    vec![Value::Integer(i as i64), element.clone()]
                } else {
                    vec![element.clone()]
                };
                if values::is_true(&context.yield_values(arguments)?) {
                    result.push(element);
                }
            }
            Ok(Value::Array(result))
        }
        Value::Integer(count) => filter_range(context, 0, count - 1, pairs),
        Value::Array(elements) => {
            let mut result = Vec::new();
            for (i, element) in elements.into_iter().enumerate() {
                let arguments = if pairs {
                    vec![Value::Integer(i as i64), element.clone()]
                } else {
                    vec![element.clone()]
                };
                if values::is_true(&context.yield_values(arguments)?) {
                    result.push(element);
                }
            }
            Ok(Value::Array(result))
        }
        Value::Hash(hash) => {
            let mut result = Hash::new();
            for (key, value) in hash.into_entries() {
                let arguments = if pairs {
                    vec![key.clone(), value.clone()]
                } else {
                    vec![Value::Array(vec![key.clone(), value.clone()])]
                };
                if values::is_true(&context.yield_values(arguments)?) {
                    result.insert(key, value);
                }
            }
            Ok(Value::Hash(result))
        }
        Value::Type(type_) => match type_.enumerable_range() {
            Some((from, to)) => filter_range(context, from, to, pairs),
            None => Err(context.error(
                context.position(0),
                format!("{} is not enumerable.", type_),
            )),
        },
        other => Err(context.error(
            context.position(0),
            format!(
                "expected enumerable type for first argument but found {}.",
                values::get_type(&other)
            ),
        )),
    }
}

fn filter_range(
    context: &mut CallContext,
    from: i64,
    to: i64,
    pairs: bool,
) -> Result<Value, EvaluationError> {
    let mut result = Vec::new();
    for (i, value) in (from..=to).enumerate() {
        let arguments = if pairs {
            vec![Value::Integer(i as i64), Value::Integer(value)]
        } else {
            vec![Value::Integer(value)]
        };
        if values::is_true(&context.yield_values(arguments)?) {
            result.push(Value::Integer(value));
        }
    }
    Ok(Value::Array(result))
}
