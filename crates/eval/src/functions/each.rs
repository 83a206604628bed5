//! The `each` function: iterate a string, count, integer range, array, or
//! hash, yielding to the lambda. With two lambda parameters the first is
//! the index or key. Returns the collection unchanged.

use super::CallContext;
use crate::error::EvaluationError;
use crate::values::{self, Value};

pub fn call(context: &mut CallContext) -> Result<Value, EvaluationError> {
    context.check_argument_count(1)?;
    context.check_iteration_lambda()?;

    let argument = values::mutate(std::mem::replace(&mut context.arguments[0], Value::Undef));
    let pairs = context.lambda_parameter_count() == 2;

    match &argument {
        Value::String(text) => {
            for (i, c) in text.chars().enumerate() {
                let element = Value::String(c.to_string());
                let arguments = if pairs {
                    vec![Value::Integer(i as i64), element]
                } else {
                    vec![element]
                };
                context.yield_values(arguments)?;
            }
        }
        Value::Integer(count) => {
            for i in 0..*count {
                let arguments = if pairs {
                    vec![Value::Integer(i), Value::Integer(i)]
                } else {
                    vec![Value::Integer(i)]
                };
                context.yield_values(arguments)?;
            }
        }
        Value::Array(elements) => {
            for (i, element) in elements.iter().enumerate() {
                let arguments = if pairs {
                    vec![Value::Integer(i as i64), element.clone()]
                } else {
                    vec![element.clone()]
                };
                context.yield_values(arguments)?;
            }
        }
        Value::Hash(hash) => {
            let hash = hash.clone();
            for (key, value) in hash.iter() {
                let arguments = if pairs {
                    vec![key.clone(), value.clone()]
                } else {
                    vec![Value::Array(vec![key.clone(), value.clone()])]
                };
                context.yield_values(arguments)?;
            }
        }
        Value::Type(type_) => match type_.enumerable_range() {
            Some((from, to)) => {
                for (i, value) in (from..=to).enumerate() {
                    let arguments = if pairs {
                        vec![Value::Integer(i as i64), Value::Integer(value)]
                    } else {
                        vec![Value::Integer(value)]
                    };
                    context.yield_values(arguments)?;
                }
            }
            None => {
                return Err(context.error(
                    context.position(0),
                    format!("{} is not enumerable.", type_),
                ))
            }
        },
        other => {
            return Err(context.error(
                context.position(0),
                format!(
                    "expected enumerable type for first argument but found {}.",
                    values::get_type(other)
                ),
            ))
        }
    }

    Ok(argument)
}
