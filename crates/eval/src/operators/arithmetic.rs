//! Arithmetic operators: `+`, `-`, `*`, `/`, `%`.
//!
//! Mixed integer/float operands promote to float; integer overflow,
//! division by zero, and `i64::MIN / -1` are errors. `+` additionally
//! concatenates arrays and merges hashes (right wins).

use super::BinaryContext;
use crate::error::EvaluationError;
use crate::values::{self, Value};

fn numeric_operands(
    context: &BinaryContext,
    operation: &str,
) -> Result<(Value, Value), EvaluationError> {
    let left = values::dereference(&context.left);
    let right = values::dereference(&context.right);
    if !matches!(left, Value::Integer(_) | Value::Float(_)) {
        return Err(context.left_error(format!(
            "expected Numeric for arithmetic {} but found {}.",
            operation,
            values::get_type(left)
        )));
    }
    if !matches!(right, Value::Integer(_) | Value::Float(_)) {
        return Err(context.right_error(format!(
            "expected Numeric for arithmetic {} but found {}.",
            operation,
            values::get_type(right)
        )));
    }
    Ok((left.clone(), right.clone()))
}

pub fn plus(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    // Array concatenation and hash merge come before numeric addition
    match (
        values::dereference(&context.left),
        values::dereference(&context.right),
    ) {
        (Value::Array(left), Value::Array(right)) => {
            let mut result = left.clone();
            result.extend(right.iter().cloned());
            return Ok(Value::Array(result));
        }
        (Value::Array(left), right) => {
            let mut result = left.clone();
            result.push(right.clone());
            return Ok(Value::Array(result));
        }
        (Value::Hash(left), Value::Hash(right)) => {
            let mut result = left.clone();
            for (key, value) in right.iter() {
                result.insert(key.clone(), value.clone());
            }
            return Ok(Value::Hash(result));
        }
        _ => {}
    }

    let (left, right) = numeric_operands(context, "addition")?;
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => l.checked_add(r).map(Value::Integer).ok_or_else(|| {
            context.left_error(format!(
                "addition of {} and {} results in an arithmetic overflow.",
                l, r
            ))
        }),
        (l, r) => Ok(Value::Float(to_float(&l) + to_float(&r))),
    }
}

pub fn minus(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    let (left, right) = numeric_operands(context, "subtraction")?;
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => l.checked_sub(r).map(Value::Integer).ok_or_else(|| {
            context.left_error(format!(
                "subtraction of {} and {} results in an arithmetic overflow.",
                l, r
            ))
        }),
        (l, r) => Ok(Value::Float(to_float(&l) - to_float(&r))),
    }
}

pub fn multiply(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    let (left, right) = numeric_operands(context, "multiplication")?;
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => l.checked_mul(r).map(Value::Integer).ok_or_else(|| {
            context.left_error(format!(
                "multiplication of {} and {} results in an arithmetic overflow.",
                l, r
            ))
        }),
        (l, r) => Ok(Value::Float(to_float(&l) * to_float(&r))),
    }
}

pub fn divide(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    let (left, right) = numeric_operands(context, "division")?;
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => {
            if r == 0 {
                return Err(context.right_error("cannot divide by zero."));
            }
            if l == i64::MIN && r == -1 {
                return Err(context.left_error(format!(
                    "division of {} by {} results in an arithmetic overflow.",
                    l, r
                )));
            }
            Ok(Value::Integer(l / r))
        }
        (l, r) => {
            let divisor = to_float(&r);
            if divisor == 0.0 {
                return Err(context.right_error("cannot divide by zero."));
            }
            Ok(Value::Float(to_float(&l) / divisor))
        }
    }
}

pub fn modulo(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    let left = values::dereference(&context.left).clone();
    let right = values::dereference(&context.right).clone();
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => {
            if r == 0 {
                return Err(context.right_error("cannot divide by zero."));
            }
            Ok(Value::Integer(l % r))
        }
        (Value::Integer(_), other) => Err(context.right_error(format!(
            "expected Integer for arithmetic modulo but found {}.",
            values::get_type(&other)
        ))),
        (other, _) => Err(context.left_error(format!(
            "expected Integer for arithmetic modulo but found {}.",
            values::get_type(&other)
        ))),
    }
}

fn to_float(value: &Value) -> f64 {
    match value {
        Value::Integer(i) => *i as f64,
        Value::Float(x) => *x,
        _ => unreachable!("checked by numeric_operands"),
    }
}
