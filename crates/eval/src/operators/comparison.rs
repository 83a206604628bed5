//! Comparison operators: `==`, `!=`, `<`, `<=`, `>`, `>=`.
//!
//! Equality never fails: values of different kinds are simply unequal.
//! Ordering comparisons promote mixed numerics, compare strings
//! case-insensitively, order types by specialization, and error on
//! anything else.

use super::BinaryContext;
use crate::error::EvaluationError;
use crate::types::Type;
use crate::values::{self, Value};
use std::cmp::Ordering;

pub fn equals(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    Ok(Value::Boolean(values::equals(&context.left, &context.right)))
}

pub fn not_equals(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    Ok(Value::Boolean(!values::equals(&context.left, &context.right)))
}

pub fn less(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    compare(context, "comparison", |ordering| ordering == Ordering::Less, |left, right| {
        // left < right: left is a strictly narrower type
        right.is_specialization(left)
    })
}

pub fn less_equal(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    compare(
        context,
        "comparison",
        |ordering| ordering != Ordering::Greater,
        |left, right| left == right || right.is_specialization(left),
    )
}

pub fn greater(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    compare(
        context,
        "comparison",
        |ordering| ordering == Ordering::Greater,
        |left, right| left.is_specialization(right),
    )
}

pub fn greater_equal(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    compare(
        context,
        "comparison",
        |ordering| ordering != Ordering::Less,
        |left, right| left == right || left.is_specialization(right),
    )
}

fn compare(
    context: &BinaryContext,
    operation: &str,
    numeric: impl Fn(Ordering) -> bool,
    types: impl Fn(&Type, &Type) -> bool,
) -> Result<Value, EvaluationError> {
    let left = values::dereference(&context.left);
    let right = values::dereference(&context.right);
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => Ok(Value::Boolean(numeric(l.cmp(r)))),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            let l = to_float(left);
            let r = to_float(right);
            let ordering = l
                .partial_cmp(&r)
                .ok_or_else(|| context.left_error("cannot compare NaN values."))?;
            Ok(Value::Boolean(numeric(ordering)))
        }
        (Value::String(l), Value::String(r)) => {
            let ordering = l.to_lowercase().cmp(&r.to_lowercase());
            Ok(Value::Boolean(numeric(ordering)))
        }
        (Value::Type(l), Value::Type(r)) => Ok(Value::Boolean(types(l, r))),
        (Value::Integer(_) | Value::Float(_), other) => Err(context.right_error(format!(
            "expected Numeric for {} but found {}.",
            operation,
            values::get_type(other)
        ))),
        (Value::String(_), other) => Err(context.right_error(format!(
            "expected String for {} but found {}.",
            operation,
            values::get_type(other)
        ))),
        (Value::Type(_), other) => Err(context.right_error(format!(
            "expected Type for {} but found {}.",
            operation,
            values::get_type(other)
        ))),
        (other, _) => Err(context.left_error(format!(
            "expected Numeric, String, or Type for {} but found {}.",
            operation,
            values::get_type(other)
        ))),
    }
}

fn to_float(value: &Value) -> f64 {
    match value {
        Value::Integer(i) => *i as f64,
        Value::Float(x) => *x,
        _ => unreachable!("checked by caller"),
    }
}
