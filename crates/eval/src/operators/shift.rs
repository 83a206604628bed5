//! Shift operators. `<<` on an array appends; on integers both shifts are
//! bitwise, keeping the sign bit of a negative left operand and reversing
//! direction for a negative right operand.

use super::BinaryContext;
use crate::error::EvaluationError;
use crate::values::{self, Value};

pub fn left_shift(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    let left = values::mutate(std::mem::replace(&mut context.left, Value::Undef));
    let right = values::mutate(std::mem::replace(&mut context.right, Value::Undef));

    match (left, right) {
        (Value::Array(mut array), element) => {
            array.push(element);
            Ok(Value::Array(array))
        }
        (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(shift(l, r))),
        (Value::Integer(_), other) => Err(context.right_error(format!(
            "expected Integer for bitwise left shift but found {}.",
            values::get_type(&other)
        ))),
        (other, _) => Err(context.left_error(format!(
            "expected Integer for bitwise left shift but found {}.",
            values::get_type(&other)
        ))),
    }
}

pub fn right_shift(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    let left = values::dereference(&context.left).clone();
    let right = values::dereference(&context.right).clone();

    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(shift(l, -r))),
        (Value::Integer(_), other) => Err(context.right_error(format!(
            "expected Integer for bitwise right shift but found {}.",
            values::get_type(&other)
        ))),
        (other, _) => Err(context.left_error(format!(
            "expected Integer for bitwise right shift but found {}.",
            values::get_type(&other)
        ))),
    }
}

/// Shift left by `amount` (negative shifts right), preserving the sign of
/// a negative value.
fn shift(value: i64, amount: i64) -> i64 {
    let magnitude = amount.unsigned_abs().min(63) as u32;
    match (value < 0, amount < 0) {
        (false, false) => value.checked_shl(magnitude).unwrap_or(0),
        (false, true) => value.checked_shr(magnitude).unwrap_or(0),
        (true, false) => -((-value).checked_shl(magnitude).unwrap_or(0)),
        (true, true) => -((-value).checked_shr(magnitude).unwrap_or(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::shift;

    #[test]
    fn shifts_preserve_sign() {
        assert_eq!(shift(1, 3), 8);
        assert_eq!(shift(8, -3), 1);
        assert_eq!(shift(-1, 3), -8);
        assert_eq!(shift(-8, -3), -1);
    }
}
