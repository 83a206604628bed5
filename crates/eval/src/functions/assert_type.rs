//! The `assert_type` function: return the value if it matches the type;
//! otherwise invoke the lambda with the actual type (or fail without one).

use super::CallContext;
use crate::error::EvaluationError;
use crate::values::{self, Value};

pub fn call(context: &mut CallContext) -> Result<Value, EvaluationError> {
    context.check_argument_count(2)?;

    let expected = match values::dereference(&context.arguments[0]) {
        Value::Type(type_) => type_.clone(),
        other => {
            return Err(context.error(
                context.position(0),
                format!(
                    "expected Type for first argument but found {}.",
                    values::get_type(other)
                ),
            ))
        }
    };

    let value = std::mem::replace(&mut context.arguments[1], Value::Undef);
    if values::is_instance(&value, &expected) {
        return Ok(value);
    }

    let actual = values::get_type(&value);
    if !context.lambda_given() {
        return Err(context.error(
            context.position(1),
            format!(
                "type assertion failure: expected {} but found {}.",
                expected, actual
            ),
        ));
    }
    context.yield_values(vec![Value::Type(actual)])
}
