//! The `with` function: invoke the lambda with the given arguments and
//! return its result.

use super::CallContext;
use crate::error::EvaluationError;
use crate::values::Value;

pub fn call(context: &mut CallContext) -> Result<Value, EvaluationError> {
    if !context.lambda_given() {
        return Err(context.error(
            context.call_position,
            format!("expected a lambda to '{}' function but one was not given.", context.name),
        ));
    }
    let arguments = std::mem::take(&mut context.arguments);
    context.yield_values(arguments)
}
