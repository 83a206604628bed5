//! The `fail` function: abort evaluation with the given message.

use super::CallContext;
use crate::error::EvaluationError;
use crate::values;

pub fn call(context: &mut CallContext) -> Result<crate::values::Value, EvaluationError> {
    let message = values::join(&context.arguments, " ");
    Err(context.error(context.call_position, message))
}
