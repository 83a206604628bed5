//! The logging functions: `debug`, `info`, `notice`, `warning`, and
//! `err`. Arguments are joined with spaces and logged at the named
//! severity; the message is the return value.

use super::CallContext;
use crate::error::EvaluationError;
use crate::logging::Level;
use crate::values::{self, Value};

pub fn call(context: &mut CallContext, level: Level) -> Result<Value, EvaluationError> {
    let message = values::join(&context.arguments, " ");
    context
        .evaluator
        .log(level, context.call_position, &message);
    Ok(Value::String(message))
}
