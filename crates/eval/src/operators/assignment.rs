//! The assignment operator. Assignment is write-once and lexical: a name
//! already bound in the current scope or any enclosing scope (including
//! facts at the top scope) cannot be reassigned.

use super::BinaryContext;
use crate::error::EvaluationError;
use crate::scope;
use crate::values::{Value, Variable};
use std::rc::Rc;

pub fn evaluate(context: &mut BinaryContext) -> Result<Value, EvaluationError> {
    // The left-hand side must be a variable reference
    let name = match &context.left {
        Value::Variable(variable) => variable.name().to_string(),
        other => {
            return Err(context.left_error(format!(
                "cannot assign to {}: assignment can only be performed on variables.",
                crate::values::get_type(other)
            )))
        }
    };
    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Err(context.left_error(format!(
            "cannot assign to ${}: the name is reserved as a match variable.",
            name
        )));
    }
    if name.contains(':') {
        return Err(context.left_error(format!(
            "cannot assign to ${}: assignment can only be performed on variables local to the current scope.",
            name
        )));
    }

    let current = context.evaluator.context.current_scope();

    // Write-once, lexically: reject a name visible anywhere up the chain
    if let Some(previous) = scope::lookup(&current, &name) {
        return Err(context.left_error(match previous.path() {
            Some(path) if !path.is_empty() => format!(
                "cannot assign to ${}: variable was previously assigned at {}:{}.",
                name,
                path,
                previous.line()
            ),
            _ => format!(
                "cannot assign to ${}: a fact or node parameter exists with the same name.",
                name
            ),
        }));
    }

    // Share the right side's storage when it is itself a variable
    let value = match std::mem::replace(&mut context.right, Value::Undef) {
        Value::Variable(variable) => variable.value_rc(),
        other => Rc::new(other),
    };

    let path = context.evaluator.path();
    let line = context.left_position.line;
    current
        .borrow_mut()
        .set(name.clone(), Rc::clone(&value), Some(path), line);

    Ok(Value::Variable(Variable::new(name, Some(value))))
}
