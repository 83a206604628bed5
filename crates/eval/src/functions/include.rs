//! The `include` function: declare each named class. Declaring an
//! already-declared class is a no-op.

use super::CallContext;
use crate::error::EvaluationError;
use crate::types::Type;
use crate::values::{self, Value};

pub fn call(context: &mut CallContext) -> Result<Value, EvaluationError> {
    if context.arguments.is_empty() {
        return Err(context.error(
            context.call_position,
            format!("expected at least one argument to '{}' function.", context.name),
        ));
    }

    let arguments = std::mem::take(&mut context.arguments);
    for (index, argument) in arguments.iter().enumerate() {
        declare(context, argument, index)?;
    }
    Ok(Value::Undef)
}

fn declare(
    context: &mut CallContext,
    argument: &Value,
    index: usize,
) -> Result<(), EvaluationError> {
    match values::dereference(argument) {
        Value::String(name) => declare_class(context, name, index),
        Value::Type(Type::Class { title }) if !title.is_empty() => {
            let title = title.clone();
            declare_class(context, &title, index)
        }
        Value::Type(Type::Resource { type_name, title }) if type_name == "Class" => {
            if title.is_empty() {
                return Err(context.error(
                    context.position(index),
                    "cannot include a class with an unspecified title.",
                ));
            }
            let title = title.clone();
            declare_class(context, &title, index)
        }
        Value::Array(elements) => {
            let elements = elements.clone();
            for element in &elements {
                declare(context, element, index)?;
            }
            Ok(())
        }
        other => Err(context.error(
            context.position(index),
            format!(
                "expected String, Array, Class, or Class Resource for argument but found {}.",
                values::get_type(other)
            ),
        )),
    }
}

fn declare_class(
    context: &mut CallContext,
    name: &str,
    index: usize,
) -> Result<(), EvaluationError> {
    let position = context.position(index);
    if name.trim().is_empty() {
        return Err(context.error(position, "cannot include a class with an unspecified title."));
    }
    context.evaluator.declare_class(name, None, position)?;
    Ok(())
}
