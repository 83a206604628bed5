//! Parameter binding and body execution for classes, defined types, and
//! lambdas.
//!
//! Defaults are evaluated left to right in the execution scope itself, so
//! later parameter defaults can reference earlier parameters. Required
//! parameters may not follow optional ones, and only the last parameter of
//! a lambda may capture the remaining arguments.

use crate::catalog::{self, ResourceIndex};
use crate::error::EvaluationError;
use crate::evaluator::Evaluator;
use crate::scope::{Scope, ScopeRef};
use crate::values::{self, Value};
use cairn_core::ast::{Expression, Parameter};
use cairn_core::Position;
use std::rc::Rc;

/// Execute a lambda body with the given arguments in a child scope of the
/// current scope.
pub fn execute_lambda(
    evaluator: &mut Evaluator,
    parameters: Option<&[Parameter]>,
    body: &[Expression],
    position: Position,
    mut arguments: Vec<Value>,
) -> Result<Value, EvaluationError> {
    let scope = Scope::child(evaluator.context.current_scope(), None);
    evaluator.context.push_scope(Rc::clone(&scope));
    let result = bind_and_run(evaluator, parameters, body, position, &mut arguments, &scope);
    evaluator.context.pop_scope();
    result
}

fn bind_and_run(
    evaluator: &mut Evaluator,
    parameters: Option<&[Parameter]>,
    body: &[Expression],
    _position: Position,
    arguments: &mut Vec<Value>,
    scope: &ScopeRef,
) -> Result<Value, EvaluationError> {
    let path = evaluator.path();
    let mut has_optional = false;

    if let Some(parameters) = parameters {
        for (i, parameter) in parameters.iter().enumerate() {
            let name = &parameter.variable.name;

            let value = if parameter.captures {
                if i != parameters.len() - 1 {
                    return Err(evaluator.error(
                        parameter.position,
                        format!(
                            "parameter ${} \"captures rest\" but is not the last parameter.",
                            name
                        ),
                    ));
                }
                let mut captured = Vec::new();
                if i < arguments.len() {
                    captured.extend(arguments.drain(i..));
                } else if let Some(default) = &parameter.default {
                    captured.push(evaluator.evaluate_expression(default, false)?);
                }
                Value::Array(captured)
            } else {
                if has_optional && parameter.default.is_none() {
                    return Err(evaluator.error(
                        parameter.position,
                        format!(
                            "parameter ${} is required but appears after optional parameters.",
                            name
                        ),
                    ));
                }
                has_optional = parameter.default.is_some();

                if i < arguments.len() {
                    std::mem::replace(&mut arguments[i], Value::Undef)
                } else {
                    match &parameter.default {
                        Some(default) => evaluator.evaluate_expression(default, false)?,
                        None => {
                            return Err(evaluator.error(
                                parameter.position,
                                format!("parameter ${} is required but no value was given.", name),
                            ))
                        }
                    }
                }
            };

            validate_type(evaluator, parameter, &value)?;

            let previous = scope.borrow_mut().set(
                name.clone(),
                Rc::new(values::mutate(value)),
                Some(Rc::clone(&path)),
                parameter.position.line,
            );
            if previous.is_some() {
                return Err(evaluator.error(
                    parameter.position,
                    format!("parameter ${} already exists in the parameter list.", name),
                ));
            }
        }
    }

    evaluate_body(evaluator, body)
}

/// Execute the body of a class or defined type: bind parameter defaults
/// and resource attributes into the given scope (with `$title` and `$name`
/// always present), then evaluate the body.
pub fn execute_resource(
    evaluator: &mut Evaluator,
    parameters: Option<&[Parameter]>,
    body: &[Expression],
    position: Position,
    resource: ResourceIndex,
    scope: ScopeRef,
) -> Result<Value, EvaluationError> {
    evaluator.context.push_scope(Rc::clone(&scope));
    let result = bind_resource_and_run(evaluator, parameters, body, position, resource, &scope);
    evaluator.context.pop_scope();
    result
}

fn bind_resource_and_run(
    evaluator: &mut Evaluator,
    parameters: Option<&[Parameter]>,
    body: &[Expression],
    _position: Position,
    resource: ResourceIndex,
    scope: &ScopeRef,
) -> Result<Value, EvaluationError> {
    let path = evaluator.path();

    // Collect what the declaration supplied
    let (title, resource_path, resource_line, attribute_entries, is_class, type_name) = {
        let resource = evaluator.context.catalog.resource(resource);
        let mut entries: Vec<(String, Rc<Value>)> = Vec::new();
        resource.attributes().each(&mut |name, value| {
            entries.push((name.to_string(), Rc::clone(value)));
            true
        });
        (
            resource.title().to_string(),
            resource.path(),
            resource.line(),
            entries,
            resource.is_class(),
            resource.type_name().to_string(),
        )
    };

    // Defaults evaluate left to right in the scope itself, so later
    // parameters see earlier ones
    if let Some(parameters) = parameters {
        for parameter in parameters {
            let name = &parameter.variable.name;
            let supplied = attribute_entries.iter().any(|(n, _)| n == name);

            match &parameter.default {
                None => {
                    if !supplied {
                        return Err(evaluator.error(
                            parameter.position,
                            format!("parameter ${} is required but no value was given.", name),
                        ));
                    }
                }
                Some(default) => {
                    if supplied {
                        continue;
                    }
                    let value = evaluator.evaluate_expression(default, false)?;
                    validate_type(evaluator, parameter, &value)?;
                    let previous = scope.borrow_mut().set(
                        name.clone(),
                        Rc::new(values::mutate(value)),
                        Some(Rc::clone(&path)),
                        parameter.position.line,
                    );
                    if previous.is_some() {
                        return Err(evaluator.error(
                            parameter.position,
                            format!(
                                "parameter ${} already exists in the parameter list.",
                                name
                            ),
                        ));
                    }
                }
            }
        }
    }

    // Bind each supplied attribute, validating against the parameter list
    let mut name_value = Rc::new(Value::String(title.clone()));
    for (attribute_name, attribute_value) in &attribute_entries {
        if attribute_name == "name" {
            name_value = Rc::clone(attribute_value);
            continue;
        }

        let parameter = parameters
            .iter()
            .flat_map(|p| p.iter())
            .find(|p| &p.variable.name == attribute_name);

        match parameter {
            Some(parameter) => {
                validate_type(evaluator, parameter, attribute_value)?;
            }
            None => {
                if !catalog::is_metaparameter(attribute_name) {
                    let message = if is_class {
                        format!(
                            "'{}' is not a valid parameter for class '{}'.",
                            attribute_name, title
                        )
                    } else {
                        format!(
                            "'{}' is not a valid parameter for defined type '{}'.",
                            attribute_name, type_name
                        )
                    };
                    return Err(EvaluationError::new(message));
                }
            }
        }

        scope.borrow_mut().set(
            attribute_name.clone(),
            Rc::clone(attribute_value),
            Some(Rc::clone(&resource_path)),
            resource_line,
        );
    }

    let title_value = Rc::new(Value::String(title));
    scope.borrow_mut().set(
        "title",
        title_value,
        Some(Rc::clone(&path)),
        resource_line,
    );
    scope
        .borrow_mut()
        .set("name", name_value, Some(path), resource_line);

    evaluate_body(evaluator, body)
}

fn validate_type(
    evaluator: &mut Evaluator,
    parameter: &Parameter,
    value: &Value,
) -> Result<(), EvaluationError> {
    let Some(type_expression) = &parameter.type_ else {
        return Ok(());
    };

    let result = evaluator.evaluate_primary(type_expression)?;
    let type_ = match values::dereference(&result) {
        Value::Type(type_) => type_.clone(),
        other => {
            return Err(evaluator.error(
                type_expression.position(),
                format!(
                    "expected Type for parameter type but found {}.",
                    values::get_type(other)
                ),
            ))
        }
    };

    if !values::is_instance(value, &type_) {
        return Err(evaluator.error(
            parameter.position,
            format!(
                "parameter ${} has expected type {} but was given {}.",
                parameter.variable.name,
                type_,
                values::get_type(value)
            ),
        ));
    }
    Ok(())
}

/// Evaluate a body; the last expression is the result and may be
/// unproductive.
fn evaluate_body(
    evaluator: &mut Evaluator,
    body: &[Expression],
) -> Result<Value, EvaluationError> {
    let mut result = Value::Undef;
    for (i, expression) in body.iter().enumerate() {
        result = evaluator.evaluate_expression(expression, i < body.len() - 1)?;
    }
    Ok(result)
}
