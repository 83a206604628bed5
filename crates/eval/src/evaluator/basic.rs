//! Evaluation of basic expressions: literals, variables, names, types,
//! arrays, and hashes.

use super::Evaluator;
use crate::error::EvaluationError;
use crate::interpolator;
use crate::types::Type;
use crate::values::{self, Hash, Value, Variable};
use cairn_core::ast::BasicExpression;
use cairn_core::lexer::NumberValue;

impl<'a> Evaluator<'a> {
    pub(super) fn evaluate_basic(
        &mut self,
        expression: &BasicExpression,
    ) -> Result<Value, EvaluationError> {
        match expression {
            BasicExpression::Undef(_) => Ok(Value::Undef),
            BasicExpression::Default(_) => Ok(Value::Default),
            BasicExpression::Boolean(boolean) => Ok(Value::Boolean(boolean.value)),
            BasicExpression::Number(number) => Ok(match number.value {
                NumberValue::Integer(i) => Value::Integer(i),
                NumberValue::Float(x) => Value::Float(x),
            }),
            BasicExpression::String(literal) => {
                let text =
                    interpolator::interpolate(self, literal.position, &literal.data)?;
                Ok(Value::String(text))
            }
            BasicExpression::Regex(literal) => values::Regex::new(&literal.pattern)
                .map(Value::Regex)
                .map_err(|e| {
                    self.error(
                        literal.position,
                        format!("invalid regular expression: {}", e),
                    )
                }),
            BasicExpression::Variable(variable) => {
                let name = &variable.name;
                if name.is_empty() {
                    return Err(self.error(variable.position, "variable name cannot be empty."));
                }
                let value = if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                    let index: usize = name.parse().map_err(|_| {
                        self.error(
                            variable.position,
                            format!("'{}' is not a valid match variable name.", name),
                        )
                    })?;
                    self.context.lookup_match(index)
                } else {
                    self.lookup_variable(name, variable.position)?
                };
                Ok(Value::Variable(Variable::new(name.clone(), value)))
            }
            // Bare names and words are strings
            BasicExpression::Name(name) => Ok(Value::String(name.value.clone())),
            BasicExpression::Type(type_ref) => Ok(Value::Type(Type::from_name(&type_ref.name))),
            BasicExpression::Array(array) => {
                let mut elements = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    let value = self.evaluate_expression(element, false)?;
                    // Splats expand in place
                    if let Some(unfolded) = self.unfold(element, &value) {
                        elements.extend(unfolded);
                        continue;
                    }
                    elements.push(value);
                }
                Ok(Value::Array(elements))
            }
            BasicExpression::Hash(hash) => {
                let mut result = Hash::new();
                for (key, value) in &hash.elements {
                    let key = self.evaluate_expression(key, false)?;
                    let value = self.evaluate_expression(value, false)?;
                    result.insert(values::mutate(key), values::mutate(value));
                }
                Ok(Value::Hash(result))
            }
        }
    }
}
