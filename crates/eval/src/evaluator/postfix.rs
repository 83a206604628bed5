//! Evaluation of postfix operations: selectors, access, and method calls.

use super::Evaluator;
use crate::error::EvaluationError;
use crate::functions;
use crate::values::{self, Value};
use cairn_core::ast::{PostfixExpression, PostfixSubexpression, SelectorExpression};
use cairn_core::Position;

impl<'a> Evaluator<'a> {
    pub(super) fn evaluate_postfix(
        &mut self,
        expression: &PostfixExpression,
    ) -> Result<Value, EvaluationError> {
        let mut result = self.evaluate_primary(&expression.primary)?;
        let mut position = expression.primary.position();

        for subexpression in &expression.subexpressions {
            match subexpression {
                PostfixSubexpression::Selector(selector) => {
                    result = self.evaluate_selector(&result, position, selector)?;
                    position = selector.position;
                }
                PostfixSubexpression::Access(access) => {
                    result = self.evaluate_access(&result, access)?;
                    position = access.position;
                }
                PostfixSubexpression::MethodCall(call) => {
                    let (mut arguments, mut positions) = self.evaluate_arguments(&call.arguments)?;
                    // x.f(args) is f(x, args)
                    arguments.insert(0, std::mem::replace(&mut result, Value::Undef));
                    positions.insert(0, position);
                    result = functions::dispatch(
                        self,
                        &call.method.value,
                        call.method.position,
                        arguments,
                        positions,
                        call.lambda.as_ref(),
                    )?;
                    position = call.position;
                }
            }
        }
        Ok(result)
    }

    fn evaluate_selector(
        &mut self,
        target: &Value,
        target_position: Position,
        expression: &SelectorExpression,
    ) -> Result<Value, EvaluationError> {
        self.with_match_scope(|evaluator| {
            let mut default_index = None;
            for (i, case) in expression.cases.iter().enumerate() {
                let selector = evaluator.evaluate_expression(&case.selector, false)?;
                if values::is_default(&selector) {
                    // Remember the default case and keep going
                    default_index = Some(i);
                    continue;
                }

                if let Some(unfolded) = evaluator.unfold(&case.selector, &selector) {
                    for element in unfolded {
                        if evaluator.is_match(target, target_position, &element, case.position)? {
                            return evaluator.evaluate_expression(&case.result, false);
                        }
                    }
                }

                if evaluator.is_match(target, target_position, &selector, case.position)? {
                    return evaluator.evaluate_expression(&case.result, false);
                }
            }

            match default_index {
                Some(index) => {
                    evaluator.evaluate_expression(&expression.cases[index].result, false)
                }
                None => Err(evaluator.error(
                    expression.position,
                    format!("no matching selector case for value '{}'.", target),
                )),
            }
        })
    }
}
