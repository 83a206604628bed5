//! Evaluation of control flow: case, if, unless, and function calls.

use super::Evaluator;
use crate::error::EvaluationError;
use crate::functions;
use crate::values::{self, Value};
use cairn_core::ast::{CaseExpression, ControlFlowExpression, IfExpression, UnlessExpression};

impl<'a> Evaluator<'a> {
    pub(super) fn evaluate_control_flow(
        &mut self,
        expression: &ControlFlowExpression,
    ) -> Result<Value, EvaluationError> {
        match expression {
            ControlFlowExpression::Case(case) => self.evaluate_case(case),
            ControlFlowExpression::If(if_) => self.evaluate_if(if_),
            ControlFlowExpression::Unless(unless) => self.evaluate_unless(unless),
            ControlFlowExpression::FunctionCall(call) => {
                let (arguments, positions) = self.evaluate_arguments(&call.arguments)?;
                functions::dispatch(
                    self,
                    &call.function.value,
                    call.position,
                    arguments,
                    positions,
                    call.lambda.as_ref(),
                )
            }
        }
    }

    fn evaluate_case(&mut self, expression: &CaseExpression) -> Result<Value, EvaluationError> {
        self.with_match_scope(|evaluator| {
            let result = evaluator.evaluate_expression(&expression.expression, false)?;

            let mut default_index = None;
            for (i, proposition) in expression.propositions.iter().enumerate() {
                for option in &proposition.options {
                    let option_value = evaluator.evaluate_expression(option, false)?;
                    if values::is_default(&option_value) {
                        // Remember the default and keep looking
                        default_index = Some(i);
                        continue;
                    }

                    // A splat option matches against each element
                    if let Some(unfolded) = evaluator.unfold(option, &option_value) {
                        for element in unfolded {
                            if evaluator.is_match(
                                &result,
                                expression.position,
                                &element,
                                option.position(),
                            )? {
                                return evaluator.execute_block(&proposition.body);
                            }
                        }
                    }

                    if evaluator.is_match(
                        &result,
                        expression.position,
                        &option_value,
                        option.position(),
                    )? {
                        return evaluator.execute_block(&proposition.body);
                    }
                }
            }

            if let Some(index) = default_index {
                return evaluator.execute_block(&expression.propositions[index].body);
            }
            Ok(Value::Undef)
        })
    }

    fn evaluate_if(&mut self, expression: &IfExpression) -> Result<Value, EvaluationError> {
        self.with_match_scope(|evaluator| {
            let conditional = evaluator.evaluate_expression(&expression.conditional, false)?;
            if values::is_truthy(&conditional) {
                return evaluator.execute_block(&expression.body);
            }
            for elsif in &expression.elsifs {
                let conditional = evaluator.evaluate_expression(&elsif.conditional, false)?;
                if values::is_truthy(&conditional) {
                    return evaluator.execute_block(&elsif.body);
                }
            }
            if let Some(else_) = &expression.else_ {
                return evaluator.execute_block(&else_.body);
            }
            Ok(Value::Undef)
        })
    }

    fn evaluate_unless(
        &mut self,
        expression: &UnlessExpression,
    ) -> Result<Value, EvaluationError> {
        self.with_match_scope(|evaluator| {
            let conditional = evaluator.evaluate_expression(&expression.conditional, false)?;
            if !values::is_truthy(&conditional) {
                return evaluator.execute_block(&expression.body);
            }
            if let Some(else_) = &expression.else_ {
                return evaluator.execute_block(&else_.body);
            }
            Ok(Value::Undef)
        })
    }
}
