//! Built-in function dispatch.
//!
//! A function receives a [`CallContext`] with its evaluated arguments and
//! optional lambda. Method calls arrive here with the target prepended to
//! the argument list.

mod assert_type;
mod each;
mod fail;
mod filter;
mod include;
mod logging;
mod shellquote;
mod split;
mod with;

use crate::error::EvaluationError;
use crate::evaluator::Evaluator;
use crate::executor;
use crate::logging::Level;
use crate::values::Value;
use cairn_core::ast::Lambda;
use cairn_core::Position;

pub struct CallContext<'e, 'a, 'l> {
    pub evaluator: &'e mut Evaluator<'a>,
    pub name: &'l str,
    pub call_position: Position,
    pub arguments: Vec<Value>,
    pub argument_positions: Vec<Position>,
    pub lambda: Option<&'l Lambda>,
}

impl<'e, 'a, 'l> CallContext<'e, 'a, 'l> {
    /// The position of the given argument, or of the call itself when out
    /// of range.
    pub fn position(&self, index: usize) -> Position {
        self.argument_positions
            .get(index)
            .copied()
            .unwrap_or(self.call_position)
    }

    pub fn error(&self, position: Position, message: impl Into<String>) -> EvaluationError {
        self.evaluator.error(position, message)
    }

    pub fn lambda_given(&self) -> bool {
        self.lambda.is_some()
    }

    pub fn lambda_parameter_count(&self) -> usize {
        self.lambda
            .and_then(|l| l.parameters.as_ref())
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn lambda_position(&self) -> Position {
        self.lambda.map(|l| l.position).unwrap_or(self.call_position)
    }

    /// Invoke the lambda with the given arguments.
    pub fn yield_values(&mut self, arguments: Vec<Value>) -> Result<Value, EvaluationError> {
        let lambda = self
            .lambda
            .ok_or_else(|| self.error(self.call_position, "expected a lambda but one was not given."))?;
        executor::execute_lambda(
            self.evaluator,
            lambda.parameters.as_deref(),
            &lambda.body,
            lambda.position,
            arguments,
        )
    }

    /// Enforce an exact argument count, reporting against the first excess
    /// argument.
    pub fn check_argument_count(&self, expected: usize) -> Result<(), EvaluationError> {
        if self.arguments.len() == expected {
            return Ok(());
        }
        let position = if self.arguments.len() > expected {
            self.position(expected)
        } else {
            self.call_position
        };
        Err(self.error(
            position,
            format!(
                "expected {} argument{} to '{}' function but {} were given.",
                expected,
                if expected == 1 { "" } else { "s" },
                self.name,
                self.arguments.len()
            ),
        ))
    }

    /// Enforce a lambda taking one or two parameters.
    pub fn check_iteration_lambda(&self) -> Result<(), EvaluationError> {
        if !self.lambda_given() {
            return Err(self.error(
                self.call_position,
                format!("expected a lambda to '{}' function but one was not given.", self.name),
            ));
        }
        let count = self.lambda_parameter_count();
        if count == 0 || count > 2 {
            return Err(self.error(
                self.lambda_position(),
                format!("expected 1 or 2 lambda parameters but {} were given.", count),
            ));
        }
        Ok(())
    }
}

/// Dispatch a function call by name.
pub fn dispatch(
    evaluator: &mut Evaluator,
    name: &str,
    call_position: Position,
    arguments: Vec<Value>,
    argument_positions: Vec<Position>,
    lambda: Option<&Lambda>,
) -> Result<Value, EvaluationError> {
    let mut context = CallContext {
        evaluator,
        name,
        call_position,
        arguments,
        argument_positions,
        lambda,
    };
    match name {
        "assert_type" => assert_type::call(&mut context),
        "each" => each::call(&mut context),
        "fail" => fail::call(&mut context),
        "filter" => filter::call(&mut context),
        "include" => include::call(&mut context),
        "shellquote" => shellquote::call(&mut context),
        "split" => split::call(&mut context),
        "with" => with::call(&mut context),
        "notice" => logging::call(&mut context, Level::Notice),
        "info" => logging::call(&mut context, Level::Info),
        "warning" => logging::call(&mut context, Level::Warning),
        "err" => logging::call(&mut context, Level::Error),
        "debug" => logging::call(&mut context, Level::Debug),
        _ => Err(evaluator.error(
            call_position,
            format!("unknown function '{}'.", name),
        )),
    }
}
