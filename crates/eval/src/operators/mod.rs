//! Binary operator implementations.
//!
//! Each operator receives a [`BinaryContext`] carrying the evaluated
//! operands and their positions; type failures are reported against the
//! offending operand.

pub mod arithmetic;
pub mod assignment;
pub mod comparison;
pub mod matching;
pub mod membership;
pub mod relationship;
pub mod shift;

use crate::error::EvaluationError;
use crate::evaluator::Evaluator;
use crate::values::Value;
use cairn_core::Position;

pub struct BinaryContext<'e, 'a> {
    pub evaluator: &'e mut Evaluator<'a>,
    pub left: Value,
    pub left_position: Position,
    pub right: Value,
    pub right_position: Position,
}

impl<'e, 'a> BinaryContext<'e, 'a> {
    pub fn left_error(&self, message: impl Into<String>) -> EvaluationError {
        self.evaluator.error(self.left_position, message)
    }

    pub fn right_error(&self, message: impl Into<String>) -> EvaluationError {
        self.evaluator.error(self.right_position, message)
    }
}
