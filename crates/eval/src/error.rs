//! Evaluation and compilation errors.
//!
//! An [`EvaluationError`] is the evaluator's non-local exit: it unwinds to
//! the top-level node compilation, which renders it into a
//! [`CompilationError`] carrying the offending line text and caret column
//! for the logger.

use cairn_core::Position;
use std::fmt;

/// An error raised during evaluation, carrying the manifest path and the
/// position of the offending expression when known.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationError {
    pub message: String,
    pub path: Option<String>,
    pub position: Option<Position>,
}

impl EvaluationError {
    pub fn new(message: impl Into<String>) -> Self {
        EvaluationError {
            message: message.into(),
            path: None,
            position: None,
        }
    }

    pub fn at(message: impl Into<String>, path: &str, position: Position) -> Self {
        EvaluationError {
            message: message.into(),
            path: Some(path.to_owned()),
            position: Some(position),
        }
    }
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, &self.position) {
            (Some(path), Some(position)) => {
                write!(f, "{}:{}: {}", path, position.line, self.message)
            }
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for EvaluationError {}

/// A fully rendered compilation failure: the diagnostic record handed to
/// the boundary, with the offending line and caret column resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationError {
    pub message: String,
    pub path: Option<String>,
    pub line: usize,
    pub column: usize,
    pub text: Option<String>,
}

impl CompilationError {
    pub fn new(message: impl Into<String>) -> Self {
        CompilationError {
            message: message.into(),
            path: None,
            line: 0,
            column: 0,
            text: None,
        }
    }

    pub fn with_context(
        message: impl Into<String>,
        path: &str,
        line: usize,
        column: usize,
        text: impl Into<String>,
    ) -> Self {
        CompilationError {
            message: message.into(),
            path: Some(path.to_owned()),
            line,
            column,
            text: Some(text.into()),
        }
    }
}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(
                f,
                "{}:{}:{}: {}",
                path, self.line, self.column, self.message
            ),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for CompilationError {}

impl From<cairn_core::ParseError> for CompilationError {
    fn from(error: cairn_core::ParseError) -> Self {
        CompilationError {
            message: error.message,
            path: Some(error.file),
            line: error.line,
            column: error.column,
            text: None,
        }
    }
}
