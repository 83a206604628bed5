use serde::{Deserialize, Serialize};
use std::fmt;

/// Where in the front-end a diagnostic originated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Lexical,
    Syntactic,
}

/// A front-end diagnostic with its source position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(
        kind: ErrorKind,
        file: &str,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        ParseError {
            kind,
            file: file.to_owned(),
            line,
            column,
            message: message.into(),
        }
    }

    pub fn lex(file: &str, line: usize, column: usize, message: impl Into<String>) -> Self {
        ParseError::new(ErrorKind::Lexical, file, line, column, message)
    }

    pub fn parse(file: &str, line: usize, column: usize, message: impl Into<String>) -> Self {
        ParseError::new(ErrorKind::Syntactic, file, line, column, message)
    }

    /// Serialize to JSON for machine-readable diagnostics.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "column":  self.column,
            "file":    self.file,
            "kind":    match self.kind { ErrorKind::Lexical => "lexical", ErrorKind::Syntactic => "syntactic" },
            "line":    self.line,
            "message": self.message,
        })
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file, self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}
