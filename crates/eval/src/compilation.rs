//! Per-manifest compilation context: the path, source text, and parsed
//! syntax tree, plus position-aware diagnostics against that source.

use crate::error::{CompilationError, EvaluationError};
use crate::logging::{Level, Logger};
use cairn_core::ast::SyntaxTree;
use cairn_core::{parser, text_and_column, ParseError, Position};
use std::rc::Rc;

#[derive(Debug)]
pub struct CompilationContext {
    path: Rc<String>,
    source: String,
    tree: Rc<SyntaxTree>,
}

impl CompilationContext {
    /// Parse a manifest into a compilation context.
    pub fn parse(path: impl Into<String>, source: impl Into<String>) -> Result<Rc<Self>, ParseError> {
        let path = path.into();
        let source = source.into();
        let tree = parser::parse_manifest(&source, &path)?;
        Ok(Rc::new(CompilationContext {
            path: Rc::new(path),
            source,
            tree: Rc::new(tree),
        }))
    }

    /// Create a context for an already-parsed tree (used by interpolation).
    pub fn synthetic(path: Rc<String>, source: String, tree: Rc<SyntaxTree>) -> Rc<Self> {
        Rc::new(CompilationContext { path, source, tree })
    }

    pub fn path(&self) -> Rc<String> {
        Rc::clone(&self.path)
    }

    pub fn tree(&self) -> Rc<SyntaxTree> {
        Rc::clone(&self.tree)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// An evaluation error positioned in this manifest.
    pub fn error(&self, position: Position, message: impl Into<String>) -> EvaluationError {
        EvaluationError::at(message, &self.path, position)
    }

    /// Log a record with the offending line and column resolved from the
    /// source text.
    pub fn log(&self, logger: &dyn Logger, level: Level, position: Position, message: &str) {
        if !logger.would_log(level) {
            return;
        }
        let (text, column) = text_and_column(&self.source, position.offset);
        logger.log(
            level,
            position.line,
            column,
            Some(&text),
            Some(&self.path),
            message,
        );
    }

    /// Render an evaluation error into a compilation error against this
    /// manifest's source.
    pub fn render_error(&self, error: &EvaluationError) -> CompilationError {
        match error.position {
            Some(position) => {
                let (text, column) = text_and_column(&self.source, position.offset);
                CompilationError::with_context(
                    error.message.clone(),
                    error.path.as_deref().unwrap_or(&self.path),
                    position.line,
                    column,
                    text,
                )
            }
            None => CompilationError::new(error.message.clone()),
        }
    }
}
