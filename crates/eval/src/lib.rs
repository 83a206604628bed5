//! Evaluator for the manifest language.
//!
//! The crate takes parsed manifests (from `cairn-core`) through the
//! two-phase pipeline: a definition scan registers classes, defined types,
//! and node definitions into the catalog, then the expression evaluator
//! walks each manifest against a hierarchy of lexical scopes, declaring
//! resources and resolving relationships. The finalized [`Catalog`] is the
//! output; facts, manifest sources, and logging are injected at the
//! boundary.

pub mod catalog;
pub mod compilation;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod facts;
pub mod functions;
pub mod interpolator;
pub mod logging;
pub mod node;
pub mod operators;
pub mod scanner;
pub mod scope;
pub mod types;
pub mod values;

pub use catalog::{Catalog, Edge, Relationship, Resource, ResourceStatus};
pub use error::{CompilationError, EvaluationError};
pub use facts::{FactProvider, StaticFactProvider};
pub use logging::{Level, LogRecord, Logger, MemoryLogger};
pub use node::{CompilationSettings, Node};
pub use types::Type;
pub use values::Value;

use cairn_core::SourceProvider;
use std::rc::Rc;

/// Compile a catalog for one node.
///
/// This is the top-level entry point: it parses every manifest named in
/// the settings through the source provider, compiles them for the node
/// named there, and returns the finalized catalog. Errors have already
/// been logged when this returns `Err`.
pub fn compile(
    settings: &CompilationSettings,
    sources: &dyn SourceProvider,
    facts: Option<Rc<dyn FactProvider>>,
    logger: Rc<dyn Logger>,
) -> Result<Catalog, CompilationError> {
    Node::new(&settings.node_name).compile(settings, sources, facts, logger)
}
