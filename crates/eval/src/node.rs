//! Per-node compilation.
//!
//! A [`Node`] carries the subnames of the node being compiled: `a.b.c`
//! matches node definitions by `a.b.c`, `a.b`, then `a`, then by regex,
//! then the default node. [`Node::compile`] drives the whole pipeline:
//! parse every manifest, scan for definitions, evaluate, declare the node,
//! and finalize the catalog.

use crate::catalog::{Attributes, Catalog, ResourceStatus};
use crate::compilation::CompilationContext;
use crate::context::Context;
use crate::error::{CompilationError, EvaluationError};
use crate::evaluator::Evaluator;
use crate::facts::FactProvider;
use crate::logging::{Level, Logger};
use crate::scanner::DefinitionScanner;
use crate::scope::Scope;
use crate::values::Value;
use cairn_core::SourceProvider;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

/// Settings consumed from the boundary. The core does not parse these;
/// they arrive from the external settings collaborator.
pub struct CompilationSettings {
    pub node_name: String,
    pub manifests: Vec<PathBuf>,
    pub environment: Option<String>,
    pub code_directory: Option<PathBuf>,
    pub environment_directory: Option<PathBuf>,
    pub module_directories: Vec<PathBuf>,
    pub log_level: Level,
}

impl CompilationSettings {
    pub fn new(node_name: impl Into<String>, manifests: Vec<PathBuf>) -> Self {
        CompilationSettings {
            node_name: node_name.into(),
            manifests,
            environment: None,
            code_directory: None,
            environment_directory: None,
            module_directories: Vec::new(),
            log_level: Level::Notice,
        }
    }
}

pub struct Node {
    /// Subnames ordered least to most specific.
    names: BTreeSet<String>,
}

impl Node {
    /// Create a node from its name. `a.b.c` gets the subnames `a`, `a.b`,
    /// and `a.b.c`.
    pub fn new(name: &str) -> Self {
        let lowered = name.to_lowercase();
        let mut names = BTreeSet::new();
        let mut current = String::new();
        for segment in lowered.split('.').filter(|s| !s.is_empty()) {
            if !current.is_empty() {
                current.push('.');
            }
            current.push_str(segment);
            names.insert(current.clone());
        }
        if names.is_empty() {
            names.insert(lowered);
        }
        Node { names }
    }

    /// The most specific name.
    pub fn name(&self) -> &str {
        self.names.iter().next_back().expect("at least one name")
    }

    /// Visit each name, most specific first.
    pub fn each_name(&self, callback: &mut dyn FnMut(&str) -> bool) {
        for name in self.names.iter().rev() {
            if !callback(name) {
                return;
            }
        }
    }

    /// Compile this node's catalog from the given manifests.
    pub fn compile(
        &self,
        settings: &CompilationSettings,
        sources: &dyn SourceProvider,
        facts: Option<Rc<dyn FactProvider>>,
        logger: Rc<dyn Logger>,
    ) -> Result<Catalog, CompilationError> {
        let mut compiler = Compiler {
            node: self,
            logger,
            contexts: HashMap::new(),
        };
        compiler.run(settings, sources, facts)
    }
}

struct Compiler<'n> {
    node: &'n Node,
    logger: Rc<dyn Logger>,
    /// Parsed manifests by path, used to render errors with source text.
    contexts: HashMap<String, Rc<CompilationContext>>,
}

impl<'n> Compiler<'n> {
    fn run(
        &mut self,
        settings: &CompilationSettings,
        sources: &dyn SourceProvider,
        facts: Option<Rc<dyn FactProvider>>,
    ) -> Result<Catalog, CompilationError> {
        let mut catalog = Catalog::new();
        create_main(&mut catalog).map_err(|e| self.render(e))?;

        let mut context = Context::new(facts, catalog);
        self.create_settings_scope(&mut context, settings)
            .map_err(|e| self.render(e))?;

        // Parse and scan all manifests before any evaluation, so classes
        // can be declared before they are defined
        let mut compilations = Vec::with_capacity(settings.manifests.len());
        for manifest in &settings.manifests {
            let path = manifest.display().to_string();
            let source = sources.read_source(manifest).map_err(|_| {
                let error = CompilationError::new(format!(
                    "manifest '{}' does not exist or cannot be read.",
                    path
                ));
                self.log_compilation_error(&error);
                error
            })?;

            self.logger
                .log_message(Level::Debug, &format!("parsing '{}'.", path));
            let compilation = match CompilationContext::parse(path.clone(), source.clone()) {
                Ok(compilation) => compilation,
                Err(parse_error) => {
                    let error = self.render_parse_error(&source, parse_error);
                    self.log_compilation_error(&error);
                    return Err(error);
                }
            };
            self.contexts.insert(path, Rc::clone(&compilation));

            DefinitionScanner::new(&mut context.catalog)
                .scan(&compilation)
                .map_err(|e| self.fail(e))?;
            compilations.push(compilation);
        }

        // Evaluate the manifests in the given order
        for compilation in &compilations {
            self.logger.log_message(
                Level::Debug,
                &format!("evaluating the syntax tree for '{}'.", compilation.path()),
            );
            let mut evaluator =
                Evaluator::new(Rc::clone(compilation), &mut context, Rc::clone(&self.logger));
            evaluator.evaluate().map_err(|e| self.fail(e))?;
        }

        // Evaluate the matching node definition
        self.logger.log_message(
            Level::Debug,
            &format!("evaluating node definition for node '{}'.", self.node.name()),
        );
        self.declare_node(&mut context).map_err(|e| self.fail(e))?;

        context.catalog.finalize().map_err(|e| self.fail(e))?;
        Ok(context.into_catalog())
    }

    fn create_settings_scope(
        &mut self,
        context: &mut Context,
        settings: &CompilationSettings,
    ) -> Result<(), EvaluationError> {
        let generated = Rc::new("<generated>".to_string());
        let index = context.catalog.add_resource(
            "class",
            "settings",
            generated,
            1,
            Attributes::new(),
            ResourceStatus::Real,
            None,
        )?;

        let scope = Scope::child(context.top_scope(), Some(index));
        scope.borrow_mut().set_namespace("settings");
        scope.borrow_mut().set(
            "node_name",
            Rc::new(Value::String(settings.node_name.clone())),
            None,
            1,
        );
        if let Some(environment) = &settings.environment {
            scope.borrow_mut().set(
                "environment",
                Rc::new(Value::String(environment.clone())),
                None,
                1,
            );
        }
        context.add_scope("settings", scope);
        Ok(())
    }

    fn declare_node(&mut self, context: &mut Context) -> Result<(), EvaluationError> {
        if !context.catalog.has_nodes() {
            return Ok(());
        }

        let mut names = Vec::new();
        self.node.each_name(&mut |name| {
            names.push(name.to_string());
            true
        });

        let Some((node_name, index)) = context.catalog.find_node(&names) else {
            return Err(EvaluationError::new(format!(
                "could not find a default node or a node with the following names: {}.",
                names.join(", ")
            )));
        };

        let (definition_context, expression) = {
            let definition = context.catalog.node_definition(index);
            (definition.context(), definition.expression())
        };

        let resource = context.catalog.add_resource(
            "node",
            &node_name,
            definition_context.path(),
            expression.position.line,
            Attributes::new(),
            ResourceStatus::Real,
            None,
        )?;

        // The node scope inherits from the top scope and persists for the
        // remainder of the evaluation
        let scope = Scope::child(context.top_scope(), Some(resource));
        context.push_node_scope(scope);

        let mut evaluator = Evaluator::new(
            Rc::clone(&definition_context),
            context,
            Rc::clone(&self.logger),
        );
        let mut result = Ok(Value::Undef);
        for (i, body_expression) in expression.body.iter().enumerate() {
            result = evaluator
                .evaluate_expression(body_expression, i < expression.body.len() - 1);
            if result.is_err() {
                break;
            }
        }
        context.pop_node_scope();

        if let Err(inner) = result {
            self.log_evaluation_error(&inner);
            return Err(EvaluationError::at(
                "failed to evaluate node.",
                &definition_context.path(),
                expression.position,
            ));
        }
        Ok(())
    }

    // -- Error rendering ----------------------------------------

    /// Render and log an evaluation error against its manifest.
    fn fail(&self, error: EvaluationError) -> CompilationError {
        self.log_evaluation_error(&error);
        self.render(error)
    }

    fn render(&self, error: EvaluationError) -> CompilationError {
        match error.path.as_deref().and_then(|p| self.contexts.get(p)) {
            Some(context) => context.render_error(&error),
            None => CompilationError::new(error.message),
        }
    }

    fn render_parse_error(
        &self,
        source: &str,
        error: cairn_core::ParseError,
    ) -> CompilationError {
        // The parse error's column is already resolved; attach the line text
        let mut text = None;
        for (i, line) in source.lines().enumerate() {
            if i + 1 == error.line {
                text = Some(line.to_string());
                break;
            }
        }
        CompilationError {
            message: error.message,
            path: Some(error.file),
            line: error.line,
            column: error.column,
            text,
        }
    }

    fn log_evaluation_error(&self, error: &EvaluationError) {
        let rendered = self.render(error.clone());
        self.log_compilation_error(&rendered);
    }

    fn log_compilation_error(&self, error: &CompilationError) {
        self.logger.log(
            Level::Error,
            error.line,
            error.column,
            error.text.as_deref(),
            error.path.as_deref(),
            &error.message,
        );
    }
}

/// Seed the catalog with the bootstrap resources every compilation gets.
fn create_main(catalog: &mut Catalog) -> Result<(), EvaluationError> {
    let generated = Rc::new("<generated>".to_string());
    catalog.add_resource(
        "stage",
        "main",
        Rc::clone(&generated),
        1,
        Attributes::new(),
        ResourceStatus::Real,
        None,
    )?;
    catalog.add_resource(
        "class",
        "main",
        generated,
        1,
        Attributes::new(),
        ResourceStatus::Real,
        None,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_subnames_go_most_specific_first() {
        let node = Node::new("Web01.Example.COM");
        assert_eq!(node.name(), "web01.example.com");
        let mut names = Vec::new();
        node.each_name(&mut |name| {
            names.push(name.to_string());
            true
        });
        assert_eq!(
            names,
            vec!["web01.example.com", "web01.example", "web01"]
        );
    }
}
