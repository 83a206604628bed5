//! Shared helpers for the compilation test suites.

use cairn_core::InMemoryProvider;
use cairn_eval::{
    compile, Catalog, CompilationError, CompilationSettings, Level, MemoryLogger,
    StaticFactProvider, Value,
};
use std::path::PathBuf;
use std::rc::Rc;

pub const MANIFEST: &str = "/site.cn";
pub const NODE_NAME: &str = "test.example.com";

pub fn compile_source(source: &str) -> (Result<Catalog, CompilationError>, Rc<MemoryLogger>) {
    compile_with_facts(source, StaticFactProvider::empty())
}

pub fn compile_with_facts(
    source: &str,
    facts: StaticFactProvider,
) -> (Result<Catalog, CompilationError>, Rc<MemoryLogger>) {
    let provider = InMemoryProvider::single(MANIFEST, source);
    let logger = Rc::new(MemoryLogger::with_level(Level::Debug));
    let settings = CompilationSettings::new(NODE_NAME, vec![PathBuf::from(MANIFEST)]);
    let result = compile(
        &settings,
        &provider,
        Some(Rc::new(facts)),
        Rc::clone(&logger) as Rc<dyn cairn_eval::Logger>,
    );
    (result, logger)
}

/// Compile a manifest that is expected to succeed.
pub fn compile_ok(source: &str) -> (Catalog, Rc<MemoryLogger>) {
    let (result, logger) = compile_source(source);
    let catalog = result.unwrap_or_else(|e| {
        panic!(
            "compilation failed: {} (records: {:?})",
            e,
            logger.records()
        )
    });
    assert_eq!(logger.errors(), 0, "records: {:?}", logger.records());
    (catalog, logger)
}

/// Compile a manifest that is expected to fail; returns the error and
/// logger.
pub fn compile_err(source: &str) -> (CompilationError, Rc<MemoryLogger>) {
    let (result, logger) = compile_source(source);
    match result {
        Ok(_) => panic!("expected compilation to fail"),
        Err(error) => (error, logger),
    }
}

/// The notice-level messages in order.
pub fn notices(logger: &MemoryLogger) -> Vec<String> {
    logger.messages_at(Level::Notice)
}

/// User-declared resources: everything but the bootstrap entries.
pub fn user_resources(catalog: &Catalog) -> Vec<(String, String)> {
    catalog
        .resources()
        .map(|index| {
            let resource = catalog.resource(index);
            (
                resource.type_name().to_string(),
                resource.title().to_string(),
            )
        })
        .filter(|(type_name, title)| {
            !matches!(
                (type_name.as_str(), title.as_str()),
                ("Stage", "main") | ("Class", "main") | ("Class", "settings")
            )
        })
        .collect()
}

/// A resource parameter as a value.
pub fn parameter(catalog: &Catalog, type_name: &str, title: &str, name: &str) -> Option<Value> {
    let index = catalog.find_resource(type_name, title)?;
    catalog
        .resource(index)
        .attributes()
        .get(name, true)
        .map(|value| (*value).clone())
}
