//! The evaluation context: the catalog under construction, the scope
//! stack, named class scopes, and the match-variable stack.
//!
//! Match scopes hold the capture groups of the most recent successful
//! regex match; `$0..$n` walk the stack outward to the nearest set of
//! captures.

use crate::catalog::Catalog;
use crate::facts::FactProvider;
use crate::scope::{self, Scope, ScopeRef};
use crate::values::Value;
use std::collections::HashMap;
use std::rc::Rc;

pub struct Context {
    pub catalog: Catalog,
    scope_stack: Vec<ScopeRef>,
    /// Named scopes: "" is the top scope; class scopes register under
    /// their class name.
    named_scopes: HashMap<String, ScopeRef>,
    node_scope: Option<ScopeRef>,
    match_stack: Vec<Option<Rc<Vec<Rc<Value>>>>>,
    /// Virtual/exported defined type instances whose bodies are deferred
    /// until realization.
    deferred_instances: std::collections::HashSet<crate::catalog::ResourceIndex>,
}

impl Context {
    pub fn new(facts: Option<Rc<dyn FactProvider>>, catalog: Catalog) -> Self {
        let main = catalog.find_resource("class", "main");
        let top = Scope::top(facts, main);
        let mut named_scopes = HashMap::new();
        named_scopes.insert(String::new(), Rc::clone(&top));
        Context {
            catalog,
            scope_stack: vec![top],
            named_scopes,
            node_scope: None,
            match_stack: vec![None],
            deferred_instances: std::collections::HashSet::new(),
        }
    }

    /// Defer the body evaluation of a virtual or exported defined type
    /// instance until it is realized by a collection.
    pub fn defer_defined_instance(&mut self, index: crate::catalog::ResourceIndex) {
        self.deferred_instances.insert(index);
    }

    /// Claim a deferred instance for evaluation; returns false if the
    /// instance was not deferred (or was already claimed).
    pub fn claim_deferred_instance(&mut self, index: crate::catalog::ResourceIndex) -> bool {
        self.deferred_instances.remove(&index)
    }

    pub fn into_catalog(self) -> Catalog {
        self.catalog
    }

    // -- Scopes -------------------------------------------------

    pub fn current_scope(&self) -> ScopeRef {
        Rc::clone(self.scope_stack.last().expect("the top scope is always present"))
    }

    pub fn top_scope(&self) -> ScopeRef {
        Rc::clone(&self.scope_stack[0])
    }

    pub fn node_scope(&self) -> Option<ScopeRef> {
        self.node_scope.clone()
    }

    pub fn node_or_top(&self) -> ScopeRef {
        self.node_scope().unwrap_or_else(|| self.top_scope())
    }

    pub fn push_scope(&mut self, scope: ScopeRef) {
        self.scope_stack.push(scope);
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(self.scope_stack.len() > 1, "the top scope is never popped");
        self.scope_stack.pop();
    }

    pub fn push_node_scope(&mut self, scope: ScopeRef) {
        self.node_scope = Some(Rc::clone(&scope));
        self.scope_stack.push(scope);
    }

    pub fn pop_node_scope(&mut self) {
        self.scope_stack.pop();
        self.node_scope = None;
    }

    /// Register a named (class) scope. Returns false if the name is taken.
    pub fn add_scope(&mut self, name: impl Into<String>, scope: ScopeRef) -> bool {
        let name = name.into();
        if self.named_scopes.contains_key(&name) {
            return false;
        }
        self.named_scopes.insert(name, scope);
        true
    }

    pub fn find_scope(&self, name: &str) -> Option<ScopeRef> {
        self.named_scopes.get(name).cloned()
    }

    // -- Variable lookup ----------------------------------------

    /// Look up a variable by (possibly qualified) name. Returns the value
    /// and, when the lookup failed because of a missing or undeclared
    /// class, a warning for the caller to log.
    pub fn lookup(&mut self, name: &str) -> (Option<Rc<Value>>, Option<String>) {
        // An unqualified name resolves against the current scope chain
        let Some(split) = name.rfind("::") else {
            let found = scope::lookup(&self.current_scope(), name).map(|v| v.value());
            return (found, None);
        };

        // Split into namespace and variable name; a leading :: is global
        let global = name.starts_with("::");
        let namespace_start = if global { 2 } else { 0 };
        let namespace = &name[namespace_start..split.max(namespace_start)];
        let variable = &name[split + 2..];

        // An empty namespace is the top scope
        if namespace.is_empty() {
            let found = scope::lookup(&self.top_scope(), variable).map(|v| v.value());
            return (found, None);
        }

        if let Some(scope) = self.find_scope(&namespace.to_lowercase()) {
            let found = scope::lookup(&scope, variable).map(|v| v.value());
            return (found, None);
        }

        let warning = if self.catalog.find_class(namespace).is_none() {
            Some(format!(
                "could not look up variable ${} because class '{}' is not defined.",
                name, namespace
            ))
        } else if self.catalog.find_resource("class", namespace).is_none() {
            Some(format!(
                "could not look up variable ${} because class '{}' has not been declared.",
                name, namespace
            ))
        } else {
            None
        };
        (None, warning)
    }

    // -- Match variables ----------------------------------------

    pub fn push_match_scope(&mut self) {
        self.match_stack.push(None);
    }

    pub fn pop_match_scope(&mut self) {
        self.match_stack.pop();
    }

    /// Store the capture groups of a successful match in the innermost
    /// match scope.
    pub fn set_matches(&mut self, captures: Vec<String>) {
        if let Some(slot) = self.match_stack.last_mut() {
            *slot = Some(Rc::new(
                captures
                    .into_iter()
                    .map(|text| Rc::new(Value::String(text)))
                    .collect(),
            ));
        }
    }

    /// Look up a match variable (`$0`..`$n`) in the nearest match scope
    /// with captures.
    pub fn lookup_match(&self, index: usize) -> Option<Rc<Value>> {
        for matches in self.match_stack.iter().rev() {
            if let Some(matches) = matches {
                return matches.get(index).cloned();
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_lookup_resolves_named_scopes() {
        let mut context = Context::new(None, Catalog::new());
        let class_scope = Scope::child(context.top_scope(), None);
        class_scope
            .borrow_mut()
            .set("port", Rc::new(Value::Integer(80)), None, 1);
        assert!(context.add_scope("web", Rc::clone(&class_scope)));

        let (found, warning) = context.lookup("web::port");
        assert_eq!(found.as_deref(), Some(&Value::Integer(80)));
        assert!(warning.is_none());

        let (found, warning) = context.lookup("other::port");
        assert!(found.is_none());
        assert!(warning.unwrap().contains("is not defined"));
    }

    #[test]
    fn global_lookup_uses_top_scope() {
        let mut context = Context::new(None, Catalog::new());
        context
            .top_scope()
            .borrow_mut()
            .set("x", Rc::new(Value::Integer(1)), None, 1);
        let (found, _) = context.lookup("::x");
        assert_eq!(found.as_deref(), Some(&Value::Integer(1)));
    }

    #[test]
    fn match_scopes_nest_and_shadow() {
        let mut context = Context::new(None, Catalog::new());
        context.set_matches(vec!["outer".to_string()]);
        context.push_match_scope();
        // Inner scope has no captures yet: walks outward
        assert_eq!(
            context.lookup_match(0).as_deref(),
            Some(&Value::String("outer".to_string()))
        );
        context.set_matches(vec!["inner".to_string()]);
        assert_eq!(
            context.lookup_match(0).as_deref(),
            Some(&Value::String("inner".to_string()))
        );
        context.pop_match_scope();
        assert_eq!(
            context.lookup_match(0).as_deref(),
            Some(&Value::String("outer".to_string()))
        );
    }
}
