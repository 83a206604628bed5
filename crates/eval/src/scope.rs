//! Lexical scopes.
//!
//! A scope is a write-once ordered variable map with a parent handle. The
//! top scope is backed by the fact provider: facts materialize as assigned
//! variables on first lookup. Scopes also hold per-scope resource defaults,
//! resolved lexically (nearest enclosing scope wins per attribute).

use crate::catalog::ResourceIndex;
use crate::facts::FactProvider;
use crate::values::Value;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A variable binding with its assignment origin for diagnostics.
#[derive(Clone)]
pub struct AssignedVariable {
    value: Rc<Value>,
    path: Option<Rc<String>>,
    line: usize,
}

impl AssignedVariable {
    pub fn new(value: Rc<Value>, path: Option<Rc<String>>, line: usize) -> Self {
        AssignedVariable { value, path, line }
    }

    pub fn value(&self) -> Rc<Value> {
        Rc::clone(&self.value)
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref().map(String::as_str)
    }

    pub fn line(&self) -> usize {
        self.line
    }
}

pub type ScopeRef = Rc<RefCell<Scope>>;

pub struct Scope {
    parent: Option<ScopeRef>,
    facts: Option<Rc<dyn FactProvider>>,
    /// The resource this scope belongs to (a class or defined type
    /// instance), as a catalog index.
    resource: Option<ResourceIndex>,
    /// Namespace for qualifying names defined in this scope (the class
    /// title), when the scope belongs to a class.
    namespace: Option<String>,
    variables: IndexMap<String, AssignedVariable>,
    /// Resource defaults set in this scope: lowercased type name to
    /// attribute values.
    defaults: HashMap<String, IndexMap<String, Rc<Value>>>,
}

impl Scope {
    /// Create the top scope, backed by the fact provider.
    pub fn top(facts: Option<Rc<dyn FactProvider>>, resource: Option<ResourceIndex>) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            parent: None,
            facts,
            resource,
            namespace: None,
            variables: IndexMap::new(),
            defaults: HashMap::new(),
        }))
    }

    /// Create a child scope.
    pub fn child(parent: ScopeRef, resource: Option<ResourceIndex>) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            parent: Some(parent),
            facts: None,
            resource,
            namespace: None,
            variables: IndexMap::new(),
            defaults: HashMap::new(),
        }))
    }

    pub fn parent(&self) -> Option<ScopeRef> {
        self.parent.clone()
    }

    pub fn resource(&self) -> Option<ResourceIndex> {
        self.resource
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.namespace = Some(namespace.into());
    }

    /// Qualify a name against this scope's namespace. A leading `::` makes
    /// the name global.
    pub fn qualify(&self, name: &str) -> String {
        if let Some(stripped) = name.strip_prefix("::") {
            return stripped.to_string();
        }
        match &self.namespace {
            Some(namespace) => format!("{}::{}", namespace, name),
            None => name.to_string(),
        }
    }

    /// Set a variable. If the variable already exists in this scope (or is
    /// an already-materialized or providable fact at the top scope), the
    /// existing assignment is returned and nothing is changed.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: Rc<Value>,
        path: Option<Rc<String>>,
        line: usize,
    ) -> Option<AssignedVariable> {
        let name = name.into();
        if let Some(existing) = self.variables.get(&name) {
            return Some(existing.clone());
        }
        if let Some(facts) = &self.facts {
            if let Some(fact) = facts.get(&name) {
                let assigned = AssignedVariable::new(Rc::new(fact), None, 0);
                self.variables.insert(name, assigned.clone());
                return Some(assigned);
            }
        }
        self.variables
            .insert(name, AssignedVariable::new(value, path, line));
        None
    }

    /// Look up a variable in this scope only, materializing a fact at the
    /// top scope.
    fn get_local(&mut self, name: &str) -> Option<AssignedVariable> {
        if let Some(existing) = self.variables.get(name) {
            return Some(existing.clone());
        }
        if let Some(facts) = &self.facts {
            if let Some(fact) = facts.get(name) {
                let assigned = AssignedVariable::new(Rc::new(fact), None, 0);
                self.variables.insert(name.to_string(), assigned.clone());
                return Some(assigned);
            }
        }
        None
    }

    /// Set a resource default for subsequent declarations in this scope.
    pub fn set_default(&mut self, type_name: &str, attribute: impl Into<String>, value: Rc<Value>) {
        self.defaults
            .entry(type_name.to_lowercase())
            .or_default()
            .insert(attribute.into(), value);
    }

    fn local_defaults(&self, type_name: &str) -> Option<&IndexMap<String, Rc<Value>>> {
        self.defaults.get(&type_name.to_lowercase())
    }
}

/// Look up a variable, walking the scope chain.
pub fn lookup(scope: &ScopeRef, name: &str) -> Option<AssignedVariable> {
    let mut current = Rc::clone(scope);
    loop {
        if let Some(found) = current.borrow_mut().get_local(name) {
            return Some(found);
        }
        let parent = current.borrow().parent();
        match parent {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

/// Collect the resource defaults visible from a scope for a type. The
/// nearest enclosing scope wins for each attribute.
pub fn collect_defaults(scope: &ScopeRef, type_name: &str) -> IndexMap<String, Rc<Value>> {
    let mut collected: IndexMap<String, Rc<Value>> = IndexMap::new();
    let mut current = Some(Rc::clone(scope));
    while let Some(scope) = current {
        {
            let borrowed = scope.borrow();
            if let Some(defaults) = borrowed.local_defaults(type_name) {
                for (attribute, value) in defaults {
                    if !collected.contains_key(attribute) {
                        collected.insert(attribute.clone(), Rc::clone(value));
                    }
                }
            }
        }
        current = scope.borrow().parent();
    }
    collected
}

/// The resource indices associated with a scope chain, nearest first.
pub fn resource_chain(scope: &ScopeRef) -> Vec<ResourceIndex> {
    let mut chain = Vec::new();
    let mut current = Some(Rc::clone(scope));
    while let Some(scope) = current {
        if let Some(resource) = scope.borrow().resource() {
            chain.push(resource);
        }
        current = scope.borrow().parent();
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::StaticFactProvider;

    #[test]
    fn set_is_write_once_per_scope() {
        let top = Scope::top(None, None);
        let first = top
            .borrow_mut()
            .set("x", Rc::new(Value::Integer(1)), None, 1);
        assert!(first.is_none());
        let second = top
            .borrow_mut()
            .set("x", Rc::new(Value::Integer(2)), None, 2);
        assert!(second.is_some());
        // The original value is untouched
        let found = lookup(&top, "x").unwrap();
        assert_eq!(*found.value(), Value::Integer(1));
    }

    #[test]
    fn lookup_walks_the_chain() {
        let top = Scope::top(None, None);
        top.borrow_mut()
            .set("outer", Rc::new(Value::Integer(1)), None, 1);
        let child = Scope::child(Rc::clone(&top), None);
        assert!(lookup(&child, "outer").is_some());
        assert!(lookup(&child, "missing").is_none());
    }

    #[test]
    fn facts_materialize_at_top_scope() {
        let mut facts = StaticFactProvider::empty();
        facts.set("hostname", Value::String("web01".to_string()));
        let top = Scope::top(Some(Rc::new(facts)), None);
        let child = Scope::child(Rc::clone(&top), None);
        let found = lookup(&child, "hostname").unwrap();
        assert_eq!(*found.value(), Value::String("web01".to_string()));
        // A fact blocks assignment of the same name
        let existing = top
            .borrow_mut()
            .set("hostname", Rc::new(Value::Integer(1)), None, 1);
        assert!(existing.is_some());
    }

    #[test]
    fn qualify_uses_namespace() {
        let top = Scope::top(None, None);
        assert_eq!(top.borrow().qualify("x"), "x");
        assert_eq!(top.borrow().qualify("::x"), "x");
        let class_scope = Scope::child(top, None);
        class_scope.borrow_mut().set_namespace("web::server");
        assert_eq!(class_scope.borrow().qualify("x"), "web::server::x");
    }

    #[test]
    fn nearest_default_wins() {
        let top = Scope::top(None, None);
        top.borrow_mut()
            .set_default("File", "owner", Rc::new(Value::String("root".to_string())));
        top.borrow_mut()
            .set_default("File", "mode", Rc::new(Value::String("0644".to_string())));
        let child = Scope::child(Rc::clone(&top), None);
        child
            .borrow_mut()
            .set_default("file", "owner", Rc::new(Value::String("web".to_string())));
        let defaults = collect_defaults(&child, "File");
        assert_eq!(
            defaults.get("owner").map(|v| (**v).clone()),
            Some(Value::String("web".to_string()))
        );
        assert_eq!(
            defaults.get("mode").map(|v| (**v).clone()),
            Some(Value::String("0644".to_string()))
        );
    }
}
