//! Fact provider boundary.
//!
//! Facts are externally supplied values visible as top-scope variables.
//! The provider is synchronous and read-only; the top scope caches each
//! fact on first lookup.

use crate::values::Value;
use std::collections::HashMap;

/// Supplies fact values for one node compilation.
pub trait FactProvider {
    /// Look up a fact by name.
    fn get(&self, name: &str) -> Option<Value>;

    /// Visit every fact. Returning false from the callback stops iteration.
    fn each(&self, callback: &mut dyn FnMut(&str, &Value) -> bool);
}

/// A fact provider backed by a fixed map.
pub struct StaticFactProvider {
    facts: HashMap<String, Value>,
}

impl StaticFactProvider {
    pub fn new(facts: HashMap<String, Value>) -> Self {
        Self { facts }
    }

    pub fn empty() -> Self {
        Self {
            facts: HashMap::new(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.facts.insert(name.into(), value);
    }
}

impl FactProvider for StaticFactProvider {
    fn get(&self, name: &str) -> Option<Value> {
        self.facts.get(name).cloned()
    }

    fn each(&self, callback: &mut dyn FnMut(&str, &Value) -> bool) {
        for (name, value) in &self.facts {
            if !callback(name, value) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_provider_returns_facts() {
        let mut provider = StaticFactProvider::empty();
        provider.set("osfamily", Value::String("linux".to_string()));
        assert_eq!(
            provider.get("osfamily"),
            Some(Value::String("linux".to_string()))
        );
        assert_eq!(provider.get("missing"), None);
    }

    #[test]
    fn each_visits_all_facts() {
        let mut provider = StaticFactProvider::empty();
        provider.set("a", Value::Integer(1));
        provider.set("b", Value::Integer(2));
        let mut seen = 0;
        provider.each(&mut |_, _| {
            seen += 1;
            true
        });
        assert_eq!(seen, 2);
    }
}
