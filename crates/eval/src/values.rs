//! Runtime values.
//!
//! A [`Value`] is a tagged variant. Values are shared-immutable once
//! constructed: variables hand out `Rc`-shared references, and any operator
//! needing a mutable operand goes through [`mutate`], which deep-copies a
//! value obtained through a variable and moves one that was not.

use crate::error::EvaluationError;
use crate::types::Type;
use std::fmt;
use std::rc::Rc;

// ──────────────────────────────────────────────
// Regexes
// ──────────────────────────────────────────────

/// A compiled regular expression value. Equality is on the pattern text.
#[derive(Debug, Clone)]
pub struct Regex {
    pattern: String,
    compiled: Rc<regex::Regex>,
}

impl Regex {
    pub fn new(pattern: impl Into<String>) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        let compiled = regex::Regex::new(&pattern)?;
        Ok(Regex {
            pattern,
            compiled: Rc::new(compiled),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn as_regex(&self) -> &regex::Regex {
        &self.compiled
    }
}

impl PartialEq for Regex {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

// ──────────────────────────────────────────────
// Arrays and hashes
// ──────────────────────────────────────────────

pub type Array = Vec<Value>;

/// An insertion-ordered map with language value equality on keys
/// (case-insensitive for strings).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hash {
    entries: Vec<(Value, Value)>,
}

impl Hash {
    pub fn new() -> Self {
        Hash::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a pair; an existing key keeps its position but takes the new
    /// value.
    pub fn insert(&mut self, key: Value, value: Value) {
        for (existing, slot) in &mut self.entries {
            if equals(existing, &key) {
                *slot = value;
                return;
            }
        }
        self.entries.push((key, value));
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| equals(existing, key))
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<(Value, Value)> {
        self.entries
    }
}

impl FromIterator<(Value, Value)> for Hash {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut hash = Hash::new();
        for (key, value) in iter {
            hash.insert(key, value);
        }
        hash
    }
}

// ──────────────────────────────────────────────
// Variables
// ──────────────────────────────────────────────

/// An indirect handle to a variable's value. Keeping the name allows
/// assignment to report what was assigned to, and the shared `Rc` keeps the
/// underlying value immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    value: Rc<Value>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: Option<Rc<Value>>) -> Self {
        Variable {
            name: name.into(),
            value: value.unwrap_or_else(|| Rc::new(Value::Undef)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_rc(&self) -> Rc<Value> {
        Rc::clone(&self.value)
    }

    pub fn assign(&mut self, value: Rc<Value>) {
        self.value = value;
    }
}

// ──────────────────────────────────────────────
// Values
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undef,
    Default,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Regex(Regex),
    Type(Type),
    Array(Array),
    Hash(Hash),
    Variable(Variable),
}

impl Value {
    pub fn as_string(&self) -> Option<&str> {
        match dereference(self) {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match dereference(self) {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&Hash> {
        match dereference(self) {
            Value::Hash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&Type> {
        match dereference(self) {
            Value::Type(t) => Some(t),
            _ => None,
        }
    }
}

/// Follow variable indirections to the underlying value.
pub fn dereference(value: &Value) -> &Value {
    let mut current = value;
    while let Value::Variable(variable) = current {
        current = variable.value();
    }
    current
}

/// Take ownership of a value for mutation: a value reached through a
/// variable is cloned, anything else is moved.
pub fn mutate(value: Value) -> Value {
    match value {
        Value::Variable(variable) => dereference(variable.value()).clone(),
        other => other,
    }
}

pub fn is_undef(value: &Value) -> bool {
    matches!(dereference(value), Value::Undef)
}

pub fn is_default(value: &Value) -> bool {
    matches!(dereference(value), Value::Default)
}

pub fn is_true(value: &Value) -> bool {
    matches!(dereference(value), Value::Boolean(true))
}

/// Truthiness: `undef` and `false` are false, everything else is true.
pub fn is_truthy(value: &Value) -> bool {
    !matches!(dereference(value), Value::Undef | Value::Boolean(false))
}

/// Language equality. String comparison is case-insensitive; integers and
/// floats compare numerically; values of different kinds are unequal.
pub fn equals(left: &Value, right: &Value) -> bool {
    match (dereference(left), dereference(right)) {
        (Value::Undef, Value::Undef) => true,
        (Value::Default, Value::Default) => true,
        (Value::Integer(l), Value::Integer(r)) => l == r,
        (Value::Float(l), Value::Float(r)) => l == r,
        (Value::Integer(l), Value::Float(r)) | (Value::Float(r), Value::Integer(l)) => {
            (*l as f64) == *r
        }
        (Value::Boolean(l), Value::Boolean(r)) => l == r,
        (Value::String(l), Value::String(r)) => l.eq_ignore_ascii_case(r),
        (Value::Regex(l), Value::Regex(r)) => l.pattern() == r.pattern(),
        (Value::Type(l), Value::Type(r)) => l == r,
        (Value::Array(l), Value::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r.iter()).all(|(a, b)| equals(a, b))
        }
        (Value::Hash(l), Value::Hash(r)) => {
            l.len() == r.len()
                && l.iter()
                    .all(|(key, value)| r.get(key).is_some_and(|other| equals(value, other)))
        }
        _ => false,
    }
}

/// The runtime type of a value.
pub fn get_type(value: &Value) -> Type {
    match dereference(value) {
        Value::Undef => Type::Undef,
        Value::Default => Type::Default,
        Value::Integer(_) => Type::integer(),
        Value::Float(_) => Type::float(),
        Value::Boolean(_) => Type::Boolean,
        Value::String(_) => Type::string(),
        Value::Regex(_) => Type::Regexp { pattern: None },
        Value::Type(t) => Type::TypeType {
            type_: Some(Box::new(t.clone())),
        },
        Value::Array(_) => Type::array(),
        Value::Hash(_) => Type::hash(),
        Value::Variable(_) => unreachable!("dereference removes variables"),
    }
}

/// Whether the value is an instance of the type.
pub fn is_instance(value: &Value, type_: &Type) -> bool {
    type_.is_instance(dereference(value))
}

/// Convert a value to an array: arrays copy, hashes become `[key, value]`
/// pairs when `convert_hash` is set, `undef` becomes empty, and anything
/// else becomes a single-element array.
pub fn to_array(value: Value, convert_hash: bool) -> Array {
    let value = mutate(value);
    match value {
        Value::Array(array) => array,
        Value::Hash(hash) if convert_hash => hash
            .into_entries()
            .into_iter()
            .map(|(key, value)| Value::Array(vec![key, value]))
            .collect(),
        Value::Undef => Vec::new(),
        other => vec![other],
    }
}

/// Join array elements into the stream with a separator. Used by logging
/// functions.
pub fn join(array: &[Value], separator: &str) -> String {
    let mut result = String::new();
    let mut first = true;
    for element in array {
        if first {
            first = false;
        } else {
            result.push_str(separator);
        }
        result.push_str(&element.to_string());
    }
    result
}

// ──────────────────────────────────────────────
// Resource references
// ──────────────────────────────────────────────

/// Visit every resource reference in a value: a `Type[title]` string, a
/// qualified Resource or Class type, or an array of those.
pub fn each_resource(
    value: &Value,
    callback: &mut dyn FnMut(&str, &str) -> Result<(), EvaluationError>,
    error: &dyn Fn(String) -> EvaluationError,
) -> Result<(), EvaluationError> {
    match dereference(value) {
        Value::String(text) => match Type::parse_resource(text) {
            Some((type_name, title)) => callback(&type_name, &title),
            None => Err(error(format!(
                "expected a resource string but found \"{}\".",
                text
            ))),
        },
        Value::Type(Type::Resource { type_name, title }) if !type_name.is_empty() && !title.is_empty() => {
            callback(type_name, title)
        }
        Value::Type(Type::Class { title }) if !title.is_empty() => callback("Class", title),
        Value::Array(elements) => {
            for element in elements {
                each_resource(element, callback, error)?;
            }
            Ok(())
        }
        other => Err(error(format!(
            "expected String, Resource, or Array[Variant[String, Resource]] for relationship operator but found {}.",
            get_type(other)
        ))),
    }
}

// ──────────────────────────────────────────────
// Printing
// ──────────────────────────────────────────────

pub(crate) fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undef => Ok(()),
            Value::Default => f.write_str("default"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            Value::String(s) => f.write_str(s),
            Value::Regex(r) => write!(f, "/{}/", r.pattern()),
            Value::Type(t) => write!(f, "{}", t),
            Value::Array(elements) => {
                write!(f, "[")?;
                let mut first = true;
                for element in elements {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Hash(hash) => {
                write!(f, "{{")?;
                let mut first = true;
                for (key, value) in hash.iter() {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} => {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Variable(variable) => write!(f, "{}", variable.value()),
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_law() {
        assert!(!is_truthy(&Value::Undef));
        assert!(!is_truthy(&Value::Boolean(false)));
        assert!(is_truthy(&Value::Boolean(true)));
        assert!(is_truthy(&Value::Integer(0)));
        assert!(is_truthy(&Value::String(String::new())));
        assert!(is_truthy(&Value::Array(Vec::new())));
        assert!(is_truthy(&Value::Hash(Hash::new())));
    }

    #[test]
    fn string_equality_is_case_insensitive() {
        assert!(equals(
            &Value::String("Hello".to_string()),
            &Value::String("hELLO".to_string())
        ));
        assert!(!equals(
            &Value::String("hello".to_string()),
            &Value::String("world".to_string())
        ));
    }

    #[test]
    fn numeric_equality_promotes() {
        assert!(equals(&Value::Integer(1), &Value::Float(1.0)));
        assert!(!equals(&Value::Integer(1), &Value::Float(1.5)));
    }

    #[test]
    fn cross_kind_equality_is_false() {
        assert!(!equals(&Value::Integer(1), &Value::String("1".to_string())));
        assert!(!equals(&Value::Undef, &Value::Boolean(false)));
    }

    #[test]
    fn hash_preserves_insertion_order_and_replaces_keys() {
        let mut hash = Hash::new();
        hash.insert(Value::String("b".to_string()), Value::Integer(1));
        hash.insert(Value::String("a".to_string()), Value::Integer(2));
        hash.insert(Value::String("B".to_string()), Value::Integer(3));
        let keys: Vec<String> = hash.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(
            hash.get(&Value::String("b".to_string())),
            Some(&Value::Integer(3))
        );
    }

    #[test]
    fn mutate_clones_variable_values() {
        let shared = Rc::new(Value::Array(vec![Value::Integer(1)]));
        let variable = Value::Variable(Variable::new("x", Some(Rc::clone(&shared))));
        let mut owned = match mutate(variable) {
            Value::Array(array) => array,
            other => panic!("expected array, got {:?}", other),
        };
        owned.push(Value::Integer(2));
        // The shared value is untouched
        assert_eq!(shared.as_array().unwrap().len(), 1);
    }

    #[test]
    fn to_array_wraps_and_converts() {
        assert_eq!(to_array(Value::Undef, true), Vec::<Value>::new());
        assert_eq!(to_array(Value::Integer(1), true), vec![Value::Integer(1)]);
        let mut hash = Hash::new();
        hash.insert(Value::String("k".to_string()), Value::Integer(1));
        let pairs = to_array(Value::Hash(hash), true);
        assert_eq!(
            pairs,
            vec![Value::Array(vec![
                Value::String("k".to_string()),
                Value::Integer(1)
            ])]
        );
    }

    #[test]
    fn each_resource_parses_strings_and_types() {
        let mut seen = Vec::new();
        each_resource(
            &Value::Array(vec![
                Value::String("File['/a']".to_string()),
                Value::Type(Type::Resource {
                    type_name: "Service".to_string(),
                    title: "nginx".to_string(),
                }),
            ]),
            &mut |type_name, title| {
                seen.push((type_name.to_string(), title.to_string()));
                Ok(())
            },
            &EvaluationError::new,
        )
        .unwrap();
        assert_eq!(
            seen,
            vec![
                ("File".to_string(), "/a".to_string()),
                ("Service".to_string(), "nginx".to_string())
            ]
        );
    }

    #[test]
    fn undef_displays_empty() {
        assert_eq!(Value::Undef.to_string(), "");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
    }
}
