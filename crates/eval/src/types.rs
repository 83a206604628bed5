//! The runtime type lattice.
//!
//! Every type carries two total predicates: `is_instance` (does a value
//! belong to the type) and `is_specialization` (is another type a narrower
//! version of this one). `String` size constraints are measured in bytes.

use crate::values::{self, Value};
use once_cell::sync::Lazy;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Any,
    Undef,
    Default,
    Boolean,
    Integer {
        from: Option<i64>,
        to: Option<i64>,
    },
    Float {
        from: Option<f64>,
        to: Option<f64>,
    },
    Numeric,
    String {
        from: Option<i64>,
        to: Option<i64>,
    },
    Regexp {
        pattern: Option<std::string::String>,
    },
    Pattern {
        patterns: Vec<values::Regex>,
    },
    Enum {
        values: Vec<std::string::String>,
    },
    Array {
        element: Box<Type>,
        from: Option<i64>,
        to: Option<i64>,
    },
    Hash {
        key: Box<Type>,
        value: Box<Type>,
        from: Option<i64>,
        to: Option<i64>,
    },
    Tuple {
        types: Vec<Type>,
        from: Option<i64>,
        to: Option<i64>,
    },
    Struct {
        schema: Vec<(std::string::String, Type)>,
    },
    Variant {
        types: Vec<Type>,
    },
    Optional {
        type_: Option<Box<Type>>,
    },
    TypeType {
        type_: Option<Box<Type>>,
    },
    Callable,
    CatalogEntry,
    Resource {
        /// Canonical type name (e.g. `File`); empty means any resource.
        type_name: std::string::String,
        /// Resource title; empty means any instance of the type.
        title: std::string::String,
    },
    Class {
        /// Class name; empty means any class.
        title: std::string::String,
    },
    Collection,
    Scalar,
    Data,
    Runtime {
        runtime: Option<std::string::String>,
        name: Option<std::string::String>,
    },
}

// ──────────────────────────────────────────────
// Construction
// ──────────────────────────────────────────────

static RESOURCE_PATTERN: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"^((?:(?:::)?[A-Z]\w*)+)\[([^\]]+)\]$").unwrap());

/// Canonicalize a resource type name: `file` and `FILE` both become `File`,
/// `foo::bar` becomes `Foo::Bar`.
pub fn normalize_type_name(name: &str) -> std::string::String {
    let lowered = name.to_lowercase();
    let mut result = std::string::String::with_capacity(lowered.len());
    for (i, segment) in lowered.split("::").enumerate() {
        if i > 0 {
            result.push_str("::");
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }
    result
}

impl Type {
    pub fn integer() -> Type {
        Type::Integer {
            from: None,
            to: None,
        }
    }

    pub fn float() -> Type {
        Type::Float {
            from: None,
            to: None,
        }
    }

    pub fn string() -> Type {
        Type::String {
            from: None,
            to: None,
        }
    }

    pub fn array() -> Type {
        Type::Array {
            element: Box::new(Type::Any),
            from: None,
            to: None,
        }
    }

    pub fn array_of(element: Type) -> Type {
        Type::Array {
            element: Box::new(element),
            from: None,
            to: None,
        }
    }

    pub fn hash() -> Type {
        Type::Hash {
            key: Box::new(Type::Any),
            value: Box::new(Type::Any),
            from: None,
            to: None,
        }
    }

    /// A resource reference with a canonicalized type name.
    pub fn resource(type_name: &str, title: &str) -> Type {
        Type::Resource {
            type_name: normalize_type_name(type_name),
            title: title.to_owned(),
        }
    }

    /// A class reference; the name is lowercased and stripped of a leading
    /// `::`.
    pub fn class(title: &str) -> Type {
        let title = title.strip_prefix("::").unwrap_or(title);
        Type::Class {
            title: title.to_lowercase(),
        }
    }

    /// Resolve a bare capitalized name to a built-in type; an unknown name
    /// is a resource type reference.
    pub fn from_name(name: &str) -> Type {
        match name {
            "Any" => Type::Any,
            "Undef" => Type::Undef,
            "Default" => Type::Default,
            "Boolean" => Type::Boolean,
            "Integer" => Type::integer(),
            "Float" => Type::float(),
            "Numeric" => Type::Numeric,
            "String" => Type::string(),
            "Regexp" => Type::Regexp { pattern: None },
            "Pattern" => Type::Pattern {
                patterns: Vec::new(),
            },
            "Enum" => Type::Enum { values: Vec::new() },
            "Array" => Type::array(),
            "Hash" => Type::hash(),
            "Tuple" => Type::Tuple {
                types: Vec::new(),
                from: None,
                to: None,
            },
            "Struct" => Type::Struct { schema: Vec::new() },
            "Variant" => Type::Variant { types: Vec::new() },
            "Optional" => Type::Optional { type_: None },
            "Type" => Type::TypeType { type_: None },
            "Callable" => Type::Callable,
            "CatalogEntry" => Type::CatalogEntry,
            "Resource" => Type::Resource {
                type_name: std::string::String::new(),
                title: std::string::String::new(),
            },
            "Class" => Type::Class {
                title: std::string::String::new(),
            },
            "Collection" => Type::Collection,
            "Scalar" => Type::Scalar,
            "Data" => Type::Data,
            "Runtime" => Type::Runtime {
                runtime: None,
                name: None,
            },
            _ => Type::Resource {
                type_name: normalize_type_name(name),
                title: std::string::String::new(),
            },
        }
    }

    /// Parse a `Type[title]` resource string. The title is trimmed and
    /// stripped of surrounding quotes.
    pub fn parse_resource(text: &str) -> Option<(std::string::String, std::string::String)> {
        let captures = RESOURCE_PATTERN.captures(text)?;
        let type_name = normalize_type_name(captures.get(1)?.as_str());
        let mut title = captures.get(2)?.as_str().trim().to_string();
        if title.len() >= 2 {
            let bytes = title.as_bytes();
            if (bytes[0] == b'"' && bytes[title.len() - 1] == b'"')
                || (bytes[0] == b'\'' && bytes[title.len() - 1] == b'\'')
            {
                title = title[1..title.len() - 1].to_string();
            }
        }
        Some((type_name, title))
    }

    /// For enumerable integer ranges (both bounds present), the bounds.
    pub fn enumerable_range(&self) -> Option<(i64, i64)> {
        match self {
            Type::Integer {
                from: Some(from),
                to: Some(to),
            } => Some((*from, *to)),
            _ => None,
        }
    }

    // ──────────────────────────────────────────
    // Instance checks
    // ──────────────────────────────────────────

    /// Whether the (dereferenced) value is an instance of this type.
    pub fn is_instance(&self, value: &Value) -> bool {
        match self {
            Type::Any => true,
            Type::Undef => matches!(value, Value::Undef),
            Type::Default => matches!(value, Value::Default),
            Type::Boolean => matches!(value, Value::Boolean(_)),
            Type::Integer { from, to } => match value {
                Value::Integer(i) => {
                    from.map_or(true, |from| *i >= from) && to.map_or(true, |to| *i <= to)
                }
                _ => false,
            },
            Type::Float { from, to } => match value {
                Value::Float(x) => {
                    from.map_or(true, |from| *x >= from) && to.map_or(true, |to| *x <= to)
                }
                _ => false,
            },
            Type::Numeric => matches!(value, Value::Integer(_) | Value::Float(_)),
            Type::String { from, to } => match value {
                // Size constraints are byte lengths
                Value::String(s) => {
                    let length = s.len() as i64;
                    from.map_or(true, |from| length >= from) && to.map_or(true, |to| length <= to)
                }
                _ => false,
            },
            Type::Regexp { pattern } => match value {
                Value::Regex(r) => pattern.as_ref().map_or(true, |p| p == r.pattern()),
                _ => false,
            },
            Type::Pattern { patterns } => match value {
                Value::String(s) => {
                    patterns.is_empty() || patterns.iter().any(|p| p.as_regex().is_match(s))
                }
                _ => false,
            },
            Type::Enum {
                values: enum_values,
            } => match value {
                Value::String(s) => {
                    enum_values.is_empty()
                        || enum_values.iter().any(|v| v.eq_ignore_ascii_case(s))
                }
                _ => false,
            },
            Type::Array { element, from, to } => match value {
                Value::Array(elements) => {
                    let length = elements.len() as i64;
                    from.map_or(true, |from| length >= from)
                        && to.map_or(true, |to| length <= to)
                        && elements
                            .iter()
                            .all(|e| element.is_instance(values::dereference(e)))
                }
                _ => false,
            },
            Type::Hash {
                key,
                value: value_type,
                from,
                to,
            } => match value {
                Value::Hash(hash) => {
                    let length = hash.len() as i64;
                    from.map_or(true, |from| length >= from)
                        && to.map_or(true, |to| length <= to)
                        && hash.iter().all(|(k, v)| {
                            key.is_instance(values::dereference(k))
                                && value_type.is_instance(values::dereference(v))
                        })
                }
                _ => false,
            },
            Type::Tuple { types, from, to } => match value {
                Value::Array(elements) => {
                    if types.is_empty() {
                        return true;
                    }
                    let min = from.unwrap_or(types.len() as i64);
                    let max = to.unwrap_or(min.max(types.len() as i64));
                    let length = elements.len() as i64;
                    if length < min || length > max {
                        return false;
                    }
                    elements.iter().enumerate().all(|(i, e)| {
                        let type_ = &types[i.min(types.len() - 1)];
                        type_.is_instance(values::dereference(e))
                    })
                }
                _ => false,
            },
            Type::Struct { schema } => match value {
                Value::Hash(hash) => {
                    // Every schema entry matches (a missing key must accept
                    // undef), and no unknown keys are present
                    schema.iter().all(|(name, type_)| {
                        match hash.get(&Value::String(name.clone())) {
                            Some(v) => type_.is_instance(values::dereference(v)),
                            None => type_.is_instance(&Value::Undef),
                        }
                    }) && hash.iter().all(|(k, _)| match values::dereference(k) {
                        Value::String(s) => schema.iter().any(|(name, _)| name == s),
                        _ => false,
                    })
                }
                _ => false,
            },
            Type::Variant { types } => types.iter().any(|t| t.is_instance(value)),
            Type::Optional { type_ } => {
                matches!(value, Value::Undef)
                    || type_.as_ref().map_or(true, |t| t.is_instance(value))
            }
            Type::TypeType { type_ } => match value {
                Value::Type(v) => match type_ {
                    None => true,
                    Some(t) => t.as_ref() == v || t.is_specialization(v),
                },
                _ => false,
            },
            Type::Callable => false,
            Type::CatalogEntry => matches!(
                value,
                Value::Type(Type::Resource { .. }) | Value::Type(Type::Class { .. })
            ),
            Type::Resource { type_name, title } => match value {
                Value::Type(Type::Resource {
                    type_name: value_type_name,
                    title: value_title,
                }) => {
                    if type_name.is_empty() {
                        return true;
                    }
                    type_name == value_type_name && (title.is_empty() || title == value_title)
                }
                _ => false,
            },
            Type::Class { title } => match value {
                Value::Type(Type::Class { title: value_title }) => {
                    title.is_empty() || title == value_title
                }
                _ => false,
            },
            Type::Collection => matches!(value, Value::Array(_) | Value::Hash(_)),
            Type::Scalar => matches!(
                value,
                Value::Integer(_)
                    | Value::Float(_)
                    | Value::String(_)
                    | Value::Boolean(_)
                    | Value::Regex(_)
            ),
            Type::Data => is_data(value),
            Type::Runtime { .. } => false,
        }
    }

    // ──────────────────────────────────────────
    // Specialization checks
    // ──────────────────────────────────────────

    /// Whether `other` is a narrower version of this type.
    pub fn is_specialization(&self, other: &Type) -> bool {
        match self {
            Type::Any => !matches!(other, Type::Any),
            Type::Numeric => matches!(other, Type::Integer { .. } | Type::Float { .. }),
            Type::Scalar => matches!(
                other,
                Type::Numeric
                    | Type::Integer { .. }
                    | Type::Float { .. }
                    | Type::String { .. }
                    | Type::Boolean
                    | Type::Regexp { .. }
                    | Type::Enum { .. }
                    | Type::Pattern { .. }
            ),
            Type::Data => {
                Type::Scalar.is_specialization(other)
                    || matches!(
                        other,
                        Type::Scalar
                            | Type::Undef
                            | Type::Array { .. }
                            | Type::Hash { .. }
                            | Type::Tuple { .. }
                            | Type::Struct { .. }
                    )
            }
            Type::Collection => matches!(
                other,
                Type::Array { .. } | Type::Hash { .. } | Type::Tuple { .. } | Type::Struct { .. }
            ),
            Type::Integer { from, to } => match other {
                // Integer[a, b] narrows Integer[c, d] iff c <= a <= b <= d
                Type::Integer {
                    from: other_from,
                    to: other_to,
                } => lower_within(*from, *other_from) && upper_within(*to, *other_to),
                _ => false,
            },
            Type::Float { from, to } => match other {
                Type::Float {
                    from: other_from,
                    to: other_to,
                } => lower_within_f(*from, *other_from) && upper_within_f(*to, *other_to),
                _ => false,
            },
            Type::String { from, to } => match other {
                Type::String {
                    from: other_from,
                    to: other_to,
                } => lower_within(*from, *other_from) && upper_within(*to, *other_to),
                Type::Enum { .. } | Type::Pattern { .. } => true,
                _ => false,
            },
            Type::Regexp { pattern } => match other {
                Type::Regexp {
                    pattern: other_pattern,
                } => pattern.is_none() && other_pattern.is_some(),
                _ => false,
            },
            Type::Enum {
                values: enum_values,
            } => match other {
                Type::Enum {
                    values: other_values,
                } => {
                    if enum_values.is_empty() {
                        !other_values.is_empty()
                    } else {
                        other_values.iter().all(|v| {
                            enum_values.iter().any(|e| e.eq_ignore_ascii_case(v))
                        }) && other_values.len() < enum_values.len()
                    }
                }
                _ => false,
            },
            Type::Pattern { patterns } => match other {
                Type::Pattern {
                    patterns: other_patterns,
                } => patterns.is_empty() && !other_patterns.is_empty(),
                _ => false,
            },
            Type::Array { element, from, to } => match other {
                Type::Array {
                    element: other_element,
                    from: other_from,
                    to: other_to,
                } => {
                    (element.as_ref() == other_element.as_ref()
                        || element.is_specialization(other_element))
                        && lower_within(*from, *other_from)
                        && upper_within(*to, *other_to)
                }
                Type::Tuple { .. } => true,
                _ => false,
            },
            Type::Hash {
                key,
                value,
                from,
                to,
            } => match other {
                Type::Hash {
                    key: other_key,
                    value: other_value,
                    from: other_from,
                    to: other_to,
                } => {
                    (key.as_ref() == other_key.as_ref() || key.is_specialization(other_key))
                        && (value.as_ref() == other_value.as_ref()
                            || value.is_specialization(other_value))
                        && lower_within(*from, *other_from)
                        && upper_within(*to, *other_to)
                }
                Type::Struct { .. } => true,
                _ => false,
            },
            Type::Tuple { types, from, to } => match other {
                Type::Tuple {
                    types: other_types,
                    from: other_from,
                    to: other_to,
                } => {
                    types.len() == other_types.len()
                        && types
                            .iter()
                            .zip(other_types.iter())
                            .all(|(t, o)| t == o || t.is_specialization(o))
                        && lower_within(*from, *other_from)
                        && upper_within(*to, *other_to)
                }
                _ => false,
            },
            Type::Struct { schema } => match other {
                Type::Struct {
                    schema: other_schema,
                } => schema.iter().all(|(name, type_)| {
                    other_schema
                        .iter()
                        .any(|(o_name, o_type)| o_name == name && (o_type == type_ || type_.is_specialization(o_type)))
                }),
                _ => false,
            },
            Type::Variant { types } => match other {
                Type::Variant { types: other_types } => other_types
                    .iter()
                    .all(|o| types.iter().any(|t| t == o || t.is_specialization(o))),
                _ => types.iter().any(|t| t == other || t.is_specialization(other)),
            },
            Type::Optional { type_ } => match type_ {
                None => !matches!(other, Type::Optional { type_: None }),
                Some(t) => {
                    matches!(other, Type::Undef)
                        || t.as_ref() == other
                        || t.is_specialization(other)
                }
            },
            Type::TypeType { type_ } => match other {
                Type::TypeType { type_: other_type } => match (type_, other_type) {
                    (None, Some(_)) => true,
                    (Some(t), Some(o)) => t.is_specialization(o),
                    _ => false,
                },
                _ => false,
            },
            Type::CatalogEntry => {
                matches!(other, Type::Resource { .. } | Type::Class { .. })
            }
            Type::Resource { type_name, title } => match other {
                Type::Resource {
                    type_name: other_type_name,
                    title: other_title,
                } => {
                    if type_name.is_empty() {
                        return !other_type_name.is_empty();
                    }
                    if type_name != other_type_name {
                        return false;
                    }
                    title.is_empty() && !other_title.is_empty()
                }
                _ => false,
            },
            Type::Class { title } => match other {
                Type::Class { title: other_title } => title.is_empty() && !other_title.is_empty(),
                _ => false,
            },
            _ => false,
        }
    }
}

/// `Data` is `Variant[Scalar, Undef, Array[Data], Hash[Scalar, Data]]`.
fn is_data(value: &Value) -> bool {
    match value {
        Value::Undef
        | Value::Integer(_)
        | Value::Float(_)
        | Value::String(_)
        | Value::Boolean(_)
        | Value::Regex(_) => true,
        Value::Array(elements) => elements.iter().all(|e| is_data(values::dereference(e))),
        Value::Hash(hash) => hash.iter().all(|(k, v)| {
            Type::Scalar.is_instance(values::dereference(k)) && is_data(values::dereference(v))
        }),
        _ => false,
    }
}

// Bound helpers; None is unbounded.

fn lower_within(outer: Option<i64>, inner: Option<i64>) -> bool {
    match (outer, inner) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(o), Some(i)) => o <= i,
    }
}

fn upper_within(outer: Option<i64>, inner: Option<i64>) -> bool {
    match (outer, inner) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(o), Some(i)) => i <= o,
    }
}

fn lower_within_f(outer: Option<f64>, inner: Option<f64>) -> bool {
    match (outer, inner) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(o), Some(i)) => o <= i,
    }
}

fn upper_within_f(outer: Option<f64>, inner: Option<f64>) -> bool {
    match (outer, inner) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(o), Some(i)) => i <= o,
    }
}

// ──────────────────────────────────────────────
// Printing
// ──────────────────────────────────────────────

fn write_bounds(
    f: &mut fmt::Formatter<'_>,
    prefix_written: bool,
    from: Option<i64>,
    to: Option<i64>,
) -> fmt::Result {
    match (from, to) {
        (None, None) => Ok(()),
        (Some(from), None) => {
            if prefix_written {
                write!(f, ", {}]", from)
            } else {
                write!(f, "[{}]", from)
            }
        }
        (from, Some(to)) => {
            let from_text = from
                .map(|v| v.to_string())
                .unwrap_or_else(|| "default".to_string());
            if prefix_written {
                write!(f, ", {}, {}]", from_text, to)
            } else {
                write!(f, "[{}, {}]", from_text, to)
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("Any"),
            Type::Undef => f.write_str("Undef"),
            Type::Default => f.write_str("Default"),
            Type::Boolean => f.write_str("Boolean"),
            Type::Integer { from, to } => {
                f.write_str("Integer")?;
                write_bounds(f, false, *from, *to)
            }
            Type::Float { from, to } => match (from, to) {
                (None, None) => f.write_str("Float"),
                (Some(from), None) => write!(f, "Float[{}]", values::format_float(*from)),
                (from, Some(to)) => {
                    let from_text = from
                        .map(values::format_float)
                        .unwrap_or_else(|| "default".to_string());
                    write!(f, "Float[{}, {}]", from_text, values::format_float(*to))
                }
            },
            Type::Numeric => f.write_str("Numeric"),
            Type::String { from, to } => {
                f.write_str("String")?;
                write_bounds(f, false, *from, *to)
            }
            Type::Regexp { pattern } => match pattern {
                None => f.write_str("Regexp"),
                Some(pattern) => write!(f, "Regexp[/{}/]", pattern),
            },
            Type::Pattern { patterns } => {
                if patterns.is_empty() {
                    return f.write_str("Pattern");
                }
                f.write_str("Pattern[")?;
                for (i, pattern) in patterns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "/{}/", pattern.pattern())?;
                }
                f.write_str("]")
            }
            Type::Enum { values } => {
                if values.is_empty() {
                    return f.write_str("Enum");
                }
                f.write_str("Enum[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{}'", value)?;
                }
                f.write_str("]")
            }
            Type::Array { element, from, to } => {
                if element.as_ref() == &Type::Any && from.is_none() && to.is_none() {
                    return f.write_str("Array");
                }
                write!(f, "Array[{}", element)?;
                write_bounds(f, true, *from, *to)?;
                if from.is_none() && to.is_none() {
                    f.write_str("]")?;
                }
                Ok(())
            }
            Type::Hash {
                key,
                value,
                from,
                to,
            } => {
                if key.as_ref() == &Type::Any
                    && value.as_ref() == &Type::Any
                    && from.is_none()
                    && to.is_none()
                {
                    return f.write_str("Hash");
                }
                write!(f, "Hash[{}, {}", key, value)?;
                write_bounds(f, true, *from, *to)?;
                if from.is_none() && to.is_none() {
                    f.write_str("]")?;
                }
                Ok(())
            }
            Type::Tuple { types, from, to } => {
                if types.is_empty() {
                    return f.write_str("Tuple");
                }
                f.write_str("Tuple[")?;
                for (i, type_) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", type_)?;
                }
                if let Some(from) = from {
                    write!(f, ", {}", from)?;
                }
                if let Some(to) = to {
                    write!(f, ", {}", to)?;
                }
                f.write_str("]")
            }
            Type::Struct { schema } => {
                if schema.is_empty() {
                    return f.write_str("Struct");
                }
                f.write_str("Struct[{")?;
                for (i, (name, type_)) in schema.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{}' => {}", name, type_)?;
                }
                f.write_str("}]")
            }
            Type::Variant { types } => {
                if types.is_empty() {
                    return f.write_str("Variant");
                }
                f.write_str("Variant[")?;
                for (i, type_) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", type_)?;
                }
                f.write_str("]")
            }
            Type::Optional { type_ } => match type_ {
                None => f.write_str("Optional"),
                Some(type_) => write!(f, "Optional[{}]", type_),
            },
            Type::TypeType { type_ } => match type_ {
                None => f.write_str("Type"),
                Some(type_) => write!(f, "Type[{}]", type_),
            },
            Type::Callable => f.write_str("Callable"),
            Type::CatalogEntry => f.write_str("CatalogEntry"),
            Type::Resource { type_name, title } => {
                if type_name.is_empty() {
                    return f.write_str("Resource");
                }
                f.write_str(type_name)?;
                if title.is_empty() {
                    return Ok(());
                }
                write!(f, "[{}]", title)
            }
            Type::Class { title } => {
                if title.is_empty() {
                    return f.write_str("Class");
                }
                write!(f, "Class[{}]", title)
            }
            Type::Collection => f.write_str("Collection"),
            Type::Scalar => f.write_str("Scalar"),
            Type::Data => f.write_str("Data"),
            Type::Runtime { runtime, name } => match (runtime, name) {
                (Some(runtime), Some(name)) => write!(f, "Runtime[{}, '{}']", runtime, name),
                (Some(runtime), None) => write!(f, "Runtime[{}]", runtime),
                _ => f.write_str("Runtime"),
            },
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn string_value(s: &str) -> Value {
        Value::String(s.to_string())
    }

    #[test]
    fn integer_range_instance_and_specialization() {
        let wide = Type::Integer {
            from: Some(0),
            to: Some(100),
        };
        let narrow = Type::Integer {
            from: Some(10),
            to: Some(20),
        };
        assert!(wide.is_instance(&Value::Integer(50)));
        assert!(!wide.is_instance(&Value::Integer(-1)));
        assert!(wide.is_specialization(&narrow));
        assert!(!narrow.is_specialization(&wide));
        assert!(Type::integer().is_specialization(&wide));
        assert!(!wide.is_specialization(&Type::integer()));
    }

    #[test]
    fn string_length_is_bytes() {
        let type_ = Type::String {
            from: Some(1),
            to: Some(4),
        };
        assert!(type_.is_instance(&string_value("abcd")));
        // "é" is two bytes; "één" is five
        assert!(!type_.is_instance(&string_value("één")));
        assert!(type_.is_instance(&string_value("éé")));
    }

    #[test]
    fn enum_is_ascii_case_insensitive() {
        let type_ = Type::Enum {
            values: vec!["present".to_string(), "absent".to_string()],
        };
        assert!(type_.is_instance(&string_value("Present")));
        assert!(!type_.is_instance(&string_value("latest")));
    }

    #[test]
    fn optional_matches_undef_or_inner() {
        let type_ = Type::Optional {
            type_: Some(Box::new(Type::integer())),
        };
        assert!(type_.is_instance(&Value::Undef));
        assert!(type_.is_instance(&Value::Integer(1)));
        assert!(!type_.is_instance(&string_value("one")));
    }

    #[test]
    fn variant_matches_any_branch() {
        let type_ = Type::Variant {
            types: vec![Type::string(), Type::integer()],
        };
        assert!(type_.is_instance(&string_value("x")));
        assert!(type_.is_instance(&Value::Integer(1)));
        assert!(!type_.is_instance(&Value::Boolean(true)));
    }

    #[test]
    fn data_is_recursive() {
        let nested = Value::Array(vec![
            Value::Integer(1),
            Value::Array(vec![string_value("x"), Value::Undef]),
        ]);
        assert!(Type::Data.is_instance(&nested));
        let with_type = Value::Array(vec![Value::Type(Type::Boolean)]);
        assert!(!Type::Data.is_instance(&with_type));
    }

    #[test]
    fn scalar_definition() {
        assert!(Type::Scalar.is_instance(&Value::Integer(1)));
        assert!(Type::Scalar.is_instance(&Value::Boolean(true)));
        assert!(Type::Scalar.is_instance(&Value::Regex(values::Regex::new("a").unwrap())));
        assert!(!Type::Scalar.is_instance(&Value::Array(Vec::new())));
    }

    #[test]
    fn lattice_supertype_transitivity() {
        // If a value is an instance of a type, it is an instance of the
        // type's wideners
        let samples = vec![
            Value::Integer(3),
            Value::Float(1.5),
            string_value("text"),
            Value::Boolean(false),
        ];
        for value in &samples {
            if Type::integer().is_instance(value) || Type::float().is_instance(value) {
                assert!(Type::Numeric.is_instance(value));
            }
            if Type::Numeric.is_instance(value) || Type::string().is_instance(value) {
                assert!(Type::Scalar.is_instance(value));
            }
            if Type::Scalar.is_instance(value) {
                assert!(Type::Data.is_instance(value));
                assert!(Type::Any.is_instance(value));
            }
        }
    }

    #[test]
    fn tuple_checks_positions_and_size() {
        let type_ = Type::Tuple {
            types: vec![Type::string(), Type::integer()],
            from: None,
            to: None,
        };
        assert!(type_.is_instance(&Value::Array(vec![string_value("a"), Value::Integer(1)])));
        assert!(!type_.is_instance(&Value::Array(vec![Value::Integer(1), Value::Integer(2)])));
        assert!(!type_.is_instance(&Value::Array(vec![string_value("a")])));
    }

    #[test]
    fn struct_requires_known_keys() {
        let type_ = Type::Struct {
            schema: vec![
                ("mode".to_string(), Type::string()),
                (
                    "owner".to_string(),
                    Type::Optional {
                        type_: Some(Box::new(Type::string())),
                    },
                ),
            ],
        };
        let mut hash = values::Hash::new();
        hash.insert(string_value("mode"), string_value("0644"));
        assert!(type_.is_instance(&Value::Hash(hash.clone())));
        hash.insert(string_value("extra"), Value::Integer(1));
        assert!(!type_.is_instance(&Value::Hash(hash)));
    }

    #[test]
    fn resource_type_canonicalization_and_parsing() {
        assert_eq!(normalize_type_name("file"), "File");
        assert_eq!(normalize_type_name("foo::bar"), "Foo::Bar");
        let (type_name, title) = Type::parse_resource("File['/tmp/a']").unwrap();
        assert_eq!(type_name, "File");
        assert_eq!(title, "/tmp/a");
        assert!(Type::parse_resource("not a resource").is_none());
    }

    #[test]
    fn resource_specialization_narrows_by_title() {
        let any_resource = Type::from_name("Resource");
        let file = Type::resource("file", "");
        let file_a = Type::resource("file", "/a");
        assert!(any_resource.is_specialization(&file));
        assert!(file.is_specialization(&file_a));
        assert!(!file_a.is_specialization(&file));
        assert!(file.is_instance(&Value::Type(file_a.clone())));
        assert!(!file_a.is_instance(&Value::Type(file)));
    }

    #[test]
    fn type_display_round_trips_names() {
        assert_eq!(
            Type::Integer {
                from: Some(1),
                to: Some(5)
            }
            .to_string(),
            "Integer[1, 5]"
        );
        assert_eq!(Type::resource("file", "/a").to_string(), "File[/a]");
        assert_eq!(Type::class("web").to_string(), "Class[web]");
        assert_eq!(
            Type::Optional {
                type_: Some(Box::new(Type::string()))
            }
            .to_string(),
            "Optional[String]"
        );
    }
}
