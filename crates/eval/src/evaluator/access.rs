//! Evaluation of access expressions: value indexing (`$array[0]`,
//! `$hash[key]`, `$string[0, 2]`) and type parameterization
//! (`Integer[1, 10]`, `Array[String]`, `File['/path']`).

use super::Evaluator;
use crate::error::EvaluationError;
use crate::types::Type;
use crate::values::{self, Value};
use cairn_core::ast::AccessExpression;
use cairn_core::Position;

impl<'a> Evaluator<'a> {
    pub(super) fn evaluate_access(
        &mut self,
        target: &Value,
        expression: &AccessExpression,
    ) -> Result<Value, EvaluationError> {
        let (arguments, positions) = self.evaluate_arguments(&expression.arguments)?;
        let position = expression.position;

        match values::dereference(target) {
            Value::Array(elements) => {
                self.access_array(elements, &arguments, &positions, position)
            }
            Value::String(text) => self.access_string(text, &arguments, &positions, position),
            Value::Hash(hash) => {
                let hash = hash.clone();
                if arguments.len() == 1 {
                    Ok(hash.get(&arguments[0]).cloned().unwrap_or(Value::Undef))
                } else {
                    let mut found = Vec::new();
                    for argument in &arguments {
                        if let Some(value) = hash.get(argument) {
                            found.push(value.clone());
                        }
                    }
                    Ok(Value::Array(found))
                }
            }
            Value::Type(type_) => {
                let type_ = type_.clone();
                self.parameterize_type(&type_, arguments, &positions, position)
            }
            other => Err(self.error(
                position,
                format!("{} cannot be accessed with [].", values::get_type(other)),
            )),
        }
    }

    fn access_array(
        &self,
        elements: &[Value],
        arguments: &[Value],
        positions: &[Position],
        position: Position,
    ) -> Result<Value, EvaluationError> {
        let index = self.require_integer(arguments, positions, 0, position)?;
        let length = elements.len() as i64;
        // Negative indices count from the end
        let start = if index < 0 { length + index } else { index };

        if arguments.len() == 1 {
            if start < 0 || start >= length {
                return Ok(Value::Undef);
            }
            return Ok(elements[start as usize].clone());
        }

        let count = self.require_integer(arguments, positions, 1, position)?;
        if count <= 0 || start >= length {
            return Ok(Value::Array(Vec::new()));
        }
        let start = start.max(0) as usize;
        let end = (start + count as usize).min(elements.len());
        Ok(Value::Array(elements[start..end].to_vec()))
    }

    fn access_string(
        &self,
        text: &str,
        arguments: &[Value],
        positions: &[Position],
        position: Position,
    ) -> Result<Value, EvaluationError> {
        let chars: Vec<char> = text.chars().collect();
        let index = self.require_integer(arguments, positions, 0, position)?;
        let length = chars.len() as i64;
        let start = if index < 0 { length + index } else { index };

        if arguments.len() == 1 {
            if start < 0 || start >= length {
                return Ok(Value::String(String::new()));
            }
            return Ok(Value::String(chars[start as usize].to_string()));
        }

        let count = self.require_integer(arguments, positions, 1, position)?;
        if count <= 0 || start >= length {
            return Ok(Value::String(String::new()));
        }
        let start = start.max(0) as usize;
        let end = (start + count as usize).min(chars.len());
        Ok(Value::String(chars[start..end].iter().collect()))
    }

    fn require_integer(
        &self,
        arguments: &[Value],
        positions: &[Position],
        index: usize,
        fallback: Position,
    ) -> Result<i64, EvaluationError> {
        match arguments.get(index).map(values::dereference) {
            Some(Value::Integer(i)) => Ok(*i),
            Some(other) => Err(self.error(
                positions.get(index).copied().unwrap_or(fallback),
                format!(
                    "expected Integer for access argument but found {}.",
                    values::get_type(other)
                ),
            )),
            None => Err(self.error(fallback, "expected an access argument.")),
        }
    }

    // -- Type parameterization ----------------------------------

    fn parameterize_type(
        &mut self,
        type_: &Type,
        arguments: Vec<Value>,
        positions: &[Position],
        position: Position,
    ) -> Result<Value, EvaluationError> {
        if arguments.is_empty() {
            return Err(self.error(position, "expected at least one type parameter."));
        }
        match type_ {
            Type::Integer { .. } => {
                let (from, to) = self.integer_bounds(&arguments, positions, position)?;
                Ok(Value::Type(Type::Integer { from, to }))
            }
            Type::Float { .. } => {
                let (from, to) = self.float_bounds(&arguments, positions, position)?;
                Ok(Value::Type(Type::Float { from, to }))
            }
            Type::String { .. } => {
                let (from, to) = self.integer_bounds(&arguments, positions, position)?;
                Ok(Value::Type(Type::String { from, to }))
            }
            Type::Regexp { .. } => {
                let pattern = match values::dereference(&arguments[0]) {
                    Value::String(s) => s.clone(),
                    Value::Regex(r) => r.pattern().to_string(),
                    other => {
                        return Err(self.error(
                            positions[0],
                            format!(
                                "expected String or Regexp for Regexp parameter but found {}.",
                                values::get_type(other)
                            ),
                        ))
                    }
                };
                // Validate the pattern eagerly
                values::Regex::new(&pattern).map_err(|e| {
                    self.error(positions[0], format!("invalid regular expression: {}", e))
                })?;
                Ok(Value::Type(Type::Regexp {
                    pattern: Some(pattern),
                }))
            }
            Type::Pattern { .. } => {
                let mut patterns = Vec::with_capacity(arguments.len());
                for (argument, argument_position) in arguments.iter().zip(positions) {
                    let pattern = match values::dereference(argument) {
                        Value::String(s) => s.clone(),
                        Value::Regex(r) => r.pattern().to_string(),
                        other => {
                            return Err(self.error(
                                *argument_position,
                                format!(
                                    "expected String or Regexp for Pattern parameter but found {}.",
                                    values::get_type(other)
                                ),
                            ))
                        }
                    };
                    patterns.push(values::Regex::new(&pattern).map_err(|e| {
                        self.error(
                            *argument_position,
                            format!("invalid regular expression: {}", e),
                        )
                    })?);
                }
                Ok(Value::Type(Type::Pattern { patterns }))
            }
            Type::Enum { .. } => {
                let mut enum_values = Vec::with_capacity(arguments.len());
                for (argument, argument_position) in arguments.iter().zip(positions) {
                    match values::dereference(argument) {
                        Value::String(s) => enum_values.push(s.clone()),
                        other => {
                            return Err(self.error(
                                *argument_position,
                                format!(
                                    "expected String for Enum parameter but found {}.",
                                    values::get_type(other)
                                ),
                            ))
                        }
                    }
                }
                Ok(Value::Type(Type::Enum {
                    values: enum_values,
                }))
            }
            Type::Array { .. } => {
                let element = self.require_type(&arguments, positions, 0)?;
                let (from, to) =
                    self.integer_bounds(&arguments[1..], &positions[1..], position)?;
                Ok(Value::Type(Type::Array {
                    element: Box::new(element),
                    from,
                    to,
                }))
            }
            Type::Hash { .. } => {
                if arguments.len() < 2 {
                    return Err(
                        self.error(position, "expected key and value types for Hash parameters.")
                    );
                }
                let key = self.require_type(&arguments, positions, 0)?;
                let value = self.require_type(&arguments, positions, 1)?;
                let (from, to) =
                    self.integer_bounds(&arguments[2..], &positions[2..], position)?;
                Ok(Value::Type(Type::Hash {
                    key: Box::new(key),
                    value: Box::new(value),
                    from,
                    to,
                }))
            }
            Type::Tuple { .. } => {
                // Trailing integers are size bounds
                let mut types = Vec::new();
                let mut bounds = Vec::new();
                for (argument, argument_position) in arguments.iter().zip(positions) {
                    match values::dereference(argument) {
                        Value::Type(t) if bounds.is_empty() => types.push(t.clone()),
                        Value::Integer(i) => bounds.push(*i),
                        other => {
                            return Err(self.error(
                                *argument_position,
                                format!(
                                    "expected Type or Integer for Tuple parameter but found {}.",
                                    values::get_type(other)
                                ),
                            ))
                        }
                    }
                }
                if bounds.len() > 2 {
                    return Err(
                        self.error(position, "expected at most two size bounds for Tuple.")
                    );
                }
                Ok(Value::Type(Type::Tuple {
                    types,
                    from: bounds.first().copied(),
                    to: bounds.get(1).copied(),
                }))
            }
            Type::Struct { .. } => {
                let hash = match values::dereference(&arguments[0]) {
                    Value::Hash(hash) => hash.clone(),
                    other => {
                        return Err(self.error(
                            positions[0],
                            format!(
                                "expected Hash for Struct parameter but found {}.",
                                values::get_type(other)
                            ),
                        ))
                    }
                };
                let mut schema = Vec::with_capacity(hash.len());
                for (key, value) in hash.iter() {
                    let name = match values::dereference(key) {
                        Value::String(s) => s.clone(),
                        other => {
                            return Err(self.error(
                                positions[0],
                                format!(
                                    "expected String for Struct member name but found {}.",
                                    values::get_type(other)
                                ),
                            ))
                        }
                    };
                    let member = match values::dereference(value) {
                        Value::Type(t) => t.clone(),
                        other => {
                            return Err(self.error(
                                positions[0],
                                format!(
                                    "expected Type for Struct member '{}' but found {}.",
                                    name,
                                    values::get_type(other)
                                ),
                            ))
                        }
                    };
                    schema.push((name, member));
                }
                Ok(Value::Type(Type::Struct { schema }))
            }
            Type::Variant { .. } => {
                let mut types = Vec::with_capacity(arguments.len());
                for i in 0..arguments.len() {
                    types.push(self.require_type(&arguments, positions, i)?);
                }
                Ok(Value::Type(Type::Variant { types }))
            }
            Type::Optional { .. } => {
                let inner = self.require_type(&arguments, positions, 0)?;
                Ok(Value::Type(Type::Optional {
                    type_: Some(Box::new(inner)),
                }))
            }
            Type::TypeType { .. } => {
                let inner = self.require_type(&arguments, positions, 0)?;
                Ok(Value::Type(Type::TypeType {
                    type_: Some(Box::new(inner)),
                }))
            }
            Type::Runtime { .. } => {
                let runtime = self.require_string(&arguments, positions, 0)?;
                let name = if arguments.len() > 1 {
                    Some(self.require_string(&arguments, positions, 1)?)
                } else {
                    None
                };
                Ok(Value::Type(Type::Runtime {
                    runtime: Some(runtime),
                    name,
                }))
            }
            Type::Class { title } if title.is_empty() => {
                let mut classes = Vec::new();
                self.collect_titles(&arguments, positions, &mut |title| {
                    classes.push(Value::Type(Type::class(&title)));
                })?;
                if classes.len() == 1 {
                    Ok(classes.pop().expect("one element"))
                } else {
                    Ok(Value::Array(classes))
                }
            }
            Type::Resource { type_name, title } if title.is_empty() => {
                // Resource[File], Resource[File, '/a'], File['/a', '/b']
                let (resource_type, title_arguments, title_positions) = if type_name.is_empty() {
                    let named = match values::dereference(&arguments[0]) {
                        Value::String(s) => crate::types::normalize_type_name(s),
                        Value::Type(Type::Resource {
                            type_name: inner, ..
                        }) if !inner.is_empty() => inner.clone(),
                        other => {
                            return Err(self.error(
                                positions[0],
                                format!(
                                    "expected String or Resource for Resource type parameter but found {}.",
                                    values::get_type(other)
                                ),
                            ))
                        }
                    };
                    (named, &arguments[1..], &positions[1..])
                } else {
                    (type_name.clone(), &arguments[..], &positions[..])
                };

                if title_arguments.is_empty() {
                    return Ok(Value::Type(Type::Resource {
                        type_name: resource_type,
                        title: String::new(),
                    }));
                }
                let mut references = Vec::new();
                self.collect_titles(title_arguments, title_positions, &mut |title| {
                    references.push(Value::Type(Type::Resource {
                        type_name: resource_type.clone(),
                        title,
                    }));
                })?;
                if references.len() == 1 {
                    Ok(references.pop().expect("one element"))
                } else {
                    Ok(Value::Array(references))
                }
            }
            other => Err(self.error(
                position,
                format!("type {} cannot be parameterized.", other),
            )),
        }
    }

    /// Collect string titles from arguments, flattening arrays.
    fn collect_titles(
        &self,
        arguments: &[Value],
        positions: &[Position],
        callback: &mut dyn FnMut(String),
    ) -> Result<(), EvaluationError> {
        for (argument, argument_position) in arguments.iter().zip(positions) {
            match values::dereference(argument) {
                Value::String(s) => callback(s.clone()),
                Value::Array(elements) => {
                    for element in elements {
                        match values::dereference(element) {
                            Value::String(s) => callback(s.clone()),
                            other => {
                                return Err(self.error(
                                    *argument_position,
                                    format!(
                                        "expected String for title but found {}.",
                                        values::get_type(other)
                                    ),
                                ))
                            }
                        }
                    }
                }
                other => {
                    return Err(self.error(
                        *argument_position,
                        format!(
                            "expected String for title but found {}.",
                            values::get_type(other)
                        ),
                    ))
                }
            }
        }
        Ok(())
    }

    fn require_type(
        &self,
        arguments: &[Value],
        positions: &[Position],
        index: usize,
    ) -> Result<Type, EvaluationError> {
        match arguments.get(index).map(values::dereference) {
            Some(Value::Type(t)) => Ok(t.clone()),
            Some(other) => Err(self.error(
                positions[index],
                format!(
                    "expected Type for parameter but found {}.",
                    values::get_type(other)
                ),
            )),
            None => Err(self.error(
                positions.last().copied().unwrap_or_default(),
                "expected a type parameter.",
            )),
        }
    }

    fn require_string(
        &self,
        arguments: &[Value],
        positions: &[Position],
        index: usize,
    ) -> Result<String, EvaluationError> {
        match arguments.get(index).map(values::dereference) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(self.error(
                positions[index],
                format!(
                    "expected String for parameter but found {}.",
                    values::get_type(other)
                ),
            )),
            None => Err(self.error(
                positions.last().copied().unwrap_or_default(),
                "expected a string parameter.",
            )),
        }
    }

    /// Size bounds: integers or `default` for an open bound.
    fn integer_bounds(
        &self,
        arguments: &[Value],
        positions: &[Position],
        position: Position,
    ) -> Result<(Option<i64>, Option<i64>), EvaluationError> {
        let mut bounds = [None, None];
        if arguments.len() > 2 {
            return Err(self.error(position, "expected at most two range bounds."));
        }
        for (i, (argument, argument_position)) in arguments.iter().zip(positions).enumerate() {
            match values::dereference(argument) {
                Value::Integer(value) => bounds[i] = Some(*value),
                Value::Default => bounds[i] = None,
                other => {
                    return Err(self.error(
                        *argument_position,
                        format!(
                            "expected Integer or Default for range bound but found {}.",
                            values::get_type(other)
                        ),
                    ))
                }
            }
        }
        Ok((bounds[0], bounds[1]))
    }

    fn float_bounds(
        &self,
        arguments: &[Value],
        positions: &[Position],
        position: Position,
    ) -> Result<(Option<f64>, Option<f64>), EvaluationError> {
        let mut bounds = [None, None];
        if arguments.len() > 2 {
            return Err(self.error(position, "expected at most two range bounds."));
        }
        for (i, (argument, argument_position)) in arguments.iter().zip(positions).enumerate() {
            match values::dereference(argument) {
                Value::Integer(value) => bounds[i] = Some(*value as f64),
                Value::Float(value) => bounds[i] = Some(*value),
                Value::Default => bounds[i] = None,
                other => {
                    return Err(self.error(
                        *argument_position,
                        format!(
                            "expected Numeric or Default for range bound but found {}.",
                            values::get_type(other)
                        ),
                    ))
                }
            }
        }
        Ok((bounds[0], bounds[1]))
    }
}
