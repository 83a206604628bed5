//! The `shellquote` function: quote each argument for safe use in a
//! Bourne shell and join them with spaces. Array arguments are flattened
//! into the word list.

use super::CallContext;
use crate::error::EvaluationError;
use crate::values::{self, Value};

const SAFE: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789@%_+=:,./-";
const DANGEROUS: &str = "!\"`$\\";

pub fn call(context: &mut CallContext) -> Result<Value, EvaluationError> {
    let mut words = Vec::new();
    let arguments = std::mem::take(&mut context.arguments);
    for (index, argument) in arguments.iter().enumerate() {
        collect_words(context, argument, index, &mut words)?;
    }

    let quoted: Vec<String> = words.iter().map(|word| quote(word)).collect();
    Ok(Value::String(quoted.join(" ")))
}

fn collect_words(
    context: &CallContext,
    argument: &Value,
    index: usize,
    words: &mut Vec<String>,
) -> Result<(), EvaluationError> {
    match values::dereference(argument) {
        Value::String(word) => {
            words.push(word.clone());
            Ok(())
        }
        Value::Array(elements) => {
            for element in elements {
                collect_words(context, element, index, words)?;
            }
            Ok(())
        }
        other => Err(context.error(
            context.position(index),
            format!(
                "expected String or Array[String] for argument but found {}.",
                values::get_type(other)
            ),
        )),
    }
}

fn quote(word: &str) -> String {
    if !word.is_empty() && word.chars().all(|c| SAFE.contains(c)) {
        return word.to_string();
    }
    if !word.chars().any(|c| DANGEROUS.contains(c)) {
        return format!("\"{}\"", word);
    }
    if !word.contains('\'') {
        return format!("'{}'", word);
    }
    let mut result = String::with_capacity(word.len() + 2);
    result.push('"');
    for c in word.chars() {
        if DANGEROUS.contains(c) {
            result.push('\\');
        }
        result.push(c);
    }
    result.push('"');
    result
}

#[cfg(test)]
mod tests {
    use super::quote;

    #[test]
    fn quoting_rules() {
        assert_eq!(quote("simple"), "simple");
        assert_eq!(quote("has space"), "\"has space\"");
        assert_eq!(quote("dollar$var"), "'dollar$var'");
        assert_eq!(quote("both '$'"), "\"both '\\$'\"");
        assert_eq!(quote(""), "\"\"");
    }
}
