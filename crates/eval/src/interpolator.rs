//! String interpolation and escape processing.
//!
//! Raw string and heredoc text is resolved at evaluation time: escape
//! sequences per the token's escape set, heredoc margin stripping, `$name`
//! variable interpolation, and `${ ... }` expression interpolation via a
//! recursive parse of the embedded segment.

use crate::error::EvaluationError;
use crate::evaluator::Evaluator;
use crate::values::Value;
use cairn_core::ast::{
    BasicExpression, Expression, PostfixExpression, PrimaryExpression, PostfixSubexpression,
    Variable,
};
use cairn_core::lexer::{self, StringData};
use cairn_core::{parser, Position};

const TAB_WIDTH: usize = 4;

/// Interpolate a string or heredoc token's raw text.
pub fn interpolate(
    evaluator: &mut Evaluator,
    position: Position,
    data: &StringData,
) -> Result<String, EvaluationError> {
    let chars: Vec<char> = data.text.chars().collect();
    let mut result = String::with_capacity(data.text.len());
    let mut pos = 0usize;
    let mut current_margin = data.margin;

    while pos < chars.len() {
        // Strip heredoc margin at the start of each line
        while current_margin > 0 && pos < chars.len() {
            match chars[pos] {
                ' ' => {
                    current_margin -= 1;
                    pos += 1;
                }
                '\t' => {
                    current_margin -= current_margin.min(TAB_WIDTH);
                    pos += 1;
                }
                _ => break,
            }
        }
        if pos >= chars.len() {
            break;
        }
        current_margin = 0;

        let c = chars[pos];

        // Escape sequences
        if c == '\\' && !data.escapes.is_empty() {
            let mut next = pos + 1;
            if chars.get(next) == Some(&'\r') {
                next += 1;
            }
            if let Some(&escaped) = chars.get(next) {
                if data.escapes.contains(escaped) {
                    match escaped {
                        'r' => result.push('\r'),
                        'n' => result.push('\n'),
                        't' => result.push('\t'),
                        's' => result.push(' '),
                        'u' => {
                            let consumed = write_unicode_escape(
                                evaluator,
                                position,
                                &chars,
                                next + 1,
                                &mut result,
                            );
                            match consumed {
                                Some(end) => {
                                    pos = end;
                                    continue;
                                }
                                None => {
                                    // Invalid sequence: emit literally
                                    result.push('\\');
                                    pos += 1;
                                    continue;
                                }
                            }
                        }
                        '\n' => {
                            // Line continuation resets the margin
                            current_margin = data.margin;
                        }
                        '$' => result.push('$'),
                        other => result.push(other),
                    }
                    pos = next + 1;
                    continue;
                } else if data.quote != '\'' {
                    evaluator.warn(
                        position,
                        &format!("invalid escape sequence '\\{}'.", escaped),
                    );
                }
            }
        } else if c == '\n' {
            current_margin = data.margin;
        } else if data.interpolated && c == '$' {
            if let Some(&next) = chars.get(pos + 1) {
                if !next.is_whitespace() {
                    if next == '{' {
                        pos = interpolate_expression(evaluator, position, data, &chars, pos, &mut result)?;
                        continue;
                    }
                    if let Some(end) = interpolate_name(evaluator, position, &chars, pos + 1, &mut result)? {
                        pos = end;
                        continue;
                    }
                }
            }
        }

        result.push(c);
        pos += 1;
    }

    // Remove the trailing line break if instructed to do so
    if data.remove_break {
        if result.ends_with('\n') {
            result.pop();
        }
        if result.ends_with('\r') {
            result.pop();
        }
    }
    Ok(result)
}

/// `$name` interpolation: greedily take a variable or match-variable name
/// and append its stringified value. Returns the position after the name,
/// or None if no name is present.
fn interpolate_name(
    evaluator: &mut Evaluator,
    position: Position,
    chars: &[char],
    start: usize,
    result: &mut String,
) -> Result<Option<usize>, EvaluationError> {
    let mut end = start;

    if chars.get(end).is_some_and(|c| c.is_ascii_digit()) {
        while chars.get(end).is_some_and(|c| c.is_ascii_digit()) {
            end += 1;
        }
        let name: String = chars[start..end].iter().collect();
        let index: usize = name.parse().unwrap_or(usize::MAX);
        if let Some(value) = evaluator.context.lookup_match(index) {
            result.push_str(&value.to_string());
        }
        return Ok(Some(end));
    }

    // name segments joined by ::, with an optional leading ::
    let mut name = String::new();
    if chars.get(end) == Some(&':')
        && chars.get(end + 1) == Some(&':')
        && chars.get(end + 2).is_some_and(|c| c.is_ascii_alphabetic() || *c == '_')
    {
        name.push_str("::");
        end += 2;
    }
    loop {
        let segment_start = end;
        while chars
            .get(end)
            .is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_')
        {
            end += 1;
        }
        if end == segment_start {
            return Ok(None);
        }
        name.extend(&chars[segment_start..end]);
        if chars.get(end) == Some(&':')
            && chars.get(end + 1) == Some(&':')
            && chars
                .get(end + 2)
                .is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_')
        {
            name.push_str("::");
            end += 2;
            continue;
        }
        break;
    }

    if name.is_empty() {
        return Ok(None);
    }
    if let Some(value) = evaluator.lookup_variable(&name, position)? {
        result.push_str(&value.to_string());
    }
    Ok(Some(end))
}

/// `${ expr }` interpolation: parse the embedded segment with the shared
/// lexer and parser, evaluate it in the current scope, and stringify the
/// result. Returns the position after the closing brace.
fn interpolate_expression(
    evaluator: &mut Evaluator,
    position: Position,
    data: &StringData,
    chars: &[char],
    dollar: usize,
    result: &mut String,
) -> Result<usize, EvaluationError> {
    let remainder: String = chars[dollar + 1..].iter().collect();
    let path = evaluator.path();

    let reposition = |e: cairn_core::ParseError| {
        let inner_position = Position::new(
            position.offset + dollar + if data.quote != '\0' { 1 } else { 0 },
            position.line + e.line - 1,
            e.column,
        );
        EvaluationError::at(e.message, &path, inner_position)
    };

    let (tokens, end_offset) =
        lexer::lex_interpolation(&remainder, &path).map_err(&reposition)?;

    // Fast path: `${name}` and `${0}` are variable lookups, not bare-word
    // strings
    if tokens.len() == 4 {
        let looked_up = match &tokens[1].token {
            lexer::Token::Name(name) => Some(evaluator.lookup_variable(name, position)?),
            lexer::Token::Variable(name) => {
                if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                    Some(name.parse().ok().and_then(|i| evaluator.context.lookup_match(i)))
                } else {
                    Some(evaluator.lookup_variable(name, position)?)
                }
            }
            lexer::Token::Number {
                value: lexer::NumberValue::Integer(index),
                ..
            } => Some(evaluator.context.lookup_match(*index as usize)),
            _ => None,
        };
        if let Some(value) = looked_up {
            if let Some(value) = value {
                result.push_str(&value.to_string());
            }
            return Ok(dollar + 1 + end_offset);
        }
    }

    let tree = parser::parse_interpolation(&tokens, &path).map_err(&reposition)?;

    let mut value = Value::Undef;
    for (i, expression) in tree.body.iter().enumerate() {
        // The first expression may be a name with access or method calls;
        // treat the name as a variable: ${foo[0]} reads $foo
        if i == 0 {
            if let Some(transformed) = transform_expression(expression) {
                value = evaluator.evaluate_expression(&transformed, false)?;
                continue;
            }
        }
        value = evaluator.evaluate_expression(expression, false)?;
    }
    result.push_str(&value.to_string());

    Ok(dollar + 1 + end_offset)
}

/// `${foo[0]}` and `${foo.size}` treat the leading name as a variable.
fn transform_expression(expression: &Expression) -> Option<Expression> {
    let postfix = match &expression.primary {
        PrimaryExpression::Postfix(postfix) => postfix,
        _ => return None,
    };
    if postfix.subexpressions.is_empty() {
        return None;
    }
    if !matches!(
        postfix.subexpressions[0],
        PostfixSubexpression::Access(_) | PostfixSubexpression::MethodCall(_)
    ) {
        return None;
    }
    let name = match &postfix.primary {
        PrimaryExpression::Basic(BasicExpression::Name(name)) => name,
        _ => return None,
    };

    Some(Expression {
        primary: PrimaryExpression::Postfix(Box::new(PostfixExpression {
            primary: PrimaryExpression::Basic(BasicExpression::Variable(Variable {
                name: name.value.clone(),
                position: name.position,
            })),
            subexpressions: postfix.subexpressions.clone(),
        })),
        binary: expression.binary.clone(),
    })
}

/// `\u` escape: either four fixed hex digits or a `{...}` delimited
/// sequence of one to six. On success appends the character and returns
/// the position after the sequence; on failure warns and returns None.
fn write_unicode_escape(
    evaluator: &mut Evaluator,
    position: Position,
    chars: &[char],
    start: usize,
    result: &mut String,
) -> Option<usize> {
    let mut pos = start;
    let variable_length = chars.get(pos) == Some(&'{');
    if variable_length {
        pos += 1;
    }

    let mut digits = String::new();
    while let Some(&c) = chars.get(pos) {
        if variable_length && c == '}' {
            break;
        }
        if !c.is_ascii_hexdigit() {
            if variable_length {
                evaluator.warn(
                    position,
                    &format!(
                        "unicode escape sequence contains non-hexadecimal character '{}'.",
                        c
                    ),
                );
                return None;
            }
            break;
        }
        digits.push(c);
        pos += 1;
        if !variable_length && digits.len() == 4 {
            break;
        }
    }

    if variable_length {
        if chars.get(pos) != Some(&'}') {
            evaluator.warn(
                position,
                "a closing '}' was not found for unicode escape sequence.",
            );
            return None;
        }
        pos += 1;
        if digits.is_empty() || digits.len() > 6 {
            evaluator.warn(
                position,
                "expected at least 1 and at most 6 hexadecimal digits for unicode escape sequence.",
            );
            return None;
        }
    } else if digits.len() != 4 {
        evaluator.warn(position, "invalid unicode escape sequence.");
        return None;
    }

    let code_point = u32::from_str_radix(&digits, 16).ok()?;
    match char::from_u32(code_point) {
        Some(c) => {
            result.push(c);
            Some(pos)
        }
        None => {
            evaluator.warn(position, "invalid unicode code point.");
            None
        }
    }
}
