//! Expression-level productions: binary sequences, primaries, literals,
//! unary and postfix operations.

use super::Parser;
use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Keyword, Token};

impl<'a> Parser<'a> {
    /// Map a token to its binary operator, if it is one.
    fn binary_operator(token: &Token) -> Option<BinaryOperator> {
        Some(match token {
            Token::Keyword(Keyword::In) => BinaryOperator::In,
            Token::Keyword(Keyword::And) => BinaryOperator::LogicalAnd,
            Token::Keyword(Keyword::Or) => BinaryOperator::LogicalOr,
            Token::Match => BinaryOperator::Match,
            Token::NotMatch => BinaryOperator::NotMatch,
            Token::Multiply => BinaryOperator::Multiply,
            Token::Divide => BinaryOperator::Divide,
            Token::Modulo => BinaryOperator::Modulo,
            Token::Plus => BinaryOperator::Plus,
            Token::Minus => BinaryOperator::Minus,
            Token::LeftShift => BinaryOperator::LeftShift,
            Token::RightShift => BinaryOperator::RightShift,
            Token::Equals => BinaryOperator::Equals,
            Token::NotEquals => BinaryOperator::NotEquals,
            Token::Greater => BinaryOperator::GreaterThan,
            Token::GreaterEqual => BinaryOperator::GreaterEquals,
            Token::Less => BinaryOperator::LessThan,
            Token::LessEqual => BinaryOperator::LessEquals,
            Token::Assign => BinaryOperator::Assignment,
            Token::InEdge => BinaryOperator::InEdge,
            Token::InEdgeSubscribe => BinaryOperator::InEdgeSubscribe,
            Token::OutEdge => BinaryOperator::OutEdge,
            Token::OutEdgeSubscribe => BinaryOperator::OutEdgeSubscribe,
            _ => return None,
        })
    }

    /// Parse an expression: a primary followed by flat (operator, primary)
    /// pairs. Precedence is not applied here.
    pub(crate) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let primary = self.parse_primary_expression()?;
        let mut binary = Vec::new();
        while let Some(op) = Self::binary_operator(self.peek()) {
            let position = self.advance().position;
            let operand = self.parse_primary_expression()?;
            binary.push(BinaryExpression {
                op,
                position,
                operand,
            });
        }
        Ok(Expression { primary, binary })
    }

    pub(crate) fn parse_primary_expression(&mut self) -> Result<PrimaryExpression, ParseError> {
        let base = self.parse_base_primary()?;

        // Catalog expressions take no postfix operations
        if matches!(base, PrimaryExpression::Catalog(_)) {
            return Ok(base);
        }

        let mut subexpressions = Vec::new();
        loop {
            match self.peek() {
                Token::LeftBracket => {
                    subexpressions.push(PostfixSubexpression::Access(self.parse_access()?));
                }
                Token::Dot => {
                    subexpressions.push(PostfixSubexpression::MethodCall(self.parse_method_call()?));
                }
                Token::Question => {
                    subexpressions.push(PostfixSubexpression::Selector(self.parse_selector()?));
                }
                _ => break,
            }
        }

        // A braced attribute list after a type reference with access
        // arguments is a resource override: File['/a'] { ... }
        if self.peek() == &Token::LeftBrace
            && matches!(base, PrimaryExpression::Basic(BasicExpression::Type(_)))
            && !subexpressions.is_empty()
            && subexpressions
                .iter()
                .all(|s| matches!(s, PostfixSubexpression::Access(_)))
        {
            let position = base.position();
            let reference = PostfixExpression {
                primary: base,
                subexpressions,
            };
            return self.parse_resource_override(reference, position);
        }

        if subexpressions.is_empty() {
            Ok(base)
        } else {
            Ok(PrimaryExpression::Postfix(Box::new(PostfixExpression {
                primary: base,
                subexpressions,
            })))
        }
    }

    fn parse_base_primary(&mut self) -> Result<PrimaryExpression, ParseError> {
        let position = self.position();
        match self.peek().clone() {
            Token::Keyword(Keyword::If) => self.parse_if_expression(),
            Token::Keyword(Keyword::Unless) => self.parse_unless_expression(),
            Token::Keyword(Keyword::Case) => self.parse_case_expression(),
            Token::Keyword(Keyword::Class) => self.parse_class(),
            Token::Keyword(Keyword::Define) => self.parse_defined_type(),
            Token::Keyword(Keyword::Node) => self.parse_node_definition(),
            Token::Keyword(Keyword::Undef) => {
                self.advance();
                Ok(PrimaryExpression::Basic(BasicExpression::Undef(position)))
            }
            Token::Keyword(Keyword::Default) => {
                self.advance();
                Ok(PrimaryExpression::Basic(BasicExpression::Default(position)))
            }
            Token::Keyword(Keyword::True) => {
                self.advance();
                Ok(PrimaryExpression::Basic(BasicExpression::Boolean(
                    Boolean {
                        value: true,
                        position,
                    },
                )))
            }
            Token::Keyword(Keyword::False) => {
                self.advance();
                Ok(PrimaryExpression::Basic(BasicExpression::Boolean(
                    Boolean {
                        value: false,
                        position,
                    },
                )))
            }
            Token::At | Token::AtAt => self.parse_virtualized_resource(),
            Token::Number { value, base } => {
                self.advance();
                Ok(PrimaryExpression::Basic(BasicExpression::Number(Number {
                    value,
                    base,
                    position,
                })))
            }
            Token::String(data) | Token::Heredoc(data) => {
                self.advance();
                Ok(PrimaryExpression::Basic(BasicExpression::String(
                    StringLiteral { data, position },
                )))
            }
            Token::Regex(pattern) => {
                self.advance();
                Ok(PrimaryExpression::Basic(BasicExpression::Regex(
                    RegexLiteral { pattern, position },
                )))
            }
            Token::Variable(name) => {
                self.advance();
                Ok(PrimaryExpression::Basic(BasicExpression::Variable(
                    Variable { name, position },
                )))
            }
            Token::Name(value) => {
                if self.peek_at(1) == &Token::LeftBrace {
                    return self.parse_resource_expression(ResourceStatus::Realized);
                }
                if self.peek_at(1) == &Token::LeftParen {
                    return self.parse_function_call();
                }
                self.advance();
                if Self::is_statement_function(&value) && self.starts_expression() {
                    return self.parse_statement_call(Name { value, position });
                }
                Ok(PrimaryExpression::Basic(BasicExpression::Name(Name {
                    value,
                    position,
                })))
            }
            Token::TypeName(name) => {
                match self.peek_at(1) {
                    Token::LeftBrace => return self.parse_resource_defaults(),
                    Token::LeftCollect | Token::LeftExportCollect => {
                        return self.parse_collection()
                    }
                    _ => {}
                }
                self.advance();
                Ok(PrimaryExpression::Basic(BasicExpression::Type(TypeRef {
                    name,
                    position,
                })))
            }
            Token::ArrayStart => self.parse_array_literal(),
            Token::LeftBrace => self.parse_hash_literal(),
            Token::LeftParen => {
                self.advance();
                let expression = self.parse_expression()?;
                self.expect(Token::RightParen, "')'")?;
                Ok(PrimaryExpression::Nested(Box::new(expression), position))
            }
            Token::Minus => {
                self.advance();
                let operand = self.parse_primary_expression()?;
                Ok(PrimaryExpression::Unary(Box::new(UnaryExpression {
                    op: UnaryOperator::Negate,
                    position,
                    operand,
                })))
            }
            Token::Not => {
                self.advance();
                let operand = self.parse_primary_expression()?;
                Ok(PrimaryExpression::Unary(Box::new(UnaryExpression {
                    op: UnaryOperator::LogicalNot,
                    position,
                    operand,
                })))
            }
            Token::Multiply => {
                self.advance();
                let operand = self.parse_primary_expression()?;
                Ok(PrimaryExpression::Unary(Box::new(UnaryExpression {
                    op: UnaryOperator::Splat,
                    position,
                    operand,
                })))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    // -- Literals -----------------------------------------------

    fn parse_array_literal(&mut self) -> Result<PrimaryExpression, ParseError> {
        let position = self.advance().position; // [
        let mut elements = Vec::new();
        while self.peek() != &Token::RightBracket {
            elements.push(self.parse_expression()?);
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(Token::RightBracket, "']'")?;
        Ok(PrimaryExpression::Basic(BasicExpression::Array(
            ArrayLiteral { elements, position },
        )))
    }

    fn parse_hash_literal(&mut self) -> Result<PrimaryExpression, ParseError> {
        let position = self.advance().position; // {
        let mut elements = Vec::new();
        while self.peek() != &Token::RightBrace {
            let key = self.parse_expression()?;
            self.expect(Token::FatArrow, "'=>'")?;
            let value = self.parse_expression()?;
            elements.push((key, value));
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(Token::RightBrace, "'}'")?;
        Ok(PrimaryExpression::Basic(BasicExpression::Hash(
            HashLiteral { elements, position },
        )))
    }

    // -- Postfix operations -------------------------------------

    fn parse_access(&mut self) -> Result<AccessExpression, ParseError> {
        let position = self.advance().position; // [
        let mut arguments = Vec::new();
        while self.peek() != &Token::RightBracket {
            arguments.push(self.parse_expression()?);
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(Token::RightBracket, "']'")?;
        if arguments.is_empty() {
            return Err(self.err("expected at least one argument for access expression."));
        }
        Ok(AccessExpression {
            arguments,
            position,
        })
    }

    fn parse_method_call(&mut self) -> Result<MethodCallExpression, ParseError> {
        let position = self.advance().position; // .
        let method = self.take_name("method name")?;
        let arguments = if self.peek() == &Token::LeftParen {
            self.parse_argument_list()?
        } else {
            Vec::new()
        };
        let lambda = self.parse_optional_lambda()?;
        Ok(MethodCallExpression {
            method,
            arguments,
            lambda,
            position,
        })
    }

    fn parse_selector(&mut self) -> Result<SelectorExpression, ParseError> {
        let position = self.advance().position; // ?
        self.expect(Token::LeftBrace, "'{'")?;
        let mut cases = Vec::new();
        while self.peek() != &Token::RightBrace {
            let case_position = self.position();
            let selector = self.parse_expression()?;
            self.expect(Token::FatArrow, "'=>'")?;
            let result = self.parse_expression()?;
            cases.push(SelectorCase {
                selector,
                result,
                position: case_position,
            });
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(Token::RightBrace, "'}'")?;
        if cases.is_empty() {
            return Err(self.err("expected at least one case in selector expression."));
        }
        Ok(SelectorExpression { cases, position })
    }

    // -- Argument lists -----------------------------------------

    pub(crate) fn parse_argument_list(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.expect(Token::LeftParen, "'('")?;
        let mut arguments = Vec::new();
        while self.peek() != &Token::RightParen {
            arguments.push(self.parse_expression()?);
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(Token::RightParen, "')'")?;
        Ok(arguments)
    }
}
