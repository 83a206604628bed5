//! Control-flow productions: conditionals, case expressions, function
//! calls, lambdas, and parameter lists.

use super::Parser;
use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Keyword, Token};

impl<'a> Parser<'a> {
    pub(crate) fn parse_if_expression(&mut self) -> Result<PrimaryExpression, ParseError> {
        let position = self.expect_keyword(Keyword::If)?;
        let conditional = self.parse_expression()?;
        let body = self.parse_block()?;

        let mut elsifs = Vec::new();
        let mut else_ = None;
        loop {
            match self.peek() {
                Token::Keyword(Keyword::Elsif) => {
                    let elsif_position = self.advance().position;
                    let conditional = self.parse_expression()?;
                    let body = self.parse_block()?;
                    elsifs.push(Elsif {
                        conditional,
                        body,
                        position: elsif_position,
                    });
                }
                Token::Keyword(Keyword::Else) => {
                    let else_position = self.advance().position;
                    let body = self.parse_block()?;
                    else_ = Some(Else {
                        body,
                        position: else_position,
                    });
                    break;
                }
                _ => break,
            }
        }

        Ok(PrimaryExpression::ControlFlow(Box::new(
            ControlFlowExpression::If(IfExpression {
                conditional,
                body,
                elsifs,
                else_,
                position,
            }),
        )))
    }

    pub(crate) fn parse_unless_expression(&mut self) -> Result<PrimaryExpression, ParseError> {
        let position = self.expect_keyword(Keyword::Unless)?;
        let conditional = self.parse_expression()?;
        let body = self.parse_block()?;
        let else_ = if self.peek() == &Token::Keyword(Keyword::Else) {
            let else_position = self.advance().position;
            let body = self.parse_block()?;
            Some(Else {
                body,
                position: else_position,
            })
        } else {
            None
        };
        Ok(PrimaryExpression::ControlFlow(Box::new(
            ControlFlowExpression::Unless(UnlessExpression {
                conditional,
                body,
                else_,
                position,
            }),
        )))
    }

    pub(crate) fn parse_case_expression(&mut self) -> Result<PrimaryExpression, ParseError> {
        let position = self.expect_keyword(Keyword::Case)?;
        let expression = self.parse_expression()?;
        self.expect(Token::LeftBrace, "'{'")?;

        let mut propositions = Vec::new();
        while self.peek() != &Token::RightBrace {
            let proposition_position = self.position();
            let mut options = vec![self.parse_expression()?];
            while self.peek() == &Token::Comma {
                self.advance();
                options.push(self.parse_expression()?);
            }
            self.expect(Token::Colon, "':'")?;
            let body = self.parse_block()?;
            propositions.push(Proposition {
                options,
                body,
                position: proposition_position,
            });
        }
        self.advance(); // }

        if propositions.is_empty() {
            return Err(self.err("expected at least one case proposition."));
        }

        Ok(PrimaryExpression::ControlFlow(Box::new(
            ControlFlowExpression::Case(CaseExpression {
                expression,
                propositions,
                position,
            }),
        )))
    }

    // -- Function calls -----------------------------------------

    /// Parse `name(arguments) |params| { body }`.
    pub(crate) fn parse_function_call(&mut self) -> Result<PrimaryExpression, ParseError> {
        let function = self.take_name("function name")?;
        let position = function.position;
        let arguments = self.parse_argument_list()?;
        let lambda = self.parse_optional_lambda()?;
        Ok(PrimaryExpression::ControlFlow(Box::new(
            ControlFlowExpression::FunctionCall(FunctionCallExpression {
                function,
                arguments,
                lambda,
                position,
            }),
        )))
    }

    /// Parse the arguments of a statement-style call such as `notice $x, $y`.
    /// The function name has already been consumed.
    pub(crate) fn parse_statement_call(
        &mut self,
        function: Name,
    ) -> Result<PrimaryExpression, ParseError> {
        let position = function.position;
        let mut arguments = vec![self.parse_expression()?];
        while self.peek() == &Token::Comma {
            self.advance();
            arguments.push(self.parse_expression()?);
        }
        Ok(PrimaryExpression::ControlFlow(Box::new(
            ControlFlowExpression::FunctionCall(FunctionCallExpression {
                function,
                arguments,
                lambda: None,
                position,
            }),
        )))
    }

    // -- Lambdas and parameters ---------------------------------

    pub(crate) fn parse_optional_lambda(&mut self) -> Result<Option<Lambda>, ParseError> {
        if self.peek() != &Token::Pipe {
            return Ok(None);
        }
        let position = self.advance().position;
        let parameters = self.parse_parameters(&Token::Pipe)?;
        self.expect(Token::Pipe, "'|'")?;
        let body = self.parse_block()?;
        Ok(Some(Lambda {
            parameters: Some(parameters),
            body,
            position,
        }))
    }

    /// Parse a comma-separated parameter list up to (not consuming) the
    /// given terminator.
    pub(crate) fn parse_parameters(
        &mut self,
        terminator: &Token,
    ) -> Result<Vec<Parameter>, ParseError> {
        let mut parameters = Vec::new();
        while self.peek() != terminator {
            parameters.push(self.parse_parameter()?);
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        Ok(parameters)
    }

    fn parse_parameter(&mut self) -> Result<Parameter, ParseError> {
        let position = self.position();

        // Optional type expression: a type name with optional access
        // arguments, e.g. `Integer[0, 10]`
        let type_ = if let Token::TypeName(name) = self.peek().clone() {
            let type_position = self.advance().position;
            let base = PrimaryExpression::Basic(BasicExpression::Type(TypeRef {
                name,
                position: type_position,
            }));
            if self.peek() == &Token::LeftBracket {
                let access = self.parse_access_subexpression()?;
                Some(PrimaryExpression::Postfix(Box::new(PostfixExpression {
                    primary: base,
                    subexpressions: vec![access],
                })))
            } else {
                Some(base)
            }
        } else {
            None
        };

        let captures = if self.peek() == &Token::Multiply {
            self.advance();
            true
        } else {
            false
        };

        let variable = match self.peek().clone() {
            Token::Variable(name) => {
                let variable_position = self.advance().position;
                Variable {
                    name,
                    position: variable_position,
                }
            }
            _ => return Err(self.unexpected("parameter variable")),
        };

        let default = if self.peek() == &Token::Assign {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(Parameter {
            type_,
            captures,
            variable,
            default,
            position,
        })
    }

    fn parse_access_subexpression(&mut self) -> Result<PostfixSubexpression, ParseError> {
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
        Ok(PostfixSubexpression::Access(AccessExpression {
            arguments,
            position,
        }))
    }
}
