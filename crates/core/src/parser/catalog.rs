//! Catalog productions: resource expressions and bodies, resource defaults
//! and overrides, class and defined type definitions, node definitions, and
//! collection expressions.

use super::Parser;
use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Keyword, Token};

impl<'a> Parser<'a> {
    /// Parse a resource expression. The current token must be the resource
    /// type: a name or the `class` keyword.
    pub(crate) fn parse_resource_expression(
        &mut self,
        status: ResourceStatus,
    ) -> Result<PrimaryExpression, ParseError> {
        let type_ = match self.peek().clone() {
            Token::Name(value) => {
                let position = self.advance().position;
                Name { value, position }
            }
            Token::Keyword(Keyword::Class) => {
                let position = self.advance().position;
                Name {
                    value: "class".to_string(),
                    position,
                }
            }
            _ => return Err(self.unexpected("resource type name")),
        };
        let position = type_.position;
        self.expect(Token::LeftBrace, "'{'")?;

        let mut bodies = Vec::new();
        loop {
            if self.peek() == &Token::RightBrace {
                break;
            }
            let body_position = self.position();
            let title = self.parse_expression()?;
            self.expect(Token::Colon, "':'")?;
            let attributes = self.parse_attribute_list()?;
            bodies.push(ResourceBody {
                title,
                attributes,
                position: body_position,
            });
            if self.peek() == &Token::Semicolon {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(Token::RightBrace, "'}'")?;

        if bodies.is_empty() {
            return Err(self.err("expected at least one resource body."));
        }

        Ok(PrimaryExpression::Catalog(Box::new(
            CatalogExpression::Resource(ResourceExpression {
                status,
                type_,
                bodies,
                position,
            }),
        )))
    }

    /// Parse `@type { ... }` or `@@type { ... }`. The current token is the
    /// `@` or `@@`.
    pub(crate) fn parse_virtualized_resource(&mut self) -> Result<PrimaryExpression, ParseError> {
        let status = match self.peek() {
            Token::At => ResourceStatus::Virtualized,
            Token::AtAt => ResourceStatus::Exported,
            _ => return Err(self.unexpected("'@' or '@@'")),
        };
        self.advance();
        self.parse_resource_expression(status)
    }

    /// Parse `class { 'title': ... }` or `class name(...) inherits parent { ... }`.
    pub(crate) fn parse_class(&mut self) -> Result<PrimaryExpression, ParseError> {
        if self.peek_at(1) == &Token::LeftBrace {
            // Resource-style class declaration
            return self.parse_resource_expression(ResourceStatus::Realized);
        }

        let position = self.expect_keyword(Keyword::Class)?;
        let name = self.take_name("class name")?;

        let parameters = if self.peek() == &Token::LeftParen {
            self.advance();
            let parameters = self.parse_parameters(&Token::RightParen)?;
            self.expect(Token::RightParen, "')'")?;
            Some(parameters)
        } else {
            None
        };

        let parent = if self.peek() == &Token::Keyword(Keyword::Inherits) {
            self.advance();
            Some(self.take_name("parent class name")?)
        } else {
            None
        };

        let body = self.parse_block()?;

        Ok(PrimaryExpression::Catalog(Box::new(
            CatalogExpression::ClassDefinition(ClassDefinitionExpression {
                name,
                parameters,
                parent,
                body,
                position,
            }),
        )))
    }

    pub(crate) fn parse_defined_type(&mut self) -> Result<PrimaryExpression, ParseError> {
        let position = self.expect_keyword(Keyword::Define)?;
        let name = self.take_name("defined type name")?;

        let parameters = if self.peek() == &Token::LeftParen {
            self.advance();
            let parameters = self.parse_parameters(&Token::RightParen)?;
            self.expect(Token::RightParen, "')'")?;
            Some(parameters)
        } else {
            None
        };

        let body = self.parse_block()?;

        Ok(PrimaryExpression::Catalog(Box::new(
            CatalogExpression::DefinedType(DefinedTypeExpression {
                name,
                parameters,
                body,
                position,
            }),
        )))
    }

    pub(crate) fn parse_node_definition(&mut self) -> Result<PrimaryExpression, ParseError> {
        let position = self.expect_keyword(Keyword::Node)?;

        let mut names = Vec::new();
        loop {
            let name_position = self.position();
            let hostname = match self.peek().clone() {
                Token::String(data) => {
                    self.advance();
                    Hostname {
                        value: data.text,
                        kind: HostnameKind::Named,
                        position: name_position,
                    }
                }
                Token::Regex(pattern) => {
                    self.advance();
                    Hostname {
                        value: pattern,
                        kind: HostnameKind::Regex,
                        position: name_position,
                    }
                }
                Token::Keyword(Keyword::Default) => {
                    self.advance();
                    Hostname {
                        value: "default".to_string(),
                        kind: HostnameKind::Default,
                        position: name_position,
                    }
                }
                Token::Name(value) => {
                    self.advance();
                    // Bare hostnames may contain dots: node foo.bar.baz
                    let mut value = value;
                    while self.peek() == &Token::Dot {
                        self.advance();
                        let segment = self.take_name("hostname segment")?;
                        value.push('.');
                        value.push_str(&segment.value);
                    }
                    Hostname {
                        value,
                        kind: HostnameKind::Named,
                        position: name_position,
                    }
                }
                _ => return Err(self.unexpected("node name")),
            };
            names.push(hostname);
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        let body = self.parse_block()?;

        Ok(PrimaryExpression::Catalog(Box::new(
            CatalogExpression::Node(NodeDefinitionExpression {
                names,
                body,
                position,
            }),
        )))
    }

    /// Parse `Type { attr => value, ... }` (per-scope resource defaults).
    pub(crate) fn parse_resource_defaults(&mut self) -> Result<PrimaryExpression, ParseError> {
        let (name, position) = match self.peek().clone() {
            Token::TypeName(name) => (name, self.advance().position),
            _ => return Err(self.unexpected("resource type")),
        };
        self.expect(Token::LeftBrace, "'{'")?;
        let attributes = self.parse_attribute_list()?;
        self.expect(Token::RightBrace, "'}'")?;
        Ok(PrimaryExpression::Catalog(Box::new(
            CatalogExpression::ResourceDefaults(ResourceDefaultsExpression {
                type_: TypeRef { name, position },
                attributes,
                position,
            }),
        )))
    }

    /// Parse the attribute list of `Ref[...] { ... }`. The reference has
    /// already been parsed; the current token is the `{`.
    pub(crate) fn parse_resource_override(
        &mut self,
        reference: PostfixExpression,
        position: crate::lexer::Position,
    ) -> Result<PrimaryExpression, ParseError> {
        self.expect(Token::LeftBrace, "'{'")?;
        let attributes = self.parse_attribute_list()?;
        self.expect(Token::RightBrace, "'}'")?;
        Ok(PrimaryExpression::Catalog(Box::new(
            CatalogExpression::ResourceOverride(ResourceOverrideExpression {
                reference,
                attributes,
                position,
            }),
        )))
    }

    /// Parse `Type <| query |>` or `Type <<| query |>>`. The current token
    /// is the type name.
    pub(crate) fn parse_collection(&mut self) -> Result<PrimaryExpression, ParseError> {
        let (name, position) = match self.peek().clone() {
            Token::TypeName(name) => (name, self.advance().position),
            _ => return Err(self.unexpected("resource type")),
        };
        let (kind, close) = match self.peek() {
            Token::LeftCollect => (CollectionKind::All, Token::RightCollect),
            Token::LeftExportCollect => (CollectionKind::Exported, Token::RightExportCollect),
            _ => return Err(self.unexpected("'<|' or '<<|'")),
        };
        self.advance();

        let mut first = None;
        let mut remainder = Vec::new();
        if self.peek() != &close {
            first = Some(self.parse_attribute_query()?);
            loop {
                let op = match self.peek() {
                    Token::Keyword(Keyword::And) => QueryJoin::And,
                    Token::Keyword(Keyword::Or) => QueryJoin::Or,
                    _ => break,
                };
                self.advance();
                remainder.push(BinaryQuery {
                    op,
                    operand: self.parse_attribute_query()?,
                });
            }
        }
        let close_text = match kind {
            CollectionKind::All => "'|>'",
            CollectionKind::Exported => "'|>>'",
        };
        self.expect(close, close_text)?;

        Ok(PrimaryExpression::Catalog(Box::new(
            CatalogExpression::Collection(CollectionExpression {
                type_: TypeRef { name, position },
                kind,
                first,
                remainder,
                position,
            }),
        )))
    }

    fn parse_attribute_query(&mut self) -> Result<AttributeQuery, ParseError> {
        let position = self.position();
        let attribute = self.take_name("attribute name")?;
        let op = match self.peek() {
            Token::Equals => QueryOperator::Equals,
            Token::NotEquals => QueryOperator::NotEquals,
            _ => return Err(self.unexpected("'==' or '!='")),
        };
        self.advance();
        let value = self.parse_query_value()?;
        Ok(AttributeQuery {
            attribute,
            op,
            value,
            position,
        })
    }

    /// A query value is a primary expression without binary operations, so
    /// `and`/`or` bind the queries rather than the values.
    fn parse_query_value(&mut self) -> Result<Expression, ParseError> {
        let primary = self.parse_primary_expression()?;
        Ok(Expression {
            primary,
            binary: Vec::new(),
        })
    }

    /// Parse `name => value` / `name +> value` pairs up to a `}` or `;`.
    pub(crate) fn parse_attribute_list(&mut self) -> Result<Vec<AttributeExpression>, ParseError> {
        let mut attributes = Vec::new();
        loop {
            if matches!(self.peek(), Token::RightBrace | Token::Semicolon) {
                break;
            }
            let position = self.position();
            let name = self.take_name("attribute name")?;
            let op = match self.peek() {
                Token::FatArrow => AttributeOperator::Assignment,
                Token::PlusArrow => AttributeOperator::Append,
                _ => return Err(self.unexpected("'=>' or '+>'")),
            };
            self.advance();
            let value = self.parse_expression()?;
            attributes.push(AttributeExpression {
                name,
                op,
                value,
                position,
            });
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        Ok(attributes)
    }
}
