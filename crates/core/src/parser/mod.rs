//! Recursive-descent parser for the manifest language.
//!
//! Binary operators are parsed flat (see [`crate::ast::Expression`]); the
//! evaluator applies precedence. The parser recognizes catalog expressions
//! (resources, classes, defined types, nodes, collections), control flow,
//! and postfix operations, but performs no name resolution or validation --
//! that is the evaluator's job.

use crate::ast::{Expression, SyntaxTree};
use crate::error::ParseError;
use crate::lexer::{self, Keyword, Position, Spanned, Token};

mod catalog;
mod control;
mod expressions;

/// Functions that may be called statement-style, without parentheses.
const STATEMENT_FUNCTIONS: &[&str] = &[
    "include", "fail", "notice", "info", "warning", "err", "debug",
];

/// Default maximum number of errors collected in multi-error mode.
pub const DEFAULT_MAX_ERRORS: usize = 10;

// ──────────────────────────────────────────────
// Entry points
// ──────────────────────────────────────────────

/// Parse a token stream into a syntax tree, stopping at the first error.
pub fn parse(tokens: &[Spanned], filename: &str) -> Result<SyntaxTree, ParseError> {
    let mut parser = Parser::new(tokens, filename);
    parser.parse_tree()
}

/// Lex and parse a manifest in one step.
pub fn parse_manifest(src: &str, filename: &str) -> Result<SyntaxTree, ParseError> {
    let tokens = lexer::lex(src, filename)?;
    parse(&tokens, filename)
}

/// Parse in multi-error recovery mode.
///
/// Returns the successfully parsed expressions plus accumulated errors. The
/// parser recovers at expression boundaries: after an error it skips tokens
/// until it reaches a closing `}` at the surrounding nesting level (or the
/// start of something that can begin a top-level expression), then resumes.
pub fn parse_recovering(
    tokens: &[Spanned],
    filename: &str,
    max_errors: usize,
) -> Result<(SyntaxTree, Vec<ParseError>), ParseError> {
    let mut parser = Parser::new(tokens, filename);
    parser.parse_tree_recovering(max_errors)
}

/// Parse the body of a `${ ... }` interpolation.
///
/// The token stream must begin with the opening `{` and end with the
/// balancing `}` followed by `Eof` (as produced by
/// [`lexer::lex_interpolation`]). Returns the inner expressions.
pub fn parse_interpolation(tokens: &[Spanned], filename: &str) -> Result<SyntaxTree, ParseError> {
    if tokens.len() < 3 {
        let position = tokens.first().map(|s| s.position).unwrap_or_default();
        return Err(ParseError::parse(
            filename,
            position.line,
            position.column,
            "expected '{' to begin interpolation.",
        ));
    }
    // Strip the braces and re-terminate the inner stream
    let close = &tokens[tokens.len() - 2];
    let mut inner: Vec<Spanned> = tokens[1..tokens.len() - 2].to_vec();
    inner.push(Spanned {
        token: Token::Eof,
        position: close.position,
    });
    parse(&inner, filename)
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

pub(crate) struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    filename: String,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], filename: &str) -> Self {
        Parser {
            tokens,
            pos: 0,
            filename: filename.to_owned(),
        }
    }

    pub(crate) fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.cur().token
    }

    pub(crate) fn peek_at(&self, ahead: usize) -> &Token {
        &self.tokens[(self.pos + ahead).min(self.tokens.len() - 1)].token
    }

    pub(crate) fn position(&self) -> Position {
        self.cur().position
    }

    pub(crate) fn advance(&mut self) -> &Spanned {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    pub(crate) fn err(&self, message: impl Into<String>) -> ParseError {
        let position = self.position();
        ParseError::parse(&self.filename, position.line, position.column, message)
    }

    pub(crate) fn describe(token: &Token) -> String {
        match token {
            Token::Eof => "end of input".to_string(),
            Token::Name(name) => format!("name '{}'", name),
            Token::TypeName(name) => format!("type '{}'", name),
            Token::Variable(name) => format!("variable '${}'", name),
            Token::Keyword(keyword) => format!("keyword '{}'", keyword.as_str()),
            Token::Number { .. } => "number".to_string(),
            Token::String(_) => "string".to_string(),
            Token::Heredoc(_) => "heredoc".to_string(),
            Token::Regex(_) => "regex".to_string(),
            other => {
                let symbol = match other {
                    Token::LeftBrace => "{",
                    Token::RightBrace => "}",
                    Token::LeftParen => "(",
                    Token::RightParen => ")",
                    Token::LeftBracket | Token::ArrayStart => "[",
                    Token::RightBracket => "]",
                    Token::Comma => ",",
                    Token::Dot => ".",
                    Token::Colon => ":",
                    Token::Semicolon => ";",
                    Token::Question => "?",
                    Token::Pipe => "|",
                    Token::Assign => "=",
                    Token::FatArrow => "=>",
                    Token::PlusArrow => "+>",
                    Token::Equals => "==",
                    Token::NotEquals => "!=",
                    Token::Match => "=~",
                    Token::NotMatch => "!~",
                    Token::Less => "<",
                    Token::LessEqual => "<=",
                    Token::Greater => ">",
                    Token::GreaterEqual => ">=",
                    Token::LeftShift => "<<",
                    Token::RightShift => ">>",
                    Token::LeftCollect => "<|",
                    Token::RightCollect => "|>",
                    Token::LeftExportCollect => "<<|",
                    Token::RightExportCollect => "|>>",
                    Token::InEdge => "->",
                    Token::InEdgeSubscribe => "~>",
                    Token::OutEdge => "<-",
                    Token::OutEdgeSubscribe => "<~",
                    Token::Plus => "+",
                    Token::Minus => "-",
                    Token::Multiply => "*",
                    Token::Divide => "/",
                    Token::Modulo => "%",
                    Token::Not => "!",
                    Token::At => "@",
                    Token::AtAt => "@@",
                    _ => "?",
                };
                format!("'{}'", symbol)
            }
        }
    }

    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        self.err(format!(
            "expected {} but found {}.",
            expected,
            Self::describe(self.peek())
        ))
    }

    pub(crate) fn expect(&mut self, token: Token, expected: &str) -> Result<Position, ParseError> {
        if self.peek() == &token {
            Ok(self.advance().position)
        } else {
            Err(self.unexpected(expected))
        }
    }

    pub(crate) fn expect_keyword(&mut self, keyword: Keyword) -> Result<Position, ParseError> {
        if self.peek() == &Token::Keyword(keyword) {
            Ok(self.advance().position)
        } else {
            Err(self.unexpected(&format!("keyword '{}'", keyword.as_str())))
        }
    }

    pub(crate) fn take_name(&mut self, expected: &str) -> Result<crate::ast::Name, ParseError> {
        if let Token::Name(value) = self.peek().clone() {
            let position = self.advance().position;
            Ok(crate::ast::Name { value, position })
        } else {
            Err(self.unexpected(expected))
        }
    }

    pub(crate) fn is_statement_function(name: &str) -> bool {
        STATEMENT_FUNCTIONS.contains(&name)
    }

    /// Whether the current token can begin an expression. Used for
    /// statement-style function calls and list termination.
    pub(crate) fn starts_expression(&self) -> bool {
        matches!(
            self.peek(),
            Token::Name(_)
                | Token::TypeName(_)
                | Token::Variable(_)
                | Token::Number { .. }
                | Token::String(_)
                | Token::Heredoc(_)
                | Token::Regex(_)
                | Token::ArrayStart
                | Token::LeftParen
                | Token::LeftBrace
                | Token::Minus
                | Token::Not
                | Token::Multiply
                | Token::At
                | Token::AtAt
                | Token::Keyword(
                    Keyword::True
                        | Keyword::False
                        | Keyword::Undef
                        | Keyword::Default
                        | Keyword::If
                        | Keyword::Unless
                        | Keyword::Case
                        | Keyword::Class
                        | Keyword::Define
                        | Keyword::Node
                )
        )
    }

    // -- Trees and blocks ---------------------------------------

    fn parse_tree(&mut self) -> Result<SyntaxTree, ParseError> {
        let mut body = Vec::new();
        while self.peek() != &Token::Eof {
            body.push(self.parse_expression()?);
        }
        Ok(SyntaxTree {
            body,
            end: self.position(),
        })
    }

    /// Parse a brace-delimited block of expressions.
    pub(crate) fn parse_block(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.expect(Token::LeftBrace, "'{'")?;
        let mut body = Vec::new();
        while self.peek() != &Token::RightBrace {
            if self.peek() == &Token::Eof {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.parse_expression()?);
        }
        self.advance();
        Ok(body)
    }

    // -- Recovery -----------------------------------------------

    /// Skip tokens until a closing `}` at the original nesting level or
    /// something that can begin a top-level expression at level zero.
    fn recover_to_next_expression(&mut self) {
        let mut depth: i32 = 0;
        loop {
            match self.peek() {
                Token::Eof => break,
                Token::LeftBrace => {
                    depth += 1;
                    self.advance();
                }
                Token::RightBrace => {
                    if depth <= 0 {
                        self.advance();
                        break;
                    }
                    depth -= 1;
                    self.advance();
                }
                _ => {
                    if depth == 0 && self.starts_expression() {
                        break;
                    }
                    self.advance();
                }
            }
        }
    }

    fn parse_tree_recovering(
        &mut self,
        max_errors: usize,
    ) -> Result<(SyntaxTree, Vec<ParseError>), ParseError> {
        let mut body = Vec::new();
        let mut errors = Vec::new();

        while self.peek() != &Token::Eof {
            let start = self.pos;
            match self.parse_expression() {
                Ok(expression) => {
                    body.push(expression);
                }
                Err(e) => {
                    errors.push(e);
                    if errors.len() >= max_errors {
                        break;
                    }
                    // Ensure forward progress before recovering
                    if self.pos == start {
                        self.advance();
                    }
                    self.recover_to_next_expression();
                }
            }
        }

        Ok((
            SyntaxTree {
                body,
                end: self.position(),
            },
            errors,
        ))
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    fn parse_str(src: &str) -> SyntaxTree {
        parse_manifest(src, "test.cn").expect("parse should succeed")
    }

    #[test]
    fn parses_flat_binary_expressions() {
        let tree = parse_str("$x = 1 + 2 * 3");
        let expression = &tree.body[0];
        // Operators stay flat; precedence is applied later
        assert_eq!(expression.binary.len(), 3);
        assert_eq!(expression.binary[0].op, BinaryOperator::Assignment);
        assert_eq!(expression.binary[1].op, BinaryOperator::Plus);
        assert_eq!(expression.binary[2].op, BinaryOperator::Multiply);
    }

    #[test]
    fn parses_resource_expression() {
        let tree = parse_str("file { '/tmp/a': ensure => present, mode => '0644' }");
        match &tree.body[0].primary {
            PrimaryExpression::Catalog(catalog) => match catalog.as_ref() {
                CatalogExpression::Resource(resource) => {
                    assert_eq!(resource.type_.value, "file");
                    assert_eq!(resource.status, ResourceStatus::Realized);
                    assert_eq!(resource.bodies.len(), 1);
                    assert_eq!(resource.bodies[0].attributes.len(), 2);
                }
                other => panic!("expected resource, got {:?}", other),
            },
            other => panic!("expected catalog expression, got {:?}", other),
        }
    }

    #[test]
    fn parses_virtual_and_exported_resources() {
        let tree = parse_str("@user { 'alice': uid => 1000 } @@user { 'bob': }");
        match &tree.body[0].primary {
            PrimaryExpression::Catalog(catalog) => match catalog.as_ref() {
                CatalogExpression::Resource(resource) => {
                    assert_eq!(resource.status, ResourceStatus::Virtualized)
                }
                other => panic!("expected resource, got {:?}", other),
            },
            other => panic!("expected catalog expression, got {:?}", other),
        }
        match &tree.body[1].primary {
            PrimaryExpression::Catalog(catalog) => match catalog.as_ref() {
                CatalogExpression::Resource(resource) => {
                    assert_eq!(resource.status, ResourceStatus::Exported)
                }
                other => panic!("expected resource, got {:?}", other),
            },
            other => panic!("expected catalog expression, got {:?}", other),
        }
    }

    #[test]
    fn parses_class_definition_with_parameters() {
        let tree = parse_str("class web($port = 80, String $bind = '0.0.0.0') { notice $port }");
        match &tree.body[0].primary {
            PrimaryExpression::Catalog(catalog) => match catalog.as_ref() {
                CatalogExpression::ClassDefinition(class) => {
                    assert_eq!(class.name.value, "web");
                    let parameters = class.parameters.as_ref().unwrap();
                    assert_eq!(parameters.len(), 2);
                    assert!(parameters[0].default.is_some());
                    assert!(parameters[1].type_.is_some());
                }
                other => panic!("expected class definition, got {:?}", other),
            },
            other => panic!("expected catalog expression, got {:?}", other),
        }
    }

    #[test]
    fn parses_collection_with_query() {
        let tree = parse_str("User <| uid == 1000 and gid != 0 |>");
        match &tree.body[0].primary {
            PrimaryExpression::Catalog(catalog) => match catalog.as_ref() {
                CatalogExpression::Collection(collection) => {
                    assert_eq!(collection.kind, CollectionKind::All);
                    assert!(collection.first.is_some());
                    assert_eq!(collection.remainder.len(), 1);
                    assert_eq!(collection.remainder[0].op, QueryJoin::And);
                }
                other => panic!("expected collection, got {:?}", other),
            },
            other => panic!("expected catalog expression, got {:?}", other),
        }
    }

    #[test]
    fn parses_selector_and_access_postfix() {
        let tree = parse_str("$x = $os ? { 'linux' => 1, default => 0 }");
        let expression = &tree.body[0];
        match &expression.binary[0].operand {
            PrimaryExpression::Postfix(postfix) => {
                assert!(matches!(
                    postfix.subexpressions[0],
                    PostfixSubexpression::Selector(_)
                ));
            }
            other => panic!("expected postfix, got {:?}", other),
        }
    }

    #[test]
    fn parses_method_call_with_lambda() {
        let tree = parse_str("[1, 2].each |$value| { notice $value }");
        match &tree.body[0].primary {
            PrimaryExpression::Postfix(postfix) => match &postfix.subexpressions[0] {
                PostfixSubexpression::MethodCall(call) => {
                    assert_eq!(call.method.value, "each");
                    assert!(call.lambda.is_some());
                }
                other => panic!("expected method call, got {:?}", other),
            },
            other => panic!("expected postfix, got {:?}", other),
        }
    }

    #[test]
    fn parses_statement_function_call() {
        let tree = parse_str("notice 'hello', 'world'");
        match &tree.body[0].primary {
            PrimaryExpression::ControlFlow(flow) => match flow.as_ref() {
                ControlFlowExpression::FunctionCall(call) => {
                    assert_eq!(call.function.value, "notice");
                    assert_eq!(call.arguments.len(), 2);
                }
                other => panic!("expected function call, got {:?}", other),
            },
            other => panic!("expected control flow, got {:?}", other),
        }
    }

    #[test]
    fn parses_node_definitions() {
        let tree = parse_str("node 'web01.example.com', /^db\\d+$/, default { }");
        match &tree.body[0].primary {
            PrimaryExpression::Catalog(catalog) => match catalog.as_ref() {
                CatalogExpression::Node(node) => {
                    assert_eq!(node.names.len(), 3);
                    assert_eq!(node.names[0].kind, HostnameKind::Named);
                    assert_eq!(node.names[1].kind, HostnameKind::Regex);
                    assert_eq!(node.names[2].kind, HostnameKind::Default);
                }
                other => panic!("expected node definition, got {:?}", other),
            },
            other => panic!("expected catalog expression, got {:?}", other),
        }
    }

    #[test]
    fn parses_resource_override() {
        let tree = parse_str("File['/tmp/a'] { mode => '0600' }");
        match &tree.body[0].primary {
            PrimaryExpression::Catalog(catalog) => match catalog.as_ref() {
                CatalogExpression::ResourceOverride(override_) => {
                    assert_eq!(override_.attributes.len(), 1);
                }
                other => panic!("expected resource override, got {:?}", other),
            },
            other => panic!("expected catalog expression, got {:?}", other),
        }
    }

    #[test]
    fn parses_resource_defaults() {
        let tree = parse_str("File { owner => 'root' }");
        match &tree.body[0].primary {
            PrimaryExpression::Catalog(catalog) => match catalog.as_ref() {
                CatalogExpression::ResourceDefaults(defaults) => {
                    assert_eq!(defaults.type_.name, "File");
                }
                other => panic!("expected resource defaults, got {:?}", other),
            },
            other => panic!("expected catalog expression, got {:?}", other),
        }
    }

    #[test]
    fn reports_expected_token() {
        let err = parse_manifest("file { 'x' ensure => present }", "t").unwrap_err();
        assert!(err.message.contains("expected"), "message: {}", err.message);
    }

    #[test]
    fn recovery_collects_multiple_errors() {
        let src = "file { 'a' } $x = 1 file { 'b' }";
        let tokens = lexer::lex(src, "t").unwrap();
        let (tree, errors) = parse_recovering(&tokens, "t", DEFAULT_MAX_ERRORS).unwrap();
        assert_eq!(errors.len(), 2, "errors: {:?}", errors);
        assert_eq!(tree.body.len(), 1);
    }

    #[test]
    fn print_then_reparse_is_stable() {
        let sources = [
            "$x = 1 + 2 * 3",
            "file { '/tmp/a': ensure => present, mode => '0644' }",
            "class web($port = 80) { notify { \"port-${port}\": } }",
            "if $x > 1 { notice 'big' } else { notice 'small' }",
            "case $os { 'linux', 'bsd': { notice 'unix' } default: { fail 'unsupported' } }",
            "$y = $list.filter |$item| { $item =~ /^a/ }",
            "@user { 'alice': uid => 1000 }",
            "User <| uid == 1000 |>",
            "Package['nginx'] -> Service['nginx']",
        ];
        for src in sources {
            let first = parse_str(src).to_string();
            let second = parse_manifest(&first, "printed.cn")
                .unwrap_or_else(|e| panic!("reparse of {:?} failed: {}", first, e))
                .to_string();
            assert_eq!(first, second, "source: {}", src);
        }
    }
}
