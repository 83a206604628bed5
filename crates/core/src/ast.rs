//! AST for the manifest language.
//!
//! The parser produces a [`SyntaxTree`]: a sequence of expressions. Binary
//! operators are kept flat -- an [`Expression`] is a primary followed by
//! zero or more (operator, primary) pairs, and operator precedence is
//! resolved by the evaluator. Every node carries the position of its first
//! token, and every node prints as canonical source.

use crate::lexer::{NumberValue, NumericBase, Position, StringData};
use std::fmt;

// ──────────────────────────────────────────────
// Trees and expressions
// ──────────────────────────────────────────────

/// A parsed manifest: the expressions of its body in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    pub body: Vec<Expression>,
    /// Position just past the last consumed token; used by interpolation to
    /// resume lexing after an embedded parse.
    pub end: Position,
}

/// A primary expression followed by flat binary operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub primary: PrimaryExpression,
    pub binary: Vec<BinaryExpression>,
}

impl Expression {
    pub fn position(&self) -> Position {
        self.primary.position()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub op: BinaryOperator,
    /// Position of the operator token.
    pub position: Position,
    pub operand: PrimaryExpression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    In,
    Match,
    NotMatch,
    Multiply,
    Divide,
    Modulo,
    Plus,
    Minus,
    LeftShift,
    RightShift,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterEquals,
    LessThan,
    LessEquals,
    LogicalAnd,
    LogicalOr,
    Assignment,
    InEdge,
    InEdgeSubscribe,
    OutEdge,
    OutEdgeSubscribe,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOperator::In => "in",
            BinaryOperator::Match => "=~",
            BinaryOperator::NotMatch => "!~",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::LeftShift => "<<",
            BinaryOperator::RightShift => ">>",
            BinaryOperator::Equals => "==",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEquals => ">=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEquals => "<=",
            BinaryOperator::LogicalAnd => "and",
            BinaryOperator::LogicalOr => "or",
            BinaryOperator::Assignment => "=",
            BinaryOperator::InEdge => "->",
            BinaryOperator::InEdgeSubscribe => "~>",
            BinaryOperator::OutEdge => "<-",
            BinaryOperator::OutEdgeSubscribe => "<~",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryExpression {
    Basic(BasicExpression),
    ControlFlow(Box<ControlFlowExpression>),
    Catalog(Box<CatalogExpression>),
    Unary(Box<UnaryExpression>),
    Postfix(Box<PostfixExpression>),
    /// A parenthesized subexpression.
    Nested(Box<Expression>, Position),
}

impl PrimaryExpression {
    pub fn position(&self) -> Position {
        match self {
            PrimaryExpression::Basic(basic) => basic.position(),
            PrimaryExpression::ControlFlow(flow) => flow.position(),
            PrimaryExpression::Catalog(catalog) => catalog.position(),
            PrimaryExpression::Unary(unary) => unary.position,
            PrimaryExpression::Postfix(postfix) => postfix.primary.position(),
            PrimaryExpression::Nested(_, position) => *position,
        }
    }
}

// ──────────────────────────────────────────────
// Basic expressions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum BasicExpression {
    Undef(Position),
    Default(Position),
    Boolean(Boolean),
    Number(Number),
    String(StringLiteral),
    Regex(RegexLiteral),
    Variable(Variable),
    Name(Name),
    Type(TypeRef),
    Array(ArrayLiteral),
    Hash(HashLiteral),
}

impl BasicExpression {
    pub fn position(&self) -> Position {
        match self {
            BasicExpression::Undef(position) | BasicExpression::Default(position) => *position,
            BasicExpression::Boolean(b) => b.position,
            BasicExpression::Number(n) => n.position,
            BasicExpression::String(s) => s.position,
            BasicExpression::Regex(r) => r.position,
            BasicExpression::Variable(v) => v.position,
            BasicExpression::Name(n) => n.position,
            BasicExpression::Type(t) => t.position,
            BasicExpression::Array(a) => a.position,
            BasicExpression::Hash(h) => h.position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Boolean {
    pub value: bool,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Number {
    pub value: NumberValue,
    pub base: NumericBase,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    pub data: StringData,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegexLiteral {
    pub pattern: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub position: Position,
}

/// A lowercase, possibly qualified name.
#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub value: String,
    pub position: Position,
}

/// A capitalized, possibly qualified type name.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub name: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLiteral {
    pub elements: Vec<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashLiteral {
    pub elements: Vec<(Expression, Expression)>,
    pub position: Position,
}

// ──────────────────────────────────────────────
// Unary and postfix expressions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    LogicalNot,
    Splat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    pub op: UnaryOperator,
    pub position: Position,
    pub operand: PrimaryExpression,
}

/// A primary expression with postfix operations applied left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct PostfixExpression {
    pub primary: PrimaryExpression,
    pub subexpressions: Vec<PostfixSubexpression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostfixSubexpression {
    Selector(SelectorExpression),
    Access(AccessExpression),
    MethodCall(MethodCallExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorExpression {
    pub cases: Vec<SelectorCase>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorCase {
    pub selector: Expression,
    pub result: Expression,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessExpression {
    pub arguments: Vec<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallExpression {
    pub method: Name,
    pub arguments: Vec<Expression>,
    pub lambda: Option<Lambda>,
    pub position: Position,
}

// ──────────────────────────────────────────────
// Control flow
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ControlFlowExpression {
    Case(CaseExpression),
    If(IfExpression),
    Unless(UnlessExpression),
    FunctionCall(FunctionCallExpression),
}

impl ControlFlowExpression {
    pub fn position(&self) -> Position {
        match self {
            ControlFlowExpression::Case(e) => e.position,
            ControlFlowExpression::If(e) => e.position,
            ControlFlowExpression::Unless(e) => e.position,
            ControlFlowExpression::FunctionCall(e) => e.position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpression {
    pub expression: Expression,
    pub propositions: Vec<Proposition>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Proposition {
    pub options: Vec<Expression>,
    pub body: Vec<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpression {
    pub conditional: Expression,
    pub body: Vec<Expression>,
    pub elsifs: Vec<Elsif>,
    pub else_: Option<Else>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Elsif {
    pub conditional: Expression,
    pub body: Vec<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Else {
    pub body: Vec<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnlessExpression {
    pub conditional: Expression,
    pub body: Vec<Expression>,
    pub else_: Option<Else>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallExpression {
    pub function: Name,
    pub arguments: Vec<Expression>,
    pub lambda: Option<Lambda>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub parameters: Option<Vec<Parameter>>,
    pub body: Vec<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Optional type expression, e.g. `Integer[0, 10]`.
    pub type_: Option<PrimaryExpression>,
    /// Whether this parameter captures the remaining arguments (`*$rest`).
    pub captures: bool,
    pub variable: Variable,
    pub default: Option<Expression>,
    pub position: Position,
}

// ──────────────────────────────────────────────
// Catalog expressions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogExpression {
    Resource(ResourceExpression),
    ResourceDefaults(ResourceDefaultsExpression),
    ResourceOverride(ResourceOverrideExpression),
    ClassDefinition(ClassDefinitionExpression),
    DefinedType(DefinedTypeExpression),
    Node(NodeDefinitionExpression),
    Collection(CollectionExpression),
}

impl CatalogExpression {
    pub fn position(&self) -> Position {
        match self {
            CatalogExpression::Resource(e) => e.position,
            CatalogExpression::ResourceDefaults(e) => e.position,
            CatalogExpression::ResourceOverride(e) => e.position,
            CatalogExpression::ClassDefinition(e) => e.position,
            CatalogExpression::DefinedType(e) => e.position,
            CatalogExpression::Node(e) => e.position,
            CatalogExpression::Collection(e) => e.position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Realized,
    Virtualized,
    Exported,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceExpression {
    pub status: ResourceStatus,
    /// The resource type name; `class` for class resource declarations.
    pub type_: Name,
    pub bodies: Vec<ResourceBody>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceBody {
    pub title: Expression,
    pub attributes: Vec<AttributeExpression>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeOperator {
    Assignment,
    Append,
}

impl fmt::Display for AttributeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttributeOperator::Assignment => "=>",
            AttributeOperator::Append => "+>",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeExpression {
    pub name: Name,
    pub op: AttributeOperator,
    pub value: Expression,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefaultsExpression {
    pub type_: TypeRef,
    pub attributes: Vec<AttributeExpression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceOverrideExpression {
    /// The resource reference, e.g. `File['/etc/motd']`.
    pub reference: PostfixExpression,
    pub attributes: Vec<AttributeExpression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDefinitionExpression {
    pub name: Name,
    pub parameters: Option<Vec<Parameter>>,
    pub parent: Option<Name>,
    pub body: Vec<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefinedTypeExpression {
    pub name: Name,
    pub parameters: Option<Vec<Parameter>>,
    pub body: Vec<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDefinitionExpression {
    pub names: Vec<Hostname>,
    pub body: Vec<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hostname {
    pub value: String,
    pub kind: HostnameKind,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostnameKind {
    Named,
    Regex,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    /// `<| ... |>`: realizes virtual resources.
    All,
    /// `<<| ... |>>`: realizes exported resources.
    Exported,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionExpression {
    pub type_: TypeRef,
    pub kind: CollectionKind,
    pub first: Option<AttributeQuery>,
    pub remainder: Vec<BinaryQuery>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Equals,
    NotEquals,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeQuery {
    pub attribute: Name,
    pub op: QueryOperator,
    pub value: Expression,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryJoin {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryQuery {
    pub op: QueryJoin,
    pub operand: AttributeQuery,
}

// ──────────────────────────────────────────────
// Printing
// ──────────────────────────────────────────────

fn write_block(f: &mut fmt::Formatter<'_>, body: &[Expression]) -> fmt::Result {
    write!(f, "{{ ")?;
    for expression in body {
        write!(f, "{} ", expression)?;
    }
    write!(f, "}}")
}

fn write_separated<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    separator: &str,
) -> fmt::Result {
    let mut first = true;
    for item in items {
        if first {
            first = false;
        } else {
            f.write_str(separator)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for expression in &self.body {
            writeln!(f, "{}", expression)?;
        }
        Ok(())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primary)?;
        for binary in &self.binary {
            write!(f, " {} {}", binary.op, binary.operand)?;
        }
        Ok(())
    }
}

impl fmt::Display for PrimaryExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryExpression::Basic(basic) => write!(f, "{}", basic),
            PrimaryExpression::ControlFlow(flow) => write!(f, "{}", flow),
            PrimaryExpression::Catalog(catalog) => write!(f, "{}", catalog),
            PrimaryExpression::Unary(unary) => write!(f, "{}", unary),
            PrimaryExpression::Postfix(postfix) => write!(f, "{}", postfix),
            PrimaryExpression::Nested(expression, _) => write!(f, "({})", expression),
        }
    }
}

impl fmt::Display for BasicExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasicExpression::Undef(_) => f.write_str("undef"),
            BasicExpression::Default(_) => f.write_str("default"),
            BasicExpression::Boolean(b) => write!(f, "{}", if b.value { "true" } else { "false" }),
            BasicExpression::Number(n) => write!(f, "{}", n),
            BasicExpression::String(s) => write!(f, "{}", s),
            BasicExpression::Regex(r) => write!(f, "/{}/", r.pattern),
            BasicExpression::Variable(v) => write!(f, "${}", v.name),
            BasicExpression::Name(n) => write!(f, "{}", n.value),
            BasicExpression::Type(t) => write!(f, "{}", t.name),
            BasicExpression::Array(a) => {
                write!(f, "[")?;
                write_separated(f, &a.elements, ", ")?;
                write!(f, "]")
            }
            BasicExpression::Hash(h) => {
                write!(f, "{{")?;
                let mut first = true;
                for (key, value) in &h.elements {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} => {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, self.base) {
            (NumberValue::Integer(i), NumericBase::Hexadecimal) => write!(f, "0x{:x}", i),
            (NumberValue::Integer(i), NumericBase::Octal) => write!(f, "0{:o}", i),
            (NumberValue::Integer(i), NumericBase::Decimal) => write!(f, "{}", i),
            (NumberValue::Float(x), _) => {
                if x.fract() == 0.0 && x.is_finite() && x.abs() < 1e15 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
        }
    }
}

impl fmt::Display for StringLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data.quote {
            '\'' => write!(f, "'{}'", self.data.text),
            // Heredocs print as double-quoted text
            _ => write!(f, "\"{}\"", self.data.text),
        }
    }
}

impl fmt::Display for UnaryExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            UnaryOperator::Negate => "-",
            UnaryOperator::LogicalNot => "!",
            UnaryOperator::Splat => "*",
        };
        write!(f, "{}{}", op, self.operand)
    }
}

impl fmt::Display for PostfixExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primary)?;
        for subexpression in &self.subexpressions {
            write!(f, "{}", subexpression)?;
        }
        Ok(())
    }
}

impl fmt::Display for PostfixSubexpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostfixSubexpression::Selector(selector) => {
                write!(f, " ? {{ ")?;
                for case in &selector.cases {
                    write!(f, "{} => {}, ", case.selector, case.result)?;
                }
                write!(f, "}}")
            }
            PostfixSubexpression::Access(access) => {
                write!(f, "[")?;
                write_separated(f, &access.arguments, ", ")?;
                write!(f, "]")
            }
            PostfixSubexpression::MethodCall(call) => {
                write!(f, ".{}(", call.method.value)?;
                write_separated(f, &call.arguments, ", ")?;
                write!(f, ")")?;
                if let Some(lambda) = &call.lambda {
                    write!(f, " {}", lambda)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ControlFlowExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlFlowExpression::Case(case) => write!(f, "{}", case),
            ControlFlowExpression::If(if_) => write!(f, "{}", if_),
            ControlFlowExpression::Unless(unless) => write!(f, "{}", unless),
            ControlFlowExpression::FunctionCall(call) => write!(f, "{}", call),
        }
    }
}

impl fmt::Display for CaseExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case {} {{ ", self.expression)?;
        for proposition in &self.propositions {
            write_separated(f, &proposition.options, ", ")?;
            write!(f, ": ")?;
            write_block(f, &proposition.body)?;
            write!(f, " ")?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for IfExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if {} ", self.conditional)?;
        write_block(f, &self.body)?;
        for elsif in &self.elsifs {
            write!(f, " elsif {} ", elsif.conditional)?;
            write_block(f, &elsif.body)?;
        }
        if let Some(else_) = &self.else_ {
            write!(f, " else ")?;
            write_block(f, &else_.body)?;
        }
        Ok(())
    }
}

impl fmt::Display for UnlessExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unless {} ", self.conditional)?;
        write_block(f, &self.body)?;
        if let Some(else_) = &self.else_ {
            write!(f, " else ")?;
            write_block(f, &else_.body)?;
        }
        Ok(())
    }
}

impl fmt::Display for FunctionCallExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function.value)?;
        write_separated(f, &self.arguments, ", ")?;
        write!(f, ")")?;
        if let Some(lambda) = &self.lambda {
            write!(f, " {}", lambda)?;
        }
        Ok(())
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|")?;
        if let Some(parameters) = &self.parameters {
            write_separated(f, parameters, ", ")?;
        }
        write!(f, "| ")?;
        write_block(f, &self.body)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(type_) = &self.type_ {
            write!(f, "{} ", type_)?;
        }
        if self.captures {
            write!(f, "*")?;
        }
        write!(f, "${}", self.variable.name)?;
        if let Some(default) = &self.default {
            write!(f, " = {}", default)?;
        }
        Ok(())
    }
}

impl fmt::Display for CatalogExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogExpression::Resource(e) => write!(f, "{}", e),
            CatalogExpression::ResourceDefaults(e) => write!(f, "{}", e),
            CatalogExpression::ResourceOverride(e) => write!(f, "{}", e),
            CatalogExpression::ClassDefinition(e) => write!(f, "{}", e),
            CatalogExpression::DefinedType(e) => write!(f, "{}", e),
            CatalogExpression::Node(e) => write!(f, "{}", e),
            CatalogExpression::Collection(e) => write!(f, "{}", e),
        }
    }
}

fn write_attributes(f: &mut fmt::Formatter<'_>, attributes: &[AttributeExpression]) -> fmt::Result {
    let mut first = true;
    for attribute in attributes {
        if first {
            first = false;
        } else {
            write!(f, ", ")?;
        }
        write!(
            f,
            "{} {} {}",
            attribute.name.value, attribute.op, attribute.value
        )?;
    }
    Ok(())
}

impl fmt::Display for ResourceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            ResourceStatus::Realized => {}
            ResourceStatus::Virtualized => write!(f, "@")?,
            ResourceStatus::Exported => write!(f, "@@")?,
        }
        write!(f, "{} {{ ", self.type_.value)?;
        let mut first = true;
        for body in &self.bodies {
            if first {
                first = false;
            } else {
                write!(f, "; ")?;
            }
            write!(f, "{}: ", body.title)?;
            write_attributes(f, &body.attributes)?;
        }
        write!(f, " }}")
    }
}

impl fmt::Display for ResourceDefaultsExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ ", self.type_.name)?;
        write_attributes(f, &self.attributes)?;
        write!(f, " }}")
    }
}

impl fmt::Display for ResourceOverrideExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ ", self.reference)?;
        write_attributes(f, &self.attributes)?;
        write!(f, " }}")
    }
}

impl fmt::Display for ClassDefinitionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.name.value)?;
        if let Some(parameters) = &self.parameters {
            write!(f, "(")?;
            write_separated(f, parameters, ", ")?;
            write!(f, ")")?;
        }
        if let Some(parent) = &self.parent {
            write!(f, " inherits {}", parent.value)?;
        }
        write!(f, " ")?;
        write_block(f, &self.body)
    }
}

impl fmt::Display for DefinedTypeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "define {}", self.name.value)?;
        if let Some(parameters) = &self.parameters {
            write!(f, "(")?;
            write_separated(f, parameters, ", ")?;
            write!(f, ")")?;
        }
        write!(f, " ")?;
        write_block(f, &self.body)
    }
}

impl fmt::Display for NodeDefinitionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node ")?;
        let mut first = true;
        for name in &self.names {
            if first {
                first = false;
            } else {
                write!(f, ", ")?;
            }
            match name.kind {
                HostnameKind::Named => write!(f, "'{}'", name.value)?,
                HostnameKind::Regex => write!(f, "/{}/", name.value)?,
                HostnameKind::Default => write!(f, "default")?,
            }
        }
        write!(f, " ")?;
        write_block(f, &self.body)
    }
}

impl fmt::Display for CollectionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = match self.kind {
            CollectionKind::All => ("<|", "|>"),
            CollectionKind::Exported => ("<<|", "|>>"),
        };
        write!(f, "{} {}", self.type_.name, open)?;
        if let Some(first) = &self.first {
            write!(f, " {}", first)?;
            for binary in &self.remainder {
                let join = match binary.op {
                    QueryJoin::And => "and",
                    QueryJoin::Or => "or",
                };
                write!(f, " {} {}", join, binary.operand)?;
            }
        }
        write!(f, " {}", close)
    }
}

impl fmt::Display for AttributeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            QueryOperator::Equals => "==",
            QueryOperator::NotEquals => "!=",
        };
        write!(f, "{} {} {}", self.attribute.value, op, self.value)
    }
}
