//! The tree-walking expression evaluator.
//!
//! Binary operators arrive flat from the parser; [`Evaluator::climb`]
//! applies precedence at evaluation time, short-circuiting `and`/`or`
//! during the climb. Class and defined type declaration live here because
//! they evaluate bodies against the shared evaluation context.

mod access;
mod basic;
mod catalog;
mod control_flow;
mod postfix;

use crate::catalog::{Attributes, ResourceIndex, ResourceStatus};
use crate::compilation::CompilationContext;
use crate::context::Context;
use crate::error::EvaluationError;
use crate::executor;
use crate::logging::{Level, Logger};
use crate::operators;
use crate::scope::{Scope, ScopeRef};
use crate::values::{self, Value};
use cairn_core::ast::{
    BinaryOperator, Expression, PostfixSubexpression, PrimaryExpression, UnaryOperator,
};
use cairn_core::Position;
use std::rc::Rc;

pub struct Evaluator<'a> {
    pub context: &'a mut Context,
    compilation: Rc<CompilationContext>,
    logger: Rc<dyn Logger>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        compilation: Rc<CompilationContext>,
        context: &'a mut Context,
        logger: Rc<dyn Logger>,
    ) -> Self {
        Evaluator {
            context,
            compilation,
            logger,
        }
    }

    /// A new evaluator against the same evaluation context but a different
    /// manifest (used when evaluating class, defined type, and node bodies).
    pub fn nested(&mut self, compilation: Rc<CompilationContext>) -> Evaluator<'_> {
        Evaluator {
            context: &mut *self.context,
            compilation,
            logger: Rc::clone(&self.logger),
        }
    }

    pub fn compilation(&self) -> Rc<CompilationContext> {
        Rc::clone(&self.compilation)
    }

    pub fn logger(&self) -> Rc<dyn Logger> {
        Rc::clone(&self.logger)
    }

    pub fn path(&self) -> Rc<String> {
        self.compilation.path()
    }

    pub fn error(&self, position: Position, message: impl Into<String>) -> EvaluationError {
        self.compilation.error(position, message)
    }

    pub fn warn(&self, position: Position, message: &str) {
        self.compilation
            .log(self.logger.as_ref(), Level::Warning, position, message);
    }

    pub fn log(&self, level: Level, position: Position, message: &str) {
        self.compilation
            .log(self.logger.as_ref(), level, position, message);
    }

    // -- Scope helpers ------------------------------------------

    pub fn with_scope<R>(&mut self, scope: ScopeRef, f: impl FnOnce(&mut Self) -> R) -> R {
        self.context.push_scope(scope);
        let result = f(self);
        self.context.pop_scope();
        result
    }

    pub fn with_match_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.context.push_match_scope();
        let result = f(self);
        self.context.pop_match_scope();
        result
    }

    // -- Evaluation ---------------------------------------------

    /// Evaluate the whole syntax tree. Top-level expressions must be
    /// productive.
    pub fn evaluate(&mut self) -> Result<(), EvaluationError> {
        let tree = self.compilation.tree();
        for expression in &tree.body {
            self.evaluate_expression(expression, true)?;
        }
        Ok(())
    }

    pub fn evaluate_expression(
        &mut self,
        expression: &Expression,
        productive: bool,
    ) -> Result<Value, EvaluationError> {
        if productive && !Self::is_productive(expression) {
            return Err(self.error(
                expression.position(),
                "unproductive expressions may only appear last in a block.",
            ));
        }

        let mut result = self.evaluate_primary(&expression.primary)?;

        // Climb the remainder of the expression by precedence
        let mut index = 0;
        self.climb(
            &mut result,
            expression.position(),
            0,
            &expression.binary,
            &mut index,
        )?;

        Ok(result)
    }

    pub fn evaluate_primary(
        &mut self,
        expression: &PrimaryExpression,
    ) -> Result<Value, EvaluationError> {
        match expression {
            PrimaryExpression::Basic(basic) => self.evaluate_basic(basic),
            PrimaryExpression::ControlFlow(flow) => self.evaluate_control_flow(flow),
            PrimaryExpression::Catalog(catalog) => self.evaluate_catalog(catalog),
            PrimaryExpression::Unary(unary) => {
                let operand = self.evaluate_primary(&unary.operand)?;
                self.evaluate_unary(unary.op, operand, unary.position)
            }
            PrimaryExpression::Postfix(postfix) => self.evaluate_postfix(postfix),
            PrimaryExpression::Nested(nested, _) => self.evaluate_expression(nested, false),
        }
    }

    fn evaluate_unary(
        &mut self,
        op: UnaryOperator,
        operand: Value,
        position: Position,
    ) -> Result<Value, EvaluationError> {
        match op {
            UnaryOperator::LogicalNot => Ok(Value::Boolean(!values::is_truthy(&operand))),
            UnaryOperator::Negate => match values::dereference(&operand) {
                Value::Integer(i) => i
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or_else(|| self.error(position, "negation results in an arithmetic overflow.")),
                Value::Float(x) => Ok(Value::Float(-x)),
                other => Err(self.error(
                    position,
                    format!(
                        "expected Numeric for unary negation but found {}.",
                        values::get_type(other)
                    ),
                )),
            },
            UnaryOperator::Splat => Ok(Value::Array(values::to_array(operand, true))),
        }
    }

    // -- Precedence climbing ------------------------------------

    /// Operator precedence, tightest to loosest: `* / %`, `+ -`, `<< >>`,
    /// `== != =~ !~`, `< <= > >=`, `in`, `and`, `or`, `=`, relationship
    /// arrows.
    fn precedence(op: BinaryOperator) -> u8 {
        match op {
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 10,
            BinaryOperator::Plus | BinaryOperator::Minus => 9,
            BinaryOperator::LeftShift | BinaryOperator::RightShift => 8,
            BinaryOperator::Equals
            | BinaryOperator::NotEquals
            | BinaryOperator::Match
            | BinaryOperator::NotMatch => 7,
            BinaryOperator::GreaterThan
            | BinaryOperator::GreaterEquals
            | BinaryOperator::LessThan
            | BinaryOperator::LessEquals => 6,
            BinaryOperator::In => 5,
            BinaryOperator::LogicalAnd => 4,
            BinaryOperator::LogicalOr => 3,
            BinaryOperator::Assignment => 2,
            BinaryOperator::InEdge
            | BinaryOperator::InEdgeSubscribe
            | BinaryOperator::OutEdge
            | BinaryOperator::OutEdgeSubscribe => 1,
        }
    }

    fn is_right_associative(op: BinaryOperator) -> bool {
        op == BinaryOperator::Assignment
    }

    fn climb(
        &mut self,
        left: &mut Value,
        left_position: Position,
        min_precedence: u8,
        operations: &[cairn_core::ast::BinaryExpression],
        index: &mut usize,
    ) -> Result<(), EvaluationError> {
        while *index < operations.len() {
            let operation = &operations[*index];
            let precedence = Self::precedence(operation.op);
            if precedence < min_precedence {
                break;
            }
            let op = operation.op;
            let operand = &operation.operand;
            let right_position = operand.position();
            *index += 1;

            // Short-circuit logical operators
            if (op == BinaryOperator::LogicalAnd && !values::is_truthy(left))
                || (op == BinaryOperator::LogicalOr && values::is_truthy(left))
            {
                *left = Value::Boolean(op == BinaryOperator::LogicalOr);
                *index = operations.len();
                return Ok(());
            }

            // Evaluate the right side, then let it climb anything tighter
            let mut right = self.evaluate_primary(operand)?;
            let next_precedence = precedence + if Self::is_right_associative(op) { 0 } else { 1 };
            self.climb(&mut right, right_position, next_precedence, operations, index)?;

            *left = self.evaluate_binary(
                std::mem::replace(left, Value::Undef),
                left_position,
                op,
                right,
                right_position,
            )?;
        }
        Ok(())
    }

    fn evaluate_binary(
        &mut self,
        left: Value,
        left_position: Position,
        op: BinaryOperator,
        right: Value,
        right_position: Position,
    ) -> Result<Value, EvaluationError> {
        let mut binary = operators::BinaryContext {
            evaluator: self,
            left,
            left_position,
            right,
            right_position,
        };
        match op {
            BinaryOperator::Assignment => operators::assignment::evaluate(&mut binary),
            BinaryOperator::Plus => operators::arithmetic::plus(&mut binary),
            BinaryOperator::Minus => operators::arithmetic::minus(&mut binary),
            BinaryOperator::Multiply => operators::arithmetic::multiply(&mut binary),
            BinaryOperator::Divide => operators::arithmetic::divide(&mut binary),
            BinaryOperator::Modulo => operators::arithmetic::modulo(&mut binary),
            BinaryOperator::Equals => operators::comparison::equals(&mut binary),
            BinaryOperator::NotEquals => operators::comparison::not_equals(&mut binary),
            BinaryOperator::LessThan => operators::comparison::less(&mut binary),
            BinaryOperator::LessEquals => operators::comparison::less_equal(&mut binary),
            BinaryOperator::GreaterThan => operators::comparison::greater(&mut binary),
            BinaryOperator::GreaterEquals => operators::comparison::greater_equal(&mut binary),
            BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr => {
                // Short-circuiting failed above, so the result is the
                // truthiness of the right side
                Ok(Value::Boolean(values::is_truthy(&binary.right)))
            }
            BinaryOperator::LeftShift => operators::shift::left_shift(&mut binary),
            BinaryOperator::RightShift => operators::shift::right_shift(&mut binary),
            BinaryOperator::Match => operators::matching::match_op(&mut binary),
            BinaryOperator::NotMatch => operators::matching::not_match(&mut binary),
            BinaryOperator::In => operators::membership::evaluate(&mut binary),
            BinaryOperator::InEdge => {
                operators::relationship::evaluate(&mut binary, crate::catalog::Relationship::Before)
            }
            BinaryOperator::InEdgeSubscribe => {
                operators::relationship::evaluate(&mut binary, crate::catalog::Relationship::Notify)
            }
            BinaryOperator::OutEdge => operators::relationship::evaluate(
                &mut binary,
                crate::catalog::Relationship::Require,
            ),
            BinaryOperator::OutEdgeSubscribe => operators::relationship::evaluate(
                &mut binary,
                crate::catalog::Relationship::Subscribe,
            ),
        }
    }

    // -- Blocks and arguments -----------------------------------

    /// Evaluate a block in a child scope. The last expression is the
    /// block's value and is allowed to be unproductive.
    pub fn execute_block(&mut self, body: &[Expression]) -> Result<Value, EvaluationError> {
        let scope = Scope::child(self.context.current_scope(), None);
        self.with_scope(scope, |evaluator| {
            let mut result = Value::Undef;
            for (i, expression) in body.iter().enumerate() {
                result = evaluator.evaluate_expression(expression, i < body.len() - 1)?;
            }
            Ok(result)
        })
    }

    /// Evaluate an argument list, unfolding splat expressions into the
    /// enclosing list.
    pub fn evaluate_arguments(
        &mut self,
        arguments: &[Expression],
    ) -> Result<(Vec<Value>, Vec<Position>), EvaluationError> {
        let mut evaluated = Vec::with_capacity(arguments.len());
        let mut positions = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let value = self.evaluate_expression(argument, false)?;
            if let Some(unfolded) = self.unfold(argument, &value) {
                for element in unfolded {
                    evaluated.push(element);
                    positions.push(argument.position());
                }
                continue;
            }
            evaluated.push(value);
            positions.push(argument.position());
        }
        Ok((evaluated, positions))
    }

    /// If the expression is a splat of an array, the unfolded elements.
    pub fn unfold(&self, expression: &Expression, value: &Value) -> Option<Vec<Value>> {
        if !expression.binary.is_empty() {
            return None;
        }
        self.unfold_primary(&expression.primary, value)
    }

    fn unfold_primary(&self, expression: &PrimaryExpression, value: &Value) -> Option<Vec<Value>> {
        match expression {
            PrimaryExpression::Unary(unary) if unary.op == UnaryOperator::Splat => {
                value.as_array().cloned()
            }
            PrimaryExpression::Nested(nested, _) => self.unfold(nested, value),
            _ => None,
        }
    }

    // -- Matching -----------------------------------------------

    /// Selector and case matching: regexes match strings (binding capture
    /// groups), types match instances, everything else compares equal.
    pub fn is_match(
        &mut self,
        actual: &Value,
        _actual_position: Position,
        expected: &Value,
        expected_position: Position,
    ) -> Result<bool, EvaluationError> {
        match values::dereference(expected) {
            Value::Regex(regex) => {
                if let Some(subject) = actual.as_string() {
                    if let Some(captures) = regex.as_regex().captures(subject) {
                        let groups = captures
                            .iter()
                            .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                            .collect();
                        self.context.set_matches(groups);
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Value::Type(type_) => Ok(values::is_instance(actual, type_)),
            _ => {
                let _ = expected_position;
                Ok(values::equals(actual, expected))
            }
        }
    }

    // -- Productivity -------------------------------------------

    fn is_productive(expression: &Expression) -> bool {
        if Self::is_productive_primary(&expression.primary) {
            return true;
        }
        // Expressions with an assignment or relationship operator are
        // productive
        expression.binary.iter().any(|binary| {
            matches!(
                binary.op,
                BinaryOperator::Assignment
                    | BinaryOperator::InEdge
                    | BinaryOperator::InEdgeSubscribe
                    | BinaryOperator::OutEdge
                    | BinaryOperator::OutEdgeSubscribe
            )
        })
    }

    fn is_productive_primary(expression: &PrimaryExpression) -> bool {
        match expression {
            PrimaryExpression::Nested(nested, _) => Self::is_productive(nested),
            PrimaryExpression::Unary(unary) => Self::is_productive_primary(&unary.operand),
            PrimaryExpression::Catalog(_) => true,
            PrimaryExpression::ControlFlow(_) => true,
            PrimaryExpression::Postfix(postfix) => {
                Self::is_productive_primary(&postfix.primary)
                    || postfix
                        .subexpressions
                        .iter()
                        .any(|s| matches!(s, PostfixSubexpression::MethodCall(_)))
            }
            PrimaryExpression::Basic(_) => false,
        }
    }

    // -- Variables ----------------------------------------------

    /// Look up a variable, declaring a defined-but-undeclared class on
    /// demand for qualified names, and warning when the lookup fails
    /// because of a missing class.
    pub fn lookup_variable(
        &mut self,
        name: &str,
        position: Position,
    ) -> Result<Option<Rc<Value>>, EvaluationError> {
        let (found, warning) = self.context.lookup(name);
        if let Some(found) = found {
            return Ok(Some(found));
        }

        // Class declaration on demand: $foo::bar::x declares foo::bar when
        // it is defined but not yet declared
        if let Some(split) = name.rfind("::") {
            let global = name.starts_with("::");
            let start = if global { 2 } else { 0 };
            let namespace = &name[start..split.max(start)];
            if !namespace.is_empty()
                && self.context.catalog.find_class(namespace).is_some()
                && self
                    .context
                    .catalog
                    .find_resource("class", namespace)
                    .is_none()
            {
                self.declare_class(namespace, None, position)?;
                let (found, _) = self.context.lookup(name);
                return Ok(found);
            }
        }

        if let Some(warning) = warning {
            self.warn(position, &warning);
        }
        Ok(None)
    }

    // -- Class and defined type declaration ---------------------

    /// Declare a class: bind parameters, declare the parent, evaluate every
    /// definition body in the class scope. Redeclaration with identical
    /// attributes is a no-op; with different attributes it is an error.
    pub fn declare_class(
        &mut self,
        name: &str,
        attributes: Option<Attributes>,
        position: Position,
    ) -> Result<ResourceIndex, EvaluationError> {
        let title = name.strip_prefix("::").unwrap_or(name).to_lowercase();
        if title.is_empty() {
            return Err(self.error(position, "cannot declare a class with an unspecified title."));
        }

        if let Some(existing) = self.context.catalog.find_resource("class", &title) {
            let resource = self.context.catalog.resource(existing);
            let identical = match &attributes {
                None => true,
                Some(attributes) => attributes_equal(attributes, resource.attributes()),
            };
            if identical {
                return Ok(existing);
            }
            return Err(self.error(
                position,
                format!(
                    "class '{}' was previously declared at {}:{} with different parameters.",
                    title,
                    resource.path(),
                    resource.line()
                ),
            ));
        }

        let definitions: Vec<_> = match self.context.catalog.find_class(&title) {
            Some(definitions) => definitions
                .iter()
                .map(|d| {
                    (
                        d.context(),
                        d.expression(),
                        d.parent().map(str::to_owned),
                    )
                })
                .collect(),
            None => {
                return Err(self.error(
                    position,
                    format!(
                        "cannot declare class '{}' because it has not been defined.",
                        title
                    ),
                ))
            }
        };

        let resource = self
            .context
            .catalog
            .add_resource(
                "class",
                &title,
                self.path(),
                position.line,
                attributes.unwrap_or_default(),
                ResourceStatus::Real,
                None,
            )
            .map_err(|e| self.error(position, e.message))?;

        for (definition_context, expression, parent) in definitions {
            let result = self.evaluate_class_body(
                &title,
                resource,
                Rc::clone(&definition_context),
                &expression,
                parent.as_deref(),
            );
            if let Err(inner) = result {
                // Log the inner failure at its own position, then fail the
                // declaration site
                self.log_evaluation_error(&definition_context, &inner);
                return Err(self.error(
                    position,
                    format!("failed to evaluate class '{}'.", title),
                ));
            }
        }
        Ok(resource)
    }

    fn evaluate_class_body(
        &mut self,
        title: &str,
        resource: ResourceIndex,
        definition_context: Rc<CompilationContext>,
        expression: &cairn_core::ast::ClassDefinitionExpression,
        parent: Option<&str>,
    ) -> Result<(), EvaluationError> {
        // Resolve the parent scope, declaring the parent class on demand
        let parent_scope = match parent {
            None => self.context.node_or_top(),
            Some(parent) => {
                if self.context.catalog.find_resource("class", parent).is_none() {
                    self.declare_class(parent, None, expression.position)?;
                }
                self.context.find_scope(parent).ok_or_else(|| {
                    self.error(
                        expression.position,
                        format!("could not resolve scope for parent class '{}'.", parent),
                    )
                })?
            }
        };

        let scope = Scope::child(parent_scope, Some(resource));
        scope.borrow_mut().set_namespace(title);
        self.context.add_scope(title, Rc::clone(&scope));

        let mut nested = self.nested(definition_context);
        executor::execute_resource(
            &mut nested,
            expression.parameters.as_deref(),
            &expression.body,
            expression.position,
            resource,
            scope,
        )?;
        Ok(())
    }

    /// Declare a defined type instance: one resource and one body
    /// evaluation per title.
    pub fn declare_defined_type(
        &mut self,
        type_name: &str,
        title: &str,
        attributes: Attributes,
        position: Position,
        status: ResourceStatus,
    ) -> Result<ResourceIndex, EvaluationError> {
        let definition = match self.context.catalog.find_defined_type(type_name) {
            Some(definition) => (definition.context(), definition.expression()),
            None => {
                return Err(self.error(
                    position,
                    format!(
                        "cannot declare defined type {}[{}] because it has not been defined.",
                        crate::types::normalize_type_name(type_name),
                        title
                    ),
                ))
            }
        };

        let container = self.current_container();
        let resource = self
            .context
            .catalog
            .add_resource(
                type_name,
                title,
                self.path(),
                position.line,
                attributes,
                status,
                container,
            )
            .map_err(|e| self.error(position, e.message))?;

        if status == ResourceStatus::Real {
            self.evaluate_defined_instance(resource, definition.0, definition.1, position)?;
        } else {
            // Virtual and exported instances evaluate their bodies when
            // collected
            self.context.defer_defined_instance(resource);
        }
        Ok(resource)
    }

    /// Evaluate the body of a defined type instance.
    pub fn evaluate_defined_instance(
        &mut self,
        resource: ResourceIndex,
        definition_context: Rc<CompilationContext>,
        expression: Rc<cairn_core::ast::DefinedTypeExpression>,
        position: Position,
    ) -> Result<(), EvaluationError> {
        let scope = Scope::child(self.context.node_or_top(), Some(resource));
        let mut nested = self.nested(Rc::clone(&definition_context));
        let result = executor::execute_resource(
            &mut nested,
            expression.parameters.as_deref(),
            &expression.body,
            expression.position,
            resource,
            scope,
        );
        if let Err(inner) = result {
            self.log_evaluation_error(&definition_context, &inner);
            let reference = self.context.catalog.resource(resource).reference();
            return Err(self.error(
                position,
                format!("failed to evaluate defined type '{}'.", reference),
            ));
        }
        Ok(())
    }

    /// The resource of the nearest enclosing scope, used as the container
    /// of newly declared resources.
    pub fn current_container(&self) -> Option<ResourceIndex> {
        crate::scope::resource_chain(&self.context.current_scope())
            .first()
            .copied()
    }

    fn log_evaluation_error(&self, context: &Rc<CompilationContext>, error: &EvaluationError) {
        match (error.path.as_deref(), error.position) {
            (Some(path), Some(position)) if path == context.path().as_str() => {
                context.log(self.logger.as_ref(), Level::Error, position, &error.message);
            }
            _ => {
                self.logger.log_message(Level::Error, &error.message);
            }
        }
    }
}

/// Attribute-set equality, used for idempotent class redeclaration.
fn attributes_equal(left: &Attributes, right: &Attributes) -> bool {
    let mut left_entries: Vec<(String, Rc<Value>)> = Vec::new();
    left.each(&mut |name, value| {
        left_entries.push((name.to_string(), Rc::clone(value)));
        true
    });
    let mut right_entries: Vec<(String, Rc<Value>)> = Vec::new();
    right.each(&mut |name, value| {
        right_entries.push((name.to_string(), Rc::clone(value)));
        true
    });
    if left_entries.len() != right_entries.len() {
        return false;
    }
    left_entries.iter().all(|(name, value)| {
        right_entries
            .iter()
            .any(|(other_name, other_value)| name == other_name && values::equals(value, other_value))
    })
}

pub(crate) fn resource_status(status: cairn_core::ast::ResourceStatus) -> ResourceStatus {
    match status {
        cairn_core::ast::ResourceStatus::Realized => ResourceStatus::Real,
        cairn_core::ast::ResourceStatus::Virtualized => ResourceStatus::Virtual,
        cairn_core::ast::ResourceStatus::Exported => ResourceStatus::Exported,
    }
}
