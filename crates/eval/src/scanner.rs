//! The definition scanner.
//!
//! Classes can be declared before they are defined, so every manifest is
//! scanned for class, defined type, and node definitions before any
//! evaluation takes place. The scanner's only side effects are on the
//! catalog; it validates names and parameter lists as it registers them.

use crate::catalog::{self, Catalog, ClassDefinition, DefinedTypeDefinition};
use crate::compilation::CompilationContext;
use crate::error::EvaluationError;
use cairn_core::ast::{
    BasicExpression, CatalogExpression, ControlFlowExpression, Expression, Lambda, Parameter,
    PostfixSubexpression, PrimaryExpression,
};
use cairn_core::ast::{ClassDefinitionExpression, DefinedTypeExpression, Name};
use std::rc::Rc;

pub struct DefinitionScanner<'c> {
    catalog: &'c mut Catalog,
}

impl<'c> DefinitionScanner<'c> {
    pub fn new(catalog: &'c mut Catalog) -> Self {
        DefinitionScanner { catalog }
    }

    /// Scan a parsed manifest for definitions.
    pub fn scan(&mut self, context: &Rc<CompilationContext>) -> Result<(), EvaluationError> {
        let tree = context.tree();
        let mut visitor = ScanVisitor {
            catalog: &mut *self.catalog,
            context,
            // The top level counts as a definable (class-like) position
            scopes: vec![Some(String::new())],
        };
        for expression in &tree.body {
            visitor.visit_expression(expression)?;
        }
        Ok(())
    }
}

struct ScanVisitor<'c, 'x> {
    catalog: &'c mut Catalog,
    context: &'x Rc<CompilationContext>,
    /// Class scope stack: Some(name) inside a class body (empty string at
    /// top level), None in positions where definitions are not allowed.
    scopes: Vec<Option<String>>,
}

impl<'c, 'x> ScanVisitor<'c, 'x> {
    fn can_define(&self) -> bool {
        self.scopes.last().map(Option::is_some).unwrap_or(false)
    }

    fn qualify(&self, name: &str) -> String {
        let mut qualified = String::new();
        for scope in self.scopes.iter().flatten() {
            if scope.is_empty() {
                continue;
            }
            if !qualified.is_empty() {
                qualified.push_str("::");
            }
            qualified.push_str(scope);
        }
        if !qualified.is_empty() {
            qualified.push_str("::");
        }
        qualified.push_str(name);
        qualified
    }

    fn scoped<R>(
        &mut self,
        scope: Option<String>,
        f: impl FnOnce(&mut Self) -> Result<R, EvaluationError>,
    ) -> Result<R, EvaluationError> {
        self.scopes.push(scope);
        let result = f(self);
        self.scopes.pop();
        result
    }

    // -- Traversal ----------------------------------------------

    fn visit_expression(&mut self, expression: &Expression) -> Result<(), EvaluationError> {
        self.visit_primary(&expression.primary)?;
        for binary in &expression.binary {
            self.visit_primary(&binary.operand)?;
        }
        Ok(())
    }

    fn visit_block(&mut self, body: &[Expression]) -> Result<(), EvaluationError> {
        for expression in body {
            self.visit_expression(expression)?;
        }
        Ok(())
    }

    fn visit_primary(&mut self, expression: &PrimaryExpression) -> Result<(), EvaluationError> {
        match expression {
            PrimaryExpression::Basic(basic) => {
                self.scoped(None, |visitor| visitor.visit_basic(basic))
            }
            PrimaryExpression::ControlFlow(flow) => {
                self.scoped(None, |visitor| visitor.visit_control_flow(flow))
            }
            PrimaryExpression::Catalog(catalog) => self.visit_catalog(catalog),
            PrimaryExpression::Unary(unary) => self.visit_primary(&unary.operand),
            PrimaryExpression::Postfix(postfix) => {
                self.visit_primary(&postfix.primary)?;
                for subexpression in &postfix.subexpressions {
                    match subexpression {
                        PostfixSubexpression::Selector(selector) => {
                            for case in &selector.cases {
                                self.visit_expression(&case.selector)?;
                                self.visit_expression(&case.result)?;
                            }
                        }
                        PostfixSubexpression::Access(access) => {
                            for argument in &access.arguments {
                                self.visit_expression(argument)?;
                            }
                        }
                        PostfixSubexpression::MethodCall(call) => {
                            for argument in &call.arguments {
                                self.visit_expression(argument)?;
                            }
                            if let Some(lambda) = &call.lambda {
                                self.visit_lambda(lambda)?;
                            }
                        }
                    }
                }
                Ok(())
            }
            PrimaryExpression::Nested(nested, _) => self.visit_expression(nested),
        }
    }

    fn visit_basic(&mut self, expression: &BasicExpression) -> Result<(), EvaluationError> {
        match expression {
            BasicExpression::Array(array) => {
                for element in &array.elements {
                    self.visit_expression(element)?;
                }
                Ok(())
            }
            BasicExpression::Hash(hash) => {
                for (key, value) in &hash.elements {
                    self.visit_expression(key)?;
                    self.visit_expression(value)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn visit_control_flow(
        &mut self,
        expression: &ControlFlowExpression,
    ) -> Result<(), EvaluationError> {
        match expression {
            ControlFlowExpression::Case(case) => {
                self.visit_expression(&case.expression)?;
                for proposition in &case.propositions {
                    for option in &proposition.options {
                        self.visit_expression(option)?;
                    }
                    self.visit_block(&proposition.body)?;
                }
                Ok(())
            }
            ControlFlowExpression::If(if_) => {
                self.visit_expression(&if_.conditional)?;
                self.visit_block(&if_.body)?;
                for elsif in &if_.elsifs {
                    self.visit_expression(&elsif.conditional)?;
                    self.visit_block(&elsif.body)?;
                }
                if let Some(else_) = &if_.else_ {
                    self.visit_block(&else_.body)?;
                }
                Ok(())
            }
            ControlFlowExpression::Unless(unless) => {
                self.visit_expression(&unless.conditional)?;
                self.visit_block(&unless.body)?;
                if let Some(else_) = &unless.else_ {
                    self.visit_block(&else_.body)?;
                }
                Ok(())
            }
            ControlFlowExpression::FunctionCall(call) => {
                for argument in &call.arguments {
                    self.visit_expression(argument)?;
                }
                if let Some(lambda) = &call.lambda {
                    self.visit_lambda(lambda)?;
                }
                Ok(())
            }
        }
    }

    fn visit_lambda(&mut self, lambda: &Lambda) -> Result<(), EvaluationError> {
        if let Some(parameters) = &lambda.parameters {
            for parameter in parameters {
                if let Some(type_) = &parameter.type_ {
                    self.visit_primary(type_)?;
                }
                if let Some(default) = &parameter.default {
                    self.visit_expression(default)?;
                }
            }
        }
        self.visit_block(&lambda.body)
    }

    fn visit_catalog(&mut self, expression: &CatalogExpression) -> Result<(), EvaluationError> {
        match expression {
            CatalogExpression::Resource(resource) => self.scoped(None, |visitor| {
                for body in &resource.bodies {
                    visitor.visit_expression(&body.title)?;
                    for attribute in &body.attributes {
                        visitor.visit_expression(&attribute.value)?;
                    }
                }
                Ok(())
            }),
            CatalogExpression::ResourceDefaults(defaults) => self.scoped(None, |visitor| {
                for attribute in &defaults.attributes {
                    visitor.visit_expression(&attribute.value)?;
                }
                Ok(())
            }),
            CatalogExpression::ResourceOverride(override_) => self.scoped(None, |visitor| {
                for attribute in &override_.attributes {
                    visitor.visit_expression(&attribute.value)?;
                }
                Ok(())
            }),
            CatalogExpression::ClassDefinition(class) => self.scan_class(class),
            CatalogExpression::DefinedType(defined) => self.scan_defined_type(defined),
            CatalogExpression::Node(node) => {
                if !self.can_define() {
                    return Err(self.context.error(
                        node.position,
                        "node definitions can only be defined at top-level or inside a class.",
                    ));
                }
                self.catalog
                    .define_node(Rc::clone(self.context), Rc::new(node.clone()))?;
                self.scoped(None, |visitor| visitor.visit_block(&node.body))
            }
            CatalogExpression::Collection(collection) => self.scoped(None, |visitor| {
                if let Some(first) = &collection.first {
                    visitor.visit_expression(&first.value)?;
                }
                for binary in &collection.remainder {
                    visitor.visit_expression(&binary.operand.value)?;
                }
                Ok(())
            }),
        }
    }

    // -- Definitions --------------------------------------------

    fn scan_class(
        &mut self,
        expression: &ClassDefinitionExpression,
    ) -> Result<(), EvaluationError> {
        let qualified = self.validate_name(true, &expression.name)?;

        // A new definition's parent must agree with existing definitions
        if let Some(parent) = &expression.parent {
            if let Some(definitions) = self.catalog.find_class(&qualified) {
                let parent_name = parent
                    .value
                    .strip_prefix("::")
                    .unwrap_or(&parent.value)
                    .to_lowercase();
                for definition in definitions {
                    let Some(existing) = definition.parent() else {
                        continue;
                    };
                    if existing == parent_name {
                        continue;
                    }
                    return Err(self.context.error(
                        parent.position,
                        format!(
                            "class '{}' cannot inherit from '{}' because the class already inherits from '{}' at {}:{}.",
                            qualified,
                            parent.value,
                            existing,
                            definition.path(),
                            definition.line()
                        ),
                    ));
                }
            }
        }

        if let Some(parameters) = &expression.parameters {
            self.validate_parameters(true, parameters)?;
        }

        self.catalog.define_class(ClassDefinition::new(
            qualified,
            Rc::clone(self.context),
            Rc::new(expression.clone()),
        ));

        // Parameters scan outside the class scope; the body scans inside it
        if let Some(parameters) = &expression.parameters {
            self.scoped(None, |visitor| {
                for parameter in parameters {
                    if let Some(type_) = &parameter.type_ {
                        visitor.visit_primary(type_)?;
                    }
                    if let Some(default) = &parameter.default {
                        visitor.visit_expression(default)?;
                    }
                }
                Ok(())
            })?;
        }

        let class_scope = expression.name.value.clone();
        self.scoped(Some(class_scope), |visitor| {
            visitor.visit_block(&expression.body)
        })
    }

    fn scan_defined_type(
        &mut self,
        expression: &DefinedTypeExpression,
    ) -> Result<(), EvaluationError> {
        if let Some(parameters) = &expression.parameters {
            self.validate_parameters(false, parameters)?;
        }

        let qualified = self.validate_name(false, &expression.name)?;
        self.catalog.define_type(
            DefinedTypeDefinition::new(
                qualified,
                Rc::clone(self.context),
                Rc::new(expression.clone()),
            ),
            expression.name.position,
            self.context,
        )?;

        self.scoped(None, |visitor| {
            if let Some(parameters) = &expression.parameters {
                for parameter in parameters {
                    if let Some(type_) = &parameter.type_ {
                        visitor.visit_primary(type_)?;
                    }
                    if let Some(default) = &parameter.default {
                        visitor.visit_expression(default)?;
                    }
                }
            }
            visitor.visit_block(&expression.body)
        })
    }

    fn validate_name(&self, is_class: bool, name: &Name) -> Result<String, EvaluationError> {
        let kind = if is_class { "class" } else { "defined type" };

        if !self.can_define() {
            return Err(self.context.error(
                name.position,
                format!(
                    "{} can only be defined at top-level or inside a class.",
                    if is_class { "classes" } else { "defined types" }
                ),
            ));
        }
        if name.value.is_empty() {
            return Err(self
                .context
                .error(name.position, format!("a {} cannot have an empty name.", kind)));
        }
        if name.value.starts_with("::") {
            return Err(self.context.error(
                name.position,
                format!("'{}' is not a valid {} name.", name.value, kind),
            ));
        }

        let qualified = self.qualify(&name.value).to_lowercase();

        // main and settings are built-in classes
        if qualified == "main" || qualified == "settings" {
            return Err(self.context.error(
                name.position,
                format!(
                    "'{}' is the name of a built-in class and cannot be used.",
                    qualified
                ),
            ));
        }

        // Classes and defined types share a namespace
        if is_class {
            if let Some(existing) = self.catalog.find_defined_type(&qualified) {
                return Err(self.context.error(
                    name.position,
                    format!(
                        "'{}' was previously defined as a defined type at {}:{}.",
                        qualified,
                        existing.path(),
                        existing.line()
                    ),
                ));
            }
        } else if let Some(definitions) = self.catalog.find_class(&qualified) {
            let first = &definitions[0];
            return Err(self.context.error(
                name.position,
                format!(
                    "'{}' was previously defined as a class at {}:{}.",
                    qualified,
                    first.path(),
                    first.line()
                ),
            ));
        }
        Ok(qualified)
    }

    fn validate_parameters(
        &self,
        is_class: bool,
        parameters: &[Parameter],
    ) -> Result<(), EvaluationError> {
        for parameter in parameters {
            let name = &parameter.variable.name;

            // $title and $name are bound implicitly
            if name == "title" || name == "name" {
                return Err(self.context.error(
                    parameter.variable.position,
                    format!("parameter ${} is reserved and cannot be used.", name),
                ));
            }
            if parameter.captures {
                return Err(self.context.error(
                    parameter.variable.position,
                    format!(
                        "{} parameter ${} cannot \"captures rest\".",
                        if is_class { "class" } else { "defined type" },
                        name
                    ),
                ));
            }
            if catalog::is_metaparameter(name) {
                return Err(self.context.error(
                    parameter.variable.position,
                    format!(
                        "parameter ${} is reserved for resource metaparameter '{}'.",
                        name, name
                    ),
                ));
            }
        }
        Ok(())
    }
}
