//! Evaluation of catalog expressions: resource declarations (real,
//! virtual, and exported), per-scope resource defaults, resource
//! overrides, and collections.

use super::{resource_status, Evaluator};
use crate::catalog::{Attributes, ResourceIndex, ResourceStatus};
use crate::error::EvaluationError;
use crate::scope;
use crate::types::Type;
use crate::values::{self, Value};
use cairn_core::ast::{
    AttributeExpression, AttributeOperator, CatalogExpression, CollectionExpression,
    CollectionKind, Expression, PrimaryExpression, QueryJoin, QueryOperator,
    ResourceDefaultsExpression, ResourceExpression, ResourceOverrideExpression,
};
use std::rc::Rc;

impl<'a> Evaluator<'a> {
    pub(super) fn evaluate_catalog(
        &mut self,
        expression: &CatalogExpression,
    ) -> Result<Value, EvaluationError> {
        match expression {
            CatalogExpression::Resource(resource) => self.evaluate_resource(resource),
            CatalogExpression::ResourceDefaults(defaults) => {
                self.evaluate_resource_defaults(defaults)
            }
            CatalogExpression::ResourceOverride(override_) => {
                self.evaluate_resource_override(override_)
            }
            CatalogExpression::ClassDefinition(class) => {
                // Handled by the definition scanner; evaluate to a class
                // reference
                let qualified = self
                    .context
                    .current_scope()
                    .borrow()
                    .qualify(&class.name.value);
                Ok(Value::Type(Type::class(&qualified)))
            }
            CatalogExpression::DefinedType(defined) => {
                // Handled by the definition scanner; evaluate to a type
                // reference
                let qualified = self
                    .context
                    .current_scope()
                    .borrow()
                    .qualify(&defined.name.value);
                Ok(Value::Type(Type::resource(&qualified, "")))
            }
            CatalogExpression::Node(_) => {
                // Handled by the definition scanner
                Ok(Value::Undef)
            }
            CatalogExpression::Collection(collection) => self.evaluate_collection(collection),
        }
    }

    // -- Resource declaration -----------------------------------

    fn evaluate_resource(
        &mut self,
        expression: &ResourceExpression,
    ) -> Result<Value, EvaluationError> {
        let type_name = expression.type_.value.clone();
        let is_class = type_name == "class";
        let status = resource_status(expression.status);

        if is_class && status != ResourceStatus::Real {
            return Err(self.error(
                expression.position,
                "classes cannot be virtual or exported.",
            ));
        }

        let is_defined_type =
            !is_class && self.context.catalog.find_defined_type(&type_name).is_some();

        // Layer the attribute parents: body attributes shadow the default
        // body, which shadows scope-level defaults for this type
        let scope_defaults = scope::collect_defaults(&self.context.current_scope(), &type_name);
        let mut parent: Option<Rc<Attributes>> = None;
        if !scope_defaults.is_empty() {
            let mut bottom = Attributes::new();
            for (name, value) in scope_defaults {
                bottom.set(name, (*value).clone());
            }
            parent = Some(Rc::new(bottom));
        }
        let default_body = self.find_default_body(expression)?;
        if let Some(body) = default_body {
            parent = Some(Rc::new(self.evaluate_attributes(&body.attributes, parent)?));
        }
        let scope_parent = parent;

        let container = self.current_container();
        let mut references = Vec::new();
        for body in &expression.bodies {
            let title = self.evaluate_expression(&body.title, false)?;

            // The default body was already evaluated
            if values::is_default(&title) {
                continue;
            }

            let attributes = self.evaluate_attributes(&body.attributes, scope_parent.clone())?;

            let mut titles = Vec::new();
            match values::dereference(&title) {
                Value::String(s) => titles.push(s.clone()),
                Value::Array(elements) => {
                    for element in elements {
                        match values::dereference(element) {
                            Value::String(s) => titles.push(s.clone()),
                            other => {
                                return Err(self.error(
                                    body.position,
                                    format!(
                                        "expected String or Array[String] for resource title but found {}.",
                                        values::get_type(other)
                                    ),
                                ))
                            }
                        }
                    }
                }
                other => {
                    return Err(self.error(
                        body.position,
                        format!(
                            "expected String or Array[String] for resource title but found {}.",
                            values::get_type(other)
                        ),
                    ))
                }
            }

            for resource_title in titles {
                if resource_title.is_empty() {
                    return Err(self.error(body.position, "resource title cannot be empty."));
                }

                if is_class {
                    self.declare_class(&resource_title, Some(attributes.clone()), body.position)?;
                    references.push(Value::Type(Type::class(&resource_title)));
                } else if is_defined_type {
                    self.declare_defined_type(
                        &type_name,
                        &resource_title,
                        attributes.clone(),
                        body.position,
                        status,
                    )?;
                    references.push(Value::Type(Type::resource(&type_name, &resource_title)));
                } else {
                    self.context
                        .catalog
                        .add_resource(
                            &type_name,
                            &resource_title,
                            self.path(),
                            body.position.line,
                            attributes.clone(),
                            status,
                            container,
                        )
                        .map_err(|e| self.error(body.position, e.message))?;
                    references.push(Value::Type(Type::resource(&type_name, &resource_title)));
                }
            }
        }
        Ok(Value::Array(references))
    }

    /// Find the body titled `default` in a resource expression; at most one
    /// is allowed.
    fn find_default_body<'e>(
        &mut self,
        expression: &'e ResourceExpression,
    ) -> Result<Option<&'e cairn_core::ast::ResourceBody>, EvaluationError> {
        let mut default_body = None;
        for body in &expression.bodies {
            if !is_default_title(&body.title) {
                continue;
            }
            if default_body.is_some() {
                return Err(self.error(
                    body.position,
                    "only one default body is supported in a resource expression.",
                ));
            }
            default_body = Some(body);
        }
        Ok(default_body)
    }

    /// Evaluate a resource body's attributes into a collection. Only `=>`
    /// is allowed; duplicate names within one body are errors.
    fn evaluate_attributes(
        &mut self,
        attributes: &[AttributeExpression],
        parent: Option<Rc<Attributes>>,
    ) -> Result<Attributes, EvaluationError> {
        let mut result = Attributes::with_parent(parent);
        for attribute in attributes {
            if attribute.op != AttributeOperator::Assignment {
                return Err(self.error(
                    attribute.position,
                    format!(
                        "illegal attribute operation '{}': only '=>' is supported in a resource expression.",
                        attribute.op
                    ),
                ));
            }
            if result.has_local(&attribute.name.value) {
                return Err(self.error(
                    attribute.position,
                    format!(
                        "attribute '{}' already exists in this resource body.",
                        attribute.name.value
                    ),
                ));
            }
            let value = self.evaluate_attribute(attribute)?;
            result.set(attribute.name.value.clone(), value);
        }
        Ok(result)
    }

    /// Evaluate an attribute value, validating and converting
    /// metaparameters.
    fn evaluate_attribute(
        &mut self,
        attribute: &AttributeExpression,
    ) -> Result<Value, EvaluationError> {
        let value = self.evaluate_expression(&attribute.value, false)?;
        let value = values::mutate(value);
        let name = attribute.name.value.as_str();

        let string_array = Type::array_of(Type::string());
        let relationship = Type::array_of(Type::Variant {
            types: vec![Type::string(), Type::CatalogEntry],
        });

        let (expected, value, converted) = match name {
            "alias" | "tag" => {
                let converted = value.as_array().is_none();
                (
                    Some(string_array),
                    Value::Array(values::to_array(value, false)),
                    converted,
                )
            }
            "before" | "notify" | "require" | "subscribe" | "after" => {
                let converted = value.as_array().is_none();
                (
                    Some(relationship),
                    Value::Array(values::to_array(value, false)),
                    converted,
                )
            }
            "audit" => (
                Some(Type::Variant {
                    types: vec![Type::string(), string_array],
                }),
                value,
                false,
            ),
            "loglevel" => (
                Some(Type::Enum {
                    values: [
                        "debug", "info", "notice", "warning", "err", "alert", "emerg", "crit",
                        "verbose",
                    ]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                }),
                value,
                false,
            ),
            "noop" => (Some(Type::Boolean), value, false),
            "schedule" | "stage" => (Some(Type::string()), value, false),
            _ => (None, value, false),
        };

        let Some(expected) = expected else {
            return Ok(value);
        };

        if !values::is_instance(&value, &expected) {
            let found = if converted {
                value
                    .as_array()
                    .and_then(|a| a.first())
                    .map(values::get_type)
                    .unwrap_or_else(|| values::get_type(&value))
            } else {
                values::get_type(&value)
            };
            return Err(self.error(
                attribute.value.position(),
                format!(
                    "expected {} for attribute '{}' but found {}.",
                    expected, name, found
                ),
            ));
        }
        Ok(value)
    }

    // -- Resource defaults --------------------------------------

    fn evaluate_resource_defaults(
        &mut self,
        expression: &ResourceDefaultsExpression,
    ) -> Result<Value, EvaluationError> {
        let type_name = &expression.type_.name;
        for attribute in &expression.attributes {
            if attribute.op != AttributeOperator::Assignment {
                return Err(self.error(
                    attribute.position,
                    format!(
                        "illegal attribute operation '{}': only '=>' is supported in a resource defaults expression.",
                        attribute.op
                    ),
                ));
            }
            let value = self.evaluate_attribute(attribute)?;
            self.context.current_scope().borrow_mut().set_default(
                type_name,
                attribute.name.value.clone(),
                Rc::new(value),
            );
        }
        Ok(Value::Type(Type::resource(type_name, "")))
    }

    // -- Resource override --------------------------------------

    fn evaluate_resource_override(
        &mut self,
        expression: &ResourceOverrideExpression,
    ) -> Result<Value, EvaluationError> {
        let reference = self.evaluate_postfix(&expression.reference)?;
        let position = expression.reference.primary.position();

        // Resolve the reference into catalog resources
        let mut resources: Vec<ResourceIndex> = Vec::new();
        let mut collect = |evaluator: &mut Self,
                           type_: &Type|
         -> Result<(), EvaluationError> {
            match type_ {
                Type::Resource { type_name, title } if !type_name.is_empty() && !title.is_empty() => {
                    if type_name == "Class" {
                        return Err(evaluator
                            .error(position, "cannot override attributes of a class resource."));
                    }
                    match evaluator.context.catalog.find_resource(type_name, title) {
                        Some(index) => {
                            resources.push(index);
                            Ok(())
                        }
                        None => Err(evaluator.error(
                            position,
                            format!(
                                "resource {}[{}] does not exist in the catalog.",
                                type_name, title
                            ),
                        )),
                    }
                }
                Type::Class { .. } => {
                    Err(evaluator.error(position, "cannot override attributes of a class resource."))
                }
                other => Err(evaluator.error(
                    position,
                    format!("expected qualified Resource but found {}.", other),
                )),
            }
        };

        match values::dereference(&reference) {
            Value::Type(type_) => {
                let type_ = type_.clone();
                collect(self, &type_)?;
            }
            Value::Array(elements) => {
                let elements = elements.clone();
                for element in &elements {
                    match values::dereference(element) {
                        Value::Type(type_) => {
                            let type_ = type_.clone();
                            collect(self, &type_)?;
                        }
                        other => {
                            return Err(self.error(
                                position,
                                format!(
                                    "expected Resource or Array[Resource] for resource reference but found {}.",
                                    values::get_type(other)
                                ),
                            ))
                        }
                    }
                }
            }
            other => {
                return Err(self.error(
                    position,
                    format!(
                        "expected Resource or Array[Resource] for resource reference but found {}.",
                        values::get_type(other)
                    ),
                ))
            }
        }

        // Overriding an already-set attribute is allowed only from a scope
        // enclosing the resource's container
        let chain = scope::resource_chain(&self.context.current_scope());
        for attribute in &expression.attributes {
            let value = self.evaluate_attribute(attribute)?;
            let name = &attribute.name.value;

            for &index in &resources {
                let (allowed, already_set, reference_text) = {
                    let resource = self.context.catalog.resource(index);
                    let allowed = match resource.container() {
                        Some(container) => chain.contains(&container),
                        None => chain.is_empty(),
                    };
                    (
                        allowed,
                        resource.attributes().get(name, true).is_some(),
                        resource.reference(),
                    )
                };

                match attribute.op {
                    AttributeOperator::Assignment => {
                        if !allowed && already_set {
                            if values::is_undef(&value) {
                                return Err(self.error(
                                    attribute.name.position,
                                    format!(
                                        "cannot remove attribute '{}' from resource {}.",
                                        name, reference_text
                                    ),
                                ));
                            }
                            return Err(self.error(
                                attribute.name.position,
                                format!(
                                    "attribute '{}' has already been set for resource {}.",
                                    name, reference_text
                                ),
                            ));
                        }
                        self.context
                            .catalog
                            .resource_mut(index)
                            .attributes_mut()
                            .set(name.clone(), value.clone());
                    }
                    AttributeOperator::Append => {
                        if !allowed && already_set {
                            return Err(self.error(
                                attribute.name.position,
                                format!(
                                    "attribute '{}' has already been set for resource {} and cannot be appended to.",
                                    name, reference_text
                                ),
                            ));
                        }
                        let appended = self
                            .context
                            .catalog
                            .resource_mut(index)
                            .attributes_mut()
                            .append(name, value.clone(), false);
                        if !appended {
                            return Err(self.error(
                                attribute.name.position,
                                format!("attribute '{}' is not an array.", name),
                            ));
                        }
                    }
                }
            }
        }

        Ok(reference)
    }

    // -- Collections --------------------------------------------

    /// Realize virtual (`<| |>`) or exported (`<<| |>>`) resources of a
    /// type that match the query.
    fn evaluate_collection(
        &mut self,
        expression: &CollectionExpression,
    ) -> Result<Value, EvaluationError> {
        let type_name = expression.type_.name.to_lowercase();
        let wanted = match expression.kind {
            CollectionKind::All => ResourceStatus::Virtual,
            CollectionKind::Exported => ResourceStatus::Exported,
        };

        let candidates: Vec<ResourceIndex> = self
            .context
            .catalog
            .all_resources()
            .filter(|&index| {
                let resource = self.context.catalog.resource(index);
                resource.status() == wanted
                    && resource.type_name().to_lowercase() == type_name
            })
            .collect();

        let mut realized = Vec::new();
        for index in candidates {
            if self.matches_query(index, expression)? {
                self.context.catalog.realize(index);
                realized.push(index);
            }
        }

        // Deferred defined type instances evaluate their bodies on
        // realization
        for index in &realized {
            if !self.context.claim_deferred_instance(*index) {
                continue;
            }
            let type_name = self.context.catalog.resource(*index).type_name().to_string();
            let definition = self
                .context
                .catalog
                .find_defined_type(&type_name)
                .map(|d| (d.context(), d.expression()));
            if let Some((definition_context, defined_expression)) = definition {
                self.evaluate_defined_instance(
                    *index,
                    definition_context,
                    defined_expression,
                    expression.position,
                )?;
            }
        }

        Ok(Value::Undef)
    }

    fn matches_query(
        &mut self,
        index: ResourceIndex,
        expression: &CollectionExpression,
    ) -> Result<bool, EvaluationError> {
        let Some(first) = &expression.first else {
            return Ok(true);
        };

        let mut result = self.matches_attribute_query(index, first)?;
        for binary in &expression.remainder {
            let operand = self.matches_attribute_query(index, &binary.operand)?;
            result = match binary.op {
                QueryJoin::And => result && operand,
                QueryJoin::Or => result || operand,
            };
        }
        Ok(result)
    }

    fn matches_attribute_query(
        &mut self,
        index: ResourceIndex,
        query: &cairn_core::ast::AttributeQuery,
    ) -> Result<bool, EvaluationError> {
        let expected = self.evaluate_expression(&query.value, false)?;
        let resource = self.context.catalog.resource(index);

        let actual = match query.attribute.value.as_str() {
            "title" => Some(Rc::new(Value::String(resource.title().to_string()))),
            name => resource.attributes().get(name, true),
        };

        let equal = match actual {
            Some(actual) => values::equals(&actual, &expected),
            None => values::is_undef(&expected),
        };
        Ok(match query.op {
            QueryOperator::Equals => equal,
            QueryOperator::NotEquals => !equal,
        })
    }
}

/// Whether a resource body's title is the literal `default`.
fn is_default_title(title: &Expression) -> bool {
    if !title.binary.is_empty() {
        return false;
    }
    match &title.primary {
        PrimaryExpression::Basic(cairn_core::ast::BasicExpression::Default(_)) => true,
        PrimaryExpression::Nested(nested, _) => is_default_title(nested),
        _ => false,
    }
}

