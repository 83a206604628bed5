//! Relationship operators: `->`, `~>`, `<-`, `<~`.
//!
//! Both operands resolve to sets of resource references that must exist in
//! the catalog. The operator appends the right-hand references to the
//! matching relationship metaparameter of each left-hand resource (with
//! duplicates removed); the edges themselves are resolved at catalog
//! finalization. The result is the right-hand reference set, so arrows
//! chain.

use super::BinaryContext;
use crate::catalog::Relationship;
use crate::error::EvaluationError;
use crate::types::Type;
use crate::values::{self, Value};

pub fn evaluate(
    context: &mut BinaryContext,
    relationship: Relationship,
) -> Result<Value, EvaluationError> {
    // Resolve the right-hand side to existing resources
    let mut targets = Vec::new();
    {
        let catalog = &context.evaluator.context.catalog;
        values::each_resource(
            &context.right,
            &mut |type_name, title| {
                if catalog.find_realized(type_name, title).is_none() {
                    return Err(context.right_error(format!(
                        "cannot create relationship: resource {}[{}] does not exist in the catalog.",
                        type_name, title
                    )));
                }
                targets.push(Value::Type(Type::Resource {
                    type_name: type_name.to_string(),
                    title: title.to_string(),
                }));
                Ok(())
            },
            &|message| context.right_error(message),
        )?;
    }

    // Append the targets to each left-hand resource's metaparameter
    let mut sources = Vec::new();
    {
        let catalog = &context.evaluator.context.catalog;
        values::each_resource(
            &context.left,
            &mut |type_name, title| match catalog.find_realized(type_name, title) {
                Some(index) => {
                    sources.push(index);
                    Ok(())
                }
                None => Err(context.left_error(format!(
                    "cannot create relationship: resource {}[{}] does not exist in the catalog.",
                    type_name, title
                ))),
            },
            &|message| context.left_error(message),
        )?;
    }

    let parameter = relationship.parameter();
    for source in sources {
        context
            .evaluator
            .context
            .catalog
            .resource_mut(source)
            .attributes_mut()
            .append(parameter, Value::Array(targets.clone()), true);
    }

    Ok(Value::Array(targets))
}
