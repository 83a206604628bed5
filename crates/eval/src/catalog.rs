//! The resource catalog.
//!
//! The catalog owns every resource in an arena, keyed by `(type, title)`
//! with declaration order preserved, along with the registries of class,
//! defined type, and node definitions and the relationship edges resolved
//! at finalization. Scopes and resources refer to catalog entries by index
//! rather than by reference.

use crate::compilation::CompilationContext;
use crate::error::EvaluationError;
use crate::values::{self, Regex, Value};
use cairn_core::ast;
use cairn_core::Position;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

pub type ResourceIndex = usize;

/// Metaparameters recognized for every resource type.
static METAPARAMETERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "alias", "audit", "before", "after", "subscribe", "notify", "require", "tag", "ensure",
        "noop", "schedule", "stage", "loglevel",
    ]
    .into_iter()
    .collect()
});

pub fn is_metaparameter(name: &str) -> bool {
    METAPARAMETERS.contains(name)
}

// ──────────────────────────────────────────────
// Attributes
// ──────────────────────────────────────────────

/// An ordered attribute collection with an optional frozen parent (the
/// default body of a resource expression). An attribute set to `undef`
/// reads as unset.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    parent: Option<Rc<Attributes>>,
    values: IndexMap<String, Rc<Value>>,
}

impl Attributes {
    pub fn new() -> Self {
        Attributes::default()
    }

    pub fn with_parent(parent: Option<Rc<Attributes>>) -> Self {
        Attributes {
            parent,
            values: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str, check_parent: bool) -> Option<Rc<Value>> {
        if let Some(value) = self.values.get(name) {
            if values::is_undef(value) {
                return None;
            }
            return Some(Rc::clone(value));
        }
        if check_parent {
            if let Some(parent) = &self.parent {
                return parent.get(name, true);
            }
        }
        None
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), Rc::new(value));
    }

    /// Append a value to an array-valued attribute. Returns false if the
    /// existing attribute is not an array.
    pub fn append(&mut self, name: &str, value: Value, skip_duplicates: bool) -> bool {
        let new_elements = values::to_array(value, false);

        let existing = self.get(name, true);
        let mut combined = match existing {
            None => Vec::new(),
            Some(existing) => match values::dereference(&existing) {
                Value::Array(elements) => elements.clone(),
                _ => return false,
            },
        };

        for element in new_elements {
            if skip_duplicates && combined.iter().any(|v| values::equals(v, &element)) {
                continue;
            }
            combined.push(element);
        }
        self.set(name, Value::Array(combined));
        true
    }

    /// Visit each set attribute; local values shadow the parent's.
    pub fn each(&self, callback: &mut dyn FnMut(&str, &Rc<Value>) -> bool) {
        for (name, value) in &self.values {
            if values::is_undef(value) {
                continue;
            }
            if !callback(name, value) {
                return;
            }
        }
        if let Some(parent) = &self.parent {
            parent.each(&mut |name, value| {
                if self.values.contains_key(name) {
                    return true;
                }
                callback(name, value)
            });
        }
    }

    /// Names set locally in this collection (used for duplicate checks
    /// within one resource body).
    pub fn has_local(&self, name: &str) -> bool {
        self.values
            .get(name)
            .map(|v| !values::is_undef(v))
            .unwrap_or(false)
    }
}

// ──────────────────────────────────────────────
// Resources
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Real,
    Virtual,
    Exported,
    RealizedVirtual,
    RealizedExported,
}

impl ResourceStatus {
    pub fn is_realized(self) -> bool {
        matches!(
            self,
            ResourceStatus::Real | ResourceStatus::RealizedVirtual | ResourceStatus::RealizedExported
        )
    }
}

#[derive(Debug)]
pub struct Resource {
    /// Canonical type name, e.g. `File`.
    type_name: String,
    title: String,
    path: Rc<String>,
    line: usize,
    attributes: Attributes,
    status: ResourceStatus,
    /// The class or defined type instance this resource was declared
    /// within, if any.
    container: Option<ResourceIndex>,
    tags: BTreeSet<String>,
}

impl Resource {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn path(&self) -> Rc<String> {
        Rc::clone(&self.path)
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn status(&self) -> ResourceStatus {
        self.status
    }

    pub fn container(&self) -> Option<ResourceIndex> {
        self.container
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn is_class(&self) -> bool {
        self.type_name == "Class"
    }

    /// The `Type[title]` reference for messages.
    pub fn reference(&self) -> String {
        format!("{}[{}]", self.type_name, self.title)
    }
}

// ──────────────────────────────────────────────
// Definitions
// ──────────────────────────────────────────────

/// A class definition registered by the definition scanner. A class may be
/// defined several times; every definition is evaluated when the class is
/// declared.
#[derive(Debug)]
pub struct ClassDefinition {
    name: String,
    parent: Option<String>,
    context: Rc<CompilationContext>,
    expression: Rc<ast::ClassDefinitionExpression>,
}

impl ClassDefinition {
    pub fn new(
        name: String,
        context: Rc<CompilationContext>,
        expression: Rc<ast::ClassDefinitionExpression>,
    ) -> Self {
        let parent = expression
            .parent
            .as_ref()
            .map(|p| p.value.strip_prefix("::").unwrap_or(&p.value).to_lowercase());
        ClassDefinition {
            name,
            parent,
            context,
            expression,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn context(&self) -> Rc<CompilationContext> {
        Rc::clone(&self.context)
    }

    pub fn expression(&self) -> Rc<ast::ClassDefinitionExpression> {
        Rc::clone(&self.expression)
    }

    pub fn path(&self) -> Rc<String> {
        self.context.path()
    }

    pub fn line(&self) -> usize {
        self.expression.position.line
    }
}

#[derive(Debug)]
pub struct DefinedTypeDefinition {
    name: String,
    context: Rc<CompilationContext>,
    expression: Rc<ast::DefinedTypeExpression>,
}

impl DefinedTypeDefinition {
    pub fn new(
        name: String,
        context: Rc<CompilationContext>,
        expression: Rc<ast::DefinedTypeExpression>,
    ) -> Self {
        DefinedTypeDefinition {
            name,
            context,
            expression,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> Rc<CompilationContext> {
        Rc::clone(&self.context)
    }

    pub fn expression(&self) -> Rc<ast::DefinedTypeExpression> {
        Rc::clone(&self.expression)
    }

    pub fn path(&self) -> Rc<String> {
        self.context.path()
    }

    pub fn line(&self) -> usize {
        self.expression.position.line
    }
}

#[derive(Debug)]
pub struct NodeDefinition {
    context: Rc<CompilationContext>,
    expression: Rc<ast::NodeDefinitionExpression>,
}

impl NodeDefinition {
    pub fn context(&self) -> Rc<CompilationContext> {
        Rc::clone(&self.context)
    }

    pub fn expression(&self) -> Rc<ast::NodeDefinitionExpression> {
        Rc::clone(&self.expression)
    }

    pub fn position(&self) -> Position {
        self.expression.position
    }
}

// ──────────────────────────────────────────────
// Relationships
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    Before,
    Notify,
    Require,
    Subscribe,
    After,
}

impl Relationship {
    pub fn parameter(self) -> &'static str {
        match self {
            Relationship::Before => "before",
            Relationship::Notify => "notify",
            Relationship::Require => "require",
            Relationship::Subscribe => "subscribe",
            Relationship::After => "after",
        }
    }

    /// `require`, `subscribe`, and `after` point from the named resource to
    /// this one; the edge is stored reversed.
    fn is_reversed(self) -> bool {
        matches!(
            self,
            Relationship::Require | Relationship::Subscribe | Relationship::After
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub source: ResourceIndex,
    pub target: ResourceIndex,
    pub relationship: Relationship,
}

// ──────────────────────────────────────────────
// Catalog
// ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Catalog {
    resources: Vec<Resource>,
    /// (lowercased type name, normalized title) to arena index.
    index: IndexMap<(String, String), ResourceIndex>,
    classes: HashMap<String, Vec<ClassDefinition>>,
    defined_types: HashMap<String, DefinedTypeDefinition>,
    nodes: Vec<NodeDefinition>,
    named_nodes: HashMap<String, usize>,
    regex_nodes: Vec<(Regex, usize)>,
    default_node: Option<usize>,
    edges: Vec<Edge>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    fn key(type_name: &str, title: &str) -> (String, String) {
        let type_key = type_name.to_lowercase();
        let title = title.trim();
        // Class, stage, and node titles are case-insensitive names
        let title_key = if matches!(type_key.as_str(), "class" | "stage" | "node") {
            title.to_lowercase()
        } else {
            title.to_string()
        };
        (type_key, title_key)
    }

    // -- Resources ----------------------------------------------

    pub fn find_resource(&self, type_name: &str, title: &str) -> Option<ResourceIndex> {
        self.index.get(&Self::key(type_name, title)).copied()
    }

    /// Find a resource that has been realized (virtual and exported
    /// resources are invisible until collected).
    pub fn find_realized(&self, type_name: &str, title: &str) -> Option<ResourceIndex> {
        self.find_resource(type_name, title)
            .filter(|&index| self.resources[index].status.is_realized())
    }

    pub fn resource(&self, index: ResourceIndex) -> &Resource {
        &self.resources[index]
    }

    pub fn resource_mut(&mut self, index: ResourceIndex) -> &mut Resource {
        &mut self.resources[index]
    }

    /// Add a resource. The type name is canonicalized and the title
    /// trimmed; a duplicate `(type, title)` is an error.
    pub fn add_resource(
        &mut self,
        type_name: &str,
        title: &str,
        path: Rc<String>,
        line: usize,
        attributes: Attributes,
        status: ResourceStatus,
        container: Option<ResourceIndex>,
    ) -> Result<ResourceIndex, EvaluationError> {
        let type_name = crate::types::normalize_type_name(type_name);
        let title = title.trim().to_string();
        if type_name.is_empty() || title.is_empty() {
            return Err(EvaluationError::new("resource name is not fully qualified."));
        }

        let key = Self::key(&type_name, &title);
        if let Some(&existing) = self.index.get(&key) {
            let existing = &self.resources[existing];
            return Err(EvaluationError::new(format!(
                "resource {} was previously declared at {}:{}.",
                existing.reference(),
                existing.path(),
                existing.line()
            )));
        }

        let index = self.resources.len();
        self.resources.push(Resource {
            type_name,
            title,
            path,
            line,
            attributes,
            status,
            container,
            tags: BTreeSet::new(),
        });
        self.index.insert(key, index);
        Ok(index)
    }

    /// Realize a virtual or exported resource. Realization keeps the
    /// resource's original position in declaration order.
    pub fn realize(&mut self, index: ResourceIndex) {
        let resource = &mut self.resources[index];
        resource.status = match resource.status {
            ResourceStatus::Virtual => ResourceStatus::RealizedVirtual,
            ResourceStatus::Exported => ResourceStatus::RealizedExported,
            other => other,
        };
    }

    /// Indices of realized resources in declaration order.
    pub fn resources(&self) -> impl Iterator<Item = ResourceIndex> + '_ {
        (0..self.resources.len()).filter(|&i| self.resources[i].status.is_realized())
    }

    /// Indices of all resources, realized or not, in declaration order.
    pub fn all_resources(&self) -> impl Iterator<Item = ResourceIndex> + '_ {
        0..self.resources.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    // -- Classes ------------------------------------------------

    pub fn find_class(&self, name: &str) -> Option<&[ClassDefinition]> {
        self.classes
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .filter(|definitions| !definitions.is_empty())
    }

    pub fn define_class(&mut self, definition: ClassDefinition) {
        self.classes
            .entry(definition.name().to_lowercase())
            .or_default()
            .push(definition);
    }

    /// Class names with at least one definition.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    // -- Defined types ------------------------------------------

    pub fn find_defined_type(&self, name: &str) -> Option<&DefinedTypeDefinition> {
        self.defined_types.get(&name.to_lowercase())
    }

    pub fn define_type(
        &mut self,
        definition: DefinedTypeDefinition,
        position: Position,
        context: &CompilationContext,
    ) -> Result<(), EvaluationError> {
        let key = definition.name().to_lowercase();
        if let Some(existing) = self.defined_types.get(&key) {
            return Err(context.error(
                position,
                format!(
                    "defined type '{}' was previously defined at {}:{}.",
                    existing.name(),
                    existing.path(),
                    existing.line()
                ),
            ));
        }
        self.defined_types.insert(key, definition);
        Ok(())
    }

    // -- Nodes --------------------------------------------------

    pub fn define_node(
        &mut self,
        context: Rc<CompilationContext>,
        expression: Rc<ast::NodeDefinitionExpression>,
    ) -> Result<(), EvaluationError> {
        let node_index = self.nodes.len();
        let names = expression.names.clone();
        self.nodes.push(NodeDefinition {
            context: Rc::clone(&context),
            expression,
        });

        for name in &names {
            match name.kind {
                ast::HostnameKind::Default => {
                    if self.default_node.is_none() {
                        self.default_node = Some(node_index);
                        continue;
                    }
                    let previous = &self.nodes[self.default_node.unwrap()];
                    return Err(context.error(
                        name.position,
                        format!(
                            "a default node was previously defined at {}:{}.",
                            previous.context().path(),
                            previous.position().line
                        ),
                    ));
                }
                ast::HostnameKind::Regex => {
                    if let Some((_, index)) = self
                        .regex_nodes
                        .iter()
                        .find(|(existing, _)| existing.pattern() == name.value)
                    {
                        let previous = &self.nodes[*index];
                        return Err(context.error(
                            name.position,
                            format!(
                                "node /{}/ was previously defined at {}:{}.",
                                name.value,
                                previous.context().path(),
                                previous.position().line
                            ),
                        ));
                    }
                    let regex = Regex::new(&name.value).map_err(|e| {
                        context.error(
                            name.position,
                            format!("invalid regular expression: {}", e),
                        )
                    })?;
                    self.regex_nodes.push((regex, node_index));
                }
                ast::HostnameKind::Named => {
                    let lowered = name.value.to_lowercase();
                    if let Some(&index) = self.named_nodes.get(&lowered) {
                        let previous = &self.nodes[index];
                        return Err(context.error(
                            name.position,
                            format!(
                                "node '{}' was previously defined at {}:{}.",
                                name.value,
                                previous.context().path(),
                                previous.position().line
                            ),
                        ));
                    }
                    self.named_nodes.insert(lowered, node_index);
                }
            }
        }
        Ok(())
    }

    pub fn has_nodes(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn node_definition(&self, index: usize) -> &NodeDefinition {
        &self.nodes[index]
    }

    /// Find the node definition matching the given names (ordered most
    /// specific first). Falls back to the default node.
    pub fn find_node(&self, names: &[String]) -> Option<(String, usize)> {
        for name in names {
            if let Some(&index) = self.named_nodes.get(name) {
                return Some((name.clone(), index));
            }
            for (regex, index) in &self.regex_nodes {
                if regex.as_regex().is_match(name) {
                    return Some((format!("/{}/", regex.pattern()), *index));
                }
            }
        }
        self.default_node
            .map(|index| ("default".to_string(), index))
    }

    // -- Finalization -------------------------------------------

    /// Resolve relationship metaparameters into edges, assign tags, and
    /// detect dependency cycles.
    pub fn finalize(&mut self) -> Result<(), EvaluationError> {
        const RELATIONSHIPS: [Relationship; 5] = [
            Relationship::Before,
            Relationship::Notify,
            Relationship::Require,
            Relationship::Subscribe,
            Relationship::After,
        ];

        let realized: Vec<ResourceIndex> = self.resources().collect();
        for &source in &realized {
            for relationship in RELATIONSHIPS {
                self.process_relationship_parameter(source, relationship)?;
            }
            self.assign_tags(source);
        }

        self.detect_cycles()
    }

    fn process_relationship_parameter(
        &mut self,
        source: ResourceIndex,
        relationship: Relationship,
    ) -> Result<(), EvaluationError> {
        let parameter = relationship.parameter();
        let value = match self.resources[source].attributes().get(parameter, true) {
            Some(value) => value,
            None => return Ok(()),
        };

        let source_description = {
            let resource = &self.resources[source];
            format!(
                "resource {} (declared at {}:{})",
                resource.reference(),
                resource.path(),
                resource.line()
            )
        };

        let mut targets = Vec::new();
        values::each_resource(
            &value,
            &mut |type_name, title| {
                match self.find_realized(type_name, title) {
                    Some(target) => {
                        targets.push(target);
                        Ok(())
                    }
                    None => Err(EvaluationError::new(format!(
                        "{} cannot form a '{}' relationship with resource {}[{}]: the resource does not exist in the catalog.",
                        source_description, parameter, type_name, title
                    ))),
                }
            },
            &|message| {
                EvaluationError::new(format!(
                    "{} cannot form a '{}' relationship: {}",
                    source_description, parameter, message
                ))
            },
        )?;

        for target in targets {
            if target == source {
                return Err(EvaluationError::new(format!(
                    "{} cannot form a '{}' relationship with resource {}: the relationship is self-referencing.",
                    source_description,
                    parameter,
                    self.resources[target].reference()
                )));
            }
            self.add_edge(source, target, relationship);
        }
        Ok(())
    }

    fn add_edge(&mut self, source: ResourceIndex, target: ResourceIndex, relationship: Relationship) {
        let (source, target) = if relationship.is_reversed() {
            (target, source)
        } else {
            (source, target)
        };
        let edge = Edge {
            source,
            target,
            relationship,
        };
        if !self
            .edges
            .iter()
            .any(|e| e.source == source && e.target == target)
        {
            self.edges.push(edge);
        }
    }

    fn assign_tags(&mut self, index: ResourceIndex) {
        let mut tags = BTreeSet::new();
        let resource = &self.resources[index];
        tags.insert(resource.type_name().to_lowercase());
        if let Some(value) = resource.attributes().get("tag", true) {
            if let Value::Array(elements) = values::dereference(&value) {
                for element in elements {
                    if let Value::String(tag) = values::dereference(element) {
                        tags.insert(tag.to_lowercase());
                    }
                }
            }
        }
        self.resources[index].tags = tags;
    }

    fn detect_cycles(&self) -> Result<(), EvaluationError> {
        // Depth-first search over the realized relationship graph; a back
        // edge closes a cycle.
        let mut adjacency: HashMap<ResourceIndex, Vec<ResourceIndex>> = HashMap::new();
        for edge in &self.edges {
            adjacency.entry(edge.source).or_default().push(edge.target);
        }

        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut colors: HashMap<ResourceIndex, Color> = HashMap::new();
        let mut cycles: Vec<String> = Vec::new();

        fn visit(
            node: ResourceIndex,
            adjacency: &HashMap<ResourceIndex, Vec<ResourceIndex>>,
            colors: &mut HashMap<ResourceIndex, Color>,
            stack: &mut Vec<ResourceIndex>,
            cycles: &mut Vec<String>,
            resources: &[Resource],
        ) {
            colors.insert(node, Color::Gray);
            stack.push(node);
            if let Some(neighbors) = adjacency.get(&node) {
                for &next in neighbors {
                    match colors.get(&next).copied().unwrap_or(Color::White) {
                        Color::White => {
                            visit(next, adjacency, colors, stack, cycles, resources)
                        }
                        Color::Gray => {
                            // Found a cycle: the stack from `next` onward
                            let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                            let mut description = String::new();
                            for (i, &member) in stack[start..].iter().enumerate() {
                                if i > 0 {
                                    description.push_str(" => ");
                                }
                                let resource = &resources[member];
                                description.push_str(&format!(
                                    "{} declared at {}:{}",
                                    resource.reference(),
                                    resource.path(),
                                    resource.line()
                                ));
                            }
                            description
                                .push_str(&format!(" => {}", resources[next].reference()));
                            cycles.push(description);
                        }
                        Color::Black => {}
                    }
                }
            }
            stack.pop();
            colors.insert(node, Color::Black);
        }

        let mut stack = Vec::new();
        for &node in adjacency.keys() {
            if colors.get(&node).copied().unwrap_or(Color::White) == Color::White {
                visit(
                    node,
                    &adjacency,
                    &mut colors,
                    &mut stack,
                    &mut cycles,
                    &self.resources,
                );
            }
        }

        if cycles.is_empty() {
            return Ok(());
        }
        let mut message = format!(
            "found {} resource dependency cycle{}:\n",
            cycles.len(),
            if cycles.len() == 1 { "" } else { "s" }
        );
        for (i, cycle) in cycles.iter().enumerate() {
            if i > 0 {
                message.push('\n');
            }
            message.push_str(&format!("  {}. {}", i + 1, cycle));
        }
        Err(EvaluationError::new(message))
    }

    // -- Encoding -----------------------------------------------

    /// Reference JSON encoding of the finalized catalog: resources in
    /// declaration order plus the edge list.
    pub fn to_json(&self) -> serde_json::Value {
        let resources: Vec<serde_json::Value> = self
            .resources()
            .map(|index| {
                let resource = &self.resources[index];
                let mut parameters = serde_json::Map::new();
                resource.attributes().each(&mut |name, value| {
                    parameters.insert(name.to_string(), value_to_json(value));
                    true
                });
                serde_json::json!({
                    "type": resource.type_name(),
                    "title": resource.title(),
                    "file": *resource.path(),
                    "line": resource.line(),
                    "exported": resource.status() == ResourceStatus::RealizedExported,
                    "tags": resource.tags().iter().collect::<Vec<_>>(),
                    "parameters": parameters,
                })
            })
            .collect();

        let edges: Vec<serde_json::Value> = self
            .edges
            .iter()
            .map(|edge| {
                serde_json::json!({
                    "source": self.resources[edge.source].reference(),
                    "target": self.resources[edge.target].reference(),
                    "relationship": edge.relationship.parameter(),
                })
            })
            .collect();

        serde_json::json!({
            "resources": resources,
            "edges": edges,
        })
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match values::dereference(value) {
        Value::Undef => serde_json::Value::Null,
        Value::Default => serde_json::Value::String("default".to_string()),
        Value::Integer(i) => serde_json::json!(i),
        Value::Float(x) => serde_json::json!(x),
        Value::Boolean(b) => serde_json::json!(b),
        Value::String(s) => serde_json::json!(s),
        other @ (Value::Regex(_) | Value::Type(_)) => serde_json::json!(other.to_string()),
        Value::Array(elements) => {
            serde_json::Value::Array(elements.iter().map(value_to_json).collect())
        }
        Value::Hash(hash) => {
            let mut map = serde_json::Map::new();
            for (key, value) in hash.iter() {
                map.insert(key.to_string(), value_to_json(value));
            }
            serde_json::Value::Object(map)
        }
        Value::Variable(_) => unreachable!("dereference removes variables"),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn add(
        catalog: &mut Catalog,
        type_name: &str,
        title: &str,
        status: ResourceStatus,
    ) -> ResourceIndex {
        catalog
            .add_resource(
                type_name,
                title,
                Rc::new("test.cn".to_string()),
                1,
                Attributes::new(),
                status,
                None,
            )
            .unwrap()
    }

    #[test]
    fn duplicate_resource_is_an_error() {
        let mut catalog = Catalog::new();
        add(&mut catalog, "file", "/a", ResourceStatus::Real);
        let err = catalog
            .add_resource(
                "File",
                "/a",
                Rc::new("other.cn".to_string()),
                9,
                Attributes::new(),
                ResourceStatus::Real,
                None,
            )
            .unwrap_err();
        assert!(err.message.contains("previously declared"), "{}", err.message);
    }

    #[test]
    fn lookup_is_case_insensitive_on_type() {
        let mut catalog = Catalog::new();
        let index = add(&mut catalog, "file", "/a", ResourceStatus::Real);
        assert_eq!(catalog.find_resource("FILE", "/a"), Some(index));
        assert_eq!(catalog.resource(index).type_name(), "File");
    }

    #[test]
    fn virtual_resources_hide_until_realized() {
        let mut catalog = Catalog::new();
        let index = add(&mut catalog, "user", "alice", ResourceStatus::Virtual);
        assert!(catalog.find_realized("user", "alice").is_none());
        assert_eq!(catalog.resources().count(), 0);
        catalog.realize(index);
        assert_eq!(
            catalog.resource(index).status(),
            ResourceStatus::RealizedVirtual
        );
        assert_eq!(catalog.resources().count(), 1);
    }

    #[test]
    fn declaration_order_is_preserved() {
        let mut catalog = Catalog::new();
        add(&mut catalog, "file", "/b", ResourceStatus::Real);
        add(&mut catalog, "file", "/a", ResourceStatus::Real);
        add(&mut catalog, "user", "alice", ResourceStatus::Real);
        let titles: Vec<&str> = catalog
            .resources()
            .map(|i| catalog.resource(i).title())
            .collect();
        assert_eq!(titles, vec!["/b", "/a", "alice"]);
    }

    #[test]
    fn relationship_edges_and_reversal() {
        let mut catalog = Catalog::new();
        let package = add(&mut catalog, "package", "nginx", ResourceStatus::Real);
        let service = add(&mut catalog, "service", "nginx", ResourceStatus::Real);
        catalog
            .resource_mut(service)
            .attributes_mut()
            .set("require", Value::String("Package[nginx]".to_string()));
        catalog.finalize().unwrap();
        assert_eq!(catalog.edges().len(), 1);
        // `require` reverses: the edge runs package -> service
        assert_eq!(catalog.edges()[0].source, package);
        assert_eq!(catalog.edges()[0].target, service);
    }

    #[test]
    fn missing_relationship_target_is_an_error() {
        let mut catalog = Catalog::new();
        let service = add(&mut catalog, "service", "nginx", ResourceStatus::Real);
        catalog
            .resource_mut(service)
            .attributes_mut()
            .set("before", Value::String("File['/missing']".to_string()));
        let err = catalog.finalize().unwrap_err();
        assert!(
            err.message.contains("does not exist in the catalog"),
            "{}",
            err.message
        );
    }

    #[test]
    fn dependency_cycles_are_detected() {
        let mut catalog = Catalog::new();
        let a = add(&mut catalog, "file", "/a", ResourceStatus::Real);
        let b = add(&mut catalog, "file", "/b", ResourceStatus::Real);
        catalog
            .resource_mut(a)
            .attributes_mut()
            .set("before", Value::String("File['/b']".to_string()));
        catalog
            .resource_mut(b)
            .attributes_mut()
            .set("before", Value::String("File['/a']".to_string()));
        let err = catalog.finalize().unwrap_err();
        assert!(
            err.message.contains("resource dependency cycle"),
            "{}",
            err.message
        );
    }

    #[test]
    fn attributes_append_and_undef_unset() {
        let mut attributes = Attributes::new();
        attributes.set("tag", Value::Array(vec![Value::String("a".to_string())]));
        assert!(attributes.append("tag", Value::String("b".to_string()), true));
        assert!(attributes.append("tag", Value::String("b".to_string()), true));
        let value = attributes.get("tag", true).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);

        attributes.set("owner", Value::Undef);
        assert!(attributes.get("owner", true).is_none());
        // A non-array attribute cannot be appended to
        attributes.set("mode", Value::String("0644".to_string()));
        assert!(!attributes.append("mode", Value::String("0600".to_string()), false));
    }
}
