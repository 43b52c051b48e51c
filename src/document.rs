//! TOML layout documents
//!
//! A document names elements, places them in containers and declares their
//! anchors as text expressions:
//!
//! ```toml
//! [root]
//! padding = 10
//!
//! [[element]]
//! name = "menu"
//! anchors = { width = 200, dock_left = "root" }
//!
//! [[element]]
//! name = "content"
//! anchors = { left = "menu.right", dock_top_right = "root" }
//!
//! [[condition]]
//! when = "root.width < 600"
//! [condition.anchors.menu]
//! width = 0
//! ```
//!
//! Anchor keys are attribute names, `dock_<name>` (value: the element docked
//! against) or `align_<attribute>` (value: one name or a list of names).

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::error::ParseError;
use crate::layout::{
    Attribute, ConditionScope, ConditionStack, Dock, ElementId, Expr, Host, LayoutConfig,
    LayoutError, LayoutTree, Predicate,
};
use crate::parser::{bind_expression, bind_guard, parse_expression, parse_guard, Scope};

/// Errors that can occur when loading a layout document
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read layout document: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse layout document TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid expression for {context}: {}", format_errors(.errors))]
    Expression {
        context: String,
        text: String,
        errors: Vec<ParseError>,
    },
    #[error("Invalid value for {context}: {message}")]
    InvalidValue { context: String, message: String },
    #[error("{context}: {source}")]
    Layout {
        context: String,
        source: LayoutError,
    },
}

fn format_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl DocumentError {
    /// Human-readable report; expression errors are shown against their text
    pub fn report(&self) -> String {
        match self {
            DocumentError::Expression {
                context,
                text,
                errors,
            } => errors
                .iter()
                .map(|error| error.format(text, context))
                .collect::<Vec<_>>()
                .join("\n"),
            DocumentError::Layout { source, .. } => match source.suggestions() {
                Some(suggestions) if !suggestions.is_empty() => {
                    format!("{}\n  did you mean: {}?", self, suggestions.join(", "))
                }
                _ => self.to_string(),
            },
            other => other.to_string(),
        }
    }
}

fn in_context(context: &str) -> impl FnOnce(LayoutError) -> DocumentError + '_ {
    move |source| DocumentError::Layout {
        context: context.to_string(),
        source,
    }
}

fn invalid(context: &str, message: &str) -> DocumentError {
    DocumentError::InvalidValue {
        context: context.to_string(),
        message: message.to_string(),
    }
}

// ============================================================================
// Document model
// ============================================================================

/// A parsed layout document, ready to [`build`](LayoutDocument::build)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutDocument {
    #[serde(default)]
    pub config: LayoutConfig,
    #[serde(default)]
    pub root: RootSection,
    #[serde(default, rename = "element")]
    pub elements: Vec<ElementSection>,
    #[serde(default, rename = "condition")]
    pub conditions: Vec<ConditionSection>,
}

/// `[root]`: the container every other element lives in
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootSection {
    #[serde(default = "default_root_name")]
    pub name: String,
    pub gap: Option<f64>,
    pub padding: Option<f64>,
}

fn default_root_name() -> String {
    "root".to_string()
}

impl Default for RootSection {
    fn default() -> Self {
        Self {
            name: default_root_name(),
            gap: None,
            padding: None,
        }
    }
}

/// `[[element]]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementSection {
    pub name: String,
    /// Containing element; the root when omitted
    pub parent: Option<String>,
    #[serde(default)]
    pub container: bool,
    pub gap: Option<f64>,
    pub padding: Option<f64>,
    /// Intrinsic `[width, height]`, delivered as if the host measured it
    pub size: Option<[f64; 2]>,
    #[serde(default)]
    pub anchors: IndexMap<String, AnchorValue>,
}

/// `[[condition]]`: anchors that apply only while `when` holds
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionSection {
    pub when: String,
    /// Element name -> anchor table
    #[serde(default)]
    pub anchors: IndexMap<String, IndexMap<String, AnchorValue>>,
    #[serde(default, rename = "condition")]
    pub conditions: Vec<ConditionSection>,
}

/// Right-hand side of an anchor key
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnchorValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

// ============================================================================
// Loading
// ============================================================================

impl LayoutDocument {
    /// Load a document from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a document from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, DocumentError> {
        Ok(toml::from_str(content)?)
    }

    /// Create the elements and declare every anchor on a new tree
    ///
    /// Elements are created in document order, so a parent must appear
    /// before its children. Anchors are declared once every element exists
    /// and may reference any of them.
    pub fn build(&self, host: Arc<dyn Host>) -> Result<LayoutTree, DocumentError> {
        let tree = LayoutTree::with_config(host, self.config.clone());
        let root = tree.root();
        let root_name = self.root.name.as_str();
        tree.set_name(root, root_name)
            .map_err(in_context(root_name))?;
        apply_spacing(&tree, root, root_name, self.root.gap, self.root.padding)?;

        let mut scope = Scope::new();
        scope.insert(root_name, root);
        let mut created = Vec::with_capacity(self.elements.len());

        for element in &self.elements {
            let name = element.name.as_str();
            if scope.get(name).is_some() {
                return Err(invalid(name, "element name is already defined"));
            }
            let parent = match &element.parent {
                Some(parent) => scope.resolve(parent).map_err(in_context(name))?,
                None => root,
            };
            let id = if element.container {
                tree.add_container(parent)
            } else {
                tree.add_element(parent)
            }
            .map_err(in_context(name))?;
            tree.set_name(id, name).map_err(in_context(name))?;
            scope.insert(name, id);
            apply_spacing(&tree, id, name, element.gap, element.padding)?;
            if let Some([width, height]) = element.size {
                tree.resize(id, width, height).map_err(in_context(name))?;
            }
            created.push(id);
        }

        for (element, &id) in self.elements.iter().zip(&created) {
            for (key, value) in &element.anchors {
                declare(&tree, &scope, id, &element.name, key, value)?;
            }
        }

        declare_conditions(&tree, &mut ConditionStack::new(), &self.conditions, &scope)?;

        Ok(tree)
    }
}

fn apply_spacing(
    tree: &LayoutTree,
    element: ElementId,
    name: &str,
    gap: Option<f64>,
    padding: Option<f64>,
) -> Result<(), DocumentError> {
    if let Some(gap) = gap {
        tree.set_gap(element, gap).map_err(in_context(name))?;
    }
    if let Some(padding) = padding {
        tree.set_padding(element, padding).map_err(in_context(name))?;
    }
    Ok(())
}

/// Walk nested `[[condition]]` tables, entering a guard frame on the way
/// down and leaving it on the way back up
fn declare_conditions(
    tree: &LayoutTree,
    stack: &mut ConditionStack,
    conditions: &[ConditionSection],
    scope: &Scope,
) -> Result<(), DocumentError> {
    for condition in conditions {
        let predicates = guard(&condition.when, scope)?;
        stack.enter(tree.next_group_id(), predicates);
        let target = ConditionScope::new(tree, stack.clone());
        for (name, anchors) in &condition.anchors {
            let element = scope.resolve(name).map_err(in_context(&condition.when))?;
            for (key, value) in anchors {
                declare(&target, scope, element, name, key, value)?;
            }
        }
        declare_conditions(tree, stack, &condition.conditions, scope)?;
        stack.exit();
    }
    Ok(())
}

fn guard(text: &str, scope: &Scope) -> Result<Vec<Predicate>, DocumentError> {
    let context = format!("when \"{text}\"");
    let guards = parse_guard(text).map_err(|errors| DocumentError::Expression {
        context: context.clone(),
        text: text.to_string(),
        errors,
    })?;
    bind_guard(&guards, scope).map_err(in_context(&context))
}

fn expression(text: &str, scope: &Scope, context: &str) -> Result<Expr, DocumentError> {
    let node = parse_expression(text).map_err(|errors| DocumentError::Expression {
        context: context.to_string(),
        text: text.to_string(),
        errors,
    })?;
    bind_expression(&node, scope).map_err(in_context(context))
}

/// Where anchors end up: unconditionally on the tree, or in a condition scope
trait Declarations {
    fn set_anchor(&self, element: ElementId, attribute: Attribute, value: Expr)
        -> Result<(), LayoutError>;
    fn dock(&self, element: ElementId, dock: Dock, target: ElementId) -> Result<(), LayoutError>;
    fn align(
        &self,
        element: ElementId,
        attribute: Attribute,
        others: &[ElementId],
    ) -> Result<(), LayoutError>;
}

impl Declarations for LayoutTree {
    fn set_anchor(
        &self,
        element: ElementId,
        attribute: Attribute,
        value: Expr,
    ) -> Result<(), LayoutError> {
        LayoutTree::set_anchor(self, element, attribute, value)
    }

    fn dock(&self, element: ElementId, dock: Dock, target: ElementId) -> Result<(), LayoutError> {
        LayoutTree::dock(self, element, dock, target)
    }

    fn align(
        &self,
        element: ElementId,
        attribute: Attribute,
        others: &[ElementId],
    ) -> Result<(), LayoutError> {
        LayoutTree::align(self, element, attribute, others)
    }
}

impl Declarations for ConditionScope<'_> {
    fn set_anchor(
        &self,
        element: ElementId,
        attribute: Attribute,
        value: Expr,
    ) -> Result<(), LayoutError> {
        ConditionScope::set_anchor(self, element, attribute, value)
    }

    fn dock(&self, element: ElementId, dock: Dock, target: ElementId) -> Result<(), LayoutError> {
        ConditionScope::dock(self, element, dock, target)
    }

    fn align(
        &self,
        element: ElementId,
        attribute: Attribute,
        others: &[ElementId],
    ) -> Result<(), LayoutError> {
        ConditionScope::align(self, element, attribute, others)
    }
}

/// Declare one `key = value` entry of an anchor table
fn declare(
    target: &dyn Declarations,
    scope: &Scope,
    element: ElementId,
    owner: &str,
    key: &str,
    value: &AnchorValue,
) -> Result<(), DocumentError> {
    let context = format!("{owner}.{key}");

    if let Some(attribute) = key.strip_prefix("align_") {
        let attribute: Attribute = attribute.parse().map_err(in_context(&context))?;
        let names: &[String] = match value {
            AnchorValue::Text(name) => std::slice::from_ref(name),
            AnchorValue::List(names) => names,
            AnchorValue::Number(_) => {
                return Err(invalid(&context, "expected an element name or a list of names"))
            }
        };
        let others = names
            .iter()
            .map(|name| scope.resolve(name))
            .collect::<Result<Vec<_>, _>>()
            .map_err(in_context(&context))?;
        return target
            .align(element, attribute, &others)
            .map_err(in_context(&context));
    }

    if key.starts_with("dock_") {
        let dock: Dock = key.parse().map_err(in_context(&context))?;
        let AnchorValue::Text(name) = value else {
            return Err(invalid(&context, "expected the name of the element to dock against"));
        };
        let other = scope.resolve(name).map_err(in_context(&context))?;
        return target
            .dock(element, dock, other)
            .map_err(in_context(&context));
    }

    let attribute: Attribute = key.parse().map_err(in_context(&context))?;
    let expr = match value {
        AnchorValue::Number(number) => Expr::Constant(*number),
        AnchorValue::Text(text) => expression(text, scope, &context)?,
        AnchorValue::List(_) => return Err(invalid(&context, "expected a number or an expression")),
    };
    target
        .set_anchor(element, attribute, expr)
        .map_err(in_context(&context))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout::RecordingHost;

    fn build(source: &str) -> Result<LayoutTree, DocumentError> {
        let document = LayoutDocument::from_str(source)?;
        document.build(Arc::new(RecordingHost::new()))
    }

    fn id(tree: &LayoutTree, name: &str) -> ElementId {
        tree.find(name)
            .unwrap_or_else(|| panic!("Expected element '{name}'"))
    }

    #[test]
    fn test_defaults() {
        let document = LayoutDocument::from_str("").unwrap();
        assert_eq!(document.root.name, "root");
        assert!(document.elements.is_empty());
        assert_eq!(document.config.default_gap, 10.0);
    }

    #[test]
    fn test_anchor_values_parse_by_shape() {
        let document = LayoutDocument::from_str(
            r#"
            [[element]]
            name = "a"
            anchors = { width = 20, left = "root.left + 5", align_top = ["root"] }
            "#,
        )
        .unwrap();
        let anchors = &document.elements[0].anchors;
        assert_eq!(anchors["width"], AnchorValue::Number(20.0));
        assert_eq!(anchors["left"], AnchorValue::Text("root.left + 5".to_string()));
        assert_eq!(anchors["align_top"], AnchorValue::List(vec!["root".to_string()]));
    }

    #[test]
    fn test_dock_against_padded_root() {
        let tree = build(
            r#"
            [root]
            padding = 10

            [[element]]
            name = "header"
            anchors = { dock_top = "root", height = 50 }

            [[element]]
            name = "body"
            anchors = { top = "header.bottom", left = "root.left" }
            "#,
        )
        .unwrap();
        tree.resize(tree.root(), 800.0, 600.0).unwrap();

        let header = tree.geometry(id(&tree, "header")).unwrap();
        assert_eq!(header.left, Some(10.0));
        assert_eq!(header.top, Some(10.0));
        assert_eq!(header.right, Some(10.0));
        assert_eq!(header.height, Some(50.0));

        let body = tree.geometry(id(&tree, "body")).unwrap();
        assert_eq!(body.top, Some(70.0));
        assert_eq!(body.left, Some(10.0));
    }

    #[test]
    fn test_conditions_follow_the_root_size() {
        let tree = build(
            r#"
            [[element]]
            name = "menu"
            anchors = { left = 0 }

            [[condition]]
            when = "root.width >= 600"
            [condition.anchors.menu]
            width = 200

            [[condition.condition]]
            when = "root.height >= 400"
            [condition.condition.anchors.menu]
            height = 100
            "#,
        )
        .unwrap();
        let menu = id(&tree, "menu");

        tree.resize(tree.root(), 800.0, 600.0).unwrap();
        assert_eq!(tree.actual(menu, Attribute::Width), Some(200.0));
        assert_eq!(tree.actual(menu, Attribute::Height), Some(100.0));

        tree.resize(tree.root(), 800.0, 300.0).unwrap();
        assert_eq!(tree.actual(menu, Attribute::Width), Some(200.0));
        assert_eq!(tree.actual(menu, Attribute::Height), None);

        tree.resize(tree.root(), 500.0, 600.0).unwrap();
        assert_eq!(tree.actual(menu, Attribute::Width), None);
        assert_eq!(tree.actual(menu, Attribute::Height), None);
    }

    #[test]
    fn test_sibling_conditions_do_not_inherit_guards() {
        let tree = build(
            r#"
            [[element]]
            name = "menu"

            [[condition]]
            when = "root.width >= 600"
            [condition.anchors.menu]
            width = 200

            [[condition.condition]]
            when = "root.height >= 400"
            [condition.condition.anchors.menu]
            height = 100

            [[condition]]
            when = "root.width < 600"
            [condition.anchors.menu]
            width = 50
            "#,
        )
        .unwrap();
        let menu = id(&tree, "menu");

        tree.resize(tree.root(), 500.0, 600.0).unwrap();
        assert_eq!(tree.actual(menu, Attribute::Width), Some(50.0));
        assert_eq!(tree.actual(menu, Attribute::Height), None);

        tree.resize(tree.root(), 800.0, 600.0).unwrap();
        assert_eq!(tree.actual(menu, Attribute::Width), Some(200.0));
        assert_eq!(tree.actual(menu, Attribute::Height), Some(100.0));
    }

    #[test]
    fn test_children_of_containers() {
        let tree = build(
            r#"
            [[element]]
            name = "panel"
            container = true
            padding = 4
            size = [100, 80]

            [[element]]
            name = "label"
            parent = "panel"
            anchors = { dock_top_left = "panel" }
            "#,
        )
        .unwrap();
        let label = id(&tree, "label");
        assert_eq!(tree.parent(label), Some(id(&tree, "panel")));
        assert_eq!(tree.actual(label, Attribute::Left), Some(4.0));
        assert_eq!(tree.actual(label, Attribute::Top), Some(4.0));
    }

    #[test]
    fn test_unknown_attribute_key() {
        let err = build(
            r#"
            [[element]]
            name = "a"
            anchors = { lefty = 3 }
            "#,
        )
        .unwrap_err();
        match err {
            DocumentError::Layout { context, source } => {
                assert_eq!(context, "a.lefty");
                assert_eq!(source, LayoutError::unknown_attribute("lefty"));
            }
            other => panic!("Expected Layout error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_dock_key() {
        let err = build(
            r#"
            [[element]]
            name = "a"
            anchors = { dock_sideways = "root" }
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Layout {
                source: LayoutError::UnknownDock { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_bad_expression_reports_against_its_text() {
        let err = build(
            r#"
            [[element]]
            name = "a"
            anchors = { left = "root.left +" }
            "#,
        )
        .unwrap_err();
        match &err {
            DocumentError::Expression { context, text, .. } => {
                assert_eq!(context, "a.left");
                assert_eq!(text, "root.left +");
            }
            other => panic!("Expected Expression error, got {other:?}"),
        }
        assert!(err.report().contains("a.left"));
    }

    #[test]
    fn test_undefined_parent_suggests_names() {
        let err = build(
            r#"
            [[element]]
            name = "panel"
            container = true

            [[element]]
            name = "label"
            parent = "panle"
            "#,
        )
        .unwrap_err();
        assert!(err.report().contains("did you mean: panel?"), "got: {}", err.report());
    }

    #[test]
    fn test_plain_element_cannot_be_a_parent() {
        let err = build(
            r#"
            [[element]]
            name = "a"

            [[element]]
            name = "b"
            parent = "a"
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Layout {
                source: LayoutError::InvalidParent { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = build(
            r#"
            [[element]]
            name = "a"

            [[element]]
            name = "a"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidValue { .. }));
    }

    #[test]
    fn test_cyclic_anchors_rejected() {
        let err = build(
            r#"
            [[element]]
            name = "a"
            anchors = { left = "b.right" }

            [[element]]
            name = "b"
            anchors = { left = "a.right" }
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Layout {
                source: LayoutError::CyclicConstraint { .. },
                ..
            }
        ));
    }
}
