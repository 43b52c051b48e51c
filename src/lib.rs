//! Anchor Layout - relative box layout for trees of rectangular elements
//!
//! Elements declare their edges, sizes and centers as expressions over the
//! geometry of their container and siblings; the engine resolves them whenever
//! an input changes and pushes the physical results to a host surface.
//!
//! # Example
//!
//! ```rust
//! use anchor_layout::render;
//!
//! let source = r#"
//! [[element]]
//! name = "box"
//! anchors = { left = 10, top = 20, width = 30, height = 40 }
//! "#;
//! let report = render(source, 200.0, 100.0).unwrap();
//! assert!(report.contains("box: left=10 top=20 width=30 height=40"));
//! ```

pub mod document;
pub mod error;
pub mod layout;
pub mod parser;

pub use document::{DocumentError, LayoutDocument};
pub use error::ParseError;
pub use layout::{
    Attribute, Dock, ElementId, Expr, Geometry, Host, LayoutConfig, LayoutError, LayoutTree,
    RecordingHost,
};
pub use parser::{parse_expression, parse_guard};

use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur during the render pipeline
#[derive(Debug, Error)]
pub enum RenderError {
    /// Error loading the layout document
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Error during layout
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
}

impl RenderError {
    /// Human-readable report, with source context for expression errors
    pub fn report(&self) -> String {
        match self {
            RenderError::Document(err) => err.report(),
            RenderError::Layout(err) => err.to_string(),
        }
    }
}

/// Lay out a TOML document in a root of the given size and report the result
///
/// This is the main entry point for the library.
pub fn render(source: &str, width: f64, height: f64) -> Result<String, RenderError> {
    let document = LayoutDocument::from_str(source)?;
    render_document(&document, width, height)
}

/// Lay out an already parsed document
pub fn render_document(
    document: &LayoutDocument,
    width: f64,
    height: f64,
) -> Result<String, RenderError> {
    let host = Arc::new(RecordingHost::new());
    let tree = document.build(host)?;
    tree.resize(tree.root(), width, height)?;
    Ok(report(&tree))
}

/// One line per named element with its resolved physical geometry
///
/// Attributes that are not set are left out.
pub fn report(tree: &LayoutTree) -> String {
    let mut lines = Vec::new();
    for element in tree.elements() {
        let Some(name) = tree.name(element) else {
            continue;
        };
        let geometry = tree.geometry(element).unwrap_or_default();
        let values: Vec<String> = geometry
            .iter()
            .map(|(attribute, value)| format!("{}={}", attribute, layout::format_number(value)))
            .collect();
        if values.is_empty() {
            lines.push(format!("{name}: unresolved"));
        } else {
            lines.push(format!("{name}: {}", values.join(" ")));
        }
    }
    lines.join("\n")
}
