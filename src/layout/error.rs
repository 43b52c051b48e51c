//! Error types for the layout engine

use thiserror::Error;

use super::types::ElementId;

/// Errors that can occur while declaring or resolving layout constraints
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// Attribute name outside the eight anchorable attributes (or gap/padding)
    #[error("unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    /// Dock name not in the dock table
    #[error("unknown dock '{name}'")]
    UnknownDock { name: String },

    /// Element attached to something that cannot host it
    #[error("cannot attach {element} to {parent}: {reason}")]
    InvalidParent {
        element: ElementId,
        parent: ElementId,
        reason: String,
    },

    /// Declaration would make an element depend on itself
    #[error("cyclic constraint: {}", format_cycle(.cycle))]
    CyclicConstraint { cycle: Vec<ElementId> },

    /// Element id not present in this tree (never created, or removed)
    #[error("unknown element {element}")]
    UnknownElement { element: ElementId },

    /// Element name not defined in a layout document
    #[error("undefined identifier '{name}'")]
    UndefinedIdentifier {
        name: String,
        suggestions: Vec<String>,
    },
}

fn format_cycle(cycle: &[ElementId]) -> String {
    cycle
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl LayoutError {
    pub fn unknown_attribute(name: impl Into<String>) -> Self {
        Self::UnknownAttribute { name: name.into() }
    }

    pub fn unknown_dock(name: impl Into<String>) -> Self {
        Self::UnknownDock { name: name.into() }
    }

    pub fn invalid_parent(element: ElementId, parent: ElementId, reason: impl Into<String>) -> Self {
        Self::InvalidParent {
            element,
            parent,
            reason: reason.into(),
        }
    }

    pub fn cyclic(cycle: Vec<ElementId>) -> Self {
        Self::CyclicConstraint { cycle }
    }

    pub fn unknown_element(element: ElementId) -> Self {
        Self::UnknownElement { element }
    }

    pub fn undefined(name: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self::UndefinedIdentifier {
            name: name.into(),
            suggestions,
        }
    }

    /// Get suggestions if available
    pub fn suggestions(&self) -> Option<&[String]> {
        match self {
            Self::UndefinedIdentifier { suggestions, .. } => Some(suggestions),
            _ => None,
        }
    }
}
