//! Abstract syntax tree for anchor expressions
//!
//! The tree keeps element names unresolved; [`crate::parser::bind`] turns it
//! into a [`crate::layout::Expr`] once the names are known.

use crate::layout::{AggregateKind, Attribute, BinaryOp, Comparison};

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// A node with its source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Valid identifier (alphanumeric + underscore, starts with letter/_)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    /// `name.attribute`
    Reference {
        element: Spanned<Identifier>,
        attribute: Attribute,
    },
    Number(f64),
    Binary {
        op: BinaryOp,
        left: Box<Spanned<ExprNode>>,
        right: Box<Spanned<ExprNode>>,
    },
    /// Unary minus
    Negate(Box<Spanned<ExprNode>>),
    /// `min(a, b, ..)` or `max(a, b, ..)`
    Aggregate {
        kind: AggregateKind,
        items: Vec<Spanned<ExprNode>>,
    },
    /// `share(inner, fraction, total)`
    Share {
        inner: Box<Spanned<ExprNode>>,
        fraction: f64,
        total: f64,
    },
    /// `when guard then value [else fallback]`
    Conditional {
        guards: Vec<Spanned<PredicateNode>>,
        value: Box<Spanned<ExprNode>>,
        fallback: Option<Box<Spanned<ExprNode>>>,
    },
    /// `value or fallback`
    Fallback {
        value: Box<Spanned<ExprNode>>,
        fallback: Box<Spanned<ExprNode>>,
    },
}

/// `left <op> right`
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateNode {
    pub left: Spanned<ExprNode>,
    pub comparison: Comparison,
    pub right: Spanned<ExprNode>,
}

impl ExprNode {
    /// Every element name referenced, with its span, in source order
    pub fn identifiers(&self) -> Vec<&Spanned<Identifier>> {
        let mut out = Vec::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers<'a>(&'a self, out: &mut Vec<&'a Spanned<Identifier>>) {
        match self {
            ExprNode::Reference { element, .. } => out.push(element),
            ExprNode::Number(_) => {}
            ExprNode::Binary { left, right, .. } => {
                left.node.collect_identifiers(out);
                right.node.collect_identifiers(out);
            }
            ExprNode::Negate(inner) | ExprNode::Share { inner, .. } => {
                inner.node.collect_identifiers(out);
            }
            ExprNode::Aggregate { items, .. } => {
                for item in items {
                    item.node.collect_identifiers(out);
                }
            }
            ExprNode::Conditional {
                guards,
                value,
                fallback,
            } => {
                for guard in guards {
                    guard.node.left.node.collect_identifiers(out);
                    guard.node.right.node.collect_identifiers(out);
                }
                value.node.collect_identifiers(out);
                if let Some(fallback) = fallback {
                    fallback.node.collect_identifiers(out);
                }
            }
            ExprNode::Fallback { value, fallback } => {
                value.node.collect_identifiers(out);
                fallback.node.collect_identifiers(out);
            }
        }
    }
}
