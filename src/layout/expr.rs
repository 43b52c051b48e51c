//! Anchor expressions
//!
//! An [`Expr`] is a lazily evaluated description of a coordinate: a reference
//! to another element's attribute, optionally combined with arithmetic,
//! min/max aggregation, guarded alternatives and proportional sharing.
//! Nothing is evaluated when an expression is built; resolution happens in
//! [`super::resolve`] every time the layout is recomputed.
//!
//! ```rust
//! use anchor_layout::layout::{Expr, LayoutTree, RecordingHost};
//! use std::sync::Arc;
//!
//! let tree = LayoutTree::new(Arc::new(RecordingHost::new()));
//! let root = tree.root();
//!
//! // Half the container width when it is wide, a quarter otherwise.
//! let center = root.width().ge(600.0).then(root.width() / 2.0).or(root.width() / 4.0);
//! assert_eq!(center.references(), vec![root]);
//!
//! // `min` chains collapse into one aggregate.
//! let narrowest = root.width().less_than(300.0).less_than(root.height());
//! assert!(matches!(narrowest, Expr::Aggregate { ref items, .. } if items.len() == 3));
//! ```

use std::fmt;
use std::ops;

use super::types::{Attribute, ElementId};

/// Reference to one attribute of one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub element: ElementId,
    pub attribute: Attribute,
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.element, self.attribute)
    }
}

/// Arithmetic operators available in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    /// Floored modulo, the result takes the sign of the divisor
    Rem,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "^",
        }
    }
}

/// Kind of an aggregate node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Min,
    Max,
}

/// Comparison used by guard predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }

    pub fn holds(self, left: f64, right: f64) -> bool {
        match self {
            Comparison::Lt => left < right,
            Comparison::Le => left <= right,
            Comparison::Gt => left > right,
            Comparison::Ge => left >= right,
        }
    }
}

/// A lazily resolved layout expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Another element's attribute
    Reference(Anchor),
    /// A plain number
    Constant(f64),
    /// Arithmetic over two sub-expressions
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Minimum or maximum of every member
    Aggregate {
        kind: AggregateKind,
        items: Vec<Expr>,
    },
    /// `value` when every guard holds, otherwise `fallback`
    Conditional {
        guards: Vec<Predicate>,
        value: Box<Expr>,
        fallback: Option<Box<Expr>>,
    },
    /// Proportional share of an extent, net of gaps and padding
    Share {
        fraction: f64,
        total: f64,
        inner: Box<Expr>,
    },
}

/// A boolean comparison between two expressions
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub left: Expr,
    pub comparison: Comparison,
    pub right: Expr,
}

/// An ordered conjunction of predicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Guard {
    pub predicates: Vec<Predicate>,
}

impl Expr {
    pub fn reference(element: ElementId, attribute: Attribute) -> Self {
        Expr::Reference(Anchor { element, attribute })
    }

    pub fn constant(value: f64) -> Self {
        Expr::Constant(value)
    }

    pub fn binary(op: BinaryOp, left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left.into()),
            right: Box::new(right.into()),
        }
    }

    pub fn floor_div(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::FloorDiv, self, rhs)
    }

    pub fn pow(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Pow, self, rhs)
    }

    /// Minimum of every member
    pub fn min_of(items: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Aggregate {
            kind: AggregateKind::Min,
            items: items.into_iter().collect(),
        }
    }

    /// Maximum of every member
    pub fn max_of(items: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Aggregate {
            kind: AggregateKind::Max,
            items: items.into_iter().collect(),
        }
    }

    /// `self < other` read as "whichever is smaller"; chains union into one `min`
    pub fn less_than(self, other: impl Into<Expr>) -> Self {
        self.aggregate_with(AggregateKind::Min, other.into())
    }

    /// `self > other` read as "whichever is larger"; chains union into one `max`
    pub fn greater_than(self, other: impl Into<Expr>) -> Self {
        self.aggregate_with(AggregateKind::Max, other.into())
    }

    fn aggregate_with(self, kind: AggregateKind, other: Expr) -> Self {
        let mut items = match self {
            Expr::Aggregate { kind: k, items } if k == kind => items,
            expr => vec![expr],
        };
        let more = match other {
            Expr::Aggregate { kind: k, items } if k == kind => items,
            expr => vec![expr],
        };
        for item in more {
            if !items.contains(&item) {
                items.push(item);
            }
        }
        Expr::Aggregate { kind, items }
    }

    pub fn lt(self, other: impl Into<Expr>) -> Predicate {
        Predicate::new(self, Comparison::Lt, other)
    }

    pub fn le(self, other: impl Into<Expr>) -> Predicate {
        Predicate::new(self, Comparison::Le, other)
    }

    pub fn gt(self, other: impl Into<Expr>) -> Predicate {
        Predicate::new(self, Comparison::Gt, other)
    }

    pub fn ge(self, other: impl Into<Expr>) -> Predicate {
        Predicate::new(self, Comparison::Ge, other)
    }

    /// Only contribute `self` while every predicate of `guard` holds
    pub fn guarded(guard: impl Into<Guard>, value: impl Into<Expr>) -> Self {
        Expr::Conditional {
            guards: guard.into().predicates,
            value: Box::new(value.into()),
            fallback: None,
        }
    }

    /// Alternative used when guards fail or the value cannot be resolved
    ///
    /// On an expression that already carries a fallback, the new alternative
    /// is chained behind the existing one.
    pub fn or(self, fallback: impl Into<Expr>) -> Self {
        match self {
            Expr::Conditional {
                guards,
                value,
                fallback: Some(existing),
            } => Expr::Conditional {
                guards,
                value,
                fallback: Some(Box::new(existing.or(fallback))),
            },
            Expr::Conditional {
                guards,
                value,
                fallback: None,
            } => Expr::Conditional {
                guards,
                value,
                fallback: Some(Box::new(fallback.into())),
            },
            expr => Expr::Conditional {
                guards: Vec::new(),
                value: Box::new(expr),
                fallback: Some(Box::new(fallback.into())),
            },
        }
    }

    /// Take `fraction` out of `total` parts of the resolved extent
    pub fn share(self, fraction: f64, total: f64) -> Self {
        Expr::Share {
            fraction,
            total,
            inner: Box::new(self),
        }
    }

    /// Every element this expression reads from, in first-seen order
    pub fn references(&self) -> Vec<ElementId> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    pub(crate) fn collect_references(&self, out: &mut Vec<ElementId>) {
        match self {
            Expr::Reference(anchor) => {
                if !out.contains(&anchor.element) {
                    out.push(anchor.element);
                }
            }
            Expr::Constant(_) => {}
            Expr::Binary { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
            Expr::Aggregate { items, .. } => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Expr::Conditional {
                guards,
                value,
                fallback,
            } => {
                for guard in guards {
                    guard.collect_references(out);
                }
                value.collect_references(out);
                if let Some(fallback) = fallback {
                    fallback.collect_references(out);
                }
            }
            Expr::Share { inner, .. } => inner.collect_references(out),
        }
    }

    fn is_compound(&self) -> bool {
        matches!(self, Expr::Binary { .. } | Expr::Conditional { .. })
    }
}

impl Predicate {
    pub fn new(left: impl Into<Expr>, comparison: Comparison, right: impl Into<Expr>) -> Self {
        Self {
            left: left.into(),
            comparison,
            right: right.into(),
        }
    }

    /// Conjunction with another predicate
    pub fn and(self, other: Predicate) -> Guard {
        Guard {
            predicates: vec![self, other],
        }
    }

    /// Guard `value` with this single predicate
    pub fn then(self, value: impl Into<Expr>) -> Expr {
        Expr::guarded(self, value)
    }

    pub(crate) fn collect_references(&self, out: &mut Vec<ElementId>) {
        self.left.collect_references(out);
        self.right.collect_references(out);
    }
}

impl Guard {
    pub fn new(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self {
            predicates: predicates.into_iter().collect(),
        }
    }

    pub fn and(mut self, other: Predicate) -> Guard {
        self.predicates.push(other);
        self
    }

    pub fn then(self, value: impl Into<Expr>) -> Expr {
        Expr::guarded(self, value)
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn references(&self) -> Vec<ElementId> {
        let mut out = Vec::new();
        for predicate in &self.predicates {
            predicate.collect_references(&mut out);
        }
        out
    }
}

impl From<Predicate> for Guard {
    fn from(predicate: Predicate) -> Self {
        Guard {
            predicates: vec![predicate],
        }
    }
}

impl From<Vec<Predicate>> for Guard {
    fn from(predicates: Vec<Predicate>) -> Self {
        Guard { predicates }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Constant(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::Constant(f64::from(value))
    }
}

impl From<Anchor> for Expr {
    fn from(anchor: Anchor) -> Self {
        Expr::Reference(anchor)
    }
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl ops::$trait<Expr> for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary($op, self, rhs)
            }
        }

        impl ops::$trait<f64> for Expr {
            type Output = Expr;

            fn $method(self, rhs: f64) -> Expr {
                Expr::binary($op, self, rhs)
            }
        }

        impl ops::$trait<Expr> for f64 {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary($op, self, rhs)
            }
        }
    };
}

binary_operator!(Add, add, BinaryOp::Add);
binary_operator!(Sub, sub, BinaryOp::Sub);
binary_operator!(Mul, mul, BinaryOp::Mul);
binary_operator!(Div, div, BinaryOp::Div);
binary_operator!(Rem, rem, BinaryOp::Rem);

impl ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::binary(BinaryOp::Sub, 0.0, self)
    }
}

// ============================================================================
// Display
// ============================================================================

/// Format a number without a trailing `.0` for whole values
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let text = format!("{:.2}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Reference(anchor) => write!(f, "{}", anchor),
            Expr::Constant(value) => f.write_str(&format_number(*value)),
            Expr::Binary { op, left, right } => {
                write_operand(f, left)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right)
            }
            Expr::Aggregate { kind, items } => {
                let name = match kind {
                    AggregateKind::Min => "min",
                    AggregateKind::Max => "max",
                };
                write!(f, "{}(", name)?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
            Expr::Conditional {
                guards,
                value,
                fallback,
            } => {
                if guards.is_empty() {
                    write_operand(f, value)?;
                } else {
                    f.write_str("when ")?;
                    for (i, guard) in guards.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" and ")?;
                        }
                        write!(f, "{}", guard)?;
                    }
                    write!(f, " then {}", value)?;
                }
                match fallback {
                    Some(fallback) if guards.is_empty() => write!(f, " or {}", fallback),
                    Some(fallback) => write!(f, " else {}", fallback),
                    None => Ok(()),
                }
            }
            Expr::Share {
                fraction,
                total,
                inner,
            } => write!(
                f,
                "share({}, {}, {})",
                inner,
                format_number(*fraction),
                format_number(*total)
            ),
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    if expr.is_compound() {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.comparison.symbol(), self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: usize) -> ElementId {
        ElementId(n)
    }

    #[test]
    fn test_arithmetic_builds_left_associated_tree() {
        let expr = id(1).width() / 2.0 + 10.0;
        match expr {
            Expr::Binary {
                op: BinaryOp::Add,
                left,
                right,
            } => {
                assert!(matches!(*left, Expr::Binary { op: BinaryOp::Div, .. }));
                assert_eq!(*right, Expr::Constant(10.0));
            }
            other => panic!("Expected addition, got {:?}", other),
        }
    }

    #[test]
    fn test_reversed_operands_keep_order() {
        let expr = 100.0 - id(1).left();
        assert_eq!(
            expr,
            Expr::binary(BinaryOp::Sub, Expr::Constant(100.0), id(1).left())
        );
    }

    #[test]
    fn test_less_than_chain_collapses_into_one_min() {
        let expr = id(1).left().less_than(id(2).left()).less_than(50.0);
        match expr {
            Expr::Aggregate {
                kind: AggregateKind::Min,
                items,
            } => assert_eq!(items.len(), 3),
            other => panic!("Expected min aggregate, got {:?}", other),
        }
    }

    #[test]
    fn test_aggregate_union_skips_duplicates() {
        let a = id(1).left().greater_than(id(2).left());
        let b = id(2).left().greater_than(id(3).left());
        match a.greater_than(b) {
            Expr::Aggregate { items, .. } => assert_eq!(items.len(), 3),
            other => panic!("Expected max aggregate, got {:?}", other),
        }
    }

    #[test]
    fn test_mixed_aggregates_nest() {
        let expr = id(1).left().less_than(5.0).greater_than(id(2).left());
        match expr {
            Expr::Aggregate {
                kind: AggregateKind::Max,
                items,
            } => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[0], Expr::Aggregate { kind: AggregateKind::Min, .. }));
            }
            other => panic!("Expected max aggregate, got {:?}", other),
        }
    }

    #[test]
    fn test_guard_and_fallback() {
        let expr = id(0)
            .width()
            .ge(600.0)
            .and(id(0).height().lt(400.0))
            .then(id(0).width() / 2.0)
            .or(id(0).width() / 4.0);
        match &expr {
            Expr::Conditional {
                guards, fallback, ..
            } => {
                assert_eq!(guards.len(), 2);
                assert!(fallback.is_some());
            }
            other => panic!("Expected conditional, got {:?}", other),
        }
        assert_eq!(
            expr.to_string(),
            "when #0.width >= 600 and #0.height < 400 then #0.width / 2 else #0.width / 4"
        );
    }

    #[test]
    fn test_or_chains_behind_existing_fallback() {
        let expr = id(1).left().or(id(2).left()).or(0.0);
        assert_eq!(expr.to_string(), "#1.left or #2.left or 0");
    }

    #[test]
    fn test_references_cover_guards_and_fallbacks() {
        let expr = id(3)
            .width()
            .ge(10.0)
            .then(id(4).left().share(1.0, 2.0))
            .or(id(5).right());
        assert_eq!(expr.references(), vec![id(3), id(4), id(5)]);
    }

    #[test]
    fn test_display_nested_arithmetic() {
        let expr = (id(1).left() + 2.0) * 3.0;
        assert_eq!(expr.to_string(), "(#1.left + 2) * 3");
        assert_eq!(id(2).width().floor_div(3.0).to_string(), "#2.width // 3");
        assert_eq!((-id(2).top()).to_string(), "0 - #2.top");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(300.0), "300");
        assert_eq!(format_number(93.333333), "93.33");
        assert_eq!(format_number(-2.5), "-2.5");
    }
}
