//! Expression resolution
//!
//! Resolution reads the cached actual geometry of other elements through a
//! [`LayoutView`] and produces a number for one target attribute, or `None`
//! when some input is not known yet. `None` is never an error: layouts are
//! built incrementally and an unresolved anchor simply skips its update.

use super::expr::{AggregateKind, Anchor, BinaryOp, Expr, Predicate};
use super::types::{Attribute, AttributeKind, ElementId, Geometry};

/// Read access to the element tree needed while resolving
pub trait LayoutView {
    fn contains(&self, element: ElementId) -> bool;

    fn parent(&self, element: ElementId) -> Option<ElementId>;

    fn actuals(&self, element: ElementId) -> Option<&Geometry>;

    /// Effective gap of an element, falling back to the configured default
    fn gap(&self, element: ElementId) -> f64;

    /// Effective padding of an element, falling back to the configured default
    fn padding(&self, element: ElementId) -> f64;
}

/// The attribute being computed and the element it belongs to
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    view: &'a dyn LayoutView,
    target: ElementId,
    kind: AttributeKind,
}

impl<'a> ResolveContext<'a> {
    pub fn new(view: &'a dyn LayoutView, target: ElementId, attribute: Attribute) -> Self {
        Self {
            view,
            target,
            kind: attribute.kind(),
        }
    }

    /// Context for evaluating group guards, where no padding or gap applies
    pub fn neutral(view: &'a dyn LayoutView, target: ElementId) -> Self {
        Self {
            view,
            target,
            kind: AttributeKind::Neutral,
        }
    }

    pub fn target(&self) -> ElementId {
        self.target
    }
}

impl Expr {
    /// Resolve to a number, `None` when any input is still unknown
    pub fn resolve(&self, ctx: &ResolveContext<'_>) -> Option<f64> {
        match self {
            Expr::Constant(value) => Some(*value),
            Expr::Reference(anchor) => resolve_reference(anchor, ctx),
            Expr::Binary { op, left, right } => {
                let left = left.resolve(ctx)?;
                let right = right.resolve(ctx)?;
                apply_op(*op, left, right)
            }
            Expr::Aggregate { kind, items } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(item.resolve(ctx)?);
                }
                let fold = match kind {
                    AggregateKind::Min => f64::min,
                    AggregateKind::Max => f64::max,
                };
                values.into_iter().reduce(fold)
            }
            Expr::Conditional {
                guards,
                value,
                fallback,
            } => {
                let primary = if guards.iter().all(|guard| guard.holds(ctx)) {
                    value.resolve(ctx)
                } else {
                    None
                };
                primary.or_else(|| fallback.as_ref().and_then(|fallback| fallback.resolve(ctx)))
            }
            Expr::Share {
                fraction,
                total,
                inner,
            } => {
                let extent = inner.resolve(ctx)?;
                apply_share(extent, *fraction, *total, ctx)
            }
        }
    }
}

impl Predicate {
    /// Whether the comparison holds; an unresolved side counts as failing
    pub fn holds(&self, ctx: &ResolveContext<'_>) -> bool {
        match (self.left.resolve(ctx), self.right.resolve(ctx)) {
            (Some(left), Some(right)) => self.comparison.holds(left, right),
            _ => false,
        }
    }
}

fn apply_op(op: BinaryOp, left: f64, right: f64) -> Option<f64> {
    let value = match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div if right == 0.0 => return None,
        BinaryOp::Div => left / right,
        BinaryOp::FloorDiv if right == 0.0 => return None,
        BinaryOp::FloorDiv => (left / right).floor(),
        BinaryOp::Rem if right == 0.0 => return None,
        BinaryOp::Rem => {
            let rem = left % right;
            if rem != 0.0 && (rem < 0.0) != (right < 0.0) {
                rem + right
            } else {
                rem
            }
        }
        BinaryOp::Pow => left.powf(right),
    };
    value.is_finite().then_some(value)
}

fn apply_share(extent: f64, fraction: f64, total: f64, ctx: &ResolveContext<'_>) -> Option<f64> {
    if total == 0.0 {
        return None;
    }
    let gap = ctx.view.gap(ctx.target);
    let padding = ctx
        .view
        .parent(ctx.target)
        .map(|parent| ctx.view.padding(parent))
        .unwrap_or(0.0);
    Some(((extent - (total - 1.0) * gap - 2.0 * padding) / total) * fraction + (fraction - 1.0) * gap)
}

// ============================================================================
// References
// ============================================================================

fn resolve_reference(anchor: &Anchor, ctx: &ResolveContext<'_>) -> Option<f64> {
    let view = ctx.view;
    if !view.contains(anchor.element) || !view.contains(ctx.target) {
        return None;
    }
    let source_kind = anchor.attribute.kind();
    let target_parent = view.parent(ctx.target);

    if target_parent == Some(anchor.element) {
        // The source is our container: read its edges in its own frame.
        let own = view.actuals(anchor.element)?;
        let mut value = container_edge(anchor.attribute, own)?;
        let padding = view.padding(anchor.element);
        match (source_kind, ctx.kind) {
            (AttributeKind::Leading, AttributeKind::Leading) => value += padding,
            (AttributeKind::Trailing, AttributeKind::Trailing) => value -= padding,
            _ => {}
        }
        return Some(value);
    }

    let container = target_parent?;
    if view.parent(anchor.element) != Some(container) {
        return None;
    }
    let source = view.actuals(anchor.element)?;
    let frame = view.actuals(container)?;
    let mut value = peer_edge(anchor.attribute, source, frame)?;
    let gap = view.gap(ctx.target);
    match (source_kind, ctx.kind) {
        (AttributeKind::Leading, AttributeKind::Trailing) => value -= gap,
        (AttributeKind::Trailing, AttributeKind::Leading) => value += gap,
        _ => {}
    }
    Some(value)
}

/// Edge of a container in its own coordinate frame
fn container_edge(attribute: Attribute, own: &Geometry) -> Option<f64> {
    match attribute {
        Attribute::Left | Attribute::Top => Some(0.0),
        Attribute::Right | Attribute::Width => own.width,
        Attribute::Bottom | Attribute::Height => own.height,
        Attribute::CenterX => own.width.map(|width| width / 2.0),
        Attribute::CenterY => own.height.map(|height| height / 2.0),
    }
}

/// Edge of a peer in the frame of the container both share
fn peer_edge(attribute: Attribute, source: &Geometry, frame: &Geometry) -> Option<f64> {
    match attribute {
        Attribute::Left => leading_edge(source.left, source.right, source.width, frame.width),
        Attribute::Right => trailing_edge(source.left, source.right, source.width, frame.width),
        Attribute::Top => leading_edge(source.top, source.bottom, source.height, frame.height),
        Attribute::Bottom => trailing_edge(source.top, source.bottom, source.height, frame.height),
        Attribute::Width => source.width,
        Attribute::Height => source.height,
        Attribute::CenterX => {
            let left = leading_edge(source.left, source.right, source.width, frame.width)?;
            Some(left + source.width? / 2.0)
        }
        Attribute::CenterY => {
            let top = leading_edge(source.top, source.bottom, source.height, frame.height)?;
            Some(top + source.height? / 2.0)
        }
    }
}

fn leading_edge(
    leading: Option<f64>,
    inset: Option<f64>,
    extent: Option<f64>,
    container: Option<f64>,
) -> Option<f64> {
    match leading {
        Some(value) => Some(value),
        None => Some(container? - inset? - extent?),
    }
}

fn trailing_edge(
    leading: Option<f64>,
    inset: Option<f64>,
    extent: Option<f64>,
    container: Option<f64>,
) -> Option<f64> {
    match inset {
        Some(inset) => Some(container? - inset),
        None => Some(leading? + extent?),
    }
}
