//! Per-element constraint store
//!
//! Recompute runs in two phases. Resolution reads the tree through a
//! [`LayoutView`] and produces logical values; application routes those
//! values through the setter table into the cached physical geometry and
//! reports which physical attributes changed.

use indexmap::{IndexMap, IndexSet};

use super::condition::{GroupContext, GroupId};
use super::expr::{Expr, Predicate};
use super::resolve::{LayoutView, ResolveContext};
use super::types::{Attribute, ElementId, Geometry, Spacing};

/// Anchors that contribute only while every guard holds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionalGroup {
    pub guards: Vec<Predicate>,
    pub anchors: IndexMap<Attribute, Expr>,
}

#[derive(Debug, Clone, Default)]
pub struct ElementConstraints {
    anchors: IndexMap<Attribute, Expr>,
    groups: IndexMap<GroupId, ConditionalGroup>,
    gap: Option<f64>,
    padding: Option<f64>,
    actuals: Geometry,
    /// Width and height last reported by the host
    measured: Geometry,
    /// Physical attributes written by declarations during the last pass
    driven: IndexSet<Attribute>,
}

/// Logical values produced by one resolution pass
#[derive(Debug, Default, PartialEq)]
pub struct Resolution {
    /// Resolved values in application order; unresolved anchors are absent
    pub values: Vec<(Attribute, f64)>,
    /// Attributes declared unconditionally or in an active group
    pub pinned: IndexSet<Attribute>,
    /// Physical attributes the pinned declarations write to
    pub driven: IndexSet<Attribute>,
}

/// Cache updates made by one application pass
#[derive(Debug, Default, PartialEq)]
pub struct Applied {
    /// Physical attributes whose value changed, in the order they changed
    pub changed: Vec<(Attribute, f64)>,
    /// Physical attributes no declaration drives any more
    pub cleared: Vec<Attribute>,
}

impl ElementConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an anchor, inside a conditional group when `group` is given
    pub fn set_anchor(&mut self, attribute: Attribute, value: Expr, group: Option<&GroupContext>) {
        match group {
            Some(context) => {
                let entry = self
                    .groups
                    .entry(context.id)
                    .or_insert_with(|| ConditionalGroup {
                        guards: context.guards.clone(),
                        anchors: IndexMap::new(),
                    });
                entry.anchors.insert(attribute, value);
            }
            None => {
                self.anchors.insert(attribute, value);
            }
        }
    }

    /// Remove a declaration, returning whether one existed
    pub fn clear_anchor(&mut self, attribute: Attribute, group: Option<GroupId>) -> bool {
        match group {
            Some(id) => {
                let Some(entry) = self.groups.get_mut(&id) else {
                    return false;
                };
                let removed = entry.anchors.shift_remove(&attribute).is_some();
                if entry.anchors.is_empty() {
                    self.groups.shift_remove(&id);
                }
                removed
            }
            None => self.anchors.shift_remove(&attribute).is_some(),
        }
    }

    /// Unconditional declaration for an attribute
    pub fn anchor(&self, attribute: Attribute) -> Option<&Expr> {
        self.anchors.get(&attribute)
    }

    pub fn anchors(&self) -> impl Iterator<Item = (Attribute, &Expr)> {
        self.anchors.iter().map(|(attribute, expr)| (*attribute, expr))
    }

    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &ConditionalGroup)> {
        self.groups.iter().map(|(id, group)| (*id, group))
    }

    pub fn gap(&self) -> Option<f64> {
        self.gap
    }

    pub fn padding(&self) -> Option<f64> {
        self.padding
    }

    pub fn spacing(&self, spacing: Spacing) -> Option<f64> {
        match spacing {
            Spacing::Gap => self.gap,
            Spacing::Padding => self.padding,
        }
    }

    pub fn set_spacing(&mut self, spacing: Spacing, value: Option<f64>) {
        match spacing {
            Spacing::Gap => self.gap = value,
            Spacing::Padding => self.padding = value,
        }
    }

    pub fn actuals(&self) -> &Geometry {
        &self.actuals
    }

    /// Record a size measured by the host. It seeds the cache and is what
    /// an extent falls back to once no declaration drives it.
    pub fn measure(&mut self, width: f64, height: f64) {
        for (attribute, value) in [(Attribute::Width, width), (Attribute::Height, height)] {
            self.measured.set(attribute, value);
            self.actuals.set(attribute, value);
        }
    }

    pub fn measured(&self) -> &Geometry {
        &self.measured
    }

    /// Every element read by a declaration or a group guard
    pub fn references(&self) -> IndexSet<ElementId> {
        let mut out = Vec::new();
        for expr in self.anchors.values() {
            expr.collect_references(&mut out);
        }
        for group in self.groups.values() {
            for guard in &group.guards {
                guard.collect_references(&mut out);
            }
            for expr in group.anchors.values() {
                expr.collect_references(&mut out);
            }
        }
        out.into_iter().collect()
    }

    /// Groups whose guards all hold right now
    pub fn active_groups<'a>(
        &'a self,
        view: &dyn LayoutView,
        element: ElementId,
    ) -> Vec<&'a ConditionalGroup> {
        let ctx = ResolveContext::neutral(view, element);
        self.groups
            .values()
            .filter(|group| group.guards.iter().all(|guard| guard.holds(&ctx)))
            .collect()
    }

    /// Attributes currently declared, unconditionally or in an active group
    pub fn declared(&self, view: &dyn LayoutView, element: ElementId) -> IndexSet<Attribute> {
        let mut declared: IndexSet<Attribute> = self.anchors.keys().copied().collect();
        for group in self.active_groups(view, element) {
            declared.extend(group.anchors.keys().copied());
        }
        declared
    }

    /// Resolve every effective declaration without touching the cache
    ///
    /// An active group's declaration replaces an earlier one for the same
    /// attribute, so each attribute is resolved once per pass. Centers come
    /// last in the result since their setters read this pass's edges.
    pub fn resolve(&self, view: &dyn LayoutView, element: ElementId) -> Resolution {
        let active = self.active_groups(view, element);
        let mut declarations: IndexMap<Attribute, &Expr> = IndexMap::new();
        for (&attribute, expr) in self
            .anchors
            .iter()
            .chain(active.iter().flat_map(|group| group.anchors.iter()))
        {
            declarations.insert(attribute, expr);
        }

        let mut resolution = Resolution {
            pinned: declarations.keys().copied().collect(),
            ..Resolution::default()
        };
        for (attribute, expr) in declarations {
            resolution
                .driven
                .extend(setter_targets(attribute, &resolution.pinned).iter().copied());
            let ctx = ResolveContext::new(view, element, attribute);
            if let Some(value) = expr.resolve(&ctx) {
                resolution.values.push((attribute, value));
            }
        }
        resolution
            .values
            .sort_by_key(|&(attribute, _)| !attribute.is_physical());
        resolution
    }

    /// Apply resolved values through the setter table.
    ///
    /// `container` is the actual geometry of the element's container, needed
    /// to turn trailing coordinates into insets. Attributes that were driven
    /// by the previous pass but by no current declaration are retired first:
    /// a measured width or height returns to its measured value, anything
    /// else is cleared.
    pub fn apply(&mut self, resolution: &Resolution, container: Option<&Geometry>) -> Applied {
        let container_width = container.and_then(|geometry| geometry.width);
        let container_height = container.and_then(|geometry| geometry.height);
        let mut applied = Applied::default();

        for &retired in self.driven.difference(&resolution.driven) {
            match self.measured.get(retired) {
                Some(value) => {
                    if self.actuals.set(retired, value) {
                        applied.changed.push((retired, value));
                    }
                }
                None => {
                    if self.actuals.clear(retired) {
                        applied.cleared.push(retired);
                    }
                }
            }
        }
        self.driven = resolution.driven.clone();

        for &(attribute, value) in &resolution.values {
            let updates = self.setter(
                attribute,
                value,
                &resolution.pinned,
                container_width,
                container_height,
            );
            for (physical, physical_value) in updates {
                if self.actuals.set(physical, physical_value) {
                    applied.changed.push((physical, physical_value));
                }
            }
        }
        applied
    }

    fn setter(
        &self,
        attribute: Attribute,
        value: f64,
        pinned: &IndexSet<Attribute>,
        container_width: Option<f64>,
        container_height: Option<f64>,
    ) -> Vec<(Attribute, f64)> {
        let own = &self.actuals;
        match attribute {
            Attribute::Left | Attribute::Top | Attribute::Width | Attribute::Height => {
                vec![(attribute, value)]
            }
            Attribute::Right => container_width
                .map(|width| vec![(Attribute::Right, width - value)])
                .unwrap_or_default(),
            Attribute::Bottom => container_height
                .map(|height| vec![(Attribute::Bottom, height - value)])
                .unwrap_or_default(),
            Attribute::CenterX => center_setter(
                value,
                Axis {
                    leading: Attribute::Left,
                    trailing: Attribute::Right,
                    extent: Attribute::Width,
                },
                own,
                pinned,
                container_width,
            ),
            Attribute::CenterY => center_setter(
                value,
                Axis {
                    leading: Attribute::Top,
                    trailing: Attribute::Bottom,
                    extent: Attribute::Height,
                },
                own,
                pinned,
                container_height,
            ),
        }
    }
}

/// Physical attributes a declaration writes, given what else is pinned
fn setter_targets(attribute: Attribute, pinned: &IndexSet<Attribute>) -> &'static [Attribute] {
    match attribute {
        Attribute::Left => &[Attribute::Left],
        Attribute::Top => &[Attribute::Top],
        Attribute::Right => &[Attribute::Right],
        Attribute::Bottom => &[Attribute::Bottom],
        Attribute::Width => &[Attribute::Width],
        Attribute::Height => &[Attribute::Height],
        Attribute::CenterX if pinned.contains(&Attribute::Left) || pinned.contains(&Attribute::Right) => {
            &[Attribute::Width]
        }
        Attribute::CenterX => &[Attribute::Left],
        Attribute::CenterY if pinned.contains(&Attribute::Top) || pinned.contains(&Attribute::Bottom) => {
            &[Attribute::Height]
        }
        Attribute::CenterY => &[Attribute::Top],
    }
}

struct Axis {
    leading: Attribute,
    trailing: Attribute,
    extent: Attribute,
}

/// A center either stretches the extent against a pinned edge or moves the
/// leading edge
fn center_setter(
    value: f64,
    axis: Axis,
    own: &Geometry,
    pinned: &IndexSet<Attribute>,
    container_extent: Option<f64>,
) -> Vec<(Attribute, f64)> {
    if pinned.contains(&axis.leading) {
        let leading = own.get(axis.leading).unwrap_or(0.0);
        return vec![(axis.extent, 2.0 * (value - leading))];
    }
    if pinned.contains(&axis.trailing) {
        let Some(container) = container_extent else {
            return Vec::new();
        };
        let inset = own.get(axis.trailing).unwrap_or(0.0);
        return vec![(axis.extent, 2.0 * (container - inset - value))];
    }
    let extent = own.get(axis.extent).unwrap_or(0.0);
    vec![(axis.leading, value - extent / 2.0)]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    struct EmptyView;

    impl LayoutView for EmptyView {
        fn contains(&self, _element: ElementId) -> bool {
            false
        }

        fn parent(&self, _element: ElementId) -> Option<ElementId> {
            None
        }

        fn actuals(&self, _element: ElementId) -> Option<&Geometry> {
            None
        }

        fn gap(&self, _element: ElementId) -> f64 {
            10.0
        }

        fn padding(&self, _element: ElementId) -> f64 {
            0.0
        }
    }

    fn container(width: f64, height: f64) -> Geometry {
        Geometry {
            width: Some(width),
            height: Some(height),
            ..Geometry::default()
        }
    }

    fn recompute(constraints: &mut ElementConstraints, frame: &Geometry) -> Vec<(Attribute, f64)> {
        let resolution = constraints.resolve(&EmptyView, ElementId(1));
        constraints.apply(&resolution, Some(frame)).changed
    }

    #[test]
    fn test_constants_apply_and_suppress_repeats() {
        let mut constraints = ElementConstraints::new();
        constraints.set_anchor(Attribute::Left, 12.0.into(), None);
        constraints.set_anchor(Attribute::Width, 40.0.into(), None);

        let changes = recompute(&mut constraints, &container(100.0, 100.0));
        assert_eq!(changes, vec![(Attribute::Left, 12.0), (Attribute::Width, 40.0)]);
        assert!(recompute(&mut constraints, &container(100.0, 100.0)).is_empty());
    }

    #[test]
    fn test_trailing_edges_become_insets() {
        let mut constraints = ElementConstraints::new();
        constraints.set_anchor(Attribute::Right, 70.0.into(), None);
        constraints.set_anchor(Attribute::Bottom, 20.0.into(), None);
        let changes = recompute(&mut constraints, &container(100.0, 50.0));
        assert_eq!(changes, vec![(Attribute::Right, 30.0), (Attribute::Bottom, 30.0)]);
    }

    #[test]
    fn test_trailing_edge_waits_for_container_extent() {
        let mut constraints = ElementConstraints::new();
        constraints.set_anchor(Attribute::Right, 70.0.into(), None);
        let changes = recompute(&mut constraints, &Geometry::default());
        assert!(changes.is_empty());
    }

    #[test]
    fn test_center_with_pinned_left_sets_width() {
        let mut constraints = ElementConstraints::new();
        constraints.set_anchor(Attribute::Left, 10.0.into(), None);
        constraints.set_anchor(Attribute::CenterX, 60.0.into(), None);
        recompute(&mut constraints, &container(200.0, 100.0));
        assert_eq!(constraints.actuals().width, Some(100.0));
        assert_eq!(constraints.actuals().left, Some(10.0));
    }

    #[test]
    fn test_center_with_pinned_right_sets_width() {
        let mut constraints = ElementConstraints::new();
        constraints.set_anchor(Attribute::Right, 180.0.into(), None);
        constraints.set_anchor(Attribute::CenterX, 150.0.into(), None);
        recompute(&mut constraints, &container(200.0, 100.0));
        assert_eq!(constraints.actuals().right, Some(20.0));
        assert_eq!(constraints.actuals().width, Some(60.0));
    }

    #[test]
    fn test_free_center_moves_leading_edge() {
        let mut constraints = ElementConstraints::new();
        constraints.set_anchor(Attribute::Height, 30.0.into(), None);
        constraints.set_anchor(Attribute::CenterY, 50.0.into(), None);
        recompute(&mut constraints, &container(200.0, 100.0));
        assert_eq!(constraints.actuals().top, Some(35.0));
    }

    #[test]
    fn test_group_declarations_are_separate() {
        let guard = ElementId(0).width().ge(600.0);
        let context = GroupContext {
            id: GroupId(1),
            guards: vec![guard],
        };
        let mut constraints = ElementConstraints::new();
        constraints.set_anchor(Attribute::Left, 5.0.into(), Some(&context));
        assert!(constraints.anchor(Attribute::Left).is_none());
        assert_eq!(constraints.groups().count(), 1);
        assert_eq!(constraints.references().into_iter().collect::<Vec<_>>(), vec![ElementId(0)]);

        // the guard cannot resolve against an empty view, so the group is idle
        assert!(recompute(&mut constraints, &container(100.0, 100.0)).is_empty());

        assert!(constraints.clear_anchor(Attribute::Left, Some(GroupId(1))));
        assert_eq!(constraints.groups().count(), 0);
    }

    #[test]
    fn test_cleared_declaration_retires_its_attribute() {
        let mut constraints = ElementConstraints::new();
        constraints.set_anchor(Attribute::Right, 70.0.into(), None);
        constraints.set_anchor(Attribute::Width, 20.0.into(), None);
        recompute(&mut constraints, &container(100.0, 100.0));
        assert_eq!(constraints.actuals().right, Some(30.0));

        constraints.clear_anchor(Attribute::Right, None);
        let resolution = constraints.resolve(&EmptyView, ElementId(1));
        let applied = constraints.apply(&resolution, Some(&container(100.0, 100.0)));
        assert_eq!(applied.cleared, vec![Attribute::Right]);
        assert!(applied.changed.is_empty());
        assert_eq!(constraints.actuals().right, None);
        assert_eq!(constraints.actuals().width, Some(20.0));
    }

    #[test]
    fn test_retired_extent_returns_to_measured_size() {
        let mut constraints = ElementConstraints::new();
        constraints.measure(50.0, 20.0);
        constraints.set_anchor(Attribute::Width, 80.0.into(), None);
        recompute(&mut constraints, &container(100.0, 100.0));
        assert_eq!(constraints.actuals().width, Some(80.0));

        constraints.clear_anchor(Attribute::Width, None);
        let resolution = constraints.resolve(&EmptyView, ElementId(1));
        let applied = constraints.apply(&resolution, Some(&container(100.0, 100.0)));
        assert_eq!(applied.changed, vec![(Attribute::Width, 50.0)]);
        assert!(applied.cleared.is_empty());
        assert_eq!(constraints.measured().width, Some(50.0));
    }

    #[test]
    fn test_center_reads_edges_set_in_the_same_pass() {
        let mut constraints = ElementConstraints::new();
        constraints.set_anchor(Attribute::CenterX, 100.0.into(), None);
        constraints.set_anchor(Attribute::Left, 10.0.into(), None);

        let changes = recompute(&mut constraints, &container(400.0, 100.0));
        assert_eq!(changes, vec![(Attribute::Left, 10.0), (Attribute::Width, 180.0)]);
        assert!(recompute(&mut constraints, &container(400.0, 100.0)).is_empty());
    }

    #[test]
    fn test_unresolved_declaration_keeps_last_value() {
        let mut constraints = ElementConstraints::new();
        constraints.set_anchor(Attribute::Left, 5.0.into(), None);
        recompute(&mut constraints, &container(100.0, 100.0));
        // now reads an element the view does not know
        constraints.set_anchor(Attribute::Left, ElementId(7).left(), None);
        let resolution = constraints.resolve(&EmptyView, ElementId(1));
        let applied = constraints.apply(&resolution, Some(&container(100.0, 100.0)));
        assert_eq!(applied, Applied::default());
        assert_eq!(constraints.actuals().left, Some(5.0));
    }

    #[test]
    fn test_spacing_round_trip() {
        let mut constraints = ElementConstraints::new();
        constraints.set_spacing(Spacing::Gap, Some(4.0));
        assert_eq!(constraints.gap(), Some(4.0));
        assert_eq!(constraints.spacing(Spacing::Padding), None);
        constraints.set_spacing(Spacing::Gap, None);
        assert_eq!(constraints.gap(), None);
    }
}
