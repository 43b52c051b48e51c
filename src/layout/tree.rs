//! Layout tree
//!
//! A [`LayoutTree`] owns one root container, every element placed under it
//! (or created detached), the dependency graph between them and the update
//! queue that serializes all mutations. Mutating methods take `&self` and may
//! be called from any thread; each one queues its events, applies the queue
//! under the state lock and returns the outcome of its own events.
//!
//! Host updates produced while applying are collected as notices and
//! delivered once the state lock is released, so host callbacks may call
//! back into the tree.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace, warn};

use super::condition::{ConditionScope, ConditionStack, GroupContext, GroupId};
use super::config::LayoutConfig;
use super::constraints::ElementConstraints;
use super::dock::Dock;
use super::error::LayoutError;
use super::expr::{Expr, Guard};
use super::graph::DependencyGraph;
use super::host::Host;
use super::resolve::LayoutView;
use super::scheduler::UpdateScheduler;
use super::types::{Attribute, ElementId, ElementKind, Geometry, Spacing};

/// One queued mutation
#[derive(Debug)]
pub(crate) enum Event {
    SetAnchor {
        element: ElementId,
        attribute: Attribute,
        value: Option<Expr>,
        group: Option<GroupContext>,
        recompute: bool,
    },
    SetSpacing {
        element: ElementId,
        spacing: Spacing,
        value: Option<f64>,
    },
    Resize {
        element: ElementId,
        width: f64,
        height: f64,
    },
    Recompute {
        element: ElementId,
    },
    /// Recompute and resend the whole cached geometry
    Refresh {
        element: ElementId,
    },
    Remove {
        element: ElementId,
    },
}

/// Host callback recorded under the state lock
#[derive(Debug, Clone, Copy, PartialEq)]
enum Notice {
    Set {
        element: ElementId,
        attribute: Attribute,
        value: f64,
    },
    Clear {
        element: ElementId,
        attribute: Attribute,
    },
    Redraw,
}

#[derive(Debug)]
struct Node {
    name: Option<String>,
    kind: ElementKind,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    constraints: ElementConstraints,
}

impl Node {
    fn new(kind: ElementKind, parent: Option<ElementId>) -> Self {
        Self {
            name: None,
            kind,
            parent,
            children: Vec::new(),
            constraints: ElementConstraints::new(),
        }
    }
}

/// Everything guarded by the scheduler's state lock
#[derive(Debug)]
pub(crate) struct LayoutState {
    config: LayoutConfig,
    root: ElementId,
    nodes: Vec<Option<Node>>,
    names: IndexMap<String, ElementId>,
    graph: DependencyGraph,
    redraw: bool,
    notices: Vec<Notice>,
}

impl LayoutView for LayoutState {
    fn contains(&self, element: ElementId) -> bool {
        self.node(element).is_some()
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.node(element)?.parent
    }

    fn actuals(&self, element: ElementId) -> Option<&Geometry> {
        self.node(element).map(|node| node.constraints.actuals())
    }

    fn gap(&self, element: ElementId) -> f64 {
        self.node(element)
            .and_then(|node| node.constraints.gap())
            .unwrap_or(self.config.default_gap)
    }

    fn padding(&self, element: ElementId) -> f64 {
        self.node(element)
            .and_then(|node| node.constraints.padding())
            .unwrap_or(self.config.default_padding)
    }
}

impl LayoutState {
    fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            root: ElementId(0),
            nodes: vec![Some(Node::new(ElementKind::Container, None))],
            names: IndexMap::new(),
            graph: DependencyGraph::new(),
            redraw: false,
            notices: Vec::new(),
        }
    }

    fn node(&self, element: ElementId) -> Option<&Node> {
        self.nodes.get(element.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, element: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(element.0).and_then(Option::as_mut)
    }

    fn require(&self, element: ElementId) -> Result<&Node, LayoutError> {
        self.node(element)
            .ok_or_else(|| LayoutError::unknown_element(element))
    }

    fn require_mut(&mut self, element: ElementId) -> Result<&mut Node, LayoutError> {
        self.node_mut(element)
            .ok_or_else(|| LayoutError::unknown_element(element))
    }

    fn is_within(&self, element: ElementId, ancestor: ElementId) -> bool {
        let mut current = Some(element);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// `element` and all of its descendants, parents before children
    fn subtree(&self, element: ElementId) -> Vec<ElementId> {
        let mut out = vec![element];
        let mut index = 0;
        while index < out.len() {
            if let Some(node) = self.node(out[index]) {
                out.extend(node.children.iter().copied());
            }
            index += 1;
        }
        out
    }

    /// Sources an element would have with these declarations and this parent
    fn sources_for(
        &self,
        constraints: &ElementConstraints,
        parent: Option<ElementId>,
    ) -> IndexSet<ElementId> {
        let mut sources: IndexSet<ElementId> = constraints
            .references()
            .into_iter()
            .filter(|&id| self.contains(id))
            .collect();
        if let Some(parent) = parent {
            sources.insert(parent);
        }
        sources
    }

    fn check_parent(
        &self,
        element: ElementId,
        parent: ElementId,
    ) -> Result<(), LayoutError> {
        let target = self.require(parent)?;
        if element == self.root {
            return Err(LayoutError::invalid_parent(
                element,
                parent,
                "the root container cannot be re-parented",
            ));
        }
        if target.kind != ElementKind::Container {
            return Err(LayoutError::invalid_parent(element, parent, "not a container"));
        }
        if element == parent {
            return Err(LayoutError::invalid_parent(
                element,
                parent,
                "an element cannot contain itself",
            ));
        }
        if self.is_within(parent, element) {
            return Err(LayoutError::invalid_parent(
                element,
                parent,
                "the parent is inside the element",
            ));
        }
        Ok(())
    }

    fn add(&mut self, kind: ElementKind, parent: ElementId) -> Result<ElementId, LayoutError> {
        let element = ElementId(self.nodes.len());
        self.check_parent(element, parent)?;
        self.nodes.push(Some(Node::new(kind, Some(parent))));
        self.graph.replace_sources(element, IndexSet::from([parent]))?;
        if let Some(node) = self.node_mut(parent) {
            node.children.push(element);
        }
        debug!(element:%, parent:%, kind:?; "added element");
        Ok(element)
    }

    fn add_detached(&mut self, kind: ElementKind) -> ElementId {
        let element = ElementId(self.nodes.len());
        self.nodes.push(Some(Node::new(kind, None)));
        debug!(element:%, kind:?; "added detached element");
        element
    }

    fn attach(&mut self, element: ElementId, parent: ElementId) -> Result<(), LayoutError> {
        let node = self.require(element)?;
        self.check_parent(element, parent)?;
        let previous = node.parent;
        let sources = self.sources_for(&node.constraints, Some(parent));
        self.graph.replace_sources(element, sources)?;

        if let Some(previous) = previous {
            if let Some(old) = self.node_mut(previous) {
                old.children.retain(|&child| child != element);
            }
        }
        if let Some(new) = self.node_mut(parent) {
            new.children.push(element);
        }
        self.require_mut(element)?.parent = Some(parent);
        debug!(element:%, parent:%; "attached element");
        Ok(())
    }

    fn set_name(&mut self, element: ElementId, name: String) -> Result<(), LayoutError> {
        let node = self.require_mut(element)?;
        let previous = node.name.replace(name.clone());
        if let Some(previous) = previous {
            self.names.shift_remove(&previous);
        }
        self.names.insert(name, element);
        Ok(())
    }

    // ========================================================================
    // Event application
    // ========================================================================

    /// Apply one event. `host` is only asked about liveness here; updates
    /// for it are recorded in `notices`.
    fn apply(&mut self, event: Event, host: &dyn Host) -> Result<(), LayoutError> {
        match event {
            Event::SetAnchor {
                element,
                attribute,
                value,
                group,
                recompute,
            } => {
                let node = self.require(element)?;
                let mut next = node.constraints.clone();
                match value {
                    Some(value) => {
                        trace!(element:%, attribute:%, value:%; "declare anchor");
                        next.set_anchor(attribute, value, group.as_ref());
                    }
                    None => {
                        next.clear_anchor(attribute, group.as_ref().map(|context| context.id));
                    }
                }
                let sources = self.sources_for(&next, node.parent);
                self.graph.replace_sources(element, sources)?;
                self.require_mut(element)?.constraints = next;

                if recompute && host.is_live(element) {
                    self.recompute_from(element, host);
                }
            }
            Event::SetSpacing {
                element,
                spacing,
                value,
            } => {
                self.require_mut(element)?
                    .constraints
                    .set_spacing(spacing, value);
                self.recompute_from(element, host);
            }
            Event::Resize {
                element,
                width,
                height,
            } => {
                self.require_mut(element)?
                    .constraints
                    .measure(width, height);
                debug!(element:%, width, height; "resized element");
                self.recompute_from(element, host);
            }
            Event::Recompute { element } => {
                self.require(element)?;
                self.recompute_from(element, host);
            }
            Event::Refresh { element } => {
                // Resend what was cached while offline; the recompute then
                // sends only what moves.
                let geometry = *self.require(element)?.constraints.actuals();
                if host.is_live(element) {
                    self.notices
                        .extend(geometry.iter().map(|(attribute, value)| Notice::Set {
                            element,
                            attribute,
                            value,
                        }));
                    self.redraw = true;
                }
                self.recompute_from(element, host);
            }
            Event::Remove { element } => self.remove(element, host)?,
        }
        Ok(())
    }

    /// Recompute `element` and then everything downstream of it
    fn recompute_from(&mut self, element: ElementId, host: &dyn Host) {
        let order = self.graph.downstream_order(element);
        debug!(element:%, count = order.len(); "recompute pass");
        for id in order {
            self.recompute_one(id, host);
        }
    }

    fn recompute_one(&mut self, element: ElementId, host: &dyn Host) {
        let Some(node) = self.node(element) else {
            return;
        };
        let resolution = node.constraints.resolve(&*self, element);
        let container = node
            .parent
            .and_then(|parent| self.node(parent))
            .map(|parent| *parent.constraints.actuals());
        let Some(node) = self.node_mut(element) else {
            return;
        };
        let applied = node.constraints.apply(&resolution, container.as_ref());

        if !host.is_live(element) {
            return;
        }
        self.redraw = true;
        for (attribute, value) in applied.changed {
            trace!(element:%, attribute:%, value; "physical update");
            self.notices.push(Notice::Set {
                element,
                attribute,
                value,
            });
        }
        for attribute in applied.cleared {
            trace!(element:%, attribute:%; "physical attribute retired");
            self.notices.push(Notice::Clear { element, attribute });
        }
    }

    fn remove(&mut self, element: ElementId, host: &dyn Host) -> Result<(), LayoutError> {
        if element == self.root {
            return Err(LayoutError::invalid_parent(
                element,
                element,
                "the root container cannot be removed",
            ));
        }
        let parent = self.require(element)?.parent;
        let subtree = self.subtree(element);
        let mut former: IndexSet<ElementId> = IndexSet::new();
        for &member in &subtree {
            former.extend(
                self.graph
                    .dependents(member)
                    .filter(|dependent| !subtree.contains(dependent)),
            );
        }

        if let Some(parent) = parent.and_then(|parent| self.node_mut(parent)) {
            parent.children.retain(|&child| child != element);
        }
        for &member in &subtree {
            self.graph.remove_node(member);
            if let Some(node) = self.nodes.get_mut(member.0).and_then(Option::take) {
                if let Some(name) = node.name {
                    self.names.shift_remove(&name);
                }
            }
        }
        debug!(element:%, removed = subtree.len(); "removed subtree");

        for dependent in former {
            self.recompute_from(dependent, host);
        }
        Ok(())
    }

    /// Notices of everything applied since the last call, closed by at
    /// most one redraw
    fn take_notices(&mut self) -> Vec<Notice> {
        if std::mem::take(&mut self.redraw) {
            self.notices.push(Notice::Redraw);
        }
        std::mem::take(&mut self.notices)
    }
}

// ============================================================================
// Public surface
// ============================================================================

/// One tree of anchored elements with its own update queue
pub struct LayoutTree {
    host: Arc<dyn Host>,
    root: ElementId,
    next_group: AtomicU64,
    scheduler: UpdateScheduler<LayoutState, Event, LayoutError>,
    /// Notices waiting for delivery, in the order they were produced
    outbox: Mutex<VecDeque<Notice>>,
    /// Held by the caller currently delivering notices
    delivering: Mutex<()>,
}

impl LayoutTree {
    /// Create a tree with an empty root container and default settings
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self::with_config(host, LayoutConfig::default())
    }

    pub fn with_config(host: Arc<dyn Host>, config: LayoutConfig) -> Self {
        let state = LayoutState::new(config);
        let root = state.root;
        Self {
            host,
            root,
            next_group: AtomicU64::new(0),
            scheduler: UpdateScheduler::new(state),
            outbox: Mutex::new(VecDeque::new()),
            delivering: Mutex::new(()),
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn config(&self) -> LayoutConfig {
        self.scheduler.with_state(|state| state.config.clone())
    }

    pub(crate) fn next_group_id(&self) -> GroupId {
        GroupId(self.next_group.fetch_add(1, Ordering::Relaxed))
    }

    fn outbox(&self) -> MutexGuard<'_, VecDeque<Notice>> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `events` with everything else queued, then deliver the notices.
    /// Returns the first error raised by these events.
    fn submit(&self, events: Vec<Event>) -> Result<(), LayoutError> {
        let host = self.host.as_ref();
        let result = self.scheduler.submit(
            events,
            |state, event| {
                state.apply(event, host).map_err(|err| {
                    warn!(error:% = err; "layout event rejected");
                    err
                })
            },
            |state| self.outbox().extend(state.take_notices()),
        );
        self.deliver();
        result
    }

    /// Hand queued notices to the host, one deliverer at a time.
    ///
    /// A caller that finds delivery under way, including a host callback
    /// that mutated the tree, returns at once: the deliverer re-checks the
    /// outbox after letting go, so notices keep their order and none are
    /// stranded. Redraws requested during one round are sent once at its end.
    fn deliver(&self) {
        loop {
            let turn = match self.delivering.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            };
            let mut redraw = false;
            loop {
                let next = self.outbox().pop_front();
                let Some(notice) = next else { break };
                match notice {
                    Notice::Set {
                        element,
                        attribute,
                        value,
                    } => self.host.set_physical_attribute(element, attribute, value),
                    Notice::Clear { element, attribute } => {
                        self.host.clear_physical_attribute(element, attribute)
                    }
                    Notice::Redraw => redraw = true,
                }
            }
            if redraw {
                self.host.request_redraw();
            }
            drop(turn);

            if self.outbox().is_empty() {
                return;
            }
        }
    }

    // ========================================================================
    // Structure
    // ========================================================================

    /// Add a plain element inside `parent`
    pub fn add_element(&self, parent: ElementId) -> Result<ElementId, LayoutError> {
        self.scheduler
            .with_state(|state| state.add(ElementKind::Element, parent))
    }

    /// Add a container inside `parent`
    pub fn add_container(&self, parent: ElementId) -> Result<ElementId, LayoutError> {
        self.scheduler
            .with_state(|state| state.add(ElementKind::Container, parent))
    }

    /// Create an element outside the tree; anchors can be declared on it
    /// before it is attached
    pub fn add_detached(&self, kind: ElementKind) -> ElementId {
        self.scheduler.with_state(|state| state.add_detached(kind))
    }

    /// Place `element` inside `parent`, moving it out of any previous parent
    pub fn attach(&self, element: ElementId, parent: ElementId) -> Result<(), LayoutError> {
        self.scheduler
            .with_state(|state| state.attach(element, parent))?;
        self.submit(vec![Event::Recompute { element }])
    }

    /// Remove an element and everything inside it
    pub fn remove(&self, element: ElementId) -> Result<(), LayoutError> {
        self.submit(vec![Event::Remove { element }])
    }

    pub fn set_name(&self, element: ElementId, name: impl Into<String>) -> Result<(), LayoutError> {
        let name = name.into();
        self.scheduler
            .with_state(|state| state.set_name(element, name))
    }

    pub fn find(&self, name: &str) -> Option<ElementId> {
        self.scheduler
            .with_state(|state| state.names.get(name).copied())
    }

    pub fn name(&self, element: ElementId) -> Option<String> {
        self.scheduler
            .with_state(|state| state.node(element).and_then(|node| node.name.clone()))
    }

    /// Every element in creation order
    pub fn elements(&self) -> Vec<ElementId> {
        self.scheduler.with_state(|state| {
            state
                .nodes
                .iter()
                .enumerate()
                .filter(|(_, node)| node.is_some())
                .map(|(index, _)| ElementId(index))
                .collect()
        })
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Declare `attribute` of `element` as a constant or an expression
    pub fn set_anchor(
        &self,
        element: ElementId,
        attribute: Attribute,
        value: impl Into<Expr>,
    ) -> Result<(), LayoutError> {
        self.declare(element, attribute, Some(value.into()), None)
    }

    /// Remove the unconditional declaration of `attribute`
    pub fn clear_anchor(&self, element: ElementId, attribute: Attribute) -> Result<(), LayoutError> {
        self.declare(element, attribute, None, None)
    }

    pub(crate) fn declare(
        &self,
        element: ElementId,
        attribute: Attribute,
        value: Option<Expr>,
        group: Option<GroupContext>,
    ) -> Result<(), LayoutError> {
        self.submit(vec![Event::SetAnchor {
            element,
            attribute,
            value,
            group,
            recompute: true,
        }])
    }

    pub fn set_gap(&self, element: ElementId, gap: f64) -> Result<(), LayoutError> {
        self.set_spacing(element, Spacing::Gap, Some(gap))
    }

    pub fn set_padding(&self, element: ElementId, padding: f64) -> Result<(), LayoutError> {
        self.set_spacing(element, Spacing::Padding, Some(padding))
    }

    /// Set `gap` or `padding` by name
    pub fn set_attribute(&self, element: ElementId, name: &str, value: f64) -> Result<(), LayoutError> {
        let spacing: Spacing = name.parse()?;
        self.set_spacing(element, spacing, Some(value))
    }

    /// Set or unset gap or padding; unset values use the configured defaults
    pub fn set_spacing(
        &self,
        element: ElementId,
        spacing: Spacing,
        value: Option<f64>,
    ) -> Result<(), LayoutError> {
        self.submit(vec![Event::SetSpacing {
            element,
            spacing,
            value,
        }])
    }

    /// Expand a dock against `target` and recompute once
    pub fn dock(&self, element: ElementId, dock: Dock, target: ElementId) -> Result<(), LayoutError> {
        self.dock_in(element, dock, target, None)
    }

    pub(crate) fn dock_in(
        &self,
        element: ElementId,
        dock: Dock,
        target: ElementId,
        group: Option<GroupContext>,
    ) -> Result<(), LayoutError> {
        let assignments = dock.expand(target);
        self.batch(element, assignments, group)
    }

    /// Anchor `attribute` to the same attribute of each listed element in
    /// turn; the last one listed is the one left declared
    pub fn align(
        &self,
        element: ElementId,
        attribute: Attribute,
        others: &[ElementId],
    ) -> Result<(), LayoutError> {
        self.align_in(element, attribute, others, None)
    }

    pub(crate) fn align_in(
        &self,
        element: ElementId,
        attribute: Attribute,
        others: &[ElementId],
        group: Option<GroupContext>,
    ) -> Result<(), LayoutError> {
        if others.is_empty() {
            return Ok(());
        }
        let assignments = others
            .iter()
            .map(|other| (attribute, other.attr(attribute)))
            .collect();
        self.batch(element, assignments, group)
    }

    /// Queue one set per assignment and a single trailing recompute
    fn batch(
        &self,
        element: ElementId,
        assignments: Vec<(Attribute, Expr)>,
        group: Option<GroupContext>,
    ) -> Result<(), LayoutError> {
        let mut events: Vec<Event> = assignments
            .into_iter()
            .map(|(attribute, value)| Event::SetAnchor {
                element,
                attribute,
                value: Some(value),
                group: group.clone(),
                recompute: false,
            })
            .collect();
        events.push(Event::Recompute { element });
        self.submit(events)
    }

    /// Open a conditional scope: declarations made through it apply only
    /// while `guard` holds
    pub fn when(&self, guard: impl Into<Guard>) -> ConditionScope<'_> {
        let mut stack = ConditionStack::new();
        stack.enter(self.next_group_id(), guard.into().predicates);
        ConditionScope::new(self, stack)
    }

    /// Deliver a measured size, as a host does when an element is resized
    pub fn resize(&self, element: ElementId, width: f64, height: f64) -> Result<(), LayoutError> {
        self.submit(vec![Event::Resize {
            element,
            width,
            height,
        }])
    }

    /// Recompute an element and resend its whole cached geometry, used once
    /// it becomes live
    pub fn refresh(&self, element: ElementId) -> Result<(), LayoutError> {
        self.submit(vec![Event::Refresh { element }])
    }

    // ========================================================================
    // Queries
    //
    // These block on the state lock, so `Host::is_live` must not call them.
    // ========================================================================

    pub fn contains(&self, element: ElementId) -> bool {
        self.scheduler.with_state(|state| state.contains(element))
    }

    /// Cached physical geometry
    pub fn geometry(&self, element: ElementId) -> Option<Geometry> {
        self.scheduler
            .with_state(|state| state.actuals(element).copied())
    }

    /// One cached physical attribute; centers are not cached and read `None`
    pub fn actual(&self, element: ElementId, attribute: Attribute) -> Option<f64> {
        self.geometry(element)?.get(attribute)
    }

    /// Unconditional declaration of an attribute
    pub fn anchor(&self, element: ElementId, attribute: Attribute) -> Option<Expr> {
        self.scheduler.with_state(|state| {
            state
                .node(element)
                .and_then(|node| node.constraints.anchor(attribute).cloned())
        })
    }

    /// Effective gap, including the configured default
    pub fn gap(&self, element: ElementId) -> Option<f64> {
        self.scheduler
            .with_state(|state| state.contains(element).then(|| LayoutView::gap(state, element)))
    }

    /// Effective padding, including the configured default
    pub fn padding(&self, element: ElementId) -> Option<f64> {
        self.scheduler.with_state(|state| {
            state
                .contains(element)
                .then(|| LayoutView::padding(state, element))
        })
    }

    pub fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.scheduler
            .with_state(|state| LayoutView::parent(state, element))
    }

    pub fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.scheduler.with_state(|state| {
            state
                .node(element)
                .map(|node| node.children.clone())
                .unwrap_or_default()
        })
    }

    pub fn kind(&self, element: ElementId) -> Option<ElementKind> {
        self.scheduler
            .with_state(|state| state.node(element).map(|node| node.kind))
    }

    /// Whether every attribute the dock implies is currently declared
    pub fn check_dock(&self, element: ElementId, dock: Dock) -> bool {
        self.scheduler.with_state(|state| {
            let Some(node) = state.node(element) else {
                return false;
            };
            let declared = node.constraints.declared(&*state, element);
            dock.attributes()
                .iter()
                .all(|attribute| declared.contains(attribute))
        })
    }
}

impl std::fmt::Debug for LayoutTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutTree")
            .field("root", &self.root)
            .field("pending", &self.scheduler.pending())
            .finish_non_exhaustive()
    }
}
