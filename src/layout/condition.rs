//! Conditional constraint groups
//!
//! A [`ConditionScope`] tags every declaration made through it with the
//! conjunction of its guards and those of every enclosing scope. The guards
//! are re-evaluated on each recompute, so a group's anchors contribute only
//! while all of them hold.

use super::dock::Dock;
use super::error::LayoutError;
use super::expr::{Expr, Guard, Predicate};
use super::tree::LayoutTree;
use super::types::{Attribute, ElementId};

/// Identity of one conditional group, unique within its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) u64);

/// The group a declaration belongs to and the guards that activate it
#[derive(Debug, Clone, PartialEq)]
pub struct GroupContext {
    pub id: GroupId,
    pub guards: Vec<Predicate>,
}

/// Stack of entered guard frames
#[derive(Debug, Clone, Default)]
pub struct ConditionStack {
    frames: Vec<(GroupId, Vec<Predicate>)>,
}

impl ConditionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, id: GroupId, predicates: Vec<Predicate>) {
        self.frames.push((id, predicates));
    }

    pub fn exit(&mut self) -> Option<GroupId> {
        self.frames.pop().map(|(id, _)| id)
    }

    /// Innermost group, guarded by every frame's predicates
    pub fn current(&self) -> Option<GroupContext> {
        let (id, _) = self.frames.last()?;
        let guards = self
            .frames
            .iter()
            .flat_map(|(_, predicates)| predicates.iter().cloned())
            .collect();
        Some(GroupContext { id: *id, guards })
    }
}

/// Handle for declaring anchors that only apply while a guard holds
///
/// Created with [`LayoutTree::when`]. Nest with [`ConditionScope::when`].
pub struct ConditionScope<'t> {
    tree: &'t LayoutTree,
    stack: ConditionStack,
}

impl<'t> ConditionScope<'t> {
    pub(crate) fn new(tree: &'t LayoutTree, stack: ConditionStack) -> Self {
        Self { tree, stack }
    }

    /// Scope whose guard is this scope's guard and `guard`
    pub fn when(&self, guard: impl Into<Guard>) -> ConditionScope<'t> {
        let mut stack = self.stack.clone();
        stack.enter(self.tree.next_group_id(), guard.into().predicates);
        ConditionScope::new(self.tree, stack)
    }

    pub fn group(&self) -> Option<GroupId> {
        self.stack.current().map(|context| context.id)
    }

    pub fn set_anchor(
        &self,
        element: ElementId,
        attribute: Attribute,
        value: impl Into<Expr>,
    ) -> Result<(), LayoutError> {
        self.tree
            .declare(element, attribute, Some(value.into()), self.stack.current())
    }

    pub fn clear_anchor(&self, element: ElementId, attribute: Attribute) -> Result<(), LayoutError> {
        self.tree.declare(element, attribute, None, self.stack.current())
    }

    pub fn dock(&self, element: ElementId, dock: Dock, target: ElementId) -> Result<(), LayoutError> {
        self.tree.dock_in(element, dock, target, self.stack.current())
    }

    pub fn align(
        &self,
        element: ElementId,
        attribute: Attribute,
        others: &[ElementId],
    ) -> Result<(), LayoutError> {
        self.tree
            .align_in(element, attribute, others, self.stack.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_flattens_guards_by_conjunction() {
        let root = ElementId(0);
        let mut stack = ConditionStack::new();
        assert!(stack.current().is_none());

        stack.enter(GroupId(1), vec![root.width().ge(600.0)]);
        stack.enter(GroupId(2), vec![root.height().lt(400.0)]);
        let context = stack.current().unwrap();
        assert_eq!(context.id, GroupId(2));
        assert_eq!(
            context.guards,
            vec![root.width().ge(600.0), root.height().lt(400.0)]
        );

        assert_eq!(stack.exit(), Some(GroupId(2)));
        let context = stack.current().unwrap();
        assert_eq!(context.id, GroupId(1));
        assert_eq!(context.guards.len(), 1);
        assert_eq!(stack.exit(), Some(GroupId(1)));
        assert_eq!(stack.exit(), None);
    }
}
