//! Dependency tracking between elements
//!
//! An edge `source -> dependent` means the dependent has at least one
//! declaration that reads the source. Every child also depends on its
//! container. The graph is kept acyclic: an edge that would close a loop is
//! rejected before the declaration that needs it is stored.

use indexmap::{IndexMap, IndexSet};

use super::error::LayoutError;
use super::types::ElementId;

#[derive(Debug, Default)]
pub struct DependencyGraph {
    dependents: IndexMap<ElementId, IndexSet<ElementId>>,
    sources: IndexMap<ElementId, IndexSet<ElementId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elements that read from `source`
    pub fn dependents(&self, source: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.dependents.get(&source).into_iter().flatten().copied()
    }

    /// Elements `dependent` reads from
    pub fn sources(&self, dependent: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.sources.get(&dependent).into_iter().flatten().copied()
    }

    /// Replace the full set of sources for `dependent`.
    ///
    /// Nothing changes when any new edge would create a cycle; the error
    /// carries the loop starting and ending at `dependent`.
    pub fn replace_sources(
        &mut self,
        dependent: ElementId,
        sources: IndexSet<ElementId>,
    ) -> Result<(), LayoutError> {
        for &source in &sources {
            if let Some(cycle) = self.cycle_through(source, dependent) {
                return Err(LayoutError::cyclic(cycle));
            }
        }

        if let Some(previous) = self.sources.shift_remove(&dependent) {
            for source in previous {
                if let Some(set) = self.dependents.get_mut(&source) {
                    set.shift_remove(&dependent);
                }
            }
        }
        for &source in &sources {
            self.dependents.entry(source).or_default().insert(dependent);
        }
        if !sources.is_empty() {
            self.sources.insert(dependent, sources);
        }
        Ok(())
    }

    /// Loop that adding `source -> dependent` would close, if any
    fn cycle_through(&self, source: ElementId, dependent: ElementId) -> Option<Vec<ElementId>> {
        if source == dependent {
            return Some(vec![dependent, dependent]);
        }
        let mut path = vec![dependent];
        let mut visited = IndexSet::new();
        if self.find_path(dependent, source, &mut path, &mut visited) {
            // path runs dependent -> .. -> source; the new edge closes it
            path.push(dependent);
            Some(path)
        } else {
            None
        }
    }

    fn find_path(
        &self,
        from: ElementId,
        to: ElementId,
        path: &mut Vec<ElementId>,
        visited: &mut IndexSet<ElementId>,
    ) -> bool {
        if !visited.insert(from) {
            return false;
        }
        for next in self.dependents(from) {
            path.push(next);
            if next == to || self.find_path(next, to, path, visited) {
                return true;
            }
            path.pop();
        }
        false
    }

    /// `start` followed by everything downstream of it, each element after
    /// all of its sources that are also downstream of `start`
    pub fn downstream_order(&self, start: ElementId) -> Vec<ElementId> {
        let mut visited = IndexSet::new();
        let mut postorder = Vec::new();
        self.visit(start, &mut visited, &mut postorder);
        postorder.reverse();
        postorder
    }

    fn visit(&self, node: ElementId, visited: &mut IndexSet<ElementId>, out: &mut Vec<ElementId>) {
        if !visited.insert(node) {
            return;
        }
        for next in self.dependents(node) {
            self.visit(next, visited, out);
        }
        out.push(node);
    }

    /// Drop every edge touching `element`
    pub fn remove_node(&mut self, element: ElementId) {
        if let Some(sources) = self.sources.shift_remove(&element) {
            for source in sources {
                if let Some(set) = self.dependents.get_mut(&source) {
                    set.shift_remove(&element);
                }
            }
        }
        if let Some(dependents) = self.dependents.shift_remove(&element) {
            for dependent in dependents {
                if let Some(set) = self.sources.get_mut(&dependent) {
                    set.shift_remove(&element);
                }
            }
        }
    }
}
