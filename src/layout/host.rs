//! Rendering surface seen by the layout engine

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use super::types::{Attribute, ElementId};

/// Surface that displays elements and receives resolved geometry
///
/// `set_physical_attribute`, `clear_physical_attribute` and
/// `request_redraw` are delivered after the tree's state lock is released, so
/// they may call any [`LayoutTree`](super::LayoutTree) method, structural
/// changes and queries included. Updates caused by such a call are delivered
/// after the current callback returns.
pub trait Host: Send + Sync {
    /// Whether the element is currently displayed
    ///
    /// Consulted while the state lock is held; must not call into the tree.
    fn is_live(&self, element: ElementId) -> bool;

    /// Receive one changed physical attribute
    fn set_physical_attribute(&self, element: ElementId, attribute: Attribute, value: f64);

    /// Drop a physical attribute no declaration drives any more
    fn clear_physical_attribute(&self, _element: ElementId, _attribute: Attribute) {}

    /// Ask for one repaint after a batch of updates
    fn request_redraw(&self);
}

/// One physical update delivered to a [`RecordingHost`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostCall {
    pub element: ElementId,
    pub attribute: Attribute,
    pub value: f64,
}

#[derive(Debug, Default)]
struct Recorded {
    calls: Vec<HostCall>,
    cleared: Vec<(ElementId, Attribute)>,
    redraws: usize,
    offline: HashSet<ElementId>,
}

/// Host that records every callback, used by the CLI and in tests
///
/// Elements are live unless marked otherwise with [`RecordingHost::set_live`].
#[derive(Debug, Default)]
pub struct RecordingHost {
    inner: Mutex<Recorded>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_live(&self, element: ElementId, live: bool) {
        let mut recorded = self.recorded();
        if live {
            recorded.offline.remove(&element);
        } else {
            recorded.offline.insert(element);
        }
    }

    /// Every physical update so far, in delivery order
    pub fn calls(&self) -> Vec<HostCall> {
        self.recorded().calls.clone()
    }

    /// Updates delivered for one element
    pub fn calls_for(&self, element: ElementId) -> Vec<HostCall> {
        self.recorded()
            .calls
            .iter()
            .filter(|call| call.element == element)
            .copied()
            .collect()
    }

    /// Drain the recorded updates
    pub fn take_calls(&self) -> Vec<HostCall> {
        std::mem::take(&mut self.recorded().calls)
    }

    /// Attributes the engine asked to drop, in delivery order
    pub fn cleared(&self) -> Vec<(ElementId, Attribute)> {
        self.recorded().cleared.clone()
    }

    pub fn redraws(&self) -> usize {
        self.recorded().redraws
    }
}

impl Host for RecordingHost {
    fn is_live(&self, element: ElementId) -> bool {
        !self.recorded().offline.contains(&element)
    }

    fn set_physical_attribute(&self, element: ElementId, attribute: Attribute, value: f64) {
        self.recorded().calls.push(HostCall {
            element,
            attribute,
            value,
        });
    }

    fn clear_physical_attribute(&self, element: ElementId, attribute: Attribute) {
        self.recorded().cleared.push((element, attribute));
    }

    fn request_redraw(&self) {
        self.recorded().redraws += 1;
    }
}
