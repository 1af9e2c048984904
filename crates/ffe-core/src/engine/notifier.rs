use super::picking::Measurement;
use super::selection::HighlightChange;
use crate::core::models::ids::NodeId;
use std::sync::Arc;

/// Snapshot handed to observers after a reconciliation.
///
/// All three fields are taken from the same, fully reconciled state.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionUpdate {
    pub changes: Vec<HighlightChange>,
    pub selection: Vec<NodeId>,
    pub active_system: Option<NodeId>,
}

/// A dependent view (status line, keyword editor, renderer overlay).
///
/// Observers are called while the explorer lock is held and must not call back
/// into the explorer. They should tolerate receiving the same state twice.
pub trait SelectionObserver: Send + Sync {
    fn on_active_system_changed(&self, system: Option<NodeId>);

    fn on_selection_changed(&self, update: &SelectionUpdate);

    fn on_measurement(&self, _measurement: &Measurement) {}
}

#[derive(Default)]
pub struct ActiveSystemNotifier {
    observers: Vec<Arc<dyn SelectionObserver>>,
}

impl ActiveSystemNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Arc<dyn SelectionObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    #[inline]
    pub fn active_system_changed(&self, system: Option<NodeId>) {
        for observer in &self.observers {
            observer.on_active_system_changed(system);
        }
    }

    #[inline]
    pub fn selection_changed(&self, update: &SelectionUpdate) {
        for observer in &self.observers {
            observer.on_selection_changed(update);
        }
    }

    #[inline]
    pub fn measured(&self, measurement: &Measurement) {
        for observer in &self.observers {
            observer.on_measurement(measurement);
        }
    }
}
