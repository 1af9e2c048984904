use crate::core::models::hierarchy::Hierarchy;
use crate::core::models::ids::NodeId;
use crate::core::models::node::Kind;
use crate::core::models::path::NodePath;
use crate::engine::collaborators::{RayCaster, Renderer};
use crate::engine::config::ExplorerConfig;
use crate::engine::error::EngineError;
use crate::engine::notifier::{ActiveSystemNotifier, SelectionObserver, SelectionUpdate};
use crate::engine::picking::{PickAction, PickLevel, PickStateMachine};
use crate::engine::selection::{Reconciliation, SelectionTree, TreeSelectionEvent};
use crate::engine::teardown::TeardownWorker;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument};

/// Everything guarded by the explorer lock.
struct ExplorerState {
    hierarchy: Hierarchy,
    selection: SelectionTree,
    picking: PickStateMachine,
    notifier: ActiveSystemNotifier,
}

impl ExplorerState {
    /// Reconciles `event`, pushes highlight changes to the renderer and notifies
    /// observers once the new state is complete.
    fn apply(
        &mut self,
        renderer: &dyn Renderer,
        event: &TreeSelectionEvent,
    ) -> Option<Reconciliation> {
        let outcome = self.selection.reconcile(&mut self.hierarchy, event)?;
        for change in &outcome.changes {
            renderer.set_highlight(change.node, change.highlighted);
        }
        self.publish(&outcome, true);
        Some(outcome)
    }

    fn publish(&self, outcome: &Reconciliation, always_selection: bool) {
        let active = self.selection.active_system();
        if outcome.active_changed {
            info!(active = ?active.map(|s| self.hierarchy.display_path(s)), "Active system changed");
            self.notifier.active_system_changed(active);
        }
        if always_selection || outcome.selection_changed {
            self.notifier.selection_changed(&SelectionUpdate {
                changes: outcome.changes.clone(),
                selection: self.selection.selection(),
                active_system: active,
            });
        }
    }
}

/// The selection-and-picking core of the explorer.
///
/// Tree events, viewport picks, attach, detach and activation may arrive from
/// any thread. Each entry point holds one lock for its whole duration, so
/// observers only ever see fully reconciled state. Observers are called with
/// that lock held and must not call back into the explorer.
pub struct Explorer {
    state: Mutex<ExplorerState>,
    renderer: Arc<dyn Renderer>,
    ray_caster: Arc<dyn RayCaster>,
    config: ExplorerConfig,
    teardown: TeardownWorker,
}

impl Explorer {
    pub fn new(
        config: ExplorerConfig,
        renderer: Arc<dyn Renderer>,
        ray_caster: Arc<dyn RayCaster>,
    ) -> Result<Self, EngineError> {
        let teardown = TeardownWorker::spawn(renderer.clone())?;
        let state = ExplorerState {
            hierarchy: Hierarchy::new(),
            selection: SelectionTree::new(config.highlight_model),
            picking: PickStateMachine::new(config.default_pick_level, config.vertices_per_atom),
            notifier: ActiveSystemNotifier::new(),
        };
        Ok(Self {
            state: Mutex::new(state),
            renderer,
            ray_caster,
            config,
            teardown,
        })
    }

    fn lock(&self) -> MutexGuard<'_, ExplorerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn subscribe(&self, observer: Arc<dyn SelectionObserver>) {
        self.lock().notifier.subscribe(observer);
    }

    /// Runs `f` with mutable access to the tree, e.g. to build a system before
    /// attaching it. Attach and detach are only available through the explorer.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Hierarchy) -> R) -> R {
        f(&mut self.lock().hierarchy)
    }

    pub fn read<R>(&self, f: impl FnOnce(&Hierarchy) -> R) -> R {
        f(&self.lock().hierarchy)
    }

    /// Attaches a built system as the last child of the root and makes it the
    /// sole selection and the active system.
    #[instrument(skip_all, name = "attach_system")]
    pub fn attach(&self, system: NodeId) -> Result<(), EngineError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.hierarchy.attach_system(system)?;
        if self.config.parallel_execution {
            state.hierarchy.set_parallel(system, true);
        }
        info!(system = %state.hierarchy.display_path(system), "System attached");

        let path = state
            .hierarchy
            .path_of(system)
            .ok_or(EngineError::NotAttachedSystem(system))?;
        let event = state.selection.replace_with(path);
        state.apply(self.renderer.as_ref(), &event);
        Ok(())
    }

    /// Unlinks an attached system and hands it to the teardown worker.
    ///
    /// The subtree is stale as soon as this returns, but its renderer resources
    /// may still be in the process of being released.
    #[instrument(skip_all, name = "detach_system")]
    pub fn detach(&self, system: NodeId) -> Result<(), EngineError> {
        let detached = {
            let mut guard = self.lock();
            let state = &mut *guard;
            if state.hierarchy.kind_of(system) != Some(Kind::System)
                || state.hierarchy.is_stale(system)
            {
                return Err(EngineError::NotAttachedSystem(system));
            }
            let detached = state.hierarchy.extract_system(system)?;
            let outcome = state.selection.forget_system(&state.hierarchy, system);
            state.picking.forget_stale(&state.hierarchy);
            info!(system = %detached.name, nodes = detached.nodes.len(), "System detached");
            state.publish(&outcome, false);
            detached
        };
        self.teardown.dispatch(detached);
        Ok(())
    }

    /// Delivers a tree-widget selection delta. Returns `None` for an empty event.
    #[instrument(skip_all, name = "tree_selection")]
    pub fn deliver_tree_event(&self, event: &TreeSelectionEvent) -> Option<Reconciliation> {
        self.lock().apply(self.renderer.as_ref(), event)
    }

    /// Selects the root, which subsumes every other selection.
    pub fn select_all(&self) -> Option<Reconciliation> {
        let mut guard = self.lock();
        let root = guard.hierarchy.root();
        let event = TreeSelectionEvent::new().add(NodePath::new(vec![root]));
        guard.apply(self.renderer.as_ref(), &event)
    }

    /// Interprets a click at a screen coordinate.
    #[instrument(skip_all, name = "viewport_pick")]
    pub fn pick(&self, screen_x: i32, screen_y: i32, modifier: bool) -> PickAction {
        let mut guard = self.lock();
        let state = &mut *guard;
        let hit = self.ray_caster.pick_closest(screen_x, screen_y);
        let action = state.picking.pick(
            &state.hierarchy,
            &state.selection,
            self.renderer.as_ref(),
            hit,
            modifier,
        );
        debug!(x = screen_x, y = screen_y, ?action, "Pick handled");
        match &action {
            PickAction::Select { event, .. } => {
                state.apply(self.renderer.as_ref(), event);
            }
            PickAction::Measured(measurement) => state.notifier.measured(measurement),
            _ => {}
        }
        action
    }

    pub fn set_pick_level(&self, level: PickLevel) {
        self.lock().picking.set_level(level, self.renderer.as_ref());
    }

    /// Activates `system` explicitly. Non-systems and stale nodes are ignored.
    /// Returns whether the active system changed.
    pub fn set_active_system(&self, system: Option<NodeId>) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;
        let changed = state.selection.set_active_system(&state.hierarchy, system);
        if changed {
            state.publish(
                &Reconciliation {
                    active_changed: true,
                    ..Reconciliation::default()
                },
                false,
            );
        }
        changed
    }

    pub fn selection(&self) -> Vec<NodeId> {
        self.lock().selection.selection()
    }

    pub fn selected_paths(&self) -> Vec<NodePath> {
        self.lock().selection.paths().to_vec()
    }

    pub fn active_system(&self) -> Option<NodeId> {
        self.lock().selection.active_system()
    }

    pub fn pick_level(&self) -> PickLevel {
        self.lock().picking.level()
    }

    pub fn measurement_cache(&self) -> Vec<NodeId> {
        self.lock().picking.measurement_cache()
    }
}
