use super::config::HighlightModel;
use crate::core::models::hierarchy::Hierarchy;
use crate::core::models::ids::NodeId;
use crate::core::models::node::Kind;
use crate::core::models::path::NodePath;
use tracing::{debug, trace};

/// A selection delta as reported by a tree widget.
///
/// Added and removed paths may be redundant with each other or with paths that
/// are already selected; [`SelectionTree::reconcile`] sorts that out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeSelectionEvent {
    pub added: Vec<NodePath>,
    pub removed: Vec<NodePath>,
    /// The widget's focus node, used to pick the active system.
    pub lead: Option<NodeId>,
}

impl TreeSelectionEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, path: NodePath) -> Self {
        self.added.push(path);
        self
    }

    pub fn remove(mut self, path: NodePath) -> Self {
        self.removed.push(path);
        self
    }

    pub fn with_lead(mut self, lead: NodeId) -> Self {
        self.lead = Some(lead);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.lead.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HighlightChange {
    pub node: NodeId,
    pub highlighted: bool,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Nodes whose visual highlight flipped, removals first.
    pub changes: Vec<HighlightChange>,
    pub selection_changed: bool,
    pub active_changed: bool,
}

/// The canonical multi-selection over a [`Hierarchy`] and the active system.
///
/// The selected paths are kept non-redundant: no path is an ancestor of
/// another. Every selected terminal node carries `selected = true` in the
/// hierarchy; no other node does.
#[derive(Debug, Clone, Default)]
pub struct SelectionTree {
    paths: Vec<NodePath>,
    active_system: Option<NodeId>,
    highlight_model: HighlightModel,
    /// Nodes last reported as highlighted under [`HighlightModel::Inherited`].
    lit: Vec<NodeId>,
}

/// Keeps only the paths not covered by another path in the list. Of two equal
/// paths the first one survives; an ancestor always beats its descendants no
/// matter which comes first.
fn remove_redundant(paths: Vec<NodePath>) -> Vec<NodePath> {
    let mut keep = vec![true; paths.len()];
    for i in 0..paths.len() {
        if !keep[i] {
            continue;
        }
        for j in 0..paths.len() {
            if i != j && keep[j] && paths[i].covers(&paths[j]) {
                keep[j] = false;
            }
        }
    }
    paths
        .into_iter()
        .zip(keep)
        .filter_map(|(path, kept)| kept.then_some(path))
        .collect()
}

fn terminals(paths: &[NodePath]) -> Vec<NodeId> {
    paths.iter().filter_map(NodePath::terminal).collect()
}

impl SelectionTree {
    pub fn new(highlight_model: HighlightModel) -> Self {
        Self {
            paths: Vec::new(),
            active_system: None,
            highlight_model,
            lit: Vec::new(),
        }
    }

    pub fn highlight_model(&self) -> HighlightModel {
        self.highlight_model
    }

    pub fn paths(&self) -> &[NodePath] {
        &self.paths
    }

    /// Terminal nodes of the selected paths, in selection order.
    pub fn selection(&self) -> Vec<NodeId> {
        terminals(&self.paths)
    }

    pub fn active_system(&self) -> Option<NodeId> {
        self.active_system
    }

    pub fn contains_path(&self, path: &NodePath) -> bool {
        self.paths.contains(path)
    }

    /// Whether any selected path is `path` or one of its ancestors.
    pub fn covers(&self, path: &NodePath) -> bool {
        self.paths.iter().any(|p| p.covers(path))
    }

    /// Whether `path` is the one and only selected path.
    pub fn is_sole_selection(&self, path: &NodePath) -> bool {
        self.paths.len() == 1 && self.paths[0] == *path
    }

    /// An event that replaces the whole selection with `path`.
    pub fn replace_with(&self, path: NodePath) -> TreeSelectionEvent {
        let lead = path.terminal();
        TreeSelectionEvent {
            added: vec![path],
            removed: self.paths.clone(),
            lead,
        }
    }

    /// An event that flips `path` in or out of the selection.
    pub fn toggle(&self, path: NodePath) -> TreeSelectionEvent {
        let lead = path.terminal();
        if self.contains_path(&path) {
            TreeSelectionEvent {
                added: Vec::new(),
                removed: vec![path],
                lead,
            }
        } else {
            TreeSelectionEvent {
                added: vec![path],
                removed: Vec::new(),
                lead,
            }
        }
    }

    /// Folds a widget event into the canonical selection.
    ///
    /// Stale paths in the event are skipped. Returns `None` for an empty event,
    /// which leaves everything untouched.
    pub fn reconcile(
        &mut self,
        hierarchy: &mut Hierarchy,
        event: &TreeSelectionEvent,
    ) -> Option<Reconciliation> {
        if event.is_empty() {
            return None;
        }

        let live = |paths: &[NodePath]| -> Vec<NodePath> {
            paths
                .iter()
                .filter(|path| {
                    let ok = hierarchy.is_live_path(path);
                    if !ok {
                        trace!(?path, "Skipping stale path in selection event");
                    }
                    ok
                })
                .cloned()
                .collect()
        };
        let added = remove_redundant(live(&event.added));
        let removed = remove_redundant(live(&event.removed));

        let previous = std::mem::take(&mut self.paths);
        let mut next: Vec<NodePath> = previous
            .iter()
            .filter(|path| hierarchy.is_live_path(path))
            .filter(|path| !removed.iter().any(|r| r.covers(path)))
            .cloned()
            .collect();

        for path in &added {
            if next.iter().any(|p| p.covers(path)) {
                continue;
            }
            next.retain(|p| !path.covers(p));
            next.push(path.clone());
        }
        self.paths = next;
        debug_assert!(
            self.is_canonical(),
            "selection contains a path and one of its ancestors"
        );

        let changes = match self.highlight_model {
            HighlightModel::Exclusive => self.exclusive_changes(hierarchy, &previous),
            HighlightModel::Inherited => {
                self.inherited_changes(hierarchy, &previous, &added, &removed)
            }
        };
        self.sync_flags(hierarchy, &previous);

        let active_changed = event
            .lead
            .and_then(|lead| hierarchy.enclosing_system(lead))
            .filter(|&system| !hierarchy.is_stale(system))
            .is_some_and(|system| self.assign_active(system));

        let outcome = Reconciliation {
            changes,
            selection_changed: previous != self.paths,
            active_changed,
        };
        debug!(
            added = added.len(),
            removed = removed.len(),
            selected = self.paths.len(),
            changed = outcome.changes.len(),
            active_changed,
            "Reconciled tree selection event"
        );
        Some(outcome)
    }

    /// Makes `system` the active system. `None` clears it; nodes that are not
    /// attached systems are ignored. Returns whether the active system changed.
    pub fn set_active_system(&mut self, hierarchy: &Hierarchy, system: Option<NodeId>) -> bool {
        match system {
            None => {
                let changed = self.active_system.is_some();
                self.active_system = None;
                changed
            }
            Some(id) => {
                if hierarchy.kind_of(id) != Some(Kind::System) || hierarchy.is_stale(id) {
                    trace!(?id, "Ignoring activation of a node that is not an attached system");
                    return false;
                }
                self.assign_active(id)
            }
        }
    }

    /// Drops every selected path through `system` (already extracted from the
    /// hierarchy) and re-targets the active system if it was the one removed.
    pub fn forget_system(&mut self, hierarchy: &Hierarchy, system: NodeId) -> Reconciliation {
        let before = self.paths.len();
        self.paths
            .retain(|path| !path.contains(system) && hierarchy.is_live_path(path));
        self.lit.retain(|&node| !hierarchy.is_stale(node));

        let mut active_changed = false;
        if self.active_system == Some(system)
            || self.active_system.is_some_and(|s| hierarchy.is_stale(s))
        {
            self.active_system = hierarchy.systems().first().copied();
            active_changed = true;
        }

        Reconciliation {
            changes: Vec::new(),
            selection_changed: before != self.paths.len(),
            active_changed,
        }
    }

    fn assign_active(&mut self, system: NodeId) -> bool {
        if self.active_system == Some(system) {
            return false;
        }
        self.active_system = Some(system);
        true
    }

    fn exclusive_changes(&self, hierarchy: &Hierarchy, previous: &[NodePath]) -> Vec<HighlightChange> {
        let old = terminals(previous);
        let new = self.selection();
        let removed = old
            .iter()
            .filter(|node| !new.contains(node) && hierarchy.contains(**node))
            .map(|&node| HighlightChange {
                node,
                highlighted: false,
            });
        let added = new
            .iter()
            .filter(|node| !old.contains(node))
            .map(|&node| HighlightChange {
                node,
                highlighted: true,
            });
        removed.chain(added).collect()
    }

    /// Lit nodes go dark once nothing covers them, even when their own path
    /// was swallowed by an ancestor earlier. Unlit nodes light up only when
    /// their coverage flips.
    fn inherited_changes(
        &mut self,
        hierarchy: &Hierarchy,
        previous: &[NodePath],
        added: &[NodePath],
        removed: &[NodePath],
    ) -> Vec<HighlightChange> {
        self.lit.retain(|&node| !hierarchy.is_stale(node));

        let mut candidates: Vec<NodeId> = self.lit.clone();
        for node in terminals(removed)
            .into_iter()
            .chain(terminals(previous))
            .chain(terminals(added))
            .chain(self.selection())
        {
            if !candidates.contains(&node) {
                candidates.push(node);
            }
        }

        let mut changes = Vec::new();
        for node in candidates {
            let Some(path) = hierarchy.path_of(node) else {
                continue;
            };
            let after = self.covers(&path);
            let was_lit = self.lit.contains(&node);
            if was_lit && !after {
                changes.push(HighlightChange {
                    node,
                    highlighted: false,
                });
            } else if !was_lit && after && !previous.iter().any(|p| p.covers(&path)) {
                changes.push(HighlightChange {
                    node,
                    highlighted: true,
                });
            }
        }

        for change in &changes {
            if change.highlighted {
                self.lit.push(change.node);
            } else {
                self.lit.retain(|&node| node != change.node);
            }
        }
        changes.sort_by_key(|change| change.highlighted);
        changes
    }

    fn sync_flags(&self, hierarchy: &mut Hierarchy, previous: &[NodePath]) {
        for node in terminals(previous) {
            hierarchy.set_selected(node, false);
        }
        for node in self.selection() {
            hierarchy.set_selected(node, true);
        }
    }

    fn is_canonical(&self) -> bool {
        self.paths.iter().enumerate().all(|(i, p)| {
            self.paths
                .iter()
                .enumerate()
                .all(|(j, q)| i == j || !p.covers(q))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::node::{AtomData, SystemData};
    use nalgebra::Point3;

    struct Fixture {
        hierarchy: Hierarchy,
        s1: NodeId,
        s2: NodeId,
        residue: NodeId,
        a: NodeId,
        b: NodeId,
        c: NodeId,
    }

    fn build() -> Fixture {
        let mut hierarchy = Hierarchy::new();
        let s1 = hierarchy.create_system("S1", SystemData::default());
        let residue = hierarchy.add_residue(s1, "GLY1").unwrap();
        let a = hierarchy
            .add_atom(residue, "A", AtomData::new(Point3::origin()))
            .unwrap();
        let b = hierarchy
            .add_atom(residue, "B", AtomData::new(Point3::new(1.0, 0.0, 0.0)))
            .unwrap();
        let c = hierarchy
            .add_atom(s1, "C", AtomData::new(Point3::new(2.0, 0.0, 0.0)))
            .unwrap();
        hierarchy.add_bond(residue, [a, b]).unwrap();
        hierarchy.attach_system(s1).unwrap();

        let s2 = hierarchy.create_system("S2", SystemData::default());
        hierarchy
            .add_atom(s2, "X", AtomData::new(Point3::origin()))
            .unwrap();
        hierarchy.attach_system(s2).unwrap();

        Fixture {
            hierarchy,
            s1,
            s2,
            residue,
            a,
            b,
            c,
        }
    }

    fn path(f: &Fixture, id: NodeId) -> NodePath {
        f.hierarchy.path_of(id).unwrap()
    }

    fn change(node: NodeId, highlighted: bool) -> HighlightChange {
        HighlightChange { node, highlighted }
    }

    mod reconciliation {
        use super::*;

        #[test]
        fn selecting_an_atom_activates_its_system() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Exclusive);
            let event = TreeSelectionEvent::new().add(path(&f, f.a)).with_lead(f.a);

            let outcome = tree.reconcile(&mut f.hierarchy, &event).unwrap();

            assert_eq!(tree.paths(), &[path(&f, f.a)]);
            assert_eq!(tree.active_system(), Some(f.s1));
            assert_eq!(outcome.changes, vec![change(f.a, true)]);
            assert!(outcome.selection_changed);
            assert!(outcome.active_changed);
            assert!(f.hierarchy.node(f.a).unwrap().is_selected());
        }

        #[test]
        fn selecting_the_system_subsumes_the_atom() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Exclusive);
            let first = TreeSelectionEvent::new().add(path(&f, f.a)).with_lead(f.a);
            tree.reconcile(&mut f.hierarchy, &first).unwrap();

            let second = TreeSelectionEvent::new().add(path(&f, f.s1)).with_lead(f.s1);
            let outcome = tree.reconcile(&mut f.hierarchy, &second).unwrap();

            assert_eq!(tree.paths(), &[path(&f, f.s1)]);
            assert_eq!(outcome.changes, vec![change(f.a, false), change(f.s1, true)]);
            assert!(!outcome.active_changed);
            assert!(!f.hierarchy.node(f.a).unwrap().is_selected());
            assert!(f.hierarchy.node(f.s1).unwrap().is_selected());
        }

        #[test]
        fn selecting_a_covered_descendant_is_a_no_op() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Exclusive);
            let select_residue = TreeSelectionEvent::new().add(path(&f, f.residue));
            tree.reconcile(&mut f.hierarchy, &select_residue).unwrap();
            let before = tree.paths().to_vec();

            let redundant = TreeSelectionEvent::new().add(path(&f, f.b));
            let outcome = tree.reconcile(&mut f.hierarchy, &redundant).unwrap();

            assert_eq!(tree.paths(), before.as_slice());
            assert!(outcome.changes.is_empty());
            assert!(!outcome.selection_changed);
        }

        #[test]
        fn removing_an_ancestor_cascades_to_known_descendants() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Exclusive);
            let event = TreeSelectionEvent::new()
                .add(path(&f, f.a))
                .add(path(&f, f.b))
                .add(path(&f, f.c));
            tree.reconcile(&mut f.hierarchy, &event).unwrap();
            assert_eq!(tree.paths().len(), 3);

            let removal = TreeSelectionEvent::new().remove(path(&f, f.residue));
            let outcome = tree.reconcile(&mut f.hierarchy, &removal).unwrap();

            assert_eq!(tree.paths(), &[path(&f, f.c)]);
            assert_eq!(outcome.changes, vec![change(f.a, false), change(f.b, false)]);
        }

        #[test]
        fn ancestor_wins_regardless_of_order_within_one_event() {
            let mut f = build();
            for descendant_first in [true, false] {
                let mut tree = SelectionTree::new(HighlightModel::Exclusive);
                let event = if descendant_first {
                    TreeSelectionEvent::new()
                        .add(path(&f, f.a))
                        .add(path(&f, f.s1))
                } else {
                    TreeSelectionEvent::new()
                        .add(path(&f, f.s1))
                        .add(path(&f, f.a))
                };
                tree.reconcile(&mut f.hierarchy, &event).unwrap();
                assert_eq!(tree.paths(), &[path(&f, f.s1)]);
            }
        }

        #[test]
        fn duplicate_paths_collapse() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Exclusive);
            let event = TreeSelectionEvent::new()
                .add(path(&f, f.c))
                .add(path(&f, f.c));
            let outcome = tree.reconcile(&mut f.hierarchy, &event).unwrap();
            assert_eq!(tree.paths().len(), 1);
            assert_eq!(outcome.changes, vec![change(f.c, true)]);
        }

        #[test]
        fn empty_event_changes_nothing() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Exclusive);
            let select_a = TreeSelectionEvent::new().add(path(&f, f.a));
            tree.reconcile(&mut f.hierarchy, &select_a);
            assert!(
                tree.reconcile(&mut f.hierarchy, &TreeSelectionEvent::new())
                    .is_none()
            );
            assert_eq!(tree.paths(), &[path(&f, f.a)]);
        }

        #[test]
        fn stale_paths_are_skipped() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Exclusive);
            let x = f.hierarchy.find_by_names(&["S2", "X"]).unwrap();
            let stale = path(&f, x);
            f.hierarchy.extract_system(f.s2).unwrap();

            let event = TreeSelectionEvent::new()
                .add(stale)
                .add(path(&f, f.c))
                .with_lead(x);
            let outcome = tree.reconcile(&mut f.hierarchy, &event).unwrap();

            assert_eq!(tree.paths(), &[path(&f, f.c)]);
            assert_eq!(outcome.changes, vec![change(f.c, true)]);
            assert_eq!(tree.active_system(), None);
        }

        #[test]
        fn selecting_root_subsumes_everything_without_changing_active() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Exclusive);
            let initial = TreeSelectionEvent::new()
                .add(path(&f, f.a))
                .add(path(&f, f.s2))
                .with_lead(f.a);
            tree.reconcile(&mut f.hierarchy, &initial);

            let root = f.hierarchy.root();
            let select_all = TreeSelectionEvent::new()
                .add(NodePath::new(vec![root]))
                .with_lead(root);
            let outcome = tree.reconcile(&mut f.hierarchy, &select_all).unwrap();

            assert_eq!(tree.selection(), vec![root]);
            assert_eq!(tree.active_system(), Some(f.s1));
            assert!(!outcome.active_changed);
        }

        #[test]
        fn removal_and_addition_in_one_event() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Exclusive);
            let select_a = TreeSelectionEvent::new().add(path(&f, f.a));
            tree.reconcile(&mut f.hierarchy, &select_a);
            let replace = tree.replace_with(path(&f, f.b));
            let outcome = tree.reconcile(&mut f.hierarchy, &replace).unwrap();
            assert_eq!(tree.paths(), &[path(&f, f.b)]);
            assert_eq!(outcome.changes, vec![change(f.a, false), change(f.b, true)]);
        }

        #[test]
        fn selection_stays_non_redundant_over_a_random_walk() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Exclusive);
            let nodes = [f.s1, f.residue, f.a, f.b, f.c, f.s2, f.hierarchy.root()];
            let mut state: u64 = 0x2545_f491_4f6c_dd1d;
            for _ in 0..200 {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let node = nodes[(state % nodes.len() as u64) as usize];
                let p = f.hierarchy.path_of(node).unwrap();
                let event = if state & 0x100 == 0 {
                    TreeSelectionEvent::new().add(p)
                } else {
                    TreeSelectionEvent::new().remove(p)
                };
                tree.reconcile(&mut f.hierarchy, &event);
                assert!(tree.is_canonical());
                let flagged: Vec<NodeId> = nodes
                    .iter()
                    .copied()
                    .filter(|&n| f.hierarchy.node(n).unwrap().is_selected())
                    .collect();
                let mut selected = tree.selection();
                selected.sort();
                let mut flagged_sorted = flagged;
                flagged_sorted.sort();
                assert_eq!(selected, flagged_sorted);
            }
        }
    }

    mod inherited_highlights {
        use super::*;

        #[test]
        fn subsumed_descendant_keeps_its_highlight() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Inherited);
            let first = TreeSelectionEvent::new().add(path(&f, f.a));
            let outcome = tree.reconcile(&mut f.hierarchy, &first).unwrap();
            assert_eq!(outcome.changes, vec![change(f.a, true)]);

            let second = TreeSelectionEvent::new().add(path(&f, f.s1));
            let outcome = tree.reconcile(&mut f.hierarchy, &second).unwrap();
            assert_eq!(tree.paths(), &[path(&f, f.s1)]);
            assert_eq!(outcome.changes, vec![change(f.s1, true)]);
        }

        #[test]
        fn removed_node_still_covered_by_new_ancestor_does_not_flip() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Inherited);
            let select_a = TreeSelectionEvent::new().add(path(&f, f.a));
            tree.reconcile(&mut f.hierarchy, &select_a);
            let event = TreeSelectionEvent::new()
                .remove(path(&f, f.a))
                .add(path(&f, f.residue));
            let outcome = tree.reconcile(&mut f.hierarchy, &event).unwrap();
            assert_eq!(outcome.changes, vec![change(f.residue, true)]);
        }

        #[test]
        fn clearing_the_ancestor_unhighlights_it() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Inherited);
            let select = TreeSelectionEvent::new().add(path(&f, f.residue));
            tree.reconcile(&mut f.hierarchy, &select);
            let clear = TreeSelectionEvent::new().remove(path(&f, f.residue));
            let outcome = tree.reconcile(&mut f.hierarchy, &clear).unwrap();
            assert!(tree.paths().is_empty());
            assert_eq!(outcome.changes, vec![change(f.residue, false)]);
        }

        #[test]
        fn swallowed_descendant_goes_dark_with_its_ancestor() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Inherited);
            let select_a = TreeSelectionEvent::new().add(path(&f, f.a));
            tree.reconcile(&mut f.hierarchy, &select_a);
            let select_s1 = TreeSelectionEvent::new().add(path(&f, f.s1));
            tree.reconcile(&mut f.hierarchy, &select_s1);
            assert_eq!(tree.paths(), &[path(&f, f.s1)]);

            let clear = TreeSelectionEvent::new().remove(path(&f, f.s1));
            let outcome = tree.reconcile(&mut f.hierarchy, &clear).unwrap();

            assert!(tree.paths().is_empty());
            assert_eq!(outcome.changes, vec![change(f.a, false), change(f.s1, false)]);

            let again = TreeSelectionEvent::new().add(path(&f, f.s1));
            let outcome = tree.reconcile(&mut f.hierarchy, &again).unwrap();
            assert_eq!(outcome.changes, vec![change(f.s1, true)]);
        }

        #[test]
        fn detaching_drops_lit_nodes_of_the_system() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Inherited);
            let x = f.hierarchy.find_by_names(&["S2", "X"]).unwrap();
            let select_x = TreeSelectionEvent::new().add(path(&f, x));
            tree.reconcile(&mut f.hierarchy, &select_x);

            f.hierarchy.extract_system(f.s2).unwrap();
            tree.forget_system(&f.hierarchy, f.s2);

            let select_c = TreeSelectionEvent::new().add(path(&f, f.c));
            let outcome = tree.reconcile(&mut f.hierarchy, &select_c).unwrap();
            assert_eq!(outcome.changes, vec![change(f.c, true)]);
        }
    }

    mod active_system {
        use super::*;

        #[test]
        fn explicit_activation_ignores_non_systems() {
            let f = build();
            let mut tree = SelectionTree::new(HighlightModel::Exclusive);
            assert!(!tree.set_active_system(&f.hierarchy, Some(f.a)));
            assert!(tree.set_active_system(&f.hierarchy, Some(f.s2)));
            assert!(!tree.set_active_system(&f.hierarchy, Some(f.s2)));
            assert!(tree.set_active_system(&f.hierarchy, None));
            assert_eq!(tree.active_system(), None);
        }

        #[test]
        fn forgetting_the_active_system_falls_back_to_first_remaining() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Exclusive);
            let select_c = TreeSelectionEvent::new().add(path(&f, f.c)).with_lead(f.c);
            tree.reconcile(&mut f.hierarchy, &select_c);
            tree.set_active_system(&f.hierarchy, Some(f.s2));

            f.hierarchy.extract_system(f.s2).unwrap();
            let outcome = tree.forget_system(&f.hierarchy, f.s2);
            assert!(outcome.active_changed);
            assert!(!outcome.selection_changed);
            assert_eq!(tree.active_system(), Some(f.s1));

            f.hierarchy.extract_system(f.s1).unwrap();
            let outcome = tree.forget_system(&f.hierarchy, f.s1);
            assert!(outcome.active_changed);
            assert!(outcome.selection_changed);
            assert_eq!(tree.active_system(), None);
            assert!(tree.paths().is_empty());
        }

        #[test]
        fn toggle_builds_add_or_remove_events() {
            let mut f = build();
            let mut tree = SelectionTree::new(HighlightModel::Exclusive);
            let on = tree.toggle(path(&f, f.b));
            assert_eq!(on.added, vec![path(&f, f.b)]);
            tree.reconcile(&mut f.hierarchy, &on);
            let off = tree.toggle(path(&f, f.b));
            assert_eq!(off.removed, vec![path(&f, f.b)]);
            assert_eq!(off.lead, Some(f.b));
        }
    }
}
