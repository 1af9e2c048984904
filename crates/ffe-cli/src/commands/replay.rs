use crate::cli::ReplayArgs;
use crate::config::PartialExplorerConfig;
use crate::error::{CliError, Result};
use crate::script::{Session, Step};
use ffexplorer::core::models::hierarchy::{DetachedSystem, Hierarchy};
use ffexplorer::core::models::ids::NodeId;
use ffexplorer::core::models::path::NodePath;
use ffexplorer::core::utils::geometry::RigidTransform;
use ffexplorer::engine::collaborators::{ColorModel, PickHit, RayCaster, Renderer};
use ffexplorer::engine::config::ExplorerConfig;
use ffexplorer::engine::notifier::{SelectionObserver, SelectionUpdate};
use ffexplorer::engine::picking::{Measurement, PickAction};
use ffexplorer::engine::selection::TreeSelectionEvent;
use ffexplorer::workflows::explorer::Explorer;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, trace, warn};

/// Shared, append-only list of output lines.
#[derive(Default)]
struct Transcript {
    lines: Mutex<Vec<String>>,
}

impl Transcript {
    fn push(&self, line: impl Into<String>) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.into());
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Serves the world transforms declared in the script and logs draw calls.
#[derive(Default)]
struct RecordingRenderer {
    transforms: Mutex<HashMap<NodeId, RigidTransform>>,
}

impl RecordingRenderer {
    fn place(&self, system: NodeId, transform: RigidTransform) {
        self.transforms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(system, transform);
    }
}

impl Renderer for RecordingRenderer {
    fn set_highlight(&self, node: NodeId, highlighted: bool) {
        trace!(?node, highlighted, "set_highlight");
    }

    fn recolor(&self, node: NodeId, color: ColorModel) {
        trace!(?node, ?color, "recolor");
    }

    fn world_transform(&self, system: NodeId) -> RigidTransform {
        self.transforms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&system)
            .copied()
            .unwrap_or_default()
    }

    fn release(&self, system: &DetachedSystem) {
        self.transforms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&system.id);
        debug!(system = %system.name, nodes = system.nodes.len(), "Released detached system");
    }
}

/// Returns whatever hit the current step armed it with, once.
#[derive(Default)]
struct ScriptedRayCaster {
    armed: Mutex<Option<PickHit>>,
}

impl ScriptedRayCaster {
    fn arm(&self, hit: Option<PickHit>) {
        *self.armed.lock().unwrap_or_else(PoisonError::into_inner) = hit;
    }
}

impl RayCaster for ScriptedRayCaster {
    fn pick_closest(&self, _screen_x: i32, _screen_y: i32) -> Option<PickHit> {
        self.armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

struct TranscriptObserver {
    names: Arc<HashMap<NodeId, String>>,
    transcript: Arc<Transcript>,
}

impl TranscriptObserver {
    fn name(&self, node: NodeId) -> &str {
        self.names.get(&node).map(String::as_str).unwrap_or("<unknown>")
    }
}

impl SelectionObserver for TranscriptObserver {
    fn on_active_system_changed(&self, system: Option<NodeId>) {
        let name = system.map_or("none", |s| self.name(s));
        self.transcript.push(format!("  active system: {name}"));
    }

    fn on_selection_changed(&self, update: &SelectionUpdate) {
        let selection: Vec<&str> = update.selection.iter().map(|&n| self.name(n)).collect();
        let changes: Vec<String> = update
            .changes
            .iter()
            .map(|c| format!("{}{}", if c.highlighted { '+' } else { '-' }, self.name(c.node)))
            .collect();
        let changes = if changes.is_empty() {
            "none".to_string()
        } else {
            changes.join(" ")
        };
        self.transcript.push(format!(
            "  selection: [{}] highlight: {}",
            selection.join(", "),
            changes
        ));
    }

    fn on_measurement(&self, measurement: &Measurement) {
        let atoms: Vec<&str> = measurement.atoms.iter().map(|&a| self.name(a)).collect();
        self.transcript.push(format!(
            "  measured {} between [{}]",
            measurement,
            atoms.join(", ")
        ));
    }
}

fn resolve(explorer: &Explorer, name_path: &str) -> Option<NodeId> {
    let names: Vec<&str> = name_path.split('/').collect();
    explorer.read(|tree| tree.find_by_names(&names))
}

fn node_names(tree: &Hierarchy, systems: &[NodeId]) -> HashMap<NodeId, String> {
    let root = tree.root();
    let mut names = HashMap::new();
    if let Some(node) = tree.node(root) {
        names.insert(root, node.name.clone());
    }
    for &system in systems {
        for node in tree.descendants(system) {
            names.insert(node, tree.display_path(node));
        }
    }
    names
}

struct Replay<'a> {
    explorer: &'a Explorer,
    ray_caster: &'a ScriptedRayCaster,
    systems: HashMap<String, NodeId>,
    names: Arc<HashMap<NodeId, String>>,
    transcript: Arc<Transcript>,
}

impl Replay<'_> {
    fn name(&self, node: NodeId) -> &str {
        self.names.get(&node).map(String::as_str).unwrap_or("<unknown>")
    }

    fn system(&self, name: &str) -> Result<NodeId> {
        self.systems
            .get(name)
            .copied()
            .ok_or_else(|| CliError::Script(format!("unknown system '{}'", name)))
    }

    fn path(&self, name_path: &str) -> Option<NodePath> {
        let path = resolve(self.explorer, name_path)
            .and_then(|node| self.explorer.read(|tree| tree.path_of(node)));
        if path.is_none() {
            warn!(path = name_path, "Skipping a name path that does not resolve");
            self.transcript
                .push(format!("  skipped unresolved path '{name_path}'"));
        }
        path
    }

    fn run(&self, step: &Step) -> Result<()> {
        match step {
            Step::Attach { system } => self.explorer.attach(self.system(system)?)?,
            Step::Detach { system } => self.explorer.detach(self.system(system)?)?,
            Step::Select { add, remove, lead } => {
                let mut event = TreeSelectionEvent::new();
                for path in add.iter().filter_map(|p| self.path(p)) {
                    event = event.add(path);
                }
                for path in remove.iter().filter_map(|p| self.path(p)) {
                    event = event.remove(path);
                }
                if let Some(lead) = lead.as_deref().and_then(|l| resolve(self.explorer, l)) {
                    event = event.with_lead(lead);
                }
                if self.explorer.deliver_tree_event(&event).is_none() {
                    self.transcript.push("  (no change)");
                }
            }
            Step::SelectAll => {
                self.explorer.select_all();
            }
            Step::PickLevel { level } => {
                self.explorer.set_pick_level(*level);
                self.transcript.push(format!("  pick level: {level}"));
            }
            Step::Pick {
                atom,
                modifier,
                batched,
            } => {
                let hit = atom
                    .as_deref()
                    .and_then(|a| resolve(self.explorer, a))
                    .and_then(|a| self.hit_for(a, *batched));
                self.ray_caster.arm(hit);
                let action = self.explorer.pick(0, 0, *modifier);
                self.describe(&action);
            }
            Step::Activate { system } => {
                let target = system.as_deref().map(|s| self.system(s)).transpose()?;
                if !self.explorer.set_active_system(target) {
                    self.transcript.push("  (no change)");
                }
            }
        }
        Ok(())
    }

    fn hit_for(&self, atom: NodeId, batched: bool) -> Option<PickHit> {
        if !batched {
            return Some(PickHit::atom(atom));
        }
        let vertices = self.explorer.config().vertices_per_atom;
        self.explorer.read(|tree| {
            let system = tree.enclosing_system(atom)?;
            let index = tree.atoms_of(system).iter().position(|&a| a == atom)?;
            Some(PickHit::batched(system, index * vertices))
        })
    }

    fn describe(&self, action: &PickAction) {
        let line = match action {
            PickAction::Miss => "  miss".to_string(),
            PickAction::NoTarget { atom } => format!("  nothing to pick at {}", self.name(*atom)),
            PickAction::Select { node, .. } => format!("  picked {}", self.name(*node)),
            PickAction::Unchanged { node } => format!("  {} is already selected", self.name(*node)),
            PickAction::MeasurementPending {
                collected,
                required,
            } => format!("  measuring: {collected}/{required} atoms"),
            PickAction::Measured(_) => return,
        };
        self.transcript.push(line);
    }
}

/// Builds the session's systems and replays its steps, returning the transcript.
pub fn execute(session: &Session, config: ExplorerConfig) -> Result<Vec<String>> {
    let renderer = Arc::new(RecordingRenderer::default());
    let ray_caster = Arc::new(ScriptedRayCaster::default());
    let explorer = Explorer::new(config, renderer.clone(), ray_caster.clone())?;

    let built = explorer.edit(|tree| session.build(tree))?;
    for system in &built {
        renderer.place(system.id, system.transform);
    }
    let ids: Vec<NodeId> = built.iter().map(|s| s.id).collect();
    let names = Arc::new(explorer.read(|tree| node_names(tree, &ids)));
    let transcript = Arc::new(Transcript::default());
    explorer.subscribe(Arc::new(TranscriptObserver {
        names: names.clone(),
        transcript: transcript.clone(),
    }));

    let replay = Replay {
        explorer: &explorer,
        ray_caster: &ray_caster,
        systems: built.iter().map(|s| (s.name.clone(), s.id)).collect(),
        names,
        transcript: transcript.clone(),
    };
    for (i, step) in session.steps.iter().enumerate() {
        debug!(step = i + 1, action = step.label(), "Replaying step");
        transcript.push(format!("step {}: {}", i + 1, step.label()));
        replay.run(step)?;
    }
    drop(replay);
    drop(explorer);
    Ok(transcript.take())
}

pub fn run(args: ReplayArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = PartialExplorerConfig::load(&args)?.merge_with_cli(&args)?;
    debug!(?config, "Explorer configuration resolved");

    let session = Session::from_file(&args.script)?;
    info!(
        "Replaying {} step(s) over {} system(s) from {:?}",
        session.steps.len(),
        session.systems.len(),
        &args.script
    );

    for line in execute(&session, config)? {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffexplorer::engine::config::{ExplorerConfigBuilder, HighlightModel};

    const SESSION: &str = r#"
        [[systems]]
        name = "S1"
        scale = 0.5
        atoms = [
            { name = "A", position = [0.0, 0.0, 0.0] },
            { name = "B", position = [2.0, 0.0, 0.0] },
        ]
        bonds = [["A", "B"]]

        [[systems]]
        name = "S2"
        atoms = [{ name = "X", position = [0.0, 0.0, 0.0] }]

        [[steps]]
        action = "attach"
        system = "S1"

        [[steps]]
        action = "attach"
        system = "S2"

        [[steps]]
        action = "select"
        remove = ["S2"]

        [[steps]]
        action = "select"
        add = ["S1/A"]
        lead = "S1/A"

        [[steps]]
        action = "select"
        add = ["S1"]
        lead = "S1"

        [[steps]]
        action = "pick-level"
        level = "measure-distance"

        [[steps]]
        action = "pick"
        atom = "S1/A"

        [[steps]]
        action = "pick"
        atom = "S1/B"

        [[steps]]
        action = "pick-level"
        level = "bond"

        [[steps]]
        action = "pick"
        atom = "S1/A"
        batched = true

        [[steps]]
        action = "detach"
        system = "S1"

        [[steps]]
        action = "detach"
        system = "S2"
    "#;

    fn replay(config: ExplorerConfig) -> Vec<String> {
        let session = Session::from_toml(SESSION).unwrap();
        execute(&session, config).unwrap()
    }

    fn after<'a>(lines: &'a [String], header: &str) -> Vec<&'a str> {
        lines
            .iter()
            .skip_while(|l| l.as_str() != header)
            .skip(1)
            .take_while(|l| !l.starts_with("step "))
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn replays_selection_picking_and_detach() {
        let config = ExplorerConfigBuilder::new()
            .vertices_per_atom(6)
            .build()
            .unwrap();
        let lines = replay(config);

        assert_eq!(
            after(&lines, "step 1: attach"),
            vec!["  active system: S1", "  selection: [S1] highlight: +S1"]
        );
        assert_eq!(
            after(&lines, "step 2: attach"),
            vec![
                "  active system: S2",
                "  selection: [S2] highlight: -S1 +S2"
            ]
        );
        assert_eq!(
            after(&lines, "step 4: select"),
            vec![
                "  active system: S1",
                "  selection: [S1/A] highlight: +S1/A"
            ]
        );
        assert_eq!(
            after(&lines, "step 5: select"),
            vec!["  selection: [S1] highlight: -S1/A +S1"]
        );
        assert_eq!(
            after(&lines, "step 8: pick"),
            vec!["  measured distance 2.0000 Å between [S1/A, S1/B]"]
        );
        assert_eq!(
            after(&lines, "step 10: pick"),
            vec![
                "  selection: [S1/A-B] highlight: -S1 +S1/A-B",
                "  picked S1/A-B"
            ]
        );
        assert_eq!(
            after(&lines, "step 11: detach"),
            vec![
                "  active system: S2",
                "  selection: [] highlight: none"
            ]
        );
        assert_eq!(
            after(&lines, "step 12: detach"),
            vec!["  active system: none"]
        );
    }

    #[test]
    fn inherited_highlights_keep_the_atom_lit() {
        let config = ExplorerConfigBuilder::new()
            .highlight_model(HighlightModel::Inherited)
            .build()
            .unwrap();
        let lines = replay(config);
        assert_eq!(
            after(&lines, "step 5: select"),
            vec!["  selection: [S1] highlight: +S1"]
        );
    }

    #[test]
    fn unknown_system_is_a_script_error() {
        let session = Session::from_toml("[[steps]]\naction = \"attach\"\nsystem = \"nope\"\n")
            .unwrap();
        assert!(matches!(
            execute(&session, ExplorerConfig::default()),
            Err(CliError::Script(_))
        ));
    }

    #[test]
    fn unresolved_paths_are_reported_and_skipped() {
        let script = r#"
            [[systems]]
            name = "S1"
            atoms = [{ name = "A", position = [0.0, 0.0, 0.0] }]

            [[steps]]
            action = "attach"
            system = "S1"

            [[steps]]
            action = "select"
            add = ["S1/Z"]

            [[steps]]
            action = "pick"
            atom = "S1/Z"
        "#;
        let session = Session::from_toml(script).unwrap();
        let lines = execute(&session, ExplorerConfig::default()).unwrap();
        assert_eq!(
            after(&lines, "step 2: select"),
            vec!["  skipped unresolved path 'S1/Z'", "  (no change)"]
        );
        assert_eq!(after(&lines, "step 3: pick"), vec!["  miss"]);
    }
}
