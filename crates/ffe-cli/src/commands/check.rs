use crate::cli::CheckArgs;
use crate::error::{CliError, Result};
use crate::script::{BuiltSystem, Session, Step};
use ffexplorer::core::models::hierarchy::Hierarchy;
use tracing::info;

/// Steps that name a system must name one the script defines.
fn check_step_references(session: &Session, built: &[BuiltSystem]) -> Result<()> {
    let known = |name: &str| built.iter().any(|s| s.name == name);
    for (i, step) in session.steps.iter().enumerate() {
        let referenced = match step {
            Step::Attach { system } | Step::Detach { system } => Some(system.as_str()),
            Step::Activate { system } => system.as_deref(),
            _ => None,
        };
        if let Some(name) = referenced.filter(|name| !known(name)) {
            return Err(CliError::Script(format!(
                "step {} ({}) references unknown system '{}'",
                i + 1,
                step.label(),
                name
            )));
        }
    }
    Ok(())
}

pub fn summarize(session: &Session) -> Result<Vec<String>> {
    let mut hierarchy = Hierarchy::new();
    let built = session.build(&mut hierarchy)?;
    check_step_references(session, &built)?;

    let mut lines: Vec<String> = built
        .iter()
        .map(|s| {
            format!(
                "system '{}': {} atoms, {} bonds, {} angles, {} dihedrals",
                s.name, s.atoms, s.bonds, s.angles, s.dihedrals
            )
        })
        .collect();
    lines.push(format!("{} step(s)", session.steps.len()));
    Ok(lines)
}

pub fn run(args: CheckArgs) -> Result<()> {
    info!("Checking session script {:?}", &args.script);
    let session = Session::from_file(&args.script)?;
    for line in summarize(&session)? {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SCRIPT: &str = r#"
        [[systems]]
        name = "butane"
        atoms = [
            { name = "C1", position = [0.0, 0.0, 0.0] },
            { name = "C2", position = [1.5, 0.0, 0.0] },
            { name = "C3", position = [2.0, 1.4, 0.0] },
            { name = "C4", position = [3.5, 1.4, 0.0] },
        ]
        bonds = [["C1", "C2"], ["C2", "C3"], ["C3", "C4"]]

        [[steps]]
        action = "attach"
        system = "butane"

        [[steps]]
        action = "select-all"
    "#;

    #[test]
    fn summarizes_counts() {
        let session = Session::from_toml(SCRIPT).unwrap();
        assert_eq!(
            summarize(&session).unwrap(),
            vec![
                "system 'butane': 4 atoms, 3 bonds, 2 angles, 1 dihedrals".to_string(),
                "2 step(s)".to_string(),
            ]
        );
    }

    #[test]
    fn dangling_system_reference_is_reported() {
        let session =
            Session::from_toml("[[steps]]\naction = \"activate\"\nsystem = \"ghost\"\n").unwrap();
        let err = summarize(&session).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[[systems]\nname = ").unwrap();
        let err = Session::from_file(&path).unwrap_err();
        assert!(matches!(err, CliError::FileParsing { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }
}
