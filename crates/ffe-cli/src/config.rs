use crate::cli::ReplayArgs;
use crate::error::{CliError, Result};
use ffexplorer::engine::config::{ExplorerConfig, ExplorerConfigBuilder, HighlightModel};
use ffexplorer::engine::picking::PickLevel;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialSelectionConfig {
    #[serde(rename = "highlight-model")]
    highlight_model: Option<HighlightModel>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialPickingConfig {
    #[serde(rename = "default-level")]
    default_level: Option<PickLevel>,
    #[serde(rename = "vertices-per-atom")]
    vertices_per_atom: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialSystemsConfig {
    parallel: Option<bool>,
}

/// Explorer settings as read from a TOML file; every field is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialExplorerConfig {
    selection: Option<PartialSelectionConfig>,
    picking: Option<PartialPickingConfig>,
    systems: Option<PartialSystemsConfig>,
}

fn parse_value<T: FromStr>(key: &str, value: &str, expected: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", expected, key, value))
    })
}

impl PartialExplorerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Loads the file named by `--config`, or starts empty.
    pub fn load(args: &ReplayArgs) -> Result<Self> {
        match &args.config {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Folds `-S` values and explicit flags over the file values.
    pub fn merge_with_cli(mut self, args: &ReplayArgs) -> Result<ExplorerConfig> {
        self.apply_set_values(&args.set_values)?;

        let selection = self.selection.take().unwrap_or_default();
        let picking = self.picking.take().unwrap_or_default();
        let systems = self.systems.take().unwrap_or_default();

        let mut builder = ExplorerConfigBuilder::new();
        if let Some(model) = args.highlight_model.or(selection.highlight_model) {
            builder = builder.highlight_model(model);
        }
        if let Some(level) = args.pick_level.or(picking.default_level) {
            builder = builder.default_pick_level(level);
        }
        if let Some(count) = picking.vertices_per_atom {
            builder = builder.vertices_per_atom(count);
        }
        if args.parallel {
            builder = builder.parallel_execution(true);
        } else if let Some(parallel) = systems.parallel {
            builder = builder.parallel_execution(parallel);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "selection.highlight-model" => {
                    self.selection
                        .get_or_insert_with(Default::default)
                        .highlight_model = Some(parse_value(key, value_str, "highlight model")?);
                }
                "picking.default-level" => {
                    self.picking
                        .get_or_insert_with(Default::default)
                        .default_level = Some(parse_value(key, value_str, "pick level")?);
                }
                "picking.vertices-per-atom" => {
                    self.picking
                        .get_or_insert_with(Default::default)
                        .vertices_per_atom = Some(parse_value(key, value_str, "integer")?);
                }
                "systems.parallel" => {
                    self.systems.get_or_insert_with(Default::default).parallel =
                        Some(parse_value(key, value_str, "boolean")?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
