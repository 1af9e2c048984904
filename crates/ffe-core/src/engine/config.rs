use super::picking::PickLevel;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}

/// How the renderer's highlight state follows the selection set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HighlightModel {
    /// Only the terminal node of each selected path is highlighted. Selecting an
    /// ancestor un-highlights descendants it now subsumes.
    #[default]
    Exclusive,
    /// A node is highlighted whenever a selected path covers it, so highlights
    /// flow down the tree and subsumed descendants keep theirs.
    Inherited,
}

impl FromStr for HighlightModel {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exclusive" => Ok(HighlightModel::Exclusive),
            "inherited" => Ok(HighlightModel::Inherited),
            _ => Err(ConfigError::UnknownVariant {
                kind: "highlight model",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for HighlightModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HighlightModel::Exclusive => write!(f, "exclusive"),
            HighlightModel::Inherited => write!(f, "inherited"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerConfig {
    pub highlight_model: HighlightModel,
    pub default_pick_level: PickLevel,
    /// Tag newly attached systems for parallel execution.
    pub parallel_execution: bool,
    /// Vertices emitted per atom in batched system geometry; used to map a
    /// ray-cast primitive index back to its atom.
    pub vertices_per_atom: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            highlight_model: HighlightModel::default(),
            default_pick_level: PickLevel::default(),
            parallel_execution: false,
            vertices_per_atom: 1,
        }
    }
}

#[derive(Default)]
pub struct ExplorerConfigBuilder {
    highlight_model: Option<HighlightModel>,
    default_pick_level: Option<PickLevel>,
    parallel_execution: Option<bool>,
    vertices_per_atom: Option<usize>,
}

impl ExplorerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highlight_model(mut self, model: HighlightModel) -> Self {
        self.highlight_model = Some(model);
        self
    }
    pub fn default_pick_level(mut self, level: PickLevel) -> Self {
        self.default_pick_level = Some(level);
        self
    }
    pub fn parallel_execution(mut self, enabled: bool) -> Self {
        self.parallel_execution = Some(enabled);
        self
    }
    pub fn vertices_per_atom(mut self, count: usize) -> Self {
        self.vertices_per_atom = Some(count);
        self
    }

    pub fn build(self) -> Result<ExplorerConfig, ConfigError> {
        let defaults = ExplorerConfig::default();
        let vertices_per_atom = self.vertices_per_atom.unwrap_or(defaults.vertices_per_atom);
        if vertices_per_atom == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "vertices_per_atom",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(ExplorerConfig {
            highlight_model: self.highlight_model.unwrap_or(defaults.highlight_model),
            default_pick_level: self
                .default_pick_level
                .unwrap_or(defaults.default_pick_level),
            parallel_execution: self
                .parallel_execution
                .unwrap_or(defaults.parallel_execution),
            vertices_per_atom,
        })
    }
}
