use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::hierarchy::ModelError;
use crate::core::models::ids::NodeId;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Model error: {source}")]
    Model {
        #[from]
        source: ModelError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Node {0:?} is not an attached system")]
    NotAttachedSystem(NodeId),

    #[error("Failed to start the teardown worker: {0}")]
    TeardownWorker(#[source] std::io::Error),
}
