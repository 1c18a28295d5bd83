//! Scene graph errors
//!
//! Lookups and removals that simply find nothing are not errors; they return
//! `Option`/`bool`. These variants cover rejected edits and numeric failures.

use thiserror::Error;

use crate::config::ConfigError;

/// Scene graph errors
#[derive(Error, Debug)]
pub enum SceneError {
    /// A node with this id is already registered
    #[error("Duplicate node id: {0}")]
    DuplicateId(String),

    /// The requested parent id is not registered
    #[error("Parent node not found: {0}")]
    ParentNotFound(String),

    /// The node key or id does not resolve to a node
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Attaching would make a node its own ancestor
    #[error("Cannot attach {child} under {parent}: would create a cycle")]
    CycleDetected {
        /// Id of the node being attached
        child: String,
        /// Id of the intended parent
        parent: String,
    },

    /// A frustum plane normal had zero or non-finite length
    #[error("Degenerate view-projection matrix: {plane} plane has no normal")]
    DegenerateFrustum {
        /// Name of the offending plane
        plane: &'static str,
    },

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
