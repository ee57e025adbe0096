//! Error type shared by the navigation crates.

use thiserror::Error;

/// Failures raised by route construction, configuration and agent ticking.
///
/// All of them are local to a single agent: the simulation root logs them
/// and keeps ticking the others.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavError {
    /// Invalid setup, e.g. an empty waypoint route. The agent is never created.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A waypoint or path index past the end of its sequence.
    #[error("index {index} out of range for sequence of length {count}")]
    IndexOutOfRange { index: usize, count: usize },

    /// A required collaborator (spatial index, hand-off target) is not bound.
    #[error("unbound dependency: {0}")]
    UnboundDependency(&'static str),
}

impl NavError {
    pub fn config(msg: impl Into<String>) -> Self {
        NavError::Configuration(msg.into())
    }
}
