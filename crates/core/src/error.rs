use std::path::PathBuf;

use thiserror::Error;

use crate::types::Point;

#[derive(Debug, Error)]
pub enum SweepError {
    /// Missing or malformed traversal parameter.
    #[error("Invalid traversal config: {message}")]
    Config { message: String },

    /// Input injection failed.
    #[error("Tap at {at} failed: {source}")]
    Tap {
        at: Point,
        #[source]
        source: anyhow::Error,
    },

    /// The host could not start a named step.
    #[error("Step '{step}' could not be invoked: {source}")]
    Invoke {
        step: String,
        #[source]
        source: anyhow::Error,
    },

    /// The host rejected a next-step rewrite.
    #[error("Rewriting next steps of '{step}' failed: {source}")]
    Rewrite {
        step: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unknown pipeline node: {name}")]
    UnknownNode { name: String },

    #[error("Failed to parse pipeline at {path}: {message}")]
    PipelineParse { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SweepError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Tap or invoke failures.
    pub fn is_action_failure(&self) -> bool {
        matches!(self, Self::Tap { .. } | Self::Invoke { .. })
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;
