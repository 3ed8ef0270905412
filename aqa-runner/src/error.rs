//! Error types for the AQA runner

use aqa_core::ConfigError;
use thiserror::Error;

/// Result type alias for runner stages
pub type Result<T> = std::result::Result<T, RunError>;

/// How a stage failure affects the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Logged; the run continues
    Warning,
    /// Aborts the run
    Fatal,
}

/// Errors raised by the stages of a run
#[derive(Debug, Error)]
pub enum RunError {
    /// Invalid task input
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Windows toolchain bootstrap failed
    #[error("Toolchain bootstrap failed: {0:#}")]
    Toolchain(anyhow::Error),

    /// Installing a build prerequisite failed
    #[error("Failed to provision {what}: {source:#}")]
    Provision {
        what: String,
        #[source]
        source: anyhow::Error,
    },

    /// Clone, fetch script, download or extraction failed
    #[error("Failed to fetch {what}: {source:#}")]
    Fetch {
        what: String,
        #[source]
        source: anyhow::Error,
    },

    /// make exited with an error
    #[error("{0:#}")]
    Build(anyhow::Error),

    /// Local filesystem failure
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    pub fn provision(what: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Provision {
            what: what.into(),
            source,
        }
    }

    pub fn fetch(what: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Fetch {
            what: what.into(),
            source,
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the run may continue after this error
    pub fn severity(&self) -> Severity {
        match self {
            Self::Toolchain(_) | Self::Build(_) => Severity::Warning,
            Self::Config(_) | Self::Provision { .. } | Self::Fetch { .. } | Self::Io { .. } => {
                Severity::Fatal
            }
        }
    }
}
