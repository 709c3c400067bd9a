//! Error types for pipeline generation and task lookup

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building, generating, or searching pipelines
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Pipeline template {} does not exist", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Failed to expand template {template}: {source}")]
    TemplateExpansion {
        template: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("Overlay tool error: {0}")]
    OverlayTool(String),

    #[error("Overlay tool `{program}` timed out after {timeout:?}")]
    OverlayTimeout { program: String, timeout: Duration },

    #[error("Failed to load generated pipeline {}: {reason}", path.display())]
    DocumentLoad { path: PathBuf, reason: String },

    #[error("Validation of {} failed with exit code {code}", path.display())]
    Validation { path: PathBuf, code: i32 },

    #[error("fly error: {0}")]
    Fly(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Exit status the CLI should terminate with for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Validation { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}
