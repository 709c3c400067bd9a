//! Generated pipeline document model
//!
//! Only the parts needed for task lookup are typed. Every other key, at any
//! level, is kept in `extra` so a document survives a load/save unchanged.

use crate::core::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// A generated pipeline document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDocument {
    /// Jobs in document order
    #[serde(default)]
    pub jobs: Vec<Job>,

    #[serde(flatten)]
    pub extra: Mapping,
}

/// A named job with an ordered plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub plan: Vec<Step>,

    #[serde(flatten)]
    pub extra: Mapping,
}

/// One plan entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Task identifier, present only on task steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    /// Task configuration, passed through verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl GeneratedDocument {
    /// Load a generated document from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::DocumentLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&content).map_err(|e| PipelineError::DocumentLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Parse a generated document from YAML text
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty file parses as null, which is an empty pipeline
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        // Jobs commonly pull their plan in through `<<: *anchor`
        let mut value: Value = serde_yaml::from_str(yaml)?;
        value.apply_merge()?;
        serde_yaml::from_value(value)
    }

    /// Iterate over every step carrying a task identifier, with its job
    pub fn tasks(&self) -> impl Iterator<Item = (&Job, &Step, &str)> {
        self.jobs.iter().flat_map(|job| {
            job.plan
                .iter()
                .filter_map(move |step| step.task.as_deref().map(|task| (job, step, task)))
        })
    }
}

impl Step {
    /// Serialize the task config for hand-off to an executor
    pub fn config_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        match &self.config {
            Some(config) => serde_yaml::to_string(config),
            None => serde_yaml::to_string(&Mapping::new()),
        }
    }
}
