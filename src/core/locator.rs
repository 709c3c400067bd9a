//! Task lookup over generated pipeline documents
//!
//! Documents are re-read on every call so lookups always reflect the last
//! completed `generate()`.

use crate::core::document::{GeneratedDocument, Step};
use crate::core::error::Result;
use crate::core::registry::PipelineRegistry;
use std::fmt;
use tracing::debug;

/// A parsed `job/task` address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskAddress {
    pub job: String,
    pub task: String,
}

impl TaskAddress {
    /// Split on the first `/`
    ///
    /// Without a `/` the job name is empty, which matches no real job.
    pub fn parse(address: &str) -> Self {
        match address.split_once('/') {
            Some((job, task)) => Self {
                job: job.to_string(),
                task: task.to_string(),
            },
            None => Self {
                job: String::new(),
                task: address.to_string(),
            },
        }
    }
}

impl fmt::Display for TaskAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.job, self.task)
    }
}

/// A step found by address, with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct TaskMatch {
    pub pipeline: String,
    pub job: String,
    pub step: Step,
}

/// Resolves task addresses against a registry's generated documents
#[derive(Debug, Clone, Copy)]
pub struct TaskLocator<'a> {
    registry: &'a PipelineRegistry,
}

impl<'a> TaskLocator<'a> {
    pub fn new(registry: &'a PipelineRegistry) -> Self {
        Self { registry }
    }

    /// Find the first step matching `address`
    ///
    /// Pipelines are searched in registration order, jobs in document order,
    /// steps in plan order. A document that is missing or unparsable fails
    /// the whole search with `DocumentLoad`. `Ok(None)` means no match.
    pub fn find_task(&self, address: &str) -> Result<Option<TaskMatch>> {
        let address = TaskAddress::parse(address);
        debug!("Looking up task {}", address);

        for pipeline in self.registry.pipelines() {
            let document = GeneratedDocument::from_file(pipeline.generated_path())?;
            let found = document
                .tasks()
                .find(|(job, _, task)| job.name == address.job && *task == address.task);

            if let Some((job, step, _)) = found {
                return Ok(Some(TaskMatch {
                    pipeline: pipeline.name().to_string(),
                    job: job.name.clone(),
                    step: step.clone(),
                }));
            }
        }

        Ok(None)
    }

    /// Every `job/task` address across all pipelines, duplicates included
    pub fn list_tasks(&self) -> Result<Vec<String>> {
        let mut tasks = Vec::new();
        for pipeline in self.registry.pipelines() {
            let document = GeneratedDocument::from_file(pipeline.generated_path())?;
            tasks.extend(
                document
                    .tasks()
                    .map(|(job, _, task)| format!("{}/{}", job.name, task)),
            );
        }
        Ok(tasks)
    }
}
