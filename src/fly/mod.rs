//! External orchestration CLI (fly) and ad hoc task hand-off

pub mod subprocess;

use crate::core::config::ProjectConfig;
use crate::core::document::Step;
use crate::core::error::{PipelineError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::process::ExitStatus;
use tracing::debug;

pub use subprocess::{FlyClient, PipelineCommand};

/// Arguments passed to `fly execute` when none are given
pub const DEFAULT_EXECUTE_ARGS: &str = "--input=git-master=.";

/// fly settings from the project file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlySettings {
    /// fly executable
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before every sub-command
    #[serde(default)]
    pub args: Vec<String>,

    /// Upper bound on validate, format and pipeline commands; `execute` is unbounded
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_program() -> String {
    "fly".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for FlySettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Configuration for the fly client
#[derive(Debug, Clone)]
pub struct FlyConfig {
    /// fly executable
    pub program: String,

    /// Arguments placed before every sub-command
    pub prefix_args: Vec<String>,

    /// Target passed with `-t`
    pub target: String,

    /// Extra arguments per sub-command
    pub fly_args: HashMap<String, Vec<String>>,

    /// Timeout for non-interactive commands, in seconds
    pub timeout_secs: Option<u64>,
}

impl Default for FlyConfig {
    fn default() -> Self {
        Self::new("default")
    }
}

impl FlyConfig {
    pub fn new(target: &str) -> Self {
        Self {
            program: default_program(),
            prefix_args: Vec::new(),
            target: target.to_string(),
            fly_args: HashMap::new(),
            timeout_secs: None,
        }
    }

    pub fn from_project(config: &ProjectConfig) -> Self {
        Self {
            program: config.fly.program.clone(),
            prefix_args: config.fly.args.clone(),
            target: config.fly_target.clone(),
            fly_args: config.fly_args.clone(),
            timeout_secs: Some(config.fly.timeout_secs),
        }
    }

    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    pub fn with_prefix_args(mut self, args: Vec<String>) -> Self {
        self.prefix_args = args;
        self
    }

    pub fn with_extra_args(mut self, command: &str, args: Vec<String>) -> Self {
        self.fly_args.insert(command.to_string(), args);
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn extra_args(&self, command: &str) -> &[String] {
        self.fly_args.get(command).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Runs a task config file somewhere
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Execute the task whose config is at `config_path`
    async fn execute(&self, config_path: &Path, args: &[String]) -> Result<ExitStatus>;
}

#[async_trait]
impl TaskExecutor for FlyClient {
    async fn execute(&self, config_path: &Path, args: &[String]) -> Result<ExitStatus> {
        self.execute_task(config_path, args).await
    }
}

/// Write the step's config to a scoped temp file and hand it to `executor`
///
/// The temp file is removed when this returns, fails, or is dropped
/// mid-flight.
pub async fn hand_off<E: TaskExecutor + ?Sized>(
    step: &Step,
    executor: &E,
    args: &[String],
) -> Result<()> {
    let config = step
        .config_yaml()
        .map_err(|e| PipelineError::Fly(format!("could not serialize task config: {}", e)))?;

    let mut file = tempfile::Builder::new()
        .prefix("pipegen-task-")
        .suffix(".yml")
        .tempfile()?;
    file.write_all(config.as_bytes())?;
    file.flush()?;
    debug!("Task config written to {}", file.path().display());

    let status = executor.execute(file.path(), args).await?;
    if !status.success() {
        return Err(PipelineError::Fly(format!(
            "task execution exited with code {}",
            status.code().unwrap_or(-1)
        )));
    }
    Ok(())
}

/// User-supplied `fly execute` arguments, or the default ones when none are given
pub fn execute_args(args: &[String]) -> Vec<String> {
    if args.is_empty() {
        DEFAULT_EXECUTE_ARGS.split_whitespace().map(String::from).collect()
    } else {
        args.to_vec()
    }
}
