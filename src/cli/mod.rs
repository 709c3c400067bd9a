//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{GenerateCommand, PipelineArg, TaskCommand, TasksCommand};
use std::ffi::OsString;

/// Generate Concourse pipelines from templates
#[derive(Debug, Parser, Clone)]
#[command(name = "pipegen")]
#[command(author = "Pipegen Contributors")]
#[command(version = "0.1.0")]
#[command(
    about = "Generate Concourse pipelines from templates and run their tasks ad hoc",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project configuration file
    #[arg(short, long, global = true, default_value = crate::core::config::DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// fly target (overrides the configured one)
    #[arg(short, long, global = true)]
    pub target: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Create the pipeline directory, an empty template and .gitignore entries
    Init,

    /// Generate and validate pipeline files
    Generate(GenerateCommand),

    /// Upload pipeline files
    Set(PipelineArg),

    /// Expose pipelines
    Expose(PipelineArg),

    /// Hide pipelines
    Hide(PipelineArg),

    /// Pause pipelines
    Pause(PipelineArg),

    /// Unpause pipelines
    Unpause(PipelineArg),

    /// Destroy pipelines
    Destroy(PipelineArg),

    /// Remove generated pipeline files
    Clean,

    /// List all the available tasks
    Tasks(TasksCommand),

    /// fly execute the specified task
    Task(TaskCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
