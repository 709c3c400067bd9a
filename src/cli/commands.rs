//! CLI command definitions

use clap::Args;

/// Optional pipeline selector shared by most commands
#[derive(Debug, Args, Clone)]
pub struct PipelineArg {
    /// Pipeline name (all pipelines when omitted)
    pub pipeline: Option<String>,
}

/// Generate and validate pipeline documents
#[derive(Debug, Args, Clone)]
pub struct GenerateCommand {
    /// Pipeline name (all pipelines when omitted)
    pub pipeline: Option<String>,

    /// Skip `fly validate-pipeline`
    #[arg(long)]
    pub no_validate: bool,
}

/// List available tasks
#[derive(Debug, Args, Clone)]
pub struct TasksCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Execute a single task with `fly execute`
#[derive(Debug, Args, Clone)]
pub struct TaskCommand {
    /// Task address as `job/task`
    pub address: String,

    /// Arguments for `fly execute` (default: --input=git-master=.)
    #[arg(last = true)]
    pub execute_args: Vec<String>,
}
