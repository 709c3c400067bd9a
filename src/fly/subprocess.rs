//! fly CLI subprocess client

use crate::core::error::{PipelineError, Result};
use crate::fly::FlyConfig;
use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Pipeline-level fly sub-commands that only need the pipeline name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineCommand {
    Expose,
    Hide,
    Pause,
    Unpause,
    Destroy,
}

impl PipelineCommand {
    pub fn fly_command(&self) -> &'static str {
        match self {
            PipelineCommand::Expose => "expose-pipeline",
            PipelineCommand::Hide => "hide-pipeline",
            PipelineCommand::Pause => "pause-pipeline",
            PipelineCommand::Unpause => "unpause-pipeline",
            PipelineCommand::Destroy => "destroy-pipeline",
        }
    }
}

/// Client for running fly as a subprocess
#[derive(Debug, Clone)]
pub struct FlyClient {
    config: FlyConfig,
}

impl FlyClient {
    pub fn new(config: FlyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FlyConfig {
        &self.config
    }

    /// Arguments for a targeted fly sub-command, including configured extras
    pub fn targeted_args(&self, command: &str) -> Vec<String> {
        let mut args = vec!["-t".to_string(), self.config.target.clone(), command.to_string()];
        args.extend(self.config.extra_args(command).iter().cloned());
        args
    }

    /// Full command line, for display
    pub fn describe(&self, args: &[String]) -> String {
        std::iter::once(self.config.program.as_str())
            .chain(self.config.prefix_args.iter().map(String::as_str))
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `fly validate-pipeline -c <path>`
    ///
    /// # Errors
    /// `Validation` with fly's exit code when the document is rejected.
    pub async fn validate_pipeline(&self, path: &Path) -> Result<()> {
        let mut args = vec!["validate-pipeline".to_string()];
        args.extend(self.config.extra_args("validate-pipeline").iter().cloned());
        args.push("-c".to_string());
        args.push(path.display().to_string());

        let status = self.run(&args).await?;
        if !status.success() {
            return Err(PipelineError::Validation {
                path: path.to_path_buf(),
                code: status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }

    /// `fly format-pipeline -w -c <path>`
    pub async fn format_pipeline(&self, path: &Path) -> Result<()> {
        let mut args = vec!["format-pipeline".to_string()];
        args.extend(self.config.extra_args("format-pipeline").iter().cloned());
        args.extend(["-w".to_string(), "-c".to_string(), path.display().to_string()]);
        self.run_checked(&args).await
    }

    /// `fly -t <target> set-pipeline -p <name> -c <path> [-l <secrets>]`
    pub async fn set_pipeline(
        &self,
        name: &str,
        path: &Path,
        secrets: Option<&Path>,
    ) -> Result<()> {
        let mut args = self.targeted_args("set-pipeline");
        args.extend([
            "-p".to_string(),
            name.to_string(),
            "-c".to_string(),
            path.display().to_string(),
        ]);
        if let Some(secrets) = secrets {
            args.extend(["-l".to_string(), secrets.display().to_string()]);
        }
        self.run_checked(&args).await
    }

    /// `fly -t <target> <command>-pipeline -p <name>`
    pub async fn pipeline_command(&self, command: PipelineCommand, name: &str) -> Result<()> {
        let mut args = self.targeted_args(command.fly_command());
        args.extend(["-p".to_string(), name.to_string()]);
        if command == PipelineCommand::Destroy {
            args.push("-n".to_string());
        }
        self.run_checked(&args).await
    }

    /// `fly -t <target> execute <args> -c <config> -x`
    pub async fn execute_task(
        &self,
        config_path: &Path,
        execute_args: &[String],
    ) -> Result<ExitStatus> {
        let mut args = self.targeted_args("execute");
        args.extend(execute_args.iter().cloned());
        args.extend(["-c".to_string(), config_path.display().to_string(), "-x".to_string()]);
        // Task runs can be long; no timeout here
        self.spawn(&args, None).await
    }

    async fn run_checked(&self, args: &[String]) -> Result<()> {
        let status = self.run(args).await?;
        if !status.success() {
            let code = status.code().unwrap_or(-1);
            warn!("fly exited with code {}", code);
            return Err(PipelineError::Fly(format!(
                "`{}` exited with code {}",
                self.describe(args),
                code
            )));
        }
        Ok(())
    }

    async fn run(&self, args: &[String]) -> Result<ExitStatus> {
        self.spawn(args, self.config.timeout_secs).await
    }

    async fn spawn(&self, args: &[String], timeout_secs: Option<u64>) -> Result<ExitStatus> {
        info!("Running {}", self.describe(args));

        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.prefix_args)
            .args(args)
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            PipelineError::Fly(format!("failed to run `{}`: {}", self.config.program, e))
        })?;

        let status = match timeout_secs {
            Some(secs) => match timeout(Duration::from_secs(secs), child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!("fly exceeded {} seconds, killing it", secs);
                    let _ = child.kill().await;
                    return Err(PipelineError::Fly(format!(
                        "`{}` timed out after {} seconds",
                        self.describe(args),
                        secs
                    )));
                }
            },
            None => child.wait().await?,
        };

        debug!("fly exited with {:?}", status.code());
        Ok(status)
    }
}
