//! Second-stage overlay through an external data-templating tool (ytt)

use crate::core::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// File name of the implicit overlay config next to the templates
pub const DEFAULT_OVERLAY_FILE: &str = "ytt.yml";

/// Directory name of the implicit overlay configs next to the templates
pub const DEFAULT_OVERLAY_DIR: &str = "ytt";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Whether and how a pipeline is passed through the overlay tool
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverlayConfig {
    /// Expanded text is used as-is
    #[default]
    Disabled,
    /// Overlay with the implicit config found in the pipeline directory
    DefaultLocation,
    /// Overlay with the config file or directory at this path
    ExplicitPath(PathBuf),
}

/// Overlay tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlaySettings {
    /// Tool executable
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the `-f` inputs
    #[serde(default)]
    pub args: Vec<String>,

    /// Upper bound on a single tool run
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_program() -> String {
    "ytt".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Runs the overlay stage
#[derive(Debug, Clone, Default)]
pub struct OverlayProcessor {
    settings: OverlaySettings,
    timeout: Option<Duration>,
}

impl OverlayProcessor {
    pub fn new(settings: OverlaySettings) -> Self {
        Self {
            settings,
            timeout: None,
        }
    }

    /// Override the configured timeout with a finer-grained one
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    fn timeout(&self) -> Duration {
        self.timeout
            .unwrap_or_else(|| Duration::from_secs(self.settings.timeout_secs))
    }

    /// Apply the overlay to already-expanded text
    ///
    /// `Disabled` returns `expanded` unchanged. Otherwise the tool is run as
    /// `<program> <args> -f <secondary>... -f <primary>` and its stdout is
    /// the result.
    pub fn process(
        &self,
        expanded: &str,
        config: &OverlayConfig,
        directory: &Path,
    ) -> Result<String> {
        let secondary = match config {
            OverlayConfig::Disabled => return Ok(expanded.to_string()),
            OverlayConfig::DefaultLocation => default_inputs(directory)?,
            OverlayConfig::ExplicitPath(path) => explicit_inputs(path)?,
        };

        let mut primary = tempfile::Builder::new()
            .prefix("pipegen-expanded-")
            .suffix(".yml")
            .tempfile()?;
        primary.write_all(expanded.as_bytes())?;
        primary.flush()?;

        let mut command = Command::new(&self.settings.program);
        command.args(&self.settings.args);
        for input in &secondary {
            command.arg("-f").arg(input);
        }
        command.arg("-f").arg(primary.path());

        self.run(command)
    }

    fn run(&self, mut command: Command) -> Result<String> {
        let program = self.settings.program.clone();
        debug!("Running overlay tool: {:?}", command);

        // Output goes to files so a chatty tool can't block on a full pipe
        let mut stdout = tempfile::tempfile()?;
        let mut stderr = tempfile::tempfile()?;
        let mut child = command
            .stdin(Stdio::null())
            .stdout(stdout.try_clone()?)
            .stderr(stderr.try_clone()?)
            .spawn()
            .map_err(|e| {
                PipelineError::OverlayTool(format!("failed to run `{}`: {}", program, e))
            })?;

        let timeout = self.timeout();
        let deadline = Instant::now() + timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                warn!("Overlay tool `{}` exceeded {:?}, killing it", program, timeout);
                let _ = child.kill();
                let _ = child.wait();
                return Err(PipelineError::OverlayTimeout { program, timeout });
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        if !status.success() {
            let message = read_all(&mut stderr).unwrap_or_default();
            return Err(PipelineError::OverlayTool(format!(
                "`{}` exited with code {}: {}",
                program,
                status.code().unwrap_or(-1),
                message.trim()
            )));
        }

        let output = read_all(&mut stdout)?;
        debug!("Overlay tool returned {} bytes", output.len());
        Ok(output)
    }
}

fn read_all(file: &mut File) -> std::io::Result<String> {
    let mut buf = String::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_string(&mut buf)?;
    Ok(buf)
}

/// Secondary inputs for `DefaultLocation`: the fixed file, then the directory
fn default_inputs(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    let file = directory.join(DEFAULT_OVERLAY_FILE);
    if file.is_file() {
        inputs.push(file);
    }
    let dir = directory.join(DEFAULT_OVERLAY_DIR);
    if dir.is_dir() {
        collect_files(&dir, &mut inputs)?;
    }
    Ok(inputs)
}

fn explicit_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if path.is_dir() {
        let mut inputs = Vec::new();
        collect_files(path, &mut inputs)?;
        return Ok(inputs);
    }
    Err(PipelineError::OverlayTool(format!(
        "overlay config {} does not exist",
        path.display()
    )))
}

/// Every file under `dir`, recursively, sorted by path
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
