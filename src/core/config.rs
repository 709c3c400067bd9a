//! Project configuration from YAML

use crate::core::error::{PipelineError, Result};
use crate::core::pipeline::PipelineOptions;
use crate::core::registry::PipelineRegistry;
use crate::fly::FlySettings;
use crate::overlay::{OverlayConfig, OverlayProcessor, OverlaySettings};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Default project configuration file
pub const DEFAULT_CONFIG_FILE: &str = "pipegen.yml";

/// Top-level project configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name, also the default pipeline name
    pub project: String,

    /// Directory holding templates and generated documents
    #[serde(default = "default_directory")]
    pub directory: String,

    /// fly target used for every fly command
    #[serde(default = "default_fly_target")]
    pub fly_target: String,

    /// Credentials file inside `directory`, passed to set-pipeline
    #[serde(default = "default_secrets_filename")]
    pub secrets_filename: String,

    /// Run `fly format-pipeline` on generated documents
    #[serde(default)]
    pub format: bool,

    /// Extra arguments per fly sub-command
    #[serde(default)]
    pub fly_args: HashMap<String, Vec<String>>,

    /// fly executable and timeout
    #[serde(default)]
    pub fly: FlySettings,

    /// Overlay tool settings
    #[serde(default)]
    pub overlay: OverlaySettings,

    /// Values exposed to templates as `vars`
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,

    /// Pipelines in declaration order
    #[serde(default)]
    pub pipelines: Vec<PipelineEntry>,
}

/// One pipeline as declared in the project file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEntry {
    pub name: String,

    /// Template path, relative to the project directory
    pub template: String,

    /// Generated document path, relative to the project directory
    #[serde(default)]
    pub generated: Option<String>,

    /// `false`, `true` (implicit config) or a config path
    #[serde(default)]
    ytt: Option<Value>,
}

fn default_directory() -> String {
    "concourse".to_string()
}

fn default_fly_target() -> String {
    "default".to_string()
}

fn default_secrets_filename() -> String {
    "private.yml".to_string()
}

impl PipelineEntry {
    pub fn new(name: &str, template: &str) -> Self {
        Self {
            name: name.to_string(),
            template: template.to_string(),
            generated: None,
            ytt: None,
        }
    }

    /// Interpret the `ytt` setting
    pub fn overlay_config(&self, directory: &Path) -> Result<OverlayConfig> {
        match &self.ytt {
            None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(OverlayConfig::Disabled),
            Some(Value::Bool(true)) => Ok(OverlayConfig::DefaultLocation),
            Some(Value::String(path)) if !path.trim().is_empty() => {
                Ok(OverlayConfig::ExplicitPath(directory.join(path)))
            }
            Some(other) => Err(PipelineError::Configuration(format!(
                "pipeline '{}': ytt must be true, false or a path, got {}",
                self.name,
                serde_yaml::to_string(other).unwrap_or_default().trim()
            ))),
        }
    }
}

impl ProjectConfig {
    /// A configuration with defaults for everything but the project name
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
            directory: default_directory(),
            fly_target: default_fly_target(),
            secrets_filename: default_secrets_filename(),
            format: false,
            fly_args: HashMap::new(),
            fly: FlySettings::default(),
            overlay: OverlaySettings::default(),
            variables: BTreeMap::new(),
            pipelines: Vec::new(),
        }
    }

    /// Load project configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!("could not read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse project configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ProjectConfig = serde_yaml::from_str(yaml)
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "project name is required".to_string(),
            ));
        }
        if self.directory.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "directory must not be empty".to_string(),
            ));
        }

        for entry in &self.pipelines {
            if entry.name.trim().is_empty() {
                return Err(PipelineError::Configuration(
                    "every pipeline needs a name".to_string(),
                ));
            }
            if entry.template.trim().is_empty() {
                return Err(PipelineError::Configuration(format!(
                    "pipeline '{}' requires a template",
                    entry.name
                )));
            }
            entry.overlay_config(self.directory_path())?;
        }

        Ok(())
    }

    pub fn directory_path(&self) -> &Path {
        Path::new(&self.directory)
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.directory_path().join(&self.secrets_filename)
    }

    /// Template file of the pipeline registered when none are declared
    pub fn default_template(&self) -> String {
        format!("{}.yml", self.project)
    }

    /// Pipelines to register, falling back to one named after the project
    pub fn pipeline_entries(&self) -> Vec<PipelineEntry> {
        if self.pipelines.is_empty() {
            vec![PipelineEntry::new(&self.project, &self.default_template())]
        } else {
            self.pipelines.clone()
        }
    }

    /// Extra fly arguments configured for `command`
    pub fn fly_args_for(&self, command: &str) -> &[String] {
        self.fly_args.get(command).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Build the pipeline registry described by this configuration
    pub fn to_registry(&self) -> Result<PipelineRegistry> {
        let directory = self.directory_path();
        let mut registry = PipelineRegistry::new(&self.project, directory)
            .with_fly_target(&self.fly_target)
            .with_variables(self.variables.clone())
            .with_overlay(OverlayProcessor::new(self.overlay.clone()));

        for entry in self.pipeline_entries() {
            let mut options =
                PipelineOptions::default().with_overlay(entry.overlay_config(directory)?);
            if let Some(generated) = &entry.generated {
                options = options.with_generated_path(generated);
            }
            registry.add_pipeline(&entry.name, &entry.template, options)?;
        }

        Ok(registry)
    }
}
