//! Template expansion for pipeline sources
//!
//! Templates are rendered with minijinja against an immutable
//! [`TemplateContext`]. Helper files are resolved relative to an explicit
//! working directory, never the process working directory.

use crate::core::error::{PipelineError, Result};
use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Project-level values visible to templates as `project`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectInfo {
    pub name: String,
    pub directory: String,
    pub fly_target: String,
}

/// A pipeline as seen from a template
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineInfo {
    pub name: String,
    pub template: String,
    pub generated: String,
}

/// Read-only values a template is rendered against
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateContext {
    pub project: ProjectInfo,

    /// The pipeline currently being generated
    pub pipeline: Option<PipelineInfo>,

    /// Every registered pipeline, in registration order
    pub pipelines: Vec<PipelineInfo>,

    /// User variables from the project config
    pub vars: BTreeMap<String, serde_yaml::Value>,
}

/// Expands pipeline templates
#[derive(Debug, Clone, Default)]
pub struct TemplateExpander {
    context: TemplateContext,
}

impl TemplateExpander {
    pub fn new(context: TemplateContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &TemplateContext {
        &self.context
    }

    /// Read and expand a template file
    ///
    /// # Errors
    /// Returns `TemplateNotFound` if `path` does not exist, or
    /// `TemplateExpansion` if rendering fails.
    pub fn expand_file(&self, path: &Path, working_dir: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(PipelineError::TemplateNotFound(path.to_path_buf()));
        }
        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.render(&name, &source, working_dir)
    }

    /// Expand template source text
    ///
    /// `{% include %}`, `{% import %}` and `read_file()` resolve relative to
    /// `working_dir`.
    pub fn expand(&self, source: &str, working_dir: &Path) -> Result<String> {
        self.render("<inline>", source, working_dir)
    }

    fn render(&self, name: &str, source: &str, working_dir: &Path) -> Result<String> {
        debug!(
            "Expanding template {} ({} bytes) in {}",
            name,
            source.len(),
            working_dir.display()
        );

        let env = build_environment(working_dir);
        let expansion_error = |source: minijinja::Error| PipelineError::TemplateExpansion {
            template: name.to_string(),
            source,
        };

        let template = env
            .template_from_named_str(name, source)
            .map_err(expansion_error)?;
        template.render(&self.context).map_err(expansion_error)
    }
}

type ReadFileResult = std::result::Result<String, minijinja::Error>;

fn build_environment<'source>(working_dir: &Path) -> Environment<'source> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_loader(minijinja::path_loader(working_dir.to_path_buf()));

    let root = working_dir.to_path_buf();
    env.add_function("read_file", move |path: String| -> ReadFileResult {
        let resolved = resolve_helper(&root, &path).ok_or_else(|| {
            minijinja::Error::new(
                ErrorKind::InvalidOperation,
                format!(
                    "read_file: `{}` must be a relative path inside the template directory",
                    path
                ),
            )
        })?;
        std::fs::read_to_string(&resolved).map_err(|e| {
            minijinja::Error::new(
                ErrorKind::TemplateNotFound,
                format!("read_file: could not read `{}`: {}", resolved.display(), e),
            )
        })
    });

    env
}

/// Join `relative` onto `root`, refusing anything that could escape it
fn resolve_helper(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}
