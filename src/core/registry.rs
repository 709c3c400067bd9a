//! Ordered collection of pipeline definitions

use crate::core::error::{PipelineError, Result};
use crate::core::locator::TaskLocator;
use crate::core::pipeline::{PipelineDefinition, PipelineOptions};
use crate::overlay::OverlayProcessor;
use crate::template::{ProjectInfo, TemplateContext, TemplateExpander};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Pipelines in declaration order
///
/// Order is significant: task lookup returns the match from the earliest
/// registered pipeline.
#[derive(Debug, Clone)]
pub struct PipelineRegistry {
    project: ProjectInfo,
    directory: PathBuf,
    variables: BTreeMap<String, serde_yaml::Value>,
    overlay: OverlayProcessor,
    pipelines: Vec<PipelineDefinition>,
}

impl PipelineRegistry {
    /// Create an empty registry whose templates live in `directory`
    pub fn new<P: Into<PathBuf>>(project: &str, directory: P) -> Self {
        let directory = directory.into();
        Self {
            project: ProjectInfo {
                name: project.to_string(),
                directory: directory.display().to_string(),
                fly_target: String::new(),
            },
            directory,
            variables: BTreeMap::new(),
            overlay: OverlayProcessor::default(),
            pipelines: Vec::new(),
        }
    }

    pub fn with_fly_target(mut self, target: &str) -> Self {
        self.project.fly_target = target.to_string();
        self
    }

    pub fn with_variables(mut self, variables: BTreeMap<String, serde_yaml::Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_overlay(mut self, overlay: OverlayProcessor) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn project(&self) -> &ProjectInfo {
        &self.project
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn overlay(&self) -> &OverlayProcessor {
        &self.overlay
    }

    /// Register a pipeline whose template is `template` inside the registry
    /// directory
    ///
    /// # Errors
    /// `Configuration` if the name or template is empty, or if another
    /// pipeline already writes to the same generated path. A repeated name
    /// is only warned about.
    pub fn add_pipeline(
        &mut self,
        name: &str,
        template: &str,
        options: PipelineOptions,
    ) -> Result<&PipelineDefinition> {
        if template.trim().is_empty() {
            return Err(PipelineError::Configuration(format!(
                "pipeline '{}' requires a template path",
                name
            )));
        }

        let options = PipelineOptions {
            generated_path: options.generated_path.map(|p| self.directory.join(p)),
            ..options
        };
        let definition = PipelineDefinition::new(name, self.directory.join(template), options)?;

        if let Some(existing) = self
            .pipelines
            .iter()
            .find(|p| p.generated_path() == definition.generated_path())
        {
            return Err(PipelineError::Configuration(format!(
                "pipelines '{}' and '{}' both generate {}",
                existing.name(),
                definition.name(),
                definition.generated_path().display()
            )));
        }

        if self.get(name).is_some() {
            warn!("Pipeline name '{}' is registered more than once", name);
        }

        debug!(
            "Registered pipeline {} ({} -> {})",
            definition.name(),
            definition.source_path().display(),
            definition.generated_path().display()
        );
        self.pipelines.push(definition);
        Ok(&self.pipelines[self.pipelines.len() - 1])
    }

    /// Pipelines in registration order
    pub fn pipelines(&self) -> &[PipelineDefinition] {
        &self.pipelines
    }

    /// First pipeline with this name
    pub fn get(&self, name: &str) -> Option<&PipelineDefinition> {
        self.pipelines.iter().find(|p| p.name() == name)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Snapshot of registry state for rendering `definition`
    pub fn template_context(&self, definition: &PipelineDefinition) -> TemplateContext {
        TemplateContext {
            project: self.project.clone(),
            pipeline: Some(definition.info()),
            pipelines: self.pipelines.iter().map(PipelineDefinition::info).collect(),
            vars: self.variables.clone(),
        }
    }

    pub fn expander_for(&self, definition: &PipelineDefinition) -> TemplateExpander {
        TemplateExpander::new(self.template_context(definition))
    }

    /// Generate one pipeline
    pub fn generate(&self, definition: &PipelineDefinition) -> Result<PathBuf> {
        definition.generate(&self.expander_for(definition), &self.overlay)
    }

    /// Generate every pipeline in order, stopping at the first failure
    pub fn generate_all(&self) -> Result<Vec<PathBuf>> {
        self.pipelines.iter().map(|p| self.generate(p)).collect()
    }

    /// Generate `selected` in parallel, one thread per pipeline
    ///
    /// Every generation runs to completion before anything is returned, so
    /// no temp file outlives the call. The first error in `selected` order
    /// wins.
    pub fn generate_concurrently(&self, selected: &[&PipelineDefinition]) -> Result<Vec<PathBuf>> {
        let results: Vec<Result<PathBuf>> = std::thread::scope(|scope| {
            let handles: Vec<_> = selected
                .iter()
                .map(|pipeline| scope.spawn(move || self.generate(pipeline)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });
        results.into_iter().collect()
    }

    /// Remove every generated document
    pub fn clean(&self) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for pipeline in &self.pipelines {
            if pipeline.clean()? {
                removed.push(pipeline.generated_path().to_path_buf());
            }
        }
        Ok(removed)
    }

    pub fn locator(&self) -> TaskLocator<'_> {
        TaskLocator::new(self)
    }
}
