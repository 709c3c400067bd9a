//! Pipeline definition: one template compiled into one generated document

use crate::core::error::{PipelineError, Result};
use crate::overlay::{OverlayConfig, OverlayProcessor};
use crate::template::{PipelineInfo, TemplateExpander};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Suffix appended to a template path to name its generated document
pub const GENERATED_SUFFIX: &str = ".generated";

/// Optional settings for a new pipeline
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Overlay stage configuration
    pub overlay: OverlayConfig,

    /// Where to write the document (defaults to `<template>.generated`)
    pub generated_path: Option<PathBuf>,
}

impl PipelineOptions {
    pub fn with_overlay(mut self, overlay: OverlayConfig) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn with_generated_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.generated_path = Some(path.into());
        self
    }
}

/// A named template/output pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDefinition {
    name: String,
    source_path: PathBuf,
    generated_path: PathBuf,
    overlay: OverlayConfig,
}

impl PipelineDefinition {
    /// Create a definition, failing if `name` or `source_path` is empty
    pub fn new<P: Into<PathBuf>>(
        name: &str,
        source_path: P,
        options: PipelineOptions,
    ) -> Result<Self> {
        let source_path = source_path.into();
        if name.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "pipeline name is required".to_string(),
            ));
        }
        if source_path.as_os_str().is_empty() {
            return Err(PipelineError::Configuration(format!(
                "pipeline '{}' requires a template path",
                name
            )));
        }

        let generated_path = options.generated_path.unwrap_or_else(|| {
            let mut generated = source_path.clone().into_os_string();
            generated.push(GENERATED_SUFFIX);
            PathBuf::from(generated)
        });

        Ok(Self {
            name: name.to_string(),
            source_path,
            generated_path,
            overlay: options.overlay,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn generated_path(&self) -> &Path {
        &self.generated_path
    }

    pub fn overlay(&self) -> &OverlayConfig {
        &self.overlay
    }

    /// Directory the template lives in; helper files resolve from here
    pub fn directory(&self) -> &Path {
        match self.source_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    pub fn info(&self) -> PipelineInfo {
        PipelineInfo {
            name: self.name.clone(),
            template: self.source_path.display().to_string(),
            generated: self.generated_path.display().to_string(),
        }
    }

    /// Expand the template, apply the overlay, and atomically replace the
    /// generated document
    ///
    /// Readers of `generated_path` see either the previous document or the
    /// complete new one. On any failure the previous document is untouched.
    pub fn generate(
        &self,
        expander: &TemplateExpander,
        overlay: &OverlayProcessor,
    ) -> Result<PathBuf> {
        info!("Generating pipeline {} from {}", self.name, self.source_path.display());

        let directory = self.directory();
        let expanded = expander.expand_file(&self.source_path, directory)?;
        let rendered = overlay.process(&expanded, &self.overlay, directory)?;

        self.write_atomically(&rendered)?;
        debug!(
            "Wrote {} bytes to {}",
            rendered.len(),
            self.generated_path.display()
        );

        Ok(self.generated_path.clone())
    }

    fn write_atomically(&self, content: &str) -> Result<()> {
        let target_dir = match self.generated_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // Same directory as the target so the rename never crosses filesystems
        let mut temp = tempfile::Builder::new()
            .prefix(".pipegen-")
            .suffix(".tmp")
            .tempfile_in(target_dir)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.generated_path)
            .map_err(|e| PipelineError::Io(e.error))?;
        Ok(())
    }

    /// Remove the generated document, if any
    pub fn clean(&self) -> Result<bool> {
        match std::fs::remove_file(&self.generated_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
