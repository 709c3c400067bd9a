//! pipegen - generate Concourse pipelines from templates and run their tasks ad hoc

pub mod cli;
pub mod core;
pub mod fly;
pub mod overlay;
pub mod template;

// Re-export commonly used types
pub use core::config::ProjectConfig;
pub use core::{
    GeneratedDocument, Job, PipelineDefinition, PipelineError, PipelineOptions, PipelineRegistry,
    Step, TaskAddress, TaskLocator, TaskMatch,
};
pub use fly::{FlyClient, FlyConfig, TaskExecutor};
pub use overlay::{OverlayConfig, OverlayProcessor, OverlaySettings};
pub use template::{TemplateContext, TemplateExpander};
