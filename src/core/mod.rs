//! Core domain models for pipeline generation
//!
//! This module defines pipeline definitions, the registry that orders them,
//! the generated document model, and task lookup over generated documents.

pub mod config;
pub mod document;
pub mod error;
pub mod locator;
pub mod pipeline;
pub mod registry;
pub mod workspace;

pub use document::*;
pub use error::*;
pub use locator::*;
pub use pipeline::*;
pub use registry::*;
