//! girweave: link, merge and patch per-platform introspection models.
//!
//! The input is one node tree per namespace and platform, as produced by an
//! external description parser. The output is a single resolved model in
//! which every type reference is linked, every element knows the platforms
//! it exists on, and callables that cannot be bound are flagged.
//!
//! Stages: [`link`], [`merge`], [`flag`], [`patch`] and [`metadata`], run in
//! that order by [`pipeline::Pipeline`].

pub mod diagnostics;
pub mod document;
pub mod error;
pub mod flag;
pub mod link;
pub mod merge;
pub mod metadata;
pub mod model;
pub mod patch;
pub mod pipeline;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineConfig, Resolved};
