//! Merge orchestration for pipeline reports.
//!
//! [`MergeOrchestrator`] composes template structure reading, raw header
//! detection, column mapping, row transformation and template writing.
//! [`TemplateReplacer`] installs a new template after validating it and
//! archiving the old one.

pub mod config;
mod error;
pub mod orchestrator;
pub mod replace;

pub use config::{ConfigError, MergeConfig, OutputConfig, RawConfig, TemplateConfig};
pub use error::{MergeError, Result};
pub use orchestrator::{HeaderReport, MergeAnalysis, MergeOrchestrator, MergeReport};
pub use replace::{Archiver, FsArchiver, ReplacementOutcome, TemplateReplacer};
