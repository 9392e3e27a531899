//! Errors surfaced by the merge orchestrator.

use std::path::PathBuf;

use pipemerge_ingest::IngestError;
use pipemerge_report::ReportError;
use thiserror::Error;

use crate::config::ConfigError;

/// Fatal merge and replacement failures.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Report(#[from] ReportError),

    // === Merge Errors ===
    /// Coverage fell below the configured minimum and aborting was requested.
    #[error("only {mapped}/{total} template columns mapped; unmapped: {}", unmapped.join(", "))]
    InsufficientMapping {
        mapped: usize,
        total: usize,
        unmapped: Vec<String>,
    },

    #[error("template not found: {path}")]
    TemplateNotFound { path: PathBuf },

    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configured output path would overwrite the template.
    #[error("output path {path} is the template itself")]
    OutputIsTemplate { path: PathBuf },

    // === Replacement Errors ===
    #[error("failed to archive template to {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install new template at {path}: {source}")]
    Install {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MergeError {
    /// True when the template cannot be used as a merge destination.
    pub fn is_structure_error(&self) -> bool {
        matches!(self, Self::Ingest(err) if err.is_structure_error())
    }
}

/// Result type for orchestration.
pub type Result<T> = std::result::Result<T, MergeError>;
