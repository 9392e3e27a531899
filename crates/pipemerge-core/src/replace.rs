//! Template replacement with backups.
//!
//! A candidate template is validated before the current one is archived and
//! overwritten. Mappings are computed per merge, so nothing else needs to be
//! regenerated after a replacement.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use pipemerge_ingest::read_template_structure;
use pipemerge_model::{ColumnSlot, TemplateLayout};
use serde::Serialize;
use tracing::{info, info_span};

use crate::error::{MergeError, Result};

/// Keeps a copy of the template before it is overwritten.
pub trait Archiver {
    /// Archive `current`, returning where the copy went. `None` when there
    /// was nothing to archive.
    fn archive(&self, current: &Path) -> Result<Option<PathBuf>>;
}

/// Copies templates into a backup directory with a timestamped name.
#[derive(Debug, Clone)]
pub struct FsArchiver {
    backup_dir: PathBuf,
}

impl FsArchiver {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// First free `template_backup_YYYYmmdd_HHMMSS[_N].<ext>` in the backup directory.
    fn backup_path(&self, stamp: NaiveDateTime, extension: &str) -> PathBuf {
        let base = format!("template_backup_{}", stamp.format("%Y%m%d_%H%M%S"));
        let mut candidate = self.backup_dir.join(with_extension(&base, extension));
        let mut suffix = 1;
        while candidate.exists() {
            candidate = self
                .backup_dir
                .join(with_extension(&format!("{base}_{suffix}"), extension));
            suffix += 1;
        }
        candidate
    }
}

fn with_extension(stem: &str, extension: &str) -> String {
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}.{extension}")
    }
}

impl Archiver for FsArchiver {
    fn archive(&self, current: &Path) -> Result<Option<PathBuf>> {
        if !current.exists() {
            return Ok(None);
        }
        std::fs::create_dir_all(&self.backup_dir).map_err(|source| MergeError::Archive {
            path: self.backup_dir.clone(),
            source,
        })?;
        let extension = current
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        let target = self.backup_path(Local::now().naive_local(), extension);
        std::fs::copy(current, &target).map_err(|source| MergeError::Archive {
            path: target.clone(),
            source,
        })?;
        info!(backup = %target.display(), "archived template");
        Ok(Some(target))
    }
}

/// Result of a template replacement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplacementOutcome {
    pub backup_path: Option<PathBuf>,
    pub template_path: PathBuf,
    /// Slots of the installed template.
    pub slots: Vec<ColumnSlot>,
}

/// Validates and installs a new template.
pub struct TemplateReplacer {
    layout: TemplateLayout,
    archiver: Box<dyn Archiver>,
}

impl TemplateReplacer {
    pub fn new(layout: TemplateLayout, archiver: Box<dyn Archiver>) -> Self {
        Self { layout, archiver }
    }

    /// Replace `current` with `candidate`.
    ///
    /// The candidate must expose at least one DATA column on the configured
    /// sheet and header row; otherwise nothing on disk changes.
    pub fn replace(&self, candidate: &Path, current: &Path) -> Result<ReplacementOutcome> {
        let span = info_span!("replace_template", candidate = %candidate.display());
        let _guard = span.enter();

        let structure = read_template_structure(candidate, &self.layout)?;
        if is_same_file(candidate, current) {
            return Err(MergeError::Install {
                path: current.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "new template is the current template",
                ),
            });
        }

        let backup_path = self.archiver.archive(current)?;

        if let Some(parent) = current.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| MergeError::Install {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::copy(candidate, current).map_err(|source| MergeError::Install {
            path: current.to_path_buf(),
            source,
        })?;

        info!(
            template = %current.display(),
            data_slots = structure.data_slot_count(),
            calendar_slots = structure.calendar_slot_count(),
            "installed new template"
        );
        Ok(ReplacementOutcome {
            backup_path,
            template_path: current.to_path_buf(),
            slots: structure.slots,
        })
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
