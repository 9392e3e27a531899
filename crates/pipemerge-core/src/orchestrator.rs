//! Merge orchestration.
//!
//! A merge reads the template structure and the raw export, maps columns,
//! transforms rows and writes them into a fresh copy of the template saved
//! under the configured output path. The template on disk is never touched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pipemerge_ingest::{
    HeaderLocation, TemplateStructure, locate_header, raw_columns, read_raw_sheet,
    read_template_structure,
};
use pipemerge_map::{ColumnMapper, ColumnMapping};
use pipemerge_model::{ColumnSlot, LogLevel, LogSink, MergeWarning, RawSheet, TracingSink};
use pipemerge_report::{TemplateWorkbook, TemplateWriter, WriteSummary};
use pipemerge_transform::{RowTransformer, TransformStats};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::config::MergeConfig;
use crate::error::{MergeError, Result};

// =============================================================================
// Reports
// =============================================================================

/// Where the raw header was found, in spreadsheet row numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderReport {
    /// 1-based header row.
    pub row: usize,
    /// 1-based first data row.
    pub data_start_row: usize,
    pub hits: usize,
    pub low_confidence: bool,
}

impl From<HeaderLocation> for HeaderReport {
    fn from(location: HeaderLocation) -> Self {
        Self {
            row: location.header_row + 1,
            data_start_row: location.data_start_row + 1,
            hits: location.hits,
            low_confidence: location.low_confidence,
        }
    }
}

/// Header detection and mapping without writing anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeAnalysis {
    pub raw_path: PathBuf,
    pub template_path: PathBuf,
    pub slots: Vec<ColumnSlot>,
    pub header: HeaderReport,
    pub mapping: ColumnMapping,
    pub warnings: Vec<MergeWarning>,
}

/// Outcome of a completed merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeReport {
    pub output_path: PathBuf,
    pub raw_path: PathBuf,
    pub template_path: PathBuf,
    pub header: HeaderReport,
    pub mapping: ColumnMapping,
    pub rows_written: usize,
    pub has_total: bool,
    pub stats: TransformStats,
    pub write: WriteSummary,
    pub warnings: Vec<MergeWarning>,
}

impl MergeReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Analysis plus the loaded raw sheet, kept for the transform step.
struct Prepared {
    analysis: MergeAnalysis,
    raw: RawSheet,
    location: HeaderLocation,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Runs merges with one configuration and log sink.
pub struct MergeOrchestrator {
    config: MergeConfig,
    sink: Arc<dyn LogSink>,
}

impl MergeOrchestrator {
    /// Orchestrator that reports through `tracing`.
    pub fn new(config: MergeConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    pub fn with_sink(config: MergeConfig, sink: Arc<dyn LogSink>) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Merge `raw_path` into the configured template.
    pub fn merge_configured(&self, raw_path: &Path) -> Result<MergeReport> {
        self.merge(raw_path, &self.config.template.path)
    }

    /// Detect the raw header and map columns without writing output.
    pub fn analyze(&self, raw_path: &Path, template_path: &Path) -> Result<MergeAnalysis> {
        let span = info_span!("analyze", raw = %raw_path.display());
        let _guard = span.enter();
        self.prepare(raw_path, template_path)
            .map(|prepared| prepared.analysis)
            .inspect_err(|err| self.sink.log(LogLevel::Error, &format!("Analysis failed: {err}")))
    }

    /// Merge `raw_path` into a copy of `template_path`.
    ///
    /// Returns the merge report; the output file lives at
    /// [`MergeReport::output_path`].
    pub fn merge(&self, raw_path: &Path, template_path: &Path) -> Result<MergeReport> {
        let span = info_span!(
            "merge",
            raw = %raw_path.display(),
            template = %template_path.display()
        );
        let _guard = span.enter();
        self.sink.log(
            LogLevel::Info,
            &format!(
                "Merging {} into {}",
                raw_path.display(),
                template_path.display()
            ),
        );
        self.run_merge(raw_path, template_path)
            .inspect_err(|err| self.sink.log(LogLevel::Error, &format!("Merge failed: {err}")))
    }

    fn run_merge(&self, raw_path: &Path, template_path: &Path) -> Result<MergeReport> {
        let output_path = self.config.output.path();
        if same_file(&output_path, template_path) {
            return Err(MergeError::OutputIsTemplate { path: output_path });
        }

        let Prepared {
            analysis,
            raw,
            location,
        } = self.prepare(raw_path, template_path)?;
        let mut warnings = analysis.warnings;

        let outcome = info_span!("transform").in_scope(|| {
            RowTransformer::new(&self.config.transform)
                .transform(raw.rows_from(location.data_start_row), &analysis.mapping)
        });
        for warning in &outcome.warnings {
            self.warn(warning);
        }
        warnings.extend(outcome.warnings);

        let layout = &self.config.template.layout;
        let write = info_span!("write", output = %output_path.display()).in_scope(
            || -> Result<WriteSummary> {
                let mut workbook = TemplateWorkbook::open(template_path, &layout.sheet_name)?;
                let summary = TemplateWriter::new(&self.config.writer).write(
                    &mut workbook,
                    layout,
                    &analysis.slots,
                    &outcome.rows,
                )?;
                std::fs::create_dir_all(&self.config.output.dir).map_err(|source| {
                    MergeError::OutputDir {
                        path: self.config.output.dir.clone(),
                        source,
                    }
                })?;
                workbook.save(&output_path)?;
                Ok(summary)
            },
        )?;

        info!(
            output = %output_path.display(),
            rows = outcome.rows.len(),
            warnings = warnings.len(),
            "merge complete"
        );
        self.sink.log(
            LogLevel::Info,
            &format!(
                "Wrote {} rows to {}",
                outcome.rows.len(),
                output_path.display()
            ),
        );

        Ok(MergeReport {
            output_path,
            raw_path: raw_path.to_path_buf(),
            template_path: template_path.to_path_buf(),
            header: analysis.header,
            mapping: analysis.mapping,
            rows_written: outcome.rows.len(),
            has_total: outcome.has_total,
            stats: outcome.stats,
            write,
            warnings,
        })
    }

    fn prepare(&self, raw_path: &Path, template_path: &Path) -> Result<Prepared> {
        if !template_path.exists() {
            return Err(MergeError::TemplateNotFound {
                path: template_path.to_path_buf(),
            });
        }
        let mut warnings = Vec::new();

        let structure = info_span!("template").in_scope(|| {
            read_template_structure(template_path, &self.config.template.layout)
        })?;
        self.sink.log(
            LogLevel::Debug,
            &format!(
                "Template has {} data and {} forecast columns",
                structure.data_slot_count(),
                structure.calendar_slot_count()
            ),
        );
        for warning in duplicate_warnings(&structure) {
            self.warn(&warning);
            warnings.push(warning);
        }

        let (raw, location) = info_span!("header").in_scope(|| -> Result<_> {
            let raw = read_raw_sheet(raw_path, self.config.raw.sheet.as_deref())?;
            let location = locate_header(&raw, &self.config.raw.search);
            Ok((raw, location))
        })?;
        if location.low_confidence {
            let warning = MergeWarning::HeaderNotFound {
                fallback_row: self.config.raw.search.fallback_row,
            };
            self.warn(&warning);
            warnings.push(warning);
        } else {
            self.sink.log(
                LogLevel::Info,
                &format!(
                    "Raw header found on row {} ({} keyword hits)",
                    location.header_row + 1,
                    location.hits
                ),
            );
        }

        let mapping = info_span!("map").in_scope(|| {
            let columns = raw_columns(&raw, &location);
            ColumnMapper::new(&self.config.mapping).map(
                &structure.slots,
                &columns,
                raw.rows_from(location.data_start_row),
            )
        });
        for entry in &mapping.entries {
            debug!(
                slot = %entry.slot_name,
                raw = entry.raw_header.as_deref().unwrap_or("-"),
                score = entry.score,
                accepted = entry.accepted,
                "slot mapping"
            );
        }
        self.sink.log(
            LogLevel::Info,
            &format!(
                "Mapped {}/{} template columns",
                mapping.accepted_count(),
                mapping.entries.len()
            ),
        );

        let min_coverage = self.config.mapping.min_coverage;
        if let Some(warning) = mapping.coverage_warning(min_coverage) {
            if self.config.mapping.abort_on_insufficient {
                return Err(MergeError::InsufficientMapping {
                    mapped: mapping.accepted_count(),
                    total: mapping.entries.len(),
                    unmapped: mapping.unmapped_names(),
                });
            }
            self.warn(&warning);
            warnings.push(warning);
        }

        Ok(Prepared {
            analysis: MergeAnalysis {
                raw_path: raw_path.to_path_buf(),
                template_path: template_path.to_path_buf(),
                slots: structure.slots,
                header: location.into(),
                mapping,
                warnings,
            },
            raw,
            location,
        })
    }

    fn warn(&self, warning: &MergeWarning) {
        warn!(%warning, "merge warning");
        self.sink.log(LogLevel::Warn, &warning.to_string());
    }
}

fn duplicate_warnings(structure: &TemplateStructure) -> Vec<MergeWarning> {
    structure
        .duplicate_names
        .iter()
        .map(|name| MergeWarning::DuplicateSlotName { name: name.clone() })
        .collect()
}

/// Compare resolved paths; an output that does not exist yet is never the template.
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
