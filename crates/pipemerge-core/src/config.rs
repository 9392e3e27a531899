//! Merge configuration loaded from TOML.
//!
//! Locations (template path, sheet, rows, output directory and file name)
//! must be given explicitly. Every other section falls back to defaults.

use std::path::{Path, PathBuf};

use pipemerge_model::{
    HeaderSearchOptions, MappingOptions, TemplateLayout, TransformOptions, WriterOptions,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Destination template and where its data region sits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub path: PathBuf,
    #[serde(flatten)]
    pub layout: TemplateLayout,
    /// Where `replace-template` archives the previous template.
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
}

/// Where merge output is saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub file_name: String,
}

impl OutputConfig {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

/// How the raw export is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// Sheet to read; the first sheet when absent.
    pub sheet: Option<String>,
    #[serde(flatten)]
    pub search: HeaderSearchOptions,
}

// =============================================================================
// MergeConfig
// =============================================================================

/// Everything a merge needs besides the raw file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    pub template: TemplateConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub raw: RawConfig,
    #[serde(default)]
    pub mapping: MappingOptions,
    #[serde(default)]
    pub transform: TransformOptions,
    #[serde(default)]
    pub writer: WriterOptions,
}

impl MergeConfig {
    /// Build a configuration from explicit locations with default tunables.
    pub fn new(template: TemplateConfig, output: OutputConfig) -> Self {
        Self {
            template,
            output,
            raw: RawConfig::default(),
            mapping: MappingOptions::default(),
            transform: TransformOptions::default(),
            writer: WriterOptions::default(),
        }
    }

    /// Load and validate a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.template.layout;
        if layout.sheet_name.trim().is_empty() {
            return Err(ConfigError::invalid("template.sheet_name is empty"));
        }
        if layout.header_row == 0 {
            return Err(ConfigError::invalid("template.header_row is 1-based"));
        }
        if layout.data_start_row <= layout.header_row {
            return Err(ConfigError::invalid(format!(
                "template.data_start_row ({}) must come after header_row ({})",
                layout.data_start_row, layout.header_row
            )));
        }
        if layout.first_column == 0 {
            return Err(ConfigError::invalid("template.first_column is 1-based"));
        }
        if self.output.file_name.trim().is_empty() {
            return Err(ConfigError::invalid("output.file_name is empty"));
        }
        if !(0.0..=1.0).contains(&self.mapping.min_coverage) {
            return Err(ConfigError::invalid(format!(
                "mapping.min_coverage ({}) must be between 0 and 1",
                self.mapping.min_coverage
            )));
        }
        if self.raw.search.fallback_row == 0 {
            return Err(ConfigError::invalid("raw.fallback_row is 1-based"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[template]
path = "templates/pipeline.xlsx"
sheet_name = "Pipeline"
header_row = 4
data_start_row = 5

[output]
dir = "out"
file_name = "Pipeline Report.xlsx"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = MergeConfig::from_toml_str(MINIMAL).expect("parse");
        assert_eq!(config.template.layout.sheet_name, "Pipeline");
        assert_eq!(config.template.layout.first_column, 2);
        assert_eq!(config.template.layout.calendar_baseline_year, 2024);
        assert_eq!(config.template.backup_dir, None);
        assert_eq!(config.output.path(), PathBuf::from("out/Pipeline Report.xlsx"));
        assert_eq!(config.raw, RawConfig::default());
        assert_eq!(config.mapping, MappingOptions::default());
        assert_eq!(config.writer, WriterOptions::default());
    }

    #[test]
    fn test_sections_override_tunables() {
        let text = format!(
            "{MINIMAL}
[raw]
sheet = \"Export\"
fallback_row = 10
min_keyword_hits = 2

[mapping]
min_score = 25
abort_on_insufficient = true

[writer]
row_height = 18.0
"
        );
        let config = MergeConfig::from_toml_str(&text).expect("parse");
        assert_eq!(config.raw.sheet.as_deref(), Some("Export"));
        assert_eq!(config.raw.search.fallback_row, 10);
        assert_eq!(config.raw.search.min_keyword_hits, 2);
        assert_eq!(config.raw.search.scan_rows, 20);
        assert_eq!(config.mapping.min_score, 25);
        assert!(config.mapping.abort_on_insufficient);
        assert!((config.mapping.min_coverage - 0.7).abs() < f64::EPSILON);
        assert!((config.writer.row_height - 18.0).abs() < f64::EPSILON);
        assert_eq!(config.writer.currency_format, "$#,##0");
    }

    #[test]
    fn test_example_config_parses() {
        let config = MergeConfig::from_toml_str(include_str!("../../../pipemerge.example.toml"))
            .expect("example config");
        assert_eq!(config.template.layout.data_start_row, 5);
        assert_eq!(
            config.template.backup_dir,
            Some(PathBuf::from("templates/backups"))
        );
        assert_eq!(config.transform, TransformOptions::default());
    }

    #[test]
    fn test_locations_are_required() {
        let text = r#"
[template]
path = "templates/pipeline.xlsx"
sheet_name = "Pipeline"
header_row = 4
data_start_row = 5
"#;
        let err = MergeConfig::from_toml_str(text).expect_err("missing output");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_data_start_must_follow_header() {
        let text = MINIMAL.replace("data_start_row = 5", "data_start_row = 4");
        let err = MergeConfig::from_toml_str(&text).expect_err("invalid rows");
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("data_start_row (4)"));
    }

    #[test]
    fn test_coverage_bounds() {
        let text = format!("{MINIMAL}\n[mapping]\nmin_coverage = 1.5\n");
        let err = MergeConfig::from_toml_str(&text).expect_err("coverage");
        assert!(err.to_string().contains("min_coverage"));
    }
}
