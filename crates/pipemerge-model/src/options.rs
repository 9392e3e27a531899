//! Options passed explicitly to each merge stage.
//!
//! Locations (sheet name, header row, data-start row) are always supplied by
//! the caller. Tunables carry defaults so a configuration file only needs to
//! mention what it changes.

use serde::{Deserialize, Serialize};

// =============================================================================
// TEMPLATE LAYOUT
// =============================================================================

/// Physical layout of the destination template.
///
/// Row and column numbers are 1-based, as shown by spreadsheet applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLayout {
    /// Worksheet holding the report.
    pub sheet_name: String,
    /// Row containing the column headers.
    pub header_row: u32,
    /// First row of the data region.
    pub data_start_row: u32,
    /// First header column; column A is reserved in the report layout.
    #[serde(default = "default_first_column")]
    pub first_column: u32,
    /// Month/year headers from this year onward are forecast columns.
    #[serde(default = "default_calendar_baseline_year")]
    pub calendar_baseline_year: i32,
}

fn default_first_column() -> u32 {
    2
}

fn default_calendar_baseline_year() -> i32 {
    2024
}

impl TemplateLayout {
    pub fn new(sheet_name: impl Into<String>, header_row: u32, data_start_row: u32) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            header_row,
            data_start_row,
            first_column: default_first_column(),
            calendar_baseline_year: default_calendar_baseline_year(),
        }
    }

    /// Zero-based header row.
    pub fn header_row_index(&self) -> u32 {
        self.header_row.saturating_sub(1)
    }

    /// Zero-based data-start row.
    pub fn data_start_index(&self) -> u32 {
        self.data_start_row.saturating_sub(1)
    }

    /// Zero-based first header column.
    pub fn first_column_index(&self) -> u32 {
        self.first_column.saturating_sub(1)
    }
}

// =============================================================================
// RAW HEADER SEARCH
// =============================================================================

/// How the raw sheet's header row is discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderSearchOptions {
    /// Number of leading rows scanned.
    pub scan_rows: usize,
    /// Keyword hits a row needs to qualify as the header.
    pub min_keyword_hits: usize,
    /// 1-based row used when no row qualifies.
    pub fallback_row: usize,
    pub keywords: Vec<String>,
    /// Cells containing any of these never count as hits (filter summaries).
    pub ignore_terms: Vec<String>,
}

impl Default for HeaderSearchOptions {
    fn default() -> Self {
        Self {
            scan_rows: 20,
            min_keyword_hits: 3,
            fallback_row: 14,
            keywords: [
                "capture",
                "opportunity",
                "salesforce",
                "sf",
                "stage",
                "positioning",
                "govwin",
            ]
            .map(String::from)
            .to_vec(),
            ignore_terms: default_ignore_terms(),
        }
    }
}

fn default_ignore_terms() -> Vec<String> {
    vec!["equals".to_string(), "probability".to_string()]
}

// =============================================================================
// MAPPING
// =============================================================================

/// Acceptance rules for the column mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingOptions {
    /// Minimum score for a candidate to be accepted.
    pub min_score: i32,
    /// Fraction of DATA slots that must be mapped before a warning is raised.
    pub min_coverage: f64,
    /// Treat insufficient coverage as fatal.
    pub abort_on_insufficient: bool,
    /// Values sampled per raw column for content checks.
    pub sample_rows: usize,
    /// Raw headers containing any of these are never candidates.
    pub exclusion_terms: Vec<String>,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            min_score: 10,
            min_coverage: 0.7,
            abort_on_insufficient: false,
            sample_rows: 3,
            exclusion_terms: default_ignore_terms(),
        }
    }
}

// =============================================================================
// TRANSFORM
// =============================================================================

/// Row filtering rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Rows whose first or second field contains one of these are dropped.
    pub boilerplate: Vec<String>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            boilerplate: vec![
                "Confidential Information - Do Not Distribute".to_string(),
                "All rights reserved".to_string(),
            ],
        }
    }
}

// =============================================================================
// WRITER
// =============================================================================

/// Cell formatting applied when writing the data region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Height in points for every written row.
    pub row_height: f64,
    pub currency_format: String,
    pub date_format: String,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            row_height: 30.0,
            currency_format: "$#,##0".to_string(),
            date_format: "mm/dd/yyyy".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_indices_are_zero_based() {
        let layout = TemplateLayout::new("Pipeline", 4, 5);
        assert_eq!(layout.header_row_index(), 3);
        assert_eq!(layout.data_start_index(), 4);
        assert_eq!(layout.first_column_index(), 1);
    }

    #[test]
    fn test_layout_requires_locations() {
        let err = toml::from_str::<TemplateLayout>("sheet_name = \"Pipeline\"");
        assert!(err.is_err());

        let layout: TemplateLayout =
            toml::from_str("sheet_name = \"Pipeline\"\nheader_row = 4\ndata_start_row = 5")
                .expect("parse layout");
        assert_eq!(layout.first_column, 2);
        assert_eq!(layout.calendar_baseline_year, 2024);
    }

    #[test]
    fn test_partial_tunables_keep_defaults() {
        let options: MappingOptions = toml::from_str("min_score = 25").expect("parse options");
        assert_eq!(options.min_score, 25);
        assert!((options.min_coverage - 0.7).abs() < f64::EPSILON);
        assert_eq!(options.sample_rows, 3);
    }
}
