//! Row transformation: projection, coercion, filtering and ordering.

use std::sync::LazyLock;

use pipemerge_map::ColumnMapping;
use pipemerge_model::{CellValue, MergeWarning, Row, TransformOptions};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::normalization::coerce;

/// A row holding nothing but a bare count in its second field.
static BARE_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("Invalid bare count regex"));

/// Row counts observed at each step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformStats {
    pub input_rows: usize,
    pub dropped_empty: usize,
    pub dropped_missing_key: usize,
    pub dropped_boilerplate: usize,
    pub folded_count: bool,
    pub coercion_fallbacks: usize,
}

/// Transformed rows plus what happened to get there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutcome {
    /// Rows in final order; the Total row, if any, is last.
    pub rows: Vec<Row>,
    pub has_total: bool,
    pub stats: TransformStats,
    pub warnings: Vec<MergeWarning>,
}

/// Turns raw rows into template-aligned rows.
#[derive(Debug, Clone)]
pub struct RowTransformer {
    boilerplate: Vec<String>,
}

impl RowTransformer {
    pub fn new(options: &TransformOptions) -> Self {
        Self {
            boilerplate: options
                .boilerplate
                .iter()
                .map(|text| text.to_lowercase())
                .collect(),
        }
    }

    /// Run every step in order.
    ///
    /// 1. project mapped raw columns onto DATA slots
    /// 2. coerce each value to its slot's type, keeping raw values on failure
    /// 3. drop all-empty rows
    /// 4. drop rows without a second field (the Total row is exempt)
    /// 5. drop boilerplate rows
    /// 6. pull out Total rows and fold a stray bare count into the first one
    /// 7. owner rows sorted by owner, then owner-less rows, then Total
    pub fn transform(&self, raw_rows: &[Vec<CellValue>], mapping: &ColumnMapping) -> TransformOutcome {
        let mut stats = TransformStats {
            input_rows: raw_rows.len(),
            ..TransformStats::default()
        };
        let mut warnings = Vec::new();

        let mut rows: Vec<Row> = raw_rows
            .iter()
            .map(|raw| self.project(raw, mapping, &mut stats.coercion_fallbacks))
            .collect();

        let before = rows.len();
        rows.retain(|row| !row.is_all_empty());
        stats.dropped_empty = before - rows.len();

        if mapping.entries.len() >= 2 {
            let before = rows.len();
            rows.retain(|row| row.is_total() || !row.field(1).is_empty());
            stats.dropped_missing_key = before - rows.len();
        }

        let before = rows.len();
        rows.retain(|row| !self.is_boilerplate(row));
        stats.dropped_boilerplate = before - rows.len();

        let (mut totals, mut rows): (Vec<Row>, Vec<Row>) =
            rows.into_iter().partition(Row::is_total);
        if let Some(total) = totals.first_mut()
            && let Some(stray) = rows.iter().position(is_bare_count)
        {
            let count = rows.remove(stray);
            debug!(count = %count.field(1), "folded stray count into total row");
            set_field(total, 1, count.field(1).clone());
            stats.folded_count = true;
        }
        if totals.len() > 1 {
            warn!(count = totals.len(), "multiple total rows");
            warnings.push(MergeWarning::MultipleTotals {
                count: totals.len(),
            });
        }

        let (mut owned, unowned): (Vec<Row>, Vec<Row>) =
            rows.into_iter().partition(Row::has_owner);
        owned.sort_by_cached_key(Row::owner_key);

        let has_total = !totals.is_empty();
        let mut ordered = owned;
        ordered.extend(unowned);
        ordered.append(&mut totals);

        if stats.coercion_fallbacks > 0 {
            warnings.push(MergeWarning::CoercionFallbacks {
                count: stats.coercion_fallbacks,
            });
        }
        if ordered.is_empty() {
            warn!("no rows survived filtering");
            warnings.push(MergeWarning::EmptyResult);
        }

        info!(
            input = stats.input_rows,
            output = ordered.len(),
            dropped_empty = stats.dropped_empty,
            dropped_missing_key = stats.dropped_missing_key,
            dropped_boilerplate = stats.dropped_boilerplate,
            has_total,
            "rows transformed"
        );

        TransformOutcome {
            rows: ordered,
            has_total,
            stats,
            warnings,
        }
    }

    /// Pull mapped values into slot order and coerce them.
    fn project(&self, raw: &[CellValue], mapping: &ColumnMapping, fallbacks: &mut usize) -> Row {
        let values = mapping
            .entries
            .iter()
            .map(|entry| {
                let value = entry
                    .raw_index
                    .filter(|_| entry.accepted)
                    .and_then(|index| raw.get(index))
                    .cloned()
                    .unwrap_or_default();
                let coerced = coerce(value, entry.value_type);
                if coerced.fell_back {
                    *fallbacks += 1;
                }
                coerced.value
            })
            .collect();
        Row::new(values)
    }

    fn is_boilerplate(&self, row: &Row) -> bool {
        [row.field(0), row.field(1)].iter().any(|value| {
            let text = value.to_string().to_lowercase();
            self.boilerplate
                .iter()
                .any(|phrase| text.contains(phrase.as_str()))
        })
    }
}

/// Second field is a bare integer and every other field is empty.
fn is_bare_count(row: &Row) -> bool {
    BARE_COUNT.is_match(&row.field(1).display_trimmed())
        && row
            .values
            .iter()
            .enumerate()
            .all(|(index, value)| index == 1 || value.is_empty())
}

fn set_field(row: &mut Row, index: usize, value: CellValue) {
    if row.values.len() <= index {
        row.values.resize(index + 1, CellValue::Empty);
    }
    row.values[index] = value;
}
