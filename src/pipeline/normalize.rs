//! Cleaning, shaping and z-score standardization of one exported hitting table.
//!
//! Standard deviation is the sample estimate (n - 1). A column whose deviation is zero, or
//! that has fewer than two values, has no defined z-score; its cells become `NaN`.

use crate::constants::{NAME_COLUMN, PA_COLUMN, TEAM_COLUMN, UNDEFINED_SENTINEL};
use crate::error::{Result, ScraperError};
use crate::pipeline::table::{Cell, StatTable};
use crate::types::NormalizationSpec;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, warn};

const DECIMALS: i32 = 4;

/// Mean and sample standard deviation of one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl ColumnStats {
    /// `None` when fewer than two values exist or every value is equal.
    pub fn sample(values: &[f64]) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let std_dev = variance.sqrt();
        if std_dev == 0.0 || !std_dev.is_finite() {
            return None;
        }
        Some(Self { mean, std_dev })
    }

    pub fn z_score(&self, value: f64) -> f64 {
        (value - self.mean) / self.std_dev
    }
}

/// Round to 4 places and print without a trailing `.0` or `-0`.
///
/// Ties round half away from zero, unlike pandas' `round`, which
/// rounds half to even; the two can differ in the last printed digit.
pub fn format_rounded(value: f64) -> String {
    let factor = 10f64.powi(DECIMALS);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        rounded.to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizationReport {
    pub rows_in: usize,
    pub rows_kept: usize,
    pub columns_removed: Vec<String>,
    pub normalized_columns: Vec<String>,
    pub inverted_columns: Vec<String>,
    pub undefined_columns: Vec<String>,
}

impl NormalizationReport {
    pub fn rows_dropped(&self) -> usize {
        self.rows_in - self.rows_kept
    }
}

#[derive(Debug, Clone)]
pub struct NormalizationOutput {
    pub cleaned: StatTable,
    pub normalized: StatTable,
    pub names: StatTable,
    pub report: NormalizationReport,
}

fn require_columns(table: &StatTable, source: &Path) -> Result<()> {
    for column in [TEAM_COLUMN, NAME_COLUMN, PA_COLUMN] {
        if table.column_index(column).is_none() {
            return Err(ScraperError::MissingColumn {
                column: column.to_string(),
                path: source.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// Drop identifier columns and rows under the plate appearance threshold.
fn clean(
    table: &mut StatTable,
    spec: &NormalizationSpec,
    source: &Path,
    report: &mut NormalizationReport,
) -> Result<()> {
    let excluded: Vec<&String> = spec.excluded_columns.iter().collect();
    report.columns_removed = table.drop_columns(&excluded);
    if !report.columns_removed.is_empty() {
        info!("Removed columns: {:?}", report.columns_removed);
    }

    let pa = table
        .column_index(PA_COLUMN)
        .ok_or_else(|| ScraperError::MissingColumn {
            column: PA_COLUMN.to_string(),
            path: source.to_path_buf(),
        })?;
    for (row, cells) in table.rows().iter().enumerate() {
        if let Cell::Text(value) = Cell::parse(&cells[pa]) {
            return Err(ScraperError::InvalidValue {
                column: PA_COLUMN.to_string(),
                row,
                value: value.to_string(),
            });
        }
    }

    let min_pa = f64::from(spec.min_plate_appearances);
    table.retain_rows(|cells| {
        Cell::parse(&cells[pa])
            .as_number()
            .is_some_and(|v| v >= min_pa)
    });
    report.rows_kept = table.len();
    info!(
        "Removed {} rows where {} < {}; {} remaining",
        report.rows_dropped(),
        PA_COLUMN,
        spec.min_plate_appearances,
        report.rows_kept
    );
    Ok(())
}

/// `Team`, `Name`, then the rest in original order; rows stably sorted by `Team`.
fn shape(table: &StatTable) -> StatTable {
    let mut order: Vec<&str> = vec![TEAM_COLUMN, NAME_COLUMN];
    order.extend(
        table
            .headers()
            .iter()
            .map(String::as_str)
            .filter(|h| *h != TEAM_COLUMN && *h != NAME_COLUMN),
    );
    let mut shaped = table.select_columns(&order);
    shaped.sort_by_column(0);
    shaped
}

/// Z-score every numeric column except `PA`, negating inverted columns.
fn standardize(
    shaped: &StatTable,
    numeric: &BTreeSet<String>,
    spec: &NormalizationSpec,
    report: &mut NormalizationReport,
) -> StatTable {
    let mut normalized = shaped.clone();

    for (col, header) in shaped.headers().iter().enumerate() {
        if !numeric.contains(header) {
            continue;
        }

        if header == PA_COLUMN {
            for row in normalized.rows_mut() {
                if let Some(v) = Cell::parse(&row[col]).as_number() {
                    row[col] = format_rounded(v);
                }
            }
            continue;
        }

        let values: Vec<f64> = shaped.column_cells(col).filter_map(|c| c.as_number()).collect();
        let inverted = spec.inverted_columns.contains(header);
        let stats = ColumnStats::sample(&values);

        match stats {
            Some(stats) => {
                debug!(
                    "{}: mean={:.4} std={:.4} inverted={}",
                    header, stats.mean, stats.std_dev, inverted
                );
                report.normalized_columns.push(header.clone());
                if inverted {
                    report.inverted_columns.push(header.clone());
                }
            }
            None => {
                warn!(
                    "Column '{}' has no spread across {} values; writing {}",
                    header,
                    values.len(),
                    UNDEFINED_SENTINEL
                );
                report.undefined_columns.push(header.clone());
            }
        }

        for row in normalized.rows_mut() {
            let Some(v) = Cell::parse(&row[col]).as_number() else {
                continue;
            };
            row[col] = match stats {
                Some(stats) => {
                    let z = stats.z_score(v);
                    format_rounded(if inverted { -z } else { z })
                }
                None => UNDEFINED_SENTINEL.to_string(),
            };
        }
    }

    normalized
}

/// Run the full transform on a raw export read from `source`.
///
/// Returns the cleaned table, the standardized table and the `Team`/`Name` index.
pub fn normalize_table(
    mut table: StatTable,
    spec: &NormalizationSpec,
    source: &Path,
) -> Result<NormalizationOutput> {
    require_columns(&table, source)?;

    let mut report = NormalizationReport {
        rows_in: table.len(),
        ..Default::default()
    };

    // Column types come from the whole export, before any rows are filtered out
    let numeric: BTreeSet<String> = table
        .headers()
        .iter()
        .enumerate()
        .filter(|(i, _)| table.is_numeric_column(*i))
        .map(|(_, h)| h.clone())
        .collect();

    clean(&mut table, spec, source, &mut report)?;
    // An exclusion list may have removed a structural column
    require_columns(&table, source)?;
    let cleaned = shape(&table);
    let normalized = standardize(&cleaned, &numeric, spec, &mut report);
    let names = normalized.select_columns(&[TEAM_COLUMN, NAME_COLUMN]);

    Ok(NormalizationOutput {
        cleaned,
        normalized,
        names,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn table(csv: &str) -> StatTable {
        StatTable::from_reader(csv.as_bytes()).unwrap()
    }

    fn source() -> PathBuf {
        PathBuf::from("Hitting_2025-03-01_to_2025-04-17.csv")
    }

    #[test]
    fn test_sample_std_dev() {
        let stats = ColumnStats::sample(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.mean, 5.0);
        // Population std of this set is 2.0; sample std is sqrt(32/7)
        assert!((stats.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_spread_is_undefined() {
        assert_eq!(ColumnStats::sample(&[3.0, 3.0, 3.0]), None);
        assert_eq!(ColumnStats::sample(&[3.0]), None);
        assert_eq!(ColumnStats::sample(&[]), None);
    }

    #[test]
    fn test_format_rounded() {
        assert_eq!(format_rounded(0.123456), "0.1235");
        assert_eq!(format_rounded(-1.0), "-1");
        assert_eq!(format_rounded(-0.00001), "0");
        assert_eq!(format_rounded(42.0), "42");
    }

    #[test]
    fn test_missing_pa_column_names_file() {
        let err = normalize_table(
            table("Team,Name,AVG\nSEA,A,.3\n"),
            &NormalizationSpec::default(),
            &source(),
        )
        .unwrap_err();
        match err {
            ScraperError::MissingColumn { column, path } => {
                assert_eq!(column, "PA");
                assert_eq!(path, source());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_text_pa_is_rejected() {
        let err = normalize_table(
            table("Team,Name,PA\nSEA,A,lots\n"),
            &NormalizationSpec::default(),
            &source(),
        )
        .unwrap_err();
        assert!(matches!(err, ScraperError::InvalidValue { row: 0, .. }));
    }

    #[test]
    fn test_shape_moves_team_and_name_first_and_sorts_stably() {
        let out = normalize_table(
            table("Name,PA,Team,AVG\nB,20,SEA,.1\nA,20,NYY,.2\nC,20,SEA,.3\n"),
            &NormalizationSpec::default(),
            &source(),
        )
        .unwrap();

        assert_eq!(out.cleaned.headers(), ["Team", "Name", "PA", "AVG"]);
        let names: Vec<&str> = out.cleaned.iter_rows().map(|r| r.raw("Name").unwrap()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        // Cleaned cells keep their original text
        assert_eq!(out.cleaned.row(1).unwrap().raw("AVG"), Some(".1"));
    }

    #[test]
    fn test_inverted_column_is_negated() {
        let out = normalize_table(
            table("Team,Name,PA,AVG,K%+\nA,a,10,1,1\nB,b,10,2,2\nC,c,10,3,3\n"),
            &NormalizationSpec::default(),
            &source(),
        )
        .unwrap();

        let avg: Vec<&str> = out.normalized.iter_rows().map(|r| r.raw("AVG").unwrap()).collect();
        let k: Vec<&str> = out.normalized.iter_rows().map(|r| r.raw("K%+").unwrap()).collect();
        assert_eq!(avg, vec!["-1", "0", "1"]);
        assert_eq!(k, vec!["1", "0", "-1"]);
        assert_eq!(out.report.inverted_columns, vec!["K%+".to_string()]);
    }

    #[test]
    fn test_pa_is_not_standardized() {
        let out = normalize_table(
            table("Team,Name,PA,AVG\nA,a,10,1\nB,b,30,2\n"),
            &NormalizationSpec::default(),
            &source(),
        )
        .unwrap();
        let pa: Vec<&str> = out.normalized.iter_rows().map(|r| r.raw("PA").unwrap()).collect();
        assert_eq!(pa, vec!["10", "30"]);
        assert!(!out.report.normalized_columns.contains(&"PA".to_string()));
    }

    #[test]
    fn test_constant_column_propagates_sentinel() {
        let out = normalize_table(
            table("Team,Name,PA,HR,AVG\nA,a,10,0,.2\nB,b,12,0,\nC,c,15,0,.4\n"),
            &NormalizationSpec::default(),
            &source(),
        )
        .unwrap();

        let hr: Vec<&str> = out.normalized.iter_rows().map(|r| r.raw("HR").unwrap()).collect();
        assert_eq!(hr, vec![UNDEFINED_SENTINEL; 3]);
        assert_eq!(out.report.undefined_columns, vec!["HR".to_string()]);

        // Missing cells stay empty; two present values still standardize
        let avg: Vec<&str> = out.normalized.iter_rows().map(|r| r.raw("AVG").unwrap()).collect();
        assert_eq!(avg, vec!["-0.7071", "", "0.7071"]);
    }

    #[test]
    fn test_text_columns_pass_through() {
        let out = normalize_table(
            table("Team,Name,PA,Pos,AVG\nA,a,10,SS,.2\nB,b,12,CF,.3\n"),
            &NormalizationSpec::default(),
            &source(),
        )
        .unwrap();
        assert_eq!(out.normalized.row(0).unwrap().raw("Pos"), Some("SS"));
    }

    #[test]
    fn test_numeric_type_decided_before_filtering() {
        // The only text AVG sits in a dropped row, so AVG stays unnormalized
        let out = normalize_table(
            table("Team,Name,PA,AVG\nA,a,10,.2\nB,b,3,n/a\nC,c,12,.3\n"),
            &NormalizationSpec::default(),
            &source(),
        )
        .unwrap();
        assert_eq!(out.normalized.row(0).unwrap().raw("AVG"), Some(".2"));
    }

    #[test]
    fn test_names_follow_normalized_order() {
        let out = normalize_table(
            table("Team,Name,PA\nSEA,b,10\nNYY,a,10\n"),
            &NormalizationSpec::default(),
            &source(),
        )
        .unwrap();
        assert_eq!(out.names.headers(), ["Team", "Name"]);
        assert_eq!(out.names.rows(), &[vec!["NYY".to_string(), "a".to_string()], vec!["SEA".to_string(), "b".to_string()]]);
    }
}
