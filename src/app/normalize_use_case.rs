use crate::constants::{CLEANED_PREFIX, CSV_EXTENSION, NAMES_PREFIX, NORMALIZED_PREFIX};
use crate::error::Result;
use crate::pipeline::{normalize_table, NormalizationReport, StatTable};
use crate::types::{DateRange, NormalizationSpec};
use metrics::counter;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Paths of the three files derived from one raw export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOutputs {
    pub cleaned: PathBuf,
    pub normalized: PathBuf,
    pub names: PathBuf,
}

impl NormalizeOutputs {
    /// Name outputs after the input's date range, or its file stem when it has none.
    pub fn for_input(input: &Path, output_dir: &Path) -> Self {
        let file_name = input.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let tag = match DateRange::from_export_file_name(file_name) {
            Some(range) => range.file_tag(),
            None => input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("export")
                .to_string(),
        };
        let path = |prefix: &str| output_dir.join(format!("{prefix}{tag}.{CSV_EXTENSION}"));
        Self {
            cleaned: path(CLEANED_PREFIX),
            normalized: path(NORMALIZED_PREFIX),
            names: path(NAMES_PREFIX),
        }
    }
}

/// Reads one raw export and writes its cleaned, normalized and names tables.
pub struct NormalizeUseCase {
    spec: NormalizationSpec,
}

impl NormalizeUseCase {
    pub fn new(spec: NormalizationSpec) -> Self {
        Self { spec }
    }

    #[instrument(skip(self, input, output_dir), fields(input = %input.display()))]
    pub fn run(&self, input: &Path, output_dir: &Path) -> Result<(NormalizeOutputs, NormalizationReport)> {
        let table = StatTable::from_csv_path(input)?;
        info!("Loaded {} rows x {} columns", table.len(), table.headers().len());

        let output = normalize_table(table, &self.spec, input)?;
        counter!("hitting_rows_kept_total").increment(output.report.rows_kept as u64);
        counter!("hitting_rows_dropped_total").increment(output.report.rows_dropped() as u64);

        fs::create_dir_all(output_dir)?;
        let outputs = NormalizeOutputs::for_input(input, output_dir);

        output.cleaned.write_csv_path(&outputs.cleaned)?;
        info!("Cleaned data saved to: {}", outputs.cleaned.display());
        output.normalized.write_csv_path(&outputs.normalized)?;
        info!("Normalized data saved to: {}", outputs.normalized.display());
        output.names.write_csv_path(&outputs.names)?;
        info!("Batter names saved to: {}", outputs.names.display());

        Ok((outputs, output.report))
    }
}
