use crate::constants::{
    CLI_DATE_FORMAT, CSV_EXTENSION, ISO_DATE_FORMAT, MAX_DAYS_TO_EXPORT, RAW_EXPORT_PREFIX,
    SEASON_START_DAY, SEASON_START_MONTH,
};
use crate::error::{Result, ScraperError};
use chrono::{Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

static RAW_EXPORT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Hitting_(\d{4}-\d{2}-\d{2})_to_(\d{4}-\d{2}-\d{2})\.csv$")
        .expect("raw export file name pattern is valid")
});

/// How date values reach the report's date inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DateEntry {
    /// Assign the input's value by script and dispatch `change`.
    Inject,
    /// Focus the input, clear it with keystrokes and type the date.
    Type,
}

/// Parse a `MM/DD/YYYY` command line date.
pub fn parse_cli_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), CLI_DATE_FORMAT).map_err(|e| ScraperError::InvalidDate {
        input: input.to_string(),
        reason: format!("expected MM/DD/YYYY (e.g. 4/17/2025): {e}"),
    })
}

/// March 1 of the given date's year.
pub fn season_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), SEASON_START_MONTH, SEASON_START_DAY)
        .expect("season start is a valid calendar date")
}

/// `M/D/YYYY`, the form the report's date inputs accept.
pub fn format_input_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ScraperError::InvalidDate {
                input: end.format(ISO_DATE_FORMAT).to_string(),
                reason: format!("end date precedes start date {}", start.format(ISO_DATE_FORMAT)),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start_iso(&self) -> String {
        self.start.format(ISO_DATE_FORMAT).to_string()
    }

    pub fn end_iso(&self) -> String {
        self.end.format(ISO_DATE_FORMAT).to_string()
    }

    /// `<start>_to_<end>`, shared by every file derived from this range.
    pub fn file_tag(&self) -> String {
        format!("{}_to_{}", self.start_iso(), self.end_iso())
    }

    /// `Hitting_<start>_to_<end>.csv`
    pub fn export_file_name(&self) -> String {
        format!("{}{}.{}", RAW_EXPORT_PREFIX, self.file_tag(), CSV_EXTENSION)
    }

    /// Text the report shows once it has been refreshed for this range.
    pub fn confirmation_text(&self) -> String {
        format!("{} and {}", self.start_iso(), self.end_iso())
    }

    /// Recover the range from a raw export file name.
    pub fn from_export_file_name(name: &str) -> Option<Self> {
        let caps = RAW_EXPORT_NAME.captures(name)?;
        let start = NaiveDate::parse_from_str(&caps[1], ISO_DATE_FORMAT).ok()?;
        let end = NaiveDate::parse_from_str(&caps[2], ISO_DATE_FORMAT).ok()?;
        DateRange::new(start, end).ok()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start_iso(), self.end_iso())
    }
}

/// One day's worth of export work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    pub range: DateRange,
    pub file_name: String,
}

impl ExportJob {
    pub fn new(range: DateRange) -> Self {
        Self {
            file_name: range.export_file_name(),
            range,
        }
    }
}

/// Validated input to the export loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    pub starting_end_date: NaiveDate,
    pub num_days: u32,
}

impl ExportRequest {
    pub fn new(starting_end_date: NaiveDate, num_days: u32) -> Result<Self> {
        if !(1..=MAX_DAYS_TO_EXPORT).contains(&num_days) {
            return Err(ScraperError::DayCount {
                got: num_days,
                max: MAX_DAYS_TO_EXPORT,
            });
        }
        let start = season_start(starting_end_date);
        if starting_end_date <= start {
            return Err(ScraperError::InvalidDate {
                input: format_input_date(starting_end_date),
                reason: format!("must be after {}", format_input_date(start)),
            });
        }
        Ok(Self {
            starting_end_date,
            num_days,
        })
    }

    pub fn season_start(&self) -> NaiveDate {
        season_start(self.starting_end_date)
    }

    /// One job per day: fixed start, end advancing one calendar day at a time.
    pub fn jobs(&self) -> Vec<ExportJob> {
        let start = self.season_start();
        (0..self.num_days)
            .map(|i| {
                let end = self.starting_end_date + Duration::days(i64::from(i));
                ExportJob::new(DateRange { start, end })
            })
            .collect()
    }
}

/// Column rules for the normalization transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationSpec {
    pub excluded_columns: BTreeSet<String>,
    pub inverted_columns: BTreeSet<String>,
    pub min_plate_appearances: u32,
}

impl Default for NormalizationSpec {
    fn default() -> Self {
        crate::config::NormalizeConfig::default().to_spec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_cli_date() {
        assert_eq!(parse_cli_date("4/17/2025").unwrap(), date(2025, 4, 17));
        assert_eq!(parse_cli_date("04/07/2025").unwrap(), date(2025, 4, 7));
        assert!(matches!(
            parse_cli_date("2025-04-17"),
            Err(ScraperError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_request_rejects_day_count_out_of_range() {
        assert!(matches!(
            ExportRequest::new(date(2025, 4, 17), 0),
            Err(ScraperError::DayCount { got: 0, .. })
        ));
        assert!(matches!(
            ExportRequest::new(date(2025, 4, 17), 11),
            Err(ScraperError::DayCount { got: 11, .. })
        ));
        assert!(ExportRequest::new(date(2025, 4, 17), 10).is_ok());
    }

    #[test]
    fn test_request_requires_date_after_season_start() {
        assert!(ExportRequest::new(date(2025, 3, 1), 1).is_err());
        assert!(ExportRequest::new(date(2025, 2, 14), 1).is_err());
        assert!(ExportRequest::new(date(2025, 3, 2), 1).is_ok());
    }

    #[test]
    fn test_jobs_advance_end_one_day_with_fixed_start() {
        let request = ExportRequest::new(date(2025, 4, 28), 5).unwrap();
        let jobs = request.jobs();

        assert_eq!(jobs.len(), 5);
        for job in &jobs {
            assert_eq!(job.range.start, date(2025, 3, 1));
        }
        for pair in jobs.windows(2) {
            assert_eq!(pair[1].range.end, pair[0].range.end + Duration::days(1));
        }
        // Month rollover
        assert_eq!(jobs[4].range.end, date(2025, 5, 2));
        assert_eq!(jobs[4].file_name, "Hitting_2025-03-01_to_2025-05-02.csv");
    }

    #[test]
    fn test_file_name_round_trips_range() {
        let range = DateRange::new(date(2025, 3, 1), date(2025, 4, 17)).unwrap();
        assert_eq!(range.export_file_name(), "Hitting_2025-03-01_to_2025-04-17.csv");
        assert_eq!(range.confirmation_text(), "2025-03-01 and 2025-04-17");
        assert_eq!(
            DateRange::from_export_file_name("Hitting_2025-03-01_to_2025-04-17.csv"),
            Some(range)
        );
        assert_eq!(DateRange::from_export_file_name("hitting.csv"), None);
    }

    #[test]
    fn test_input_date_format_has_no_padding() {
        assert_eq!(format_input_date(date(2025, 3, 1)), "3/1/2025");
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(DateRange::new(date(2025, 5, 1), date(2025, 4, 1)).is_err());
    }
}
