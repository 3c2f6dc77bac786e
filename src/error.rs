use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: set {0} in the environment or .env file")]
    MissingCredential(&'static str),

    #[error("Invalid date '{input}': {reason}")]
    InvalidDate { input: String, reason: String },

    #[error("Number of days to export must be between 1 and {max}, got {got}")]
    DayCount { got: u32, max: u32 },

    #[error("WebDriver error ({code}): {message}")]
    WebDriver { code: String, message: String },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error(
        "Timed out after {secs:.1}s waiting for {what}{}",
        cause.as_ref().map(|c| format!(" (last error: {c})")).unwrap_or_default()
    )]
    Timeout {
        what: String,
        secs: f64,
        /// Last lookup error seen before the deadline, if any.
        cause: Option<String>,
    },

    #[error("Failed to set {field} to {date}: {source}")]
    DateFieldSet {
        field: &'static str,
        date: String,
        #[source]
        source: Box<ScraperError>,
    },

    #[error("Date range {start} to {end} was not confirmed by the page")]
    DateMismatch { start: String, end: String },

    #[error("No new CSV files found in {}", dir.display())]
    NoNewExport { dir: PathBuf },

    #[error("No CSV files found in {}", dir.display())]
    NoCsvFound { dir: PathBuf },

    #[error("Input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("Missing required column '{column}' in {}", path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("Duplicate column '{column}' in {}", path.display())]
    DuplicateColumn { column: String, path: PathBuf },

    #[error("Invalid value '{value}' in column '{column}' at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },
}

impl ScraperError {
    /// Date field failures abort the whole export run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScraperError::DateFieldSet { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
