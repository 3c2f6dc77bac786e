use crate::constants::{
    DEFAULT_EXCLUDED_COLUMNS, DEFAULT_INVERTED_COLUMNS, DEFAULT_MIN_PLATE_APPEARANCES,
    DEFAULT_WEBDRIVER_URL, LOGIN_URL, PASSWORD_ENV, REPORT_URL, USERNAME_ENV,
};
use crate::error::{Result, ScraperError};
use crate::types::{DateEntry, NormalizationSpec};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub browser: BrowserConfig,
    pub export: ExportConfig,
    pub normalize: NormalizeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub login_url: String,
    pub report_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            login_url: LOGIN_URL.to_string(),
            report_url: REPORT_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub headless: bool,
    pub date_entry: DateEntry,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            headless: true,
            date_entry: DateEntry::Type,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub download_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub download_timeout_secs: u64,
    pub element_timeout_secs: u64,
    /// Pause after page interactions so the report widgets can re-render.
    pub settle_ms: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            poll_interval_ms: 1000,
            download_timeout_secs: 30,
            element_timeout_secs: 10,
            settle_ms: 1000,
        }
    }
}

impl ExportConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub excluded_columns: Vec<String>,
    pub inverted_columns: Vec<String>,
    pub min_plate_appearances: u32,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            excluded_columns: DEFAULT_EXCLUDED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            inverted_columns: DEFAULT_INVERTED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            min_plate_appearances: DEFAULT_MIN_PLATE_APPEARANCES,
        }
    }
}

impl NormalizeConfig {
    pub fn to_spec(&self) -> NormalizationSpec {
        NormalizationSpec {
            excluded_columns: self.excluded_columns.iter().cloned().collect(),
            inverted_columns: self.inverted_columns.iter().cloned().collect(),
            min_plate_appearances: self.min_plate_appearances,
        }
    }
}

impl Config {
    /// Load from an explicit path, or from `config.toml` when present, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !default_path.exists() {
                    return Ok(Config::default());
                }
                default_path
            }
        };

        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        Self::from_toml(&config_content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.export.poll_interval_ms == 0 {
            return Err(ScraperError::Config(
                "export.poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.export.download_timeout_secs == 0 {
            return Err(ScraperError::Config(
                "export.download_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// `~/Downloads`, the browser's default download location.
pub fn default_download_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_default()
        .join("Downloads")
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Reads credentials from the process environment, loading `.env` first.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ScraperError::MissingCredential(key))
        };
        Ok(Self {
            username: fetch(USERNAME_ENV)?,
            password: fetch(PASSWORD_ENV)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.export.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.export.download_timeout(), Duration::from_secs(30));
        assert_eq!(config.browser.date_entry, DateEntry::Type);
        assert!(config.browser.headless);
        assert_eq!(config.normalize.min_plate_appearances, 10);
        assert!(config.export.download_dir.ends_with("Downloads"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [browser]
            headless = false
            date_entry = "inject"

            [normalize]
            inverted_columns = ["K%+"]
            "#,
        )
        .unwrap();

        assert!(!config.browser.headless);
        assert_eq!(config.browser.date_entry, DateEntry::Inject);
        assert_eq!(config.normalize.inverted_columns, vec!["K%+".to_string()]);
        assert_eq!(config.normalize.excluded_columns.len(), 3);
        assert_eq!(config.export.download_timeout_secs, 30);
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let err = Config::from_toml("[export]\npoll_interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, ScraperError::Config(_)));
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn test_credentials_from_lookup() {
        let env: HashMap<&str, &str> =
            [(USERNAME_ENV, "slugger"), (PASSWORD_ENV, "hunter2")].into_iter().collect();
        let creds = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.username, "slugger");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    #[test]
    fn test_missing_password_is_fatal() {
        let err = Credentials::from_lookup(|k| {
            (k == USERNAME_ENV).then(|| "slugger".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ScraperError::MissingCredential(PASSWORD_ENV)));
    }
}
