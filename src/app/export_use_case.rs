use crate::app::ports::{BrowserPort, Locator, ScriptArg};
use crate::app::wait::{click_when_present, wait_for_element, wait_for_url_containing};
use crate::config::{Credentials, ExportConfig, SiteConfig};
use crate::constants::{
    CHAT_BANNER_CSS, END_DATE_FIELD, EXPORT_BUTTON_XPATH, LOAD_REPORT_XPATH,
    LOAD_SAVE_REPORT_XPATH, LOGIN_PASS_ID, LOGIN_SUBMIT_CSS, LOGIN_USER_ID, SITE_DOMAIN,
    START_DATE_FIELD, UPDATE_BUTTON_XPATH,
};
use crate::error::{Result, ScraperError};
use crate::infra::downloads::DownloadDir;
use crate::types::{format_input_date, DateEntry, DateRange, ExportJob, ExportRequest};
use chrono::NaiveDate;
use metrics::counter;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

const HIDE_BANNER_SCRIPT: &str =
    "let el = document.querySelector(arguments[0]); if (el) el.style.display = 'none';";
const SCROLL_INTO_VIEW_SCRIPT: &str = "arguments[0].scrollIntoView(true);";
const CLICK_SCRIPT: &str = "arguments[0].click();";
const DISPATCH_CHANGE_SCRIPT: &str =
    "arguments[0].dispatchEvent(new Event('change', { bubbles: true }));";
const INJECT_VALUE_SCRIPT: &str = "arguments[0].value = arguments[1]; \
     arguments[0].dispatchEvent(new Event('input', { bubbles: true })); \
     arguments[0].dispatchEvent(new Event('change', { bubbles: true }));";

// WebDriver key codes
const KEY_CONTROL: char = '\u{E009}';
const KEY_DELETE: char = '\u{E017}';

/// Wait and pacing parameters for one export run.
#[derive(Debug, Clone, Copy)]
pub struct ExportTimings {
    pub poll_interval: Duration,
    pub download_timeout: Duration,
    pub element_timeout: Duration,
    pub settle: Duration,
}

impl From<&ExportConfig> for ExportTimings {
    fn from(config: &ExportConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            download_timeout: config.download_timeout(),
            element_timeout: config.element_timeout(),
            settle: config.settle(),
        }
    }
}

/// A day whose export did not complete.
#[derive(Debug, Clone, Serialize)]
pub struct ExportFailure {
    pub range: DateRange,
    pub error: String,
}

/// Result of a complete export run
#[derive(Debug, Default, Serialize)]
pub struct ExportSummary {
    pub attempted: usize,
    pub exported: Vec<PathBuf>,
    pub failures: Vec<ExportFailure>,
}

/// Drives the report page through one export per day.
pub struct ExportUseCase<'a> {
    browser: &'a dyn BrowserPort,
    downloads: DownloadDir,
    site: SiteConfig,
    timings: ExportTimings,
    date_entry: DateEntry,
}

impl<'a> ExportUseCase<'a> {
    pub fn new(
        browser: &'a dyn BrowserPort,
        downloads: DownloadDir,
        site: SiteConfig,
        timings: ExportTimings,
        date_entry: DateEntry,
    ) -> Self {
        Self {
            browser,
            downloads,
            site,
            timings,
            date_entry,
        }
    }

    async fn settle(&self) {
        if !self.timings.settle.is_zero() {
            sleep(self.timings.settle).await;
        }
    }

    /// Log in through the site's login form. Ends once the browser lands back on the site.
    #[instrument(skip(self, credentials), fields(user = %credentials.username))]
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        let timeout = self.timings.element_timeout;
        self.browser.navigate(&self.site.login_url).await?;
        info!("Navigated to login page: {}", self.site.login_url);

        let username = wait_for_element(self.browser, &Locator::id(LOGIN_USER_ID), timeout).await?;
        let password = wait_for_element(self.browser, &Locator::id(LOGIN_PASS_ID), timeout).await?;
        let submit = wait_for_element(self.browser, &Locator::css(LOGIN_SUBMIT_CSS), timeout).await?;

        self.browser.send_keys(&username, &credentials.username).await?;
        self.browser.send_keys(&password, &credentials.password).await?;
        self.browser.click(&submit).await?;
        info!("Login attempted");

        let url = wait_for_url_containing(self.browser, SITE_DOMAIN, timeout).await?;
        self.settle().await;
        info!("Logged in, current URL: {}", url);
        Ok(())
    }

    /// Open the leaderboard and load the account's saved report layout.
    #[instrument(skip(self))]
    pub async fn load_saved_report(&self) -> Result<()> {
        let timeout = self.timings.element_timeout;
        self.browser.navigate(&self.site.report_url).await?;

        click_when_present(self.browser, &Locator::xpath(LOAD_SAVE_REPORT_XPATH), timeout).await?;
        info!("Opened 'Load / Save Report' menu");
        self.settle().await;

        click_when_present(self.browser, &Locator::xpath(LOAD_REPORT_XPATH), timeout).await?;
        info!("Saved report loaded");
        self.settle().await;
        Ok(())
    }

    async fn hide_banner(&self) {
        let result = self
            .browser
            .execute_script(HIDE_BANNER_SCRIPT, vec![ScriptArg::Value(json!(CHAT_BANNER_CSS))])
            .await;
        match result {
            Ok(_) => debug!("Hid blocking banner ({})", CHAT_BANNER_CSS),
            Err(e) => warn!("Could not hide banner: {}", e),
        }
    }

    async fn enter_date(&self, field: &'static str, value: &str) -> Result<()> {
        let timeout = self.timings.element_timeout;
        let locator = Locator::name(field);
        let input = wait_for_element(self.browser, &locator, timeout).await?;

        match self.date_entry {
            DateEntry::Inject => {
                self.browser
                    .execute_script(
                        INJECT_VALUE_SCRIPT,
                        vec![ScriptArg::Element(input), ScriptArg::Value(json!(value))],
                    )
                    .await?;
            }
            DateEntry::Type => {
                self.browser
                    .execute_script(SCROLL_INTO_VIEW_SCRIPT, vec![ScriptArg::Element(input.clone())])
                    .await?;
                self.browser
                    .execute_script(CLICK_SCRIPT, vec![ScriptArg::Element(input)])
                    .await?;
                self.settle().await;

                // The picker re-renders on focus; look the input up again
                let input = wait_for_element(self.browser, &locator, timeout).await?;
                self.browser.send_keys(&input, &format!("{KEY_CONTROL}a")).await?;
                self.browser.send_keys(&input, &KEY_DELETE.to_string()).await?;
                self.browser.send_keys(&input, value).await?;
                self.browser
                    .execute_script(DISPATCH_CHANGE_SCRIPT, vec![ScriptArg::Element(input)])
                    .await?;
            }
        }

        let input = wait_for_element(self.browser, &locator, timeout).await?;
        debug!(
            "{} after entry: {:?}",
            field,
            self.browser.element_value(&input).await?
        );
        Ok(())
    }

    /// Set one date input and press Update. Any failure here is fatal to the run.
    #[instrument(skip(self))]
    pub async fn set_date_field(&self, field: &'static str, date: NaiveDate) -> Result<()> {
        let value = format_input_date(date);
        let attempt = async {
            self.hide_banner().await;
            self.enter_date(field, &value).await?;
            click_when_present(
                self.browser,
                &Locator::xpath(UPDATE_BUTTON_XPATH),
                self.timings.element_timeout,
            )
            .await?;
            info!("Update clicked for {} = {}", field, value);
            self.settle().await;
            Ok::<(), ScraperError>(())
        };

        attempt.await.map_err(|e| {
            error!("Failed to set {} to {}: {}", field, value, e);
            ScraperError::DateFieldSet {
                field,
                date: value.clone(),
                source: Box::new(e),
            }
        })
    }

    /// Wait for the report to show the requested range.
    pub async fn confirm_range(&self, range: &DateRange) -> Result<()> {
        let locator = Locator::text_contains(&range.confirmation_text());
        match wait_for_element(self.browser, &locator, self.timings.element_timeout).await {
            Ok(_) => {
                info!("Date range updated to {}", range);
                Ok(())
            }
            Err(ScraperError::Timeout { .. }) => Err(ScraperError::DateMismatch {
                start: range.start_iso(),
                end: range.end_iso(),
            }),
            Err(e) => Err(e),
        }
    }

    /// Click Export, wait for the file and give it its dated name.
    pub async fn export_job(&self, job: &ExportJob) -> Result<PathBuf> {
        let previous = self.downloads.count_csv()?;

        click_when_present(
            self.browser,
            &Locator::xpath(EXPORT_BUTTON_XPATH),
            self.timings.element_timeout,
        )
        .await?;
        info!("Export Data clicked");

        let arrived = self
            .downloads
            .wait_for_new_csv(previous, self.timings.poll_interval, self.timings.download_timeout)
            .await?;
        if !arrived {
            return Err(ScraperError::NoNewExport {
                dir: self.downloads.path().to_path_buf(),
            });
        }

        self.downloads.rename_latest_csv(&job.file_name)
    }

    async fn run_job(&self, job: &ExportJob) -> Result<PathBuf> {
        // End first: moving the start past an old end would be rejected by the picker
        self.set_date_field(END_DATE_FIELD, job.range.end).await?;
        self.set_date_field(START_DATE_FIELD, job.range.start).await?;
        self.confirm_range(&job.range).await?;
        self.export_job(job).await
    }

    /// Log in, load the report and export every requested day.
    ///
    /// Per-day failures are recorded and the loop moves on; a date field failure aborts.
    pub async fn run(&self, request: &ExportRequest, credentials: &Credentials) -> Result<ExportSummary> {
        if let Err(e) = self.login(credentials).await {
            error!("Login failed: {}", e);
            println!("⚠️  Login failed: {e}");
        }
        if let Err(e) = self.load_saved_report().await {
            error!("Loading saved report failed: {}", e);
            println!("⚠️  Loading saved report failed: {e}");
        }

        let mut summary = ExportSummary::default();
        for job in request.jobs() {
            let span = info_span!("export_day", range = %job.range);
            println!("📅 Exporting {}", job.range);
            summary.attempted += 1;
            counter!("hitting_exports_attempted_total").increment(1);

            match self.run_job(&job).instrument(span).await {
                Ok(path) => {
                    counter!("hitting_exports_succeeded_total").increment(1);
                    println!("💾 Saved {}", path.display());
                    summary.exported.push(path);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    counter!("hitting_exports_failed_total").increment(1);
                    error!("Export for {} failed: {}", job.range, e);
                    println!("⚠️  Export for {} failed: {}", job.range, e);
                    summary.failures.push(ExportFailure {
                        range: job.range,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(summary)
    }
}

/// Run an export and close the browser afterwards, whether or not the run succeeded.
pub async fn run_export_session(
    use_case: &ExportUseCase<'_>,
    request: &ExportRequest,
    credentials: &Credentials,
) -> Result<ExportSummary> {
    let result = use_case.run(request, credentials).await;
    if let Err(e) = use_case.browser.close().await {
        warn!("Failed to close browser session: {}", e);
    }
    result
}
