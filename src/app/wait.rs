//! Bounded polling waits against the browser.

use crate::app::ports::{BrowserPort, ElementRef, Locator};
use crate::error::{Result, ScraperError};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{trace, warn};

/// Interval between element lookups.
pub const ELEMENT_POLL: Duration = Duration::from_millis(250);

/// Poll for `locator` until it is present or `timeout` elapses.
///
/// Lookup errors (a stale page mid-render) are retried until the deadline; the last one is
/// carried in the resulting timeout.
pub async fn wait_for_element(
    browser: &dyn BrowserPort,
    locator: &Locator,
    timeout: Duration,
) -> Result<ElementRef> {
    let deadline = Instant::now() + timeout;
    let mut last_err: Option<ScraperError> = None;
    loop {
        match browser.find_element(locator).await {
            Ok(Some(element)) => return Ok(element),
            Ok(None) => last_err = None,
            Err(e) => {
                trace!("lookup of {} failed, retrying: {}", locator, e);
                last_err = Some(e);
            }
        }
        if Instant::now() >= deadline {
            if let Some(e) = &last_err {
                warn!("Gave up on {} after {:?}; last lookup error: {}", locator, timeout, e);
            }
            return Err(ScraperError::Timeout {
                what: format!("element {locator}"),
                secs: timeout.as_secs_f64(),
                cause: last_err.map(|e| e.to_string()),
            });
        }
        sleep(ELEMENT_POLL.min(timeout)).await;
    }
}

/// Poll the current URL until it contains `needle` or `timeout` elapses.
pub async fn wait_for_url_containing(
    browser: &dyn BrowserPort,
    needle: &str,
    timeout: Duration,
) -> Result<String> {
    let deadline = Instant::now() + timeout;
    let mut last_err: Option<ScraperError> = None;
    loop {
        match browser.current_url().await {
            Ok(url) if url.contains(needle) => return Ok(url),
            Ok(_) => last_err = None,
            Err(e) => last_err = Some(e),
        }
        if Instant::now() >= deadline {
            return Err(ScraperError::Timeout {
                what: format!("URL containing '{needle}'"),
                secs: timeout.as_secs_f64(),
                cause: last_err.map(|e| e.to_string()),
            });
        }
        sleep(ELEMENT_POLL.min(timeout)).await;
    }
}

/// Wait for `locator` then click it.
pub async fn click_when_present(
    browser: &dyn BrowserPort,
    locator: &Locator,
    timeout: Duration,
) -> Result<()> {
    let element = wait_for_element(browser, locator, timeout).await?;
    browser.click(&element).await
}
