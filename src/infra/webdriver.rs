//! W3C WebDriver client for chromedriver, spoken over plain HTTP.

use crate::app::ports::{BrowserPort, ElementRef, Locator, ScriptArg};
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Key under which W3C WebDriver serializes element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

pub struct WebDriverSession {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
    closed: Mutex<bool>,
}

/// Chrome capabilities: headless args and the download directory preference.
pub fn chrome_capabilities(headless: bool, download_dir: &Path) -> Value {
    let mut args = vec!["--disable-gpu", "--window-size=1920,1080"];
    if headless {
        args.push("--headless=new");
    }
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": {
                    "args": args,
                    "prefs": {
                        "download.default_directory": download_dir.to_string_lossy(),
                        "download.prompt_for_download": false,
                        "download.directory_upgrade": true
                    }
                }
            }
        }
    })
}

/// Translate a locator into a W3C `{using, value}` pair.
pub fn locator_strategy(locator: &Locator) -> (&'static str, String) {
    match locator {
        Locator::Css(s) => ("css selector", s.clone()),
        Locator::XPath(s) => ("xpath", s.clone()),
        Locator::Name(s) => ("css selector", format!("[name=\"{s}\"]")),
        Locator::Id(s) => ("css selector", format!("[id=\"{s}\"]")),
    }
}

/// Pull `value` out of a response body, turning protocol errors into `ScraperError::WebDriver`.
pub fn unwrap_response(body: Value) -> Result<Value> {
    let value = body.get("value").cloned().unwrap_or(Value::Null);
    if let Some(code) = value.get("error").and_then(|e| e.as_str()) {
        let message = value
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or_default()
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
        return Err(ScraperError::WebDriver {
            code: code.to_string(),
            message,
        });
    }
    Ok(value)
}

fn element_from_value(value: &Value) -> Result<ElementRef> {
    value
        .get(ELEMENT_KEY)
        .and_then(|id| id.as_str())
        .map(|id| ElementRef(id.to_string()))
        .ok_or_else(|| ScraperError::WebDriver {
            code: "invalid response".into(),
            message: format!("no element reference in {value}"),
        })
}

fn script_arg_to_json(arg: ScriptArg) -> Value {
    match arg {
        ScriptArg::Element(ElementRef(id)) => json!({ ELEMENT_KEY: id }),
        ScriptArg::Value(v) => v,
    }
}

impl WebDriverSession {
    /// Open a new browser session on the WebDriver server at `base_url`.
    #[instrument(skip(download_dir))]
    pub async fn start(base_url: &str, headless: bool, download_dir: &Path) -> Result<Self> {
        let client = reqwest::Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();
        let body: Value = client
            .post(format!("{base_url}/session"))
            .json(&chrome_capabilities(headless, download_dir))
            .send()
            .await?
            .json()
            .await?;
        let value = unwrap_response(body)?;
        let session_id = value
            .get("sessionId")
            .and_then(|s| s.as_str())
            .ok_or_else(|| ScraperError::WebDriver {
                code: "session not created".into(),
                message: "response carried no sessionId".into(),
            })?
            .to_string();
        info!("Started WebDriver session {} (headless={})", session_id, headless);
        Ok(Self {
            client,
            base_url,
            session_id,
            closed: Mutex::new(false),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let resp: Value = self.client.post(self.url(path)).json(&body).send().await?.json().await?;
        unwrap_response(resp)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let resp: Value = self.client.get(self.url(path)).send().await?.json().await?;
        unwrap_response(resp)
    }
}

#[async_trait]
impl BrowserPort for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        self.post("/url", json!({ "url": url })).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let value = self.get("/url").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementRef>> {
        let (using, value) = locator_strategy(locator);
        match self.post("/element", json!({ "using": using, "value": value })).await {
            Ok(found) => element_from_value(&found).map(Some),
            Err(ScraperError::WebDriver { code, .. }) if code == "no such element" => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        self.post(&format!("/element/{}/click", element.0), json!({})).await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.post(&format!("/element/{}/value", element.0), json!({ "text": text }))
            .await?;
        Ok(())
    }

    async fn element_value(&self, element: &ElementRef) -> Result<Option<String>> {
        let value = self.get(&format!("/element/{}/property/value", element.0)).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn execute_script(&self, script: &str, args: Vec<ScriptArg>) -> Result<Value> {
        let args: Vec<Value> = args.into_iter().map(script_arg_to_json).collect();
        self.post("/execute/sync", json!({ "script": script, "args": args })).await
    }

    async fn close(&self) -> Result<()> {
        let mut closed = self.closed.lock().await;
        if *closed {
            return Ok(());
        }
        let resp: Value = self.client.delete(self.url("")).send().await?.json().await?;
        *closed = true;
        match unwrap_response(resp) {
            Ok(_) => {
                info!("Closed WebDriver session {}", self.session_id);
                Ok(())
            }
            Err(e) => {
                warn!("WebDriver session {} did not close cleanly: {}", self.session_id, e);
                Err(e)
            }
        }
    }
}
