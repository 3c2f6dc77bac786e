use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// How an element is located on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
    /// Form control `name` attribute.
    Name(String),
    Id(String),
}

impl Locator {
    pub fn css(selector: &str) -> Self {
        Locator::Css(selector.to_string())
    }

    pub fn xpath(expr: &str) -> Self {
        Locator::XPath(expr.to_string())
    }

    pub fn name(name: &str) -> Self {
        Locator::Name(name.to_string())
    }

    pub fn id(id: &str) -> Self {
        Locator::Id(id.to_string())
    }

    /// Matches any `div` whose own text contains `text`.
    pub fn text_contains(text: &str) -> Self {
        Locator::XPath(format!("//div[contains(text(), '{text}')]"))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={s}"),
            Locator::XPath(s) => write!(f, "xpath={s}"),
            Locator::Name(s) => write!(f, "name={s}"),
            Locator::Id(s) => write!(f, "id={s}"),
        }
    }
}

/// Opaque handle to an element found by a [`BrowserPort`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(pub String);

/// Argument passed to a page script.
#[derive(Debug, Clone)]
pub enum ScriptArg {
    Element(ElementRef),
    Value(serde_json::Value),
}

/// The browser capability the export loop drives.
#[async_trait]
pub trait BrowserPort: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// `Ok(None)` when nothing matches yet.
    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementRef>>;

    async fn click(&self, element: &ElementRef) -> Result<()>;

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()>;

    /// Current `value` property of an input.
    async fn element_value(&self, element: &ElementRef) -> Result<Option<String>>;

    async fn execute_script(&self, script: &str, args: Vec<ScriptArg>) -> Result<serde_json::Value>;

    /// Ends the session. Safe to call once per session.
    async fn close(&self) -> Result<()>;
}
