use serde::{Deserialize, Serialize};
use serde_json::Value;

/// W3C web element identifier key.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

// --- Wire envelopes ---

/// Every WebDriver response wraps its payload in `{"value": ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct WireResponse<T> {
    pub value: T,
}

/// Error payload carried in `value` on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct WireError {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewSessionValue {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

// --- Element references ---

/// Opaque reference to one element in the current document of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct ElementRef {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
    id: String,
}

impl ElementRef {
    pub fn id(&self) -> &str {
        &self.id
    }
}

// --- Session capabilities ---

/// Chrome launch options sent with `POST /session`.
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub args: Vec<String>,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            args: vec![
                "--disable-gpu".to_string(),
                "--window-size=1920,1080".to_string(),
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--remote-allow-origins=*".to_string(),
            ],
        }
    }
}

impl ChromeOptions {
    pub(crate) fn capabilities(&self) -> Value {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        if self.headless {
            args.push("--headless=new".to_string());
        }
        args.extend(self.args.iter().cloned());

        serde_json::json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}

/// Locator body for `POST /session/{id}/elements`.
#[derive(Debug, Serialize)]
pub(crate) struct Locator<'a> {
    pub using: &'static str,
    pub value: &'a str,
}

impl<'a> Locator<'a> {
    pub fn css(selector: &'a str) -> Self {
        Self {
            using: "css selector",
            value: selector,
        }
    }
}
