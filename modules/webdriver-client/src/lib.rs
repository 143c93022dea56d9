pub mod error;
pub mod types;

pub use error::{Result, WebDriverError};
pub use types::{ChromeOptions, ElementRef, ELEMENT_KEY};

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use types::{Locator, NewSessionValue, WireError, WireResponse};

/// Client for an already-running WebDriver endpoint (e.g. `chromedriver --port=9515`).
pub struct WebDriverClient {
    client: reqwest::Client,
    base_url: String,
}

impl WebDriverClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Open a new browser session.
    pub async fn new_session(&self, options: &ChromeOptions) -> Result<Session> {
        let endpoint = format!("{}/session", self.base_url);
        let resp = self
            .client
            .post(&endpoint)
            .json(&options.capabilities())
            .send()
            .await?;

        let value: NewSessionValue = decode(resp).await?;
        debug!(session_id = value.session_id.as_str(), "WebDriver session created");

        Ok(Session {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            id: value.session_id,
        })
    }
}

/// One browser session. Cheap to clone; all clones address the same browser.
#[derive(Clone)]
pub struct Session {
    client: reqwest::Client,
    base_url: String,
    id: String,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Load `url` in the current top-level browsing context.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let body = serde_json::json!({ "url": url });
        let _: Value = self.call(Method::POST, "url", Some(body)).await?;
        Ok(())
    }

    /// Run a synchronous script in the page and return its JSON result.
    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let body = serde_json::json!({ "script": script, "args": args });
        self.call(Method::POST, "execute/sync", Some(body)).await
    }

    /// All elements matching a CSS selector, in document order.
    pub async fn find_elements(&self, selector: &str) -> Result<Vec<ElementRef>> {
        let body = serde_json::to_value(Locator::css(selector))?;
        self.call(Method::POST, "elements", Some(body)).await
    }

    /// Read a DOM property of an element (`outerHTML`, `className`, ...).
    pub async fn element_property(&self, element: &ElementRef, name: &str) -> Result<Value> {
        let path = format!("element/{}/property/{}", element.id(), name);
        self.call(Method::GET, &path, None).await
    }

    /// Serialized HTML of an element, including the element itself.
    pub async fn outer_html(&self, element: &ElementRef) -> Result<String> {
        match self.element_property(element, "outerHTML").await? {
            Value::String(html) => Ok(html),
            other => Err(WebDriverError::Protocol(format!(
                "outerHTML is not a string: {other}"
            ))),
        }
    }

    /// End the session and close the browser.
    pub async fn close(self) -> Result<()> {
        let endpoint = format!("{}/session/{}", self.base_url, self.id);
        let resp = self.client.delete(&endpoint).send().await?;
        let _: Value = decode(resp).await?;
        debug!(session_id = self.id.as_str(), "WebDriver session closed");
        Ok(())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let endpoint = format!("{}/session/{}/{}", self.base_url, self.id, path);
        let mut req = self.client.request(method, &endpoint);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        decode(resp).await
    }
}

/// Unwrap the `{"value": ...}` envelope, turning driver error payloads into `Api` errors.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(match serde_json::from_str::<WireResponse<WireError>>(&text) {
            Ok(wire) => WebDriverError::Api {
                status: status.as_u16(),
                error: wire.value.error,
                message: wire.value.message,
            },
            Err(_) => WebDriverError::Api {
                status: status.as_u16(),
                error: "unknown error".to_string(),
                message: text,
            },
        });
    }

    let wire: WireResponse<T> = serde_json::from_str(&text)?;
    Ok(wire.value)
}
