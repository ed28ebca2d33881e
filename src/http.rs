use async_trait::async_trait;
use log::debug;

use crate::error::{Error, Result};

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// The two request shapes the pipeline needs
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET `url` and return the body; non-success status is a fetch error
    async fn get_text(&self, url: &str) -> Result<String>;

    /// POST `body` as JSON to `url` and return the decoded JSON response
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value>;
}

/// `HttpClient` backed by reqwest
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
    user_agent: String,
}

impl ReqwestClient {
    pub fn new(user_agent: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: user_agent.unwrap_or(USER_AGENT).to_string(),
        }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {url}");
        self.client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::fetch(url, e))?
            .text()
            .await
            .map_err(|e| Error::fetch(url, e))
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        debug!("POST {url}");
        self.client
            .post(url)
            .header("User-Agent", &self.user_agent)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::fetch(url, e))?
            .json()
            .await
            .map_err(|e| Error::fetch(url, e))
    }
}
