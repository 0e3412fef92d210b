use crate::error::AppError;
use crate::feed::FeedSource;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Feed source polling a realtime-database REST endpoint.
pub struct HttpFeedSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpFeedSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Feed(format!("client build failed: {err}")))?;
        Ok(Self {
            client,
            url: snapshot_url(base_url),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// The RTDB REST convention: the whole tree is readable at `<base>/.json`.
fn snapshot_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with(".json") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/.json")
    }
}

impl FeedSource for HttpFeedSource {
    fn fetch_snapshot(&mut self) -> Result<Value, AppError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|err| AppError::Feed(format!("request failed: {err}")))?
            .error_for_status()
            .map_err(|err| AppError::Feed(format!("bad status: {err}")))?;

        response
            .json()
            .map_err(|err| AppError::Feed(format!("invalid json: {err}")))
    }
}
