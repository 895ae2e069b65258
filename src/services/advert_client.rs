use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::{WatchError, WatchResult};

/// HTTP client for the advertisement source.
#[derive(Clone)]
pub struct AdvertClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl AdvertClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn has_base(&self) -> bool {
        !self.base_url.trim().is_empty()
    }

    /// `{base}/advertisements/{id}` with `id` kept as a single path segment.
    pub fn advertisement_url(&self, id: &str) -> WatchResult<Url> {
        if !self.has_base() {
            return Err(WatchError::Fetch("ADVERT_API_URL is missing in .env".to_string()));
        }
        if id.is_empty() || id == "." || id == ".." {
            return Err(WatchError::Fetch(format!("invalid advertisement id {id:?}")));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| WatchError::Fetch(format!("ADVERT_API_URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| WatchError::Fetch("ADVERT_API_URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .push("advertisements")
            .push(id);

        Ok(url)
    }

    pub async fn advertisement(&self, id: &str) -> WatchResult<AdvertisementState> {
        let url = self.advertisement_url(id)?;
        let mut req = self.http.get(url);
        if !self.api_key.trim().is_empty() {
            req = req.bearer_auth(&self.api_key);
        }

        let res = req.send().await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(WatchError::Fetch(format!("advertisement {id}: {status} {body}")));
        }

        Ok(res.json::<AdvertisementState>().await?)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdvertisementState {
    pub price: f64,

    #[serde(default = "default_available")]
    pub available: bool,

    #[serde(default)]
    pub title: Option<String>,
}

fn default_available() -> bool {
    true
}
