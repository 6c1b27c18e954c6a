use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::spotify::models::AccessToken;

/// Authenticated GET access to the Spotify Web API.
pub struct SpotifyClient {
    http_client: Client,
    api_base: String,
    access_token: String,
}

impl SpotifyClient {
    pub fn new(config: &Config, token: &AccessToken) -> Result<Self> {
        let http_client = Client::builder().timeout(config.http_timeout).build()?;

        Ok(Self {
            http_client,
            api_base: config.spotify_api_base.trim_end_matches('/').to_string(),
            access_token: token.access_token.clone(),
        })
    }

    /// Resolves `path` against the API base unless it is already absolute,
    /// as pagination `next` links are.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.api_base, path.trim_start_matches('/'))
        }
    }

    /// Issues a bearer-authenticated GET. Non-2xx responses are logged and
    /// returned as `AppError::Api`; callers decide whether that means "no data".
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        let url = self.url_for(path);
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Error making API call to {}, status code: {}", url, status);
            return Err(AppError::Api {
                status: status.as_u16(),
                url,
            });
        }

        Ok(response.json().await?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.get_json(path).await?;
        Ok(serde_json::from_value(value)?)
    }
}
