use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::store::TableStore;

/// Supabase/PostgREST table access over HTTP.
pub struct PostgrestStore {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let url = config
            .supabase_url
            .as_deref()
            .ok_or_else(|| AppError::Config("SUPABASE_URL not set".into()))?;
        let key = config
            .supabase_key
            .as_deref()
            .ok_or_else(|| AppError::Config("SUPABASE_KEY not set".into()))?;

        Self::new(url, key, config.http_timeout)
    }
}

impl TableStore for PostgrestStore {
    async fn upsert(&self, table: &str, records: &[Value], conflict_key: &str) -> Result<()> {
        let url = format!("{}/rest/v1/{}", self.base_url, urlencoding::encode(table));
        debug!("Upserting {} records to {}", records.len(), url);

        let response = self
            .http_client
            .post(&url)
            .query(&[("on_conflict", conflict_key)])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(records)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Store {
                table: table.to_string(),
                message: format!("{}: {}", status, error_text),
            });
        }

        Ok(())
    }
}
