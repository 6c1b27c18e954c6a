use std::time::Duration;

use crate::error::{AppError, Result};

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/callback";
pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
pub const DEFAULT_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_refresh_token: Option<String>,
    pub spotify_redirect_uri: String,
    pub spotify_api_base: String,
    pub spotify_accounts_base: String,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub http_timeout: Duration,
    pub auth_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let spotify_client_id = std::env::var("SPOTIFY_CLIENT_ID")
            .map_err(|_| AppError::Config("SPOTIFY_CLIENT_ID not set".into()))?;

        let spotify_client_secret = std::env::var("SPOTIFY_CLIENT_SECRET")
            .map_err(|_| AppError::Config("SPOTIFY_CLIENT_SECRET not set".into()))?;

        let spotify_redirect_uri = std::env::var("SPOTIFY_REDIRECT_URI")
            .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string());

        let spotify_api_base =
            std::env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        let spotify_accounts_base = std::env::var("SPOTIFY_ACCOUNTS_BASE")
            .unwrap_or_else(|_| DEFAULT_ACCOUNTS_BASE.to_string());

        Ok(Self {
            spotify_client_id,
            spotify_client_secret,
            spotify_refresh_token: optional_var("SPOTIFY_REFRESH_TOKEN"),
            spotify_redirect_uri,
            spotify_api_base,
            spotify_accounts_base,
            supabase_url: optional_var("SUPABASE_URL"),
            supabase_key: optional_var("SUPABASE_KEY"),
            http_timeout: secs_var("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
            auth_timeout: secs_var("AUTH_TIMEOUT_SECS", DEFAULT_AUTH_TIMEOUT_SECS)?,
        })
    }

    /// Config for tests and embedding, pointing both Spotify bases at `base`.
    pub fn for_endpoints(base: &str) -> Self {
        Self {
            spotify_client_id: "client-id".to_string(),
            spotify_client_secret: "client-secret".to_string(),
            spotify_refresh_token: None,
            spotify_redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            spotify_api_base: base.to_string(),
            spotify_accounts_base: base.to_string(),
            supabase_url: None,
            supabase_key: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            auth_timeout: Duration::from_secs(DEFAULT_AUTH_TIMEOUT_SECS),
        }
    }

    pub fn get_missing_config(&self, refresh_mode: bool, needs_store: bool) -> Vec<String> {
        let mut missing = Vec::new();

        if self.spotify_client_id.is_empty() {
            missing.push("SPOTIFY_CLIENT_ID".to_string());
        }
        if self.spotify_client_secret.is_empty() {
            missing.push("SPOTIFY_CLIENT_SECRET".to_string());
        }
        if refresh_mode && self.spotify_refresh_token.is_none() {
            missing.push("SPOTIFY_REFRESH_TOKEN".to_string());
        }
        if needs_store {
            if self.supabase_url.is_none() {
                missing.push("SUPABASE_URL".to_string());
            }
            if self.supabase_key.is_none() {
                missing.push("SUPABASE_KEY".to_string());
            }
        }

        missing
    }

    pub fn refresh_token(&self) -> Result<&str> {
        self.spotify_refresh_token
            .as_deref()
            .ok_or_else(|| AppError::Config("SPOTIFY_REFRESH_TOKEN not set".into()))
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn secs_var(name: &str, default: u64) -> Result<Duration> {
    match optional_var(name) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| AppError::Config(format!("{} must be a whole number of seconds", name))),
        None => Ok(Duration::from_secs(default)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_by_mode() {
        let mut config = Config::for_endpoints("http://127.0.0.1:1");
        assert!(config.get_missing_config(false, false).is_empty());

        assert_eq!(
            config.get_missing_config(true, true),
            vec!["SPOTIFY_REFRESH_TOKEN", "SUPABASE_URL", "SUPABASE_KEY"]
        );

        config.spotify_refresh_token = Some("refresh".into());
        config.supabase_url = Some("https://db.example".into());
        config.supabase_key = Some("key".into());
        assert!(config.get_missing_config(true, true).is_empty());
    }

    #[test]
    fn test_refresh_token_absent_is_config_error() {
        let config = Config::for_endpoints("http://127.0.0.1:1");
        assert!(matches!(config.refresh_token(), Err(AppError::Config(_))));
    }
}
