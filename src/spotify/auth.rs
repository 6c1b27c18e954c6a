use reqwest::Client;
use tracing::{info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::spotify::callback::CallbackServer;
use crate::spotify::models::{AccessToken, TokenResponse};

const SCOPES: &str = "user-top-read playlist-read-private";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Browser authorization with a local redirect listener.
    Interactive,
    /// Exchange the configured long-lived refresh token.
    RefreshToken,
}

/// Produces the bearer credential for a run.
pub struct TokenProvider<'a> {
    config: &'a Config,
    http_client: Client,
}

impl<'a> TokenProvider<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        let http_client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub async fn acquire(&self, mode: AuthMode) -> Result<AccessToken> {
        match mode {
            AuthMode::Interactive => self.interactive().await,
            AuthMode::RefreshToken => self.refresh(self.config.refresh_token()?).await,
        }
    }

    pub fn authorize_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/authorize",
            self.config.spotify_accounts_base.trim_end_matches('/')
        ))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.spotify_client_id)
            .append_pair("scope", SCOPES)
            .append_pair("redirect_uri", &self.config.spotify_redirect_uri);
        Ok(url)
    }

    /// Runs the authorization-code flow: opens the browser, waits for the
    /// redirect (bounded by the configured auth timeout), exchanges the code.
    pub async fn interactive(&self) -> Result<AccessToken> {
        let server = CallbackServer::bind(&self.config.spotify_redirect_uri).await?;
        let auth_url = self.authorize_url()?;

        if webbrowser::open(auth_url.as_str()).is_err() {
            warn!("Failed to open a browser");
        }
        println!("\nOpen this URL in your browser to authorize Spotify:");
        println!("{}\n", auth_url);

        let code = server.wait_for_code(self.config.auth_timeout).await?;
        info!("Received authorization code");

        self.exchange_code(&code).await
    }

    pub async fn exchange_code(&self, code: &str) -> Result<AccessToken> {
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.config.spotify_redirect_uri),
        ])
        .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessToken> {
        let token = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;
        info!("Refreshed Spotify access token");
        Ok(token)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<AccessToken> {
        let token_url = format!(
            "{}/api/token",
            self.config.spotify_accounts_base.trim_end_matches('/')
        );

        let response = self
            .http_client
            .post(&token_url)
            .basic_auth(
                &self.config.spotify_client_id,
                Some(&self.config.spotify_client_secret),
            )
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(error_text));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Failed to parse token response: {}", e)))?;

        let access_token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::Auth("Token response did not include an access_token".into())
            })?;

        Ok(AccessToken {
            access_token,
            refresh_token: body.refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve;
    use axum::{
        Form, Json, Router,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::post,
    };
    use serde_json::json;
    use std::collections::HashMap;

    async fn token_endpoint(
        headers: HeaderMap,
        Form(form): Form<HashMap<String, String>>,
    ) -> Response {
        // base64("client-id:client-secret")
        let expected = "Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ=";
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(expected) {
            return (StatusCode::UNAUTHORIZED, r#"{"error":"invalid_client"}"#).into_response();
        }

        let refresh_token = form.get("refresh_token").map(String::as_str);
        match form.get("grant_type").map(String::as_str) {
            Some("refresh_token") if refresh_token == Some("good") => {
                Json(json!({"access_token": "fresh", "token_type": "Bearer", "expires_in": 3600}))
                    .into_response()
            }
            Some("authorization_code") if form.get("code").map(String::as_str) == Some("abc") => {
                Json(json!({"access_token": "from-code", "refresh_token": "long-lived"}))
                    .into_response()
            }
            Some("refresh_token") => (
                StatusCode::BAD_REQUEST,
                r#"{"error":"invalid_grant","error_description":"Refresh token revoked"}"#,
            )
                .into_response(),
            _ => Json(json!({"token_type": "Bearer"})).into_response(),
        }
    }

    async fn provider_config() -> Config {
        let base = serve(Router::new().route("/api/token", post(token_endpoint))).await;
        Config::for_endpoints(&base)
    }

    #[tokio::test]
    async fn test_refresh_exchange_returns_access_token() {
        let config = provider_config().await;
        let provider = TokenProvider::new(&config).unwrap();

        let token = provider.refresh("good").await.unwrap();
        assert_eq!(token.access_token, "fresh");
        assert!(token.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_refresh_failure_surfaces_payload_verbatim() {
        let config = provider_config().await;
        let provider = TokenProvider::new(&config).unwrap();

        match provider.refresh("revoked").await {
            Err(AppError::Auth(payload)) => assert_eq!(
                payload,
                r#"{"error":"invalid_grant","error_description":"Refresh token revoked"}"#
            ),
            other => panic!("expected Auth error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_code_exchange_keeps_refresh_token() {
        let config = provider_config().await;
        let provider = TokenProvider::new(&config).unwrap();

        let token = provider.exchange_code("abc").await.unwrap();
        assert_eq!(token.access_token, "from-code");
        assert_eq!(token.refresh_token.as_deref(), Some("long-lived"));
    }

    #[tokio::test]
    async fn test_success_without_access_token_is_auth_error() {
        let config = provider_config().await;
        let provider = TokenProvider::new(&config).unwrap();

        let result = provider.exchange_code("unknown").await;
        assert!(matches!(result, Err(AppError::Auth(_))));
    }

    #[tokio::test]
    async fn test_refresh_mode_requires_configured_token() {
        let config = Config::for_endpoints("http://127.0.0.1:1");
        let provider = TokenProvider::new(&config).unwrap();

        let result = provider.acquire(AuthMode::RefreshToken).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_authorize_url_requests_top_read_scope() {
        let config = Config::for_endpoints("https://accounts.example");
        let provider = TokenProvider::new(&config).unwrap();

        let url = provider.authorize_url().unwrap();
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.path(), "/authorize");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-id");
        assert!(params["scope"].contains("user-top-read"));
        assert_eq!(params["redirect_uri"], "http://localhost:3000/callback");
    }
}
