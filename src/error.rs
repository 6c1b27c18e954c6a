use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Timed out after {0}s waiting for the authorization callback")]
    AuthTimeout(u64),

    #[error("Authorization cancelled")]
    AuthCancelled,

    #[error("Spotify API returned {status} for {url}")]
    Api { status: u16, url: String },

    #[error("Store error on table {table}: {message}")]
    Store { table: String, message: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, AppError>;
