pub mod auth;
pub mod callback;
pub mod client;
pub mod models;

pub use auth::{AuthMode, TokenProvider};
pub use callback::CallbackServer;
pub use client::SpotifyClient;
pub use models::{AccessToken, TimeWindow, TopCategory};
