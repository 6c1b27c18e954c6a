use serde::{Deserialize, Serialize};
use std::fmt;

/// The provider's statistical aggregation periods for "top" rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 3] = [
        TimeWindow::ShortTerm,
        TimeWindow::MediumTerm,
        TimeWindow::LongTerm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::ShortTerm => "short_term",
            TimeWindow::MediumTerm => "medium_term",
            TimeWindow::LongTerm => "long_term",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopCategory {
    Artists,
    Tracks,
}

impl TopCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopCategory::Artists => "artists",
            TopCategory::Tracks => "tracks",
        }
    }
}

impl fmt::Display for TopCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a `me/top/{artists,tracks}` page. Tracks carry no genres.
#[derive(Debug, Clone, Deserialize)]
pub struct TopItem {
    pub name: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopItemsPage {
    #[serde(default)]
    pub items: Vec<TopItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistSummary {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// A `me/playlists` page. Entries can come back as `null`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistsPage {
    #[serde(default)]
    pub items: Vec<Option<PlaylistSummary>>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTracksRef {
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistDetail {
    pub tracks: PlaylistTracksRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

/// Bearer credential for the duration of one run.
#[derive(Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
