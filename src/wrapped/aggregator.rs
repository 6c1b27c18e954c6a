use std::collections::HashMap;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::spotify::models::{
    PlaylistDetail, PlaylistSummary, PlaylistsPage, TimeWindow, TopCategory, TopItem,
    TopItemsPage,
};
use crate::spotify::SpotifyClient;

const TOP_ITEMS_LIMIT: u32 = 50;
const PLAYLISTS_PAGE_LIMIT: u32 = 50;
const MAX_PLAYLIST_PAGES: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedItem {
    pub rank: u32,
    pub name: Option<String>,
}

impl RankedItem {
    pub fn new(rank: u32, name: &str) -> Self {
        Self {
            rank,
            name: Some(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreCount {
    pub rank: u32,
    pub genre: String,
    pub count: u32,
}

impl GenreCount {
    pub fn new(rank: u32, genre: &str, count: u32) -> Self {
        Self {
            rank,
            genre: genre.to_string(),
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub name: Option<String>,
    pub total_tracks: u64,
}

/// Everything harvested in one run, per time window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrappedData {
    pub artists: Vec<(TimeWindow, Vec<RankedItem>)>,
    pub tracks: Vec<(TimeWindow, Vec<RankedItem>)>,
    pub genres: Vec<(TimeWindow, Vec<GenreCount>)>,
    pub playlists: Vec<PlaylistEntry>,
}

/// Ranks items 1..N in the order the provider returned them.
pub fn rank_items(items: &[TopItem]) -> Vec<RankedItem> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| RankedItem {
            rank: i as u32 + 1,
            name: item.name.clone(),
        })
        .collect()
}

/// Tallies genres across artists and ranks them by descending count.
/// Equal counts keep the order in which the genre was first seen.
pub fn rank_genres(artists: &[TopItem]) -> Vec<GenreCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut tallies: Vec<(&str, u32)> = Vec::new();

    for genre in artists.iter().flat_map(|artist| artist.genres.iter()) {
        match index.get(genre.as_str()) {
            Some(&i) => tallies[i].1 += 1,
            None => {
                index.insert(genre.as_str(), tallies.len());
                tallies.push((genre.as_str(), 1));
            }
        }
    }

    // sort_by is stable
    tallies.sort_by(|a, b| b.1.cmp(&a.1));

    tallies
        .into_iter()
        .enumerate()
        .map(|(i, (genre, count))| GenreCount::new(i as u32 + 1, genre, count))
        .collect()
}

pub struct Aggregator<'a> {
    client: &'a SpotifyClient,
}

impl<'a> Aggregator<'a> {
    pub fn new(client: &'a SpotifyClient) -> Self {
        Self { client }
    }

    pub async fn collect(&self) -> WrappedData {
        let mut data = WrappedData::default();

        for window in TimeWindow::ALL {
            data.artists
                .push((window, self.top_items(TopCategory::Artists, window).await));
        }
        for window in TimeWindow::ALL {
            data.tracks
                .push((window, self.top_items(TopCategory::Tracks, window).await));
        }
        for window in TimeWindow::ALL {
            data.genres.push((window, self.genre_counts(window).await));
        }
        data.playlists = self.playlists().await;

        data
    }

    pub async fn top_items(&self, category: TopCategory, window: TimeWindow) -> Vec<RankedItem> {
        let items = self.fetch_top(category, window).await;
        let ranked = rank_items(&items);
        info!("Fetched {} top {} ({})", ranked.len(), category, window);
        ranked
    }

    pub async fn genre_counts(&self, window: TimeWindow) -> Vec<GenreCount> {
        let artists = self.fetch_top(TopCategory::Artists, window).await;
        let genres = rank_genres(&artists);
        info!(
            "Counted {} genres across {} top artists ({})",
            genres.len(),
            artists.len(),
            window
        );
        genres
    }

    /// Lists the user's playlists and looks up each one's track total.
    /// A playlist whose lookup fails is skipped.
    pub async fn playlists(&self) -> Vec<PlaylistEntry> {
        let summaries = self.list_playlists().await;

        let pb = ProgressBar::new(summaries.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut entries = Vec::with_capacity(summaries.len());
        for (id, name) in &summaries {
            let label = name.as_deref().unwrap_or(id);
            pb.set_message(format!("Counting tracks: {}", label));

            let path = format!("playlists/{}?fields=tracks.total", urlencoding::encode(id));
            match self.client.get::<PlaylistDetail>(&path).await {
                Ok(detail) => entries.push(PlaylistEntry {
                    name: name.clone(),
                    total_tracks: detail.tracks.total,
                }),
                Err(e) => warn!("Skipping playlist {}: track count lookup failed: {}", label, e),
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        info!("Fetched track counts for {} of {} playlists", entries.len(), summaries.len());
        entries
    }

    /// `(id, name)` of every listed playlist. Null or id-less entries are skipped.
    async fn list_playlists(&self) -> Vec<(String, Option<String>)> {
        let mut summaries = Vec::new();
        let mut next = Some(format!("me/playlists?limit={}", PLAYLISTS_PAGE_LIMIT));
        let mut pages = 0;

        while let Some(path) = next.take() {
            if pages == MAX_PLAYLIST_PAGES {
                warn!("Stopping playlist listing after {} pages", pages);
                break;
            }
            pages += 1;

            match self.client.get::<PlaylistsPage>(&path).await {
                Ok(page) => {
                    debug!("Playlist page {} with {} items", pages, page.items.len());
                    for (i, item) in page.items.into_iter().enumerate() {
                        match item {
                            Some(PlaylistSummary { id: Some(id), name }) => {
                                summaries.push((id, name))
                            }
                            Some(PlaylistSummary { id: None, name }) => warn!(
                                "Skipping playlist without an id: {}",
                                name.as_deref().unwrap_or("<unnamed>")
                            ),
                            None => warn!("Skipping empty entry {} on playlist page {}", i, pages),
                        }
                    }
                    next = page.next;
                }
                Err(e) => warn!("Failed to list playlists: {}", e),
            }
        }

        summaries
    }

    async fn fetch_top(&self, category: TopCategory, window: TimeWindow) -> Vec<TopItem> {
        let path = format!(
            "me/top/{}?time_range={}&limit={}",
            category, window, TOP_ITEMS_LIMIT
        );
        match self.client.get::<TopItemsPage>(&path).await {
            Ok(page) => page.items,
            Err(e) => {
                warn!("No top {} for {}: {}", category, window, e);
                Vec::new()
            }
        }
    }
}
