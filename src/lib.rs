pub mod config;
pub mod error;
pub mod spotify;
pub mod store;
pub mod sync;
pub mod wrapped;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{AppError, Result};
pub use spotify::{AccessToken, AuthMode, SpotifyClient, TimeWindow, TokenProvider};
pub use store::{PostgrestStore, SyncWriter, TableStore};
pub use sync::{SyncPipeline, SyncReport};
pub use wrapped::{Aggregator, GenreCount, PlaylistEntry, RankedItem, RecordBuilder, Row, Table};
