use chrono::NaiveDate;
use serde_json::{Map, Value as JsonValue};
use std::fmt;

use crate::spotify::TimeWindow;
use crate::wrapped::aggregator::{GenreCount, PlaylistEntry, RankedItem, WrappedData};
use crate::wrapped::dedup::{self, Field, Value};

pub const UNIQUE_KEY_COLUMN: &str = "unique_key";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Artists,
    Tracks,
    Genres,
    Playlists,
}

impl Table {
    pub const ALL: [Table; 4] = [Table::Artists, Table::Tracks, Table::Genres, Table::Playlists];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Artists => "artists",
            Table::Tracks => "tracks",
            Table::Genres => "genres",
            Table::Playlists => "playlists",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Artists => &["date", "time_range", "artist_name", "rank"],
            Table::Tracks => &["date", "time_range", "track_name", "rank"],
            Table::Genres => &["date", "time_range", "rank", "genre_name", "count"],
            Table::Playlists => &["date", "playlist_name", "total_tracks"],
        }
    }

    pub fn int_columns(&self) -> &'static [&'static str] {
        match self {
            Table::Artists | Table::Tracks => &["rank"],
            Table::Genres => &["rank", "count"],
            Table::Playlists => &["total_tracks"],
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistRow {
    pub date: NaiveDate,
    pub time_range: TimeWindow,
    pub artist_name: Option<String>,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRow {
    pub date: NaiveDate,
    pub time_range: TimeWindow,
    pub track_name: Option<String>,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreRow {
    pub date: NaiveDate,
    pub time_range: TimeWindow,
    pub rank: u32,
    pub genre_name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRow {
    pub date: NaiveDate,
    pub playlist_name: Option<String>,
    pub total_tracks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Artist(ArtistRow),
    Track(TrackRow),
    Genre(GenreRow),
    Playlist(PlaylistRow),
}

impl Row {
    pub fn table(&self) -> Table {
        match self {
            Row::Artist(_) => Table::Artists,
            Row::Track(_) => Table::Tracks,
            Row::Genre(_) => Table::Genres,
            Row::Playlist(_) => Table::Playlists,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            Row::Artist(r) => r.date,
            Row::Track(r) => r.date,
            Row::Genre(r) => r.date,
            Row::Playlist(r) => r.date,
        }
    }

    /// Field values paired with the table's columns, in column order.
    pub fn fields(&self) -> Vec<Field> {
        self.table()
            .columns()
            .iter()
            .zip(self.values())
            .map(|(column, value)| Field::new(*column, value))
            .collect()
    }

    /// Raw cell values, in the order of `Table::columns`.
    fn values(&self) -> Vec<Value> {
        let window = |w: TimeWindow| Value::Text(w.as_str().to_string());
        match self {
            Row::Artist(r) => vec![
                Value::Date(r.date),
                window(r.time_range),
                r.artist_name.clone().into(),
                Value::Int(r.rank.into()),
            ],
            Row::Track(r) => vec![
                Value::Date(r.date),
                window(r.time_range),
                r.track_name.clone().into(),
                Value::Int(r.rank.into()),
            ],
            Row::Genre(r) => vec![
                Value::Date(r.date),
                window(r.time_range),
                Value::Int(r.rank.into()),
                Value::Text(r.genre_name.clone()),
                Value::Int(r.count.into()),
            ],
            Row::Playlist(r) => vec![
                Value::Date(r.date),
                r.playlist_name.clone().into(),
                Value::Int(r.total_tracks as i64),
            ],
        }
    }

    pub fn unique_key(&self) -> String {
        dedup::unique_key(&self.fields(), self.table().int_columns())
    }

    /// The JSON object written to the store: normalized columns plus `unique_key`.
    pub fn to_record(&self) -> JsonValue {
        let int_columns = self.table().int_columns();
        let mut record = Map::new();
        for field in self.fields() {
            record.insert(field.column.to_string(), dedup::normalize(&field, int_columns));
        }
        record.insert(UNIQUE_KEY_COLUMN.to_string(), JsonValue::from(self.unique_key()));
        JsonValue::Object(record)
    }
}

/// Flattens harvested rankings into rows, all stamped with one capture date.
pub struct RecordBuilder {
    capture_date: NaiveDate,
}

impl RecordBuilder {
    pub fn new(capture_date: NaiveDate) -> Self {
        Self { capture_date }
    }

    pub fn capture_date(&self) -> NaiveDate {
        self.capture_date
    }

    pub fn artist_rows(&self, data: &[(TimeWindow, Vec<RankedItem>)]) -> Vec<Row> {
        flatten(data, |window, item| {
            Row::Artist(ArtistRow {
                date: self.capture_date,
                time_range: window,
                artist_name: item.name.clone(),
                rank: item.rank,
            })
        })
    }

    pub fn track_rows(&self, data: &[(TimeWindow, Vec<RankedItem>)]) -> Vec<Row> {
        flatten(data, |window, item| {
            Row::Track(TrackRow {
                date: self.capture_date,
                time_range: window,
                track_name: item.name.clone(),
                rank: item.rank,
            })
        })
    }

    pub fn genre_rows(&self, data: &[(TimeWindow, Vec<GenreCount>)]) -> Vec<Row> {
        flatten(data, |window, genre| {
            Row::Genre(GenreRow {
                date: self.capture_date,
                time_range: window,
                rank: genre.rank,
                genre_name: genre.genre.clone(),
                count: genre.count,
            })
        })
    }

    pub fn playlist_rows(&self, playlists: &[PlaylistEntry]) -> Vec<Row> {
        playlists
            .iter()
            .map(|p| {
                Row::Playlist(PlaylistRow {
                    date: self.capture_date,
                    playlist_name: p.name.clone(),
                    total_tracks: p.total_tracks,
                })
            })
            .collect()
    }

    /// Row sets for every table, in write order.
    pub fn build(&self, data: &WrappedData) -> Vec<(Table, Vec<Row>)> {
        vec![
            (Table::Artists, self.artist_rows(&data.artists)),
            (Table::Tracks, self.track_rows(&data.tracks)),
            (Table::Genres, self.genre_rows(&data.genres)),
            (Table::Playlists, self.playlist_rows(&data.playlists)),
        ]
    }
}

fn flatten<T>(
    data: &[(TimeWindow, Vec<T>)],
    to_row: impl Fn(TimeWindow, &T) -> Row,
) -> Vec<Row> {
    let to_row = &to_row;
    data.iter()
        .flat_map(|(window, items)| items.iter().map(move |item| to_row(*window, item)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn sample() -> WrappedData {
        WrappedData {
            artists: vec![
                (
                    TimeWindow::ShortTerm,
                    vec![RankedItem::new(1, "Queen"), RankedItem::new(2, "Muse")],
                ),
                (TimeWindow::MediumTerm, vec![RankedItem::new(1, "Muse")]),
                (TimeWindow::LongTerm, vec![]),
            ],
            tracks: vec![(TimeWindow::ShortTerm, vec![RankedItem::new(1, "Starlight")])],
            genres: vec![(TimeWindow::LongTerm, vec![GenreCount::new(1, "rock", 2)])],
            playlists: vec![PlaylistEntry {
                name: Some("Road Trip".into()),
                total_tracks: 42,
            }],
        }
    }

    #[test]
    fn test_rows_flatten_in_window_then_rank_order() {
        let rows = RecordBuilder::new(date()).artist_rows(&sample().artists);
        let keys: Vec<String> = rows.iter().map(Row::unique_key).collect();
        assert_eq!(
            keys,
            vec![
                "2024-05-01_short_term_Queen_1",
                "2024-05-01_short_term_Muse_2",
                "2024-05-01_medium_term_Muse_1",
            ]
        );
    }

    #[test]
    fn test_every_row_carries_the_capture_date() {
        let tables = RecordBuilder::new(date()).build(&sample());
        let tables_seen: Vec<Table> = tables.iter().map(|(t, _)| *t).collect();
        assert_eq!(tables_seen, Table::ALL.to_vec());

        for (table, rows) in &tables {
            assert!(!rows.is_empty());
            for row in rows {
                assert_eq!(row.table(), *table);
                assert_eq!(row.date(), date());
            }
        }
    }

    #[test]
    fn test_records_match_table_schema() {
        let tables = RecordBuilder::new(date()).build(&sample());
        for (table, rows) in &tables {
            let record = rows[0].to_record();
            let mut columns: Vec<&str> =
                record.as_object().unwrap().keys().map(String::as_str).collect();
            columns.sort_unstable();

            let mut expected: Vec<&str> = table.columns().to_vec();
            expected.push(UNIQUE_KEY_COLUMN);
            expected.sort_unstable();

            assert_eq!(columns, expected, "schema mismatch for {}", table);
        }
    }

    #[test]
    fn test_fields_follow_table_columns() {
        for (table, rows) in RecordBuilder::new(date()).build(&sample()) {
            let columns: Vec<&str> = rows[0].fields().iter().map(|f| f.column).collect();
            assert_eq!(columns, table.columns().to_vec(), "column order for {}", table);
        }
    }

    #[test]
    fn test_genre_record_values() {
        let rows = RecordBuilder::new(date()).genre_rows(&sample().genres);
        assert_eq!(
            rows[0].to_record(),
            json!({
                "date": "2024-05-01",
                "time_range": "long_term",
                "rank": 1,
                "genre_name": "rock",
                "count": 2,
                "unique_key": "2024-05-01_long_term_1_rock_2"
            })
        );
    }

    #[test]
    fn test_missing_playlist_name_uses_sentinel() {
        let rows = RecordBuilder::new(date()).playlist_rows(&[PlaylistEntry {
            name: None,
            total_tracks: 3,
        }]);
        let record = rows[0].to_record();
        assert_eq!(record["playlist_name"], "Default Value");
        assert_eq!(record["unique_key"], "2024-05-01_Default Value_3");
    }
}
