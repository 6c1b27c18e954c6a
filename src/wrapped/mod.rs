pub mod aggregator;
pub mod dedup;
pub mod records;

pub use aggregator::{Aggregator, GenreCount, PlaylistEntry, RankedItem, WrappedData};
pub use records::{RecordBuilder, Row, Table};
