pub mod postgrest;
pub mod writer;

#[cfg(test)]
pub mod memory;

pub use postgrest::PostgrestStore;
pub use writer::{SyncWriter, TableStore};
