use std::collections::HashMap;
use std::future::Future;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::wrapped::records::{Row, Table, UNIQUE_KEY_COLUMN};

/// A backend that can insert-or-replace records keyed by one column.
pub trait TableStore {
    fn upsert(
        &self,
        table: &str,
        records: &[Value],
        conflict_key: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Writes each table's rows with one bulk upsert keyed by `unique_key`.
pub struct SyncWriter<S> {
    store: S,
}

impl<S: TableStore> SyncWriter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns whether the table was written. Failures are logged, not raised,
    /// so one table's error never stops the others.
    pub async fn upsert(&self, table: Table, rows: &[Row]) -> bool {
        if rows.is_empty() {
            info!("No rows for {}, skipping", table);
            return true;
        }

        let records = collapse_by_key(rows);
        if records.len() < rows.len() {
            debug!(
                "Collapsed {} rows sharing a unique_key in {}",
                rows.len() - records.len(),
                table
            );
        }
        info!("Inserting {} rows into {}...", records.len(), table);

        match self
            .store
            .upsert(table.as_str(), &records, UNIQUE_KEY_COLUMN)
            .await
        {
            Ok(()) => {
                info!("Data insertion into {} complete.", table);
                true
            }
            Err(e) => {
                warn!("Error inserting data into {}: {}", table, e);
                false
            }
        }
    }
}

/// One record per `unique_key`, in first-seen order; a later row with the
/// same key replaces the earlier one. The store rejects a batch that
/// touches one key twice.
fn collapse_by_key(rows: &[Row]) -> Vec<Value> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut records: Vec<Value> = Vec::with_capacity(rows.len());

    for row in rows {
        let record = row.to_record();
        match positions.get(&row.unique_key()) {
            Some(&i) => records[i] = record,
            None => {
                positions.insert(row.unique_key(), records.len());
                records.push(record);
            }
        }
    }

    records
}
