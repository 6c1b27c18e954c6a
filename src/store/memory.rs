use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::store::TableStore;

/// In-process store with upsert semantics, for tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, BTreeMap<String, Value>>>,
    failing: HashSet<String>,
}

impl MemoryStore {
    pub fn failing(tables: &[&str]) -> Self {
        Self {
            failing: tables.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn snapshot(&self, table: &str) -> BTreeMap<String, Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

impl TableStore for MemoryStore {
    async fn upsert(&self, table: &str, records: &[Value], conflict_key: &str) -> Result<()> {
        if self.failing.contains(table) {
            return Err(AppError::Store {
                table: table.to_string(),
                message: "relation is read-only".into(),
            });
        }

        let mut batch: BTreeMap<String, Value> = BTreeMap::new();
        for record in records {
            let key = record[conflict_key].as_str().ok_or_else(|| AppError::Store {
                table: table.to_string(),
                message: format!("record without {}", conflict_key),
            })?;
            // Postgres: ON CONFLICT DO UPDATE command cannot affect row a second time
            if batch.insert(key.to_string(), record.clone()).is_some() {
                return Err(AppError::Store {
                    table: table.to_string(),
                    message: format!("{} {} appears twice in one batch", conflict_key, key),
                });
            }
        }

        let mut tables = self.tables.lock().unwrap();
        tables.entry(table.to_string()).or_default().extend(batch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_batch_repeating_a_key_is_rejected_whole() {
        let store = MemoryStore::default();
        let records = vec![
            json!({"unique_key": "a"}),
            json!({"unique_key": "b"}),
            json!({"unique_key": "a"}),
        ];

        let result = store.upsert("playlists", &records, "unique_key").await;

        assert!(matches!(result, Err(AppError::Store { .. })));
        assert!(store.snapshot("playlists").is_empty());
    }
}
