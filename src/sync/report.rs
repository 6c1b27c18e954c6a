use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableResult {
    pub table: String,
    pub rows: usize,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub capture_date: NaiveDate,
    pub dry_run: bool,
    pub tables: Vec<TableResult>,
}

impl SyncReport {
    pub fn new(capture_date: NaiveDate, dry_run: bool) -> Self {
        Self {
            capture_date,
            dry_run,
            tables: Vec::new(),
        }
    }

    pub fn record(&mut self, table: &str, rows: usize, success: bool) {
        self.tables.push(TableResult {
            table: table.to_string(),
            rows,
            success,
        });
    }

    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }

    pub fn failed_tables(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| !t.success)
            .map(|t| t.table.as_str())
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.tables.iter().all(|t| t.success)
    }
}
