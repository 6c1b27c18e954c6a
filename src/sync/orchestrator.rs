use chrono::{Local, NaiveDate};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::spotify::{AuthMode, SpotifyClient, TokenProvider};
use crate::store::{PostgrestStore, SyncWriter, TableStore};
use crate::sync::report::SyncReport;
use crate::wrapped::{Aggregator, RecordBuilder, Row, Table, WrappedData};

/// One harvest-and-upsert pass. Without a store the pass is a dry run.
pub struct SyncPipeline<S = PostgrestStore> {
    spotify_client: SpotifyClient,
    writer: Option<SyncWriter<S>>,
    builder: RecordBuilder,
}

impl SyncPipeline<PostgrestStore> {
    /// Acquires a token in `mode` and, unless `dry_run`, connects the store.
    pub async fn connect(
        config: &Config,
        mode: AuthMode,
        capture_date: NaiveDate,
        dry_run: bool,
    ) -> Result<Self> {
        let store = if dry_run {
            None
        } else {
            Some(PostgrestStore::from_config(config)?)
        };

        let token = TokenProvider::new(config)?.acquire(mode).await?;
        let spotify_client = SpotifyClient::new(config, &token)?;

        let pipeline = Self::new(spotify_client, capture_date);
        Ok(match store {
            Some(store) => pipeline.with_store(store),
            None => pipeline,
        })
    }
}

impl<S: TableStore> SyncPipeline<S> {
    pub fn new(spotify_client: SpotifyClient, capture_date: NaiveDate) -> Self {
        Self {
            spotify_client,
            writer: None,
            builder: RecordBuilder::new(capture_date),
        }
    }

    pub fn with_store(mut self, store: S) -> Self {
        self.writer = Some(SyncWriter::new(store));
        self
    }

    pub fn writer(&self) -> Option<&SyncWriter<S>> {
        self.writer.as_ref()
    }

    pub async fn collect(&self) -> WrappedData {
        Aggregator::new(&self.spotify_client).collect().await
    }

    pub fn build_rows(&self, data: &WrappedData) -> Vec<(Table, Vec<Row>)> {
        self.builder.build(data)
    }

    /// Harvests, flattens and writes every table. Every table is attempted
    /// even when an earlier one fails.
    pub async fn run(&self) -> SyncReport {
        let capture_date = self.builder.capture_date();
        let dry_run = self.writer.is_none();
        info!(
            "Starting sync for {} (dry_run={})",
            capture_date, dry_run
        );

        let data = self.collect().await;
        let mut report = SyncReport::new(capture_date, dry_run);

        for (table, rows) in self.build_rows(&data) {
            let success = match &self.writer {
                Some(writer) => writer.upsert(table, &rows).await,
                None => {
                    info!("Dry run: {} rows for {}", rows.len(), table);
                    true
                }
            };
            report.record(table.as_str(), rows.len(), success);
        }

        let failed = report.failed_tables();
        if !failed.is_empty() {
            warn!("Sync finished with failed tables: {}", failed.join(", "));
        }

        report
    }

    pub fn save_sync_report(&self, report: &SyncReport) -> Result<PathBuf> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let results_dir = Path::new("sync_results");

        fs::create_dir_all(results_dir)?;

        let filename = results_dir.join(format!("sync_report_{}.json", timestamp));
        let json = serde_json::to_string_pretty(report)?;

        fs::write(&filename, json)?;

        info!("Sync report saved to: {}", filename.display());

        Ok(filename)
    }

    pub fn print_summary(&self, report: &SyncReport) {
        println!();
        println!("{}", "=".repeat(60));
        println!("{}", "SYNC SUMMARY".bold());
        println!("{}", "=".repeat(60));
        println!("Capture date: {}", report.capture_date);
        println!("Total rows: {}", report.total_rows());
        if report.dry_run {
            println!("{}", "Dry run - nothing was written".yellow());
        }
        println!("{}", "=".repeat(60));

        for result in &report.tables {
            let status = if report.dry_run {
                "skipped".yellow()
            } else if result.success {
                "ok".green()
            } else {
                "failed".red()
            };
            println!("  {:<10} {:>5} rows  {}", result.table, result.rows, status);
        }
    }
}
