pub mod orchestrator;
pub mod report;

pub use orchestrator::SyncPipeline;
pub use report::{SyncReport, TableResult};
