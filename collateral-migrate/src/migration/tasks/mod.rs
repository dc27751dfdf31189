//! The three backfill tasks and the seam the orchestrator drives them through

pub mod products;
pub mod promotions;
pub mod salons;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::report::{MigrationResult, ReportSink};

pub use products::ProductsTask;
pub use promotions::PromotionsTask;
pub use salons::SalonsTask;

/// Run-wide settings handed to every task
#[derive(Clone)]
pub struct TaskContext {
    /// Collect and filter, but issue no writes
    pub dry_run: bool,
    pub reports: Arc<dyn ReportSink>,
}

impl TaskContext {
    /// Persist a task's candidate ids. A failed write is logged and the task goes on.
    pub fn record_candidates(&self, task: &str, ids: &[String]) {
        if let Err(e) = self.reports.record_candidates(task, ids) {
            log::error!("Failed to write {} candidate report: {:#}", task, e);
        }
    }
}

/// One backfill: collect, filter to unmigrated records, mutate each.
///
/// `run` returns `Err` only when the collection step fails, before any
/// record has been touched. Per-record failures land in the result's error map.
#[async_trait]
pub trait MigrationTask: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &TaskContext) -> Result<MigrationResult>;
}
