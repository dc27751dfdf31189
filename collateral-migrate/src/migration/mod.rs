//! Migration engine
//!
//! Generic collection and execution primitives, the three backfill tasks
//! built from them, and the orchestrator that runs the tasks in order.

pub mod applier;
pub mod classification;
pub mod collector;
pub mod executor;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod tasks;

#[cfg(test)]
pub mod testing;

pub use applier::SequentialApplier;
pub use classification::ClassificationMap;
pub use collector::collect_all;
pub use executor::BatchExecutor;
pub use orchestrator::{Orchestrator, RunSummary};
pub use report::ReportWriter;
pub use tasks::{MigrationTask, ProductsTask, PromotionsTask, SalonsTask, TaskContext};
