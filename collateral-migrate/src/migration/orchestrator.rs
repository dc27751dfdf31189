//! Runs the selected tasks in a fixed order and aggregates their results

use serde::Serialize;

use super::report::MigrationResult;
use super::tasks::{MigrationTask, TaskContext};

/// What happened to one task
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub name: String,
    /// `Err` holds the fatal collection error, formatted with its context chain
    pub result: Result<MigrationResult, String>,
}

impl TaskOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(&self.result, Ok(result) if result.is_clean())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub outcomes: Vec<TaskOutcome>,
}

impl RunSummary {
    /// No task aborted and no element failed
    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(TaskOutcome::is_clean)
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_clean() { 0 } else { 1 }
    }

    pub fn total_updated(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|r| r.updated)
            .sum()
    }

    pub fn total_errors(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match &o.result {
                Ok(result) => result.errors.len(),
                Err(_) => 1,
            })
            .sum()
    }
}

pub struct Orchestrator {
    tasks: Vec<Box<dyn MigrationTask>>,
}

impl Orchestrator {
    pub fn new(tasks: Vec<Box<dyn MigrationTask>>) -> Self {
        Self { tasks }
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    /// Run every task to completion, one after the other.
    ///
    /// A task that aborts is recorded and the next one still runs.
    pub async fn run(&self, ctx: &TaskContext) -> RunSummary {
        let mut summary = RunSummary::default();

        for task in &self.tasks {
            let name = task.name();
            log::info!("Starting {} migration{}", name, if ctx.dry_run { " (dry run)" } else { "" });

            let result = match task.run(ctx).await {
                Ok(result) => {
                    log::info!(
                        "{} migration finished: {} updated, {} errors",
                        name,
                        result.updated,
                        result.errors.len()
                    );
                    if let Err(e) = ctx.reports.record_result(&result) {
                        log::error!("Failed to write {} report: {:#}", name, e);
                        for (id, err) in &result.errors {
                            log::error!("{} {}: {}", name, id, err);
                        }
                    }
                    Ok(result)
                }
                Err(e) => {
                    log::error!("{} migration aborted: {:#}", name, e);
                    Err(format!("{:#}", e))
                }
            };

            summary.outcomes.push(TaskOutcome {
                name: name.to_string(),
                result,
            });
        }

        summary
    }
}
