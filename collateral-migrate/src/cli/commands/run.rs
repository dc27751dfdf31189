//! `run` command: build the selected tasks and drive them through the orchestrator

use anyhow::{Context, Result};
use colored::*;
use std::sync::Arc;

use crate::api::CatalogClient;
use crate::cli::{RunArgs, TaskKind};
use crate::config::Config;
use crate::docdb::DocumentClient;
use crate::migration::{
    BatchExecutor, MigrationTask, Orchestrator, ProductsTask, PromotionsTask, ReportWriter,
    RunSummary, SalonsTask, SequentialApplier, TaskContext,
};

/// Catalog client shared by every catalog task, created on first use
fn shared_catalog(slot: &mut Option<Arc<CatalogClient>>, config: &Config) -> Result<Arc<CatalogClient>> {
    if let Some(client) = slot {
        return Ok(client.clone());
    }
    let client = Arc::new(CatalogClient::new(
        config.catalog_url()?,
        config.credentials()?,
        config.resilience().concurrency,
    ));
    *slot = Some(client.clone());
    Ok(client)
}

/// Handle the run command, returning the process exit code
pub async fn handle_run_command(args: RunArgs, config: &Config, dry_run: bool) -> Result<i32> {
    let selection = TaskKind::selection(&args.only);
    let resilience = config.resilience();

    // Every setting the selected tasks need is checked before anything runs
    let mut catalog = None;
    let mut tasks: Vec<Box<dyn MigrationTask>> = Vec::new();
    for kind in selection {
        let task: Box<dyn MigrationTask> = match kind {
            TaskKind::Products => Box::new(ProductsTask::new(
                shared_catalog(&mut catalog, config)?,
                BatchExecutor::new(&resilience.concurrency),
            )),
            TaskKind::Salons => Box::new(SalonsTask::new(
                shared_catalog(&mut catalog, config)?,
                config.buyer_id()?,
                Arc::new(config.classification_map()),
                BatchExecutor::new(&resilience.concurrency),
            )),
            TaskKind::Promotions => {
                let store = DocumentClient::new(config.container_ref()?, config.docdb_key()?)
                    .context("Failed to set up document database client")?;
                Box::new(PromotionsTask::new(
                    Arc::new(store),
                    SequentialApplier::new(&resilience.throttle),
                ))
            }
        };
        tasks.push(task);
    }

    let orchestrator = Orchestrator::new(tasks);
    let reports = ReportWriter::new(config.report_dir());
    println!(
        "Running {}{}",
        orchestrator.task_names().join(", ").cyan(),
        if dry_run { " (dry run)".yellow().to_string() } else { String::new() }
    );
    println!("Reports go to {}", reports.dir().display().to_string().dimmed());

    let ctx = TaskContext {
        dry_run,
        reports: Arc::new(reports),
    };
    let summary = orchestrator.run(&ctx).await;

    if let Some(client) = &catalog {
        let stats = client.limiter_stats();
        log::debug!(
            "Catalog limiter: {} requests, {:.1}% waited for a permit (max {})",
            stats.requests_acquired,
            stats.wait_rate() * 100.0,
            stats.max_concurrent_requests
        );
    }

    println!();
    for line in summary_lines(&summary) {
        println!("{}", line);
    }
    Ok(summary.exit_code())
}

fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let mut lines = Vec::new();

    for outcome in &summary.outcomes {
        match &outcome.result {
            Ok(result) => {
                let status = if result.is_clean() {
                    "ok".bright_green().bold()
                } else {
                    "errors".bright_red().bold()
                };
                let mut line = format!(
                    "{:<11} {:<6} {} records, {} already migrated, {} candidates, {} updated, {} errors",
                    outcome.name,
                    status,
                    result.total_records,
                    result.already_migrated,
                    result.candidates,
                    result.updated,
                    result.errors.len()
                );
                if result.unclassifiable > 0 {
                    line.push_str(&format!(", {} unclassifiable", result.unclassifiable));
                }
                lines.push(line);
                for (id, err) in result.errors.iter().take(10) {
                    lines.push(format!("    {} {}", id.yellow(), err.to_string().dimmed()));
                }
                if result.errors.len() > 10 {
                    lines.push(format!("    ... and {} more (see report)", result.errors.len() - 10));
                }
            }
            Err(e) => lines.push(format!(
                "{:<11} {:<6} {}",
                outcome.name,
                "failed".bright_red().bold(),
                e
            )),
        }
    }

    let total = format!(
        "{} updated, {} errors",
        summary.total_updated(),
        summary.total_errors()
    );
    lines.push(if summary.is_clean() {
        total.bright_green().to_string()
    } else {
        total.bright_red().to_string()
    });
    lines
}
