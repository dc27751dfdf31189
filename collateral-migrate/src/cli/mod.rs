//! Command-line interface

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "collateral-migrate")]
#[command(about = "One-time backfill of collateral fields on products, salons and promotions")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ~/.config/collateral-migrate/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Collect and report candidates without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the migrations
    Run(RunArgs),
    /// List buyers in the catalog, to pick `catalog.buyer_id`
    Buyers,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Only run these tasks (order stays products, salons, promotions)
    #[arg(long, value_enum, value_delimiter = ',')]
    pub only: Vec<TaskKind>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskKind {
    Products,
    Salons,
    Promotions,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [TaskKind::Products, TaskKind::Salons, TaskKind::Promotions];

    /// Selected tasks in run order, everything when nothing was selected
    pub fn selection(only: &[TaskKind]) -> Vec<TaskKind> {
        Self::ALL
            .into_iter()
            .filter(|kind| only.is_empty() || only.contains(kind))
            .collect()
    }
}
