mod api;
mod cli;
mod config;
mod docdb;
mod migration;

use anyhow::Result;
use clap::Parser;
use colored::*;

use cli::{Cli, Commands};
use config::Config;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    if verbose {
        builder.filter_module("collateral_migrate", log::LevelFilter::Debug);
    }
    builder.format_timestamp_millis().init();
}

async fn dispatch(cli: Cli) -> Result<i32> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => cli::commands::handle_run_command(args, &config, cli.dry_run).await,
        Commands::Buyers => {
            cli::commands::handle_buyers_command(&config).await?;
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::debug!("{:?}", e);
            eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
            1
        }
    };
    std::process::exit(code);
}
