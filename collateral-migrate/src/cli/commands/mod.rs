//! Subcommand handlers

pub mod buyers;
pub mod run;

pub use buyers::handle_buyers_command;
pub use run::handle_run_command;
