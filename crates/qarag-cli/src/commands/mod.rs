//! Command implementations

mod chunk;
mod config;
mod query;

use crate::cli::{Cli, Commands};
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use anyhow::Result;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let layered = load_config(cli.config.as_deref(), cli.overrides())?;

    match cli.command {
        Commands::Chunk(args) => chunk::execute(args, &layered.resolve()?, &output),
        Commands::Query(args) => query::execute(args, &layered.resolve()?, &output).await,
        Commands::Config(args) => config::execute(args, &layered, &output),
    }
}
