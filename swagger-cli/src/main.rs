mod cli;
mod commands;
mod error;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use swagger_spec::utils::logger::init_logger;
use swagger_spec::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    }
    .from_env_overrides()?;

    let mut stdout = std::io::stdout().lock();
    match &cli.command {
        Commands::Expand(args) => commands::expand(args, &config, &mut stdout),
        Commands::Resolve(args) => commands::resolve(args, &config, &mut stdout),
    }
}
