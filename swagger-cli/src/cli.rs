use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "swagger-spec-cli")]
#[command(about = "Expand and resolve $ref references in Swagger 2.0 documents", version)]
pub struct Cli {
    /// Configuration file (TOML, or YAML by extension)
    #[arg(long, global = true, env = "SWAGGER_SPEC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Expand every $ref in a specification
    Expand(ExpandArgs),
    /// Print the value a single reference points to
    Resolve(ResolveArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ExpandArgs {
    /// Path or URL of the specification
    pub spec: String,

    /// Write on a single line
    #[arg(long)]
    pub compact: bool,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_parser = ["json", "yaml"], default_value = "json")]
    pub format: String,

    /// Leave circular references in place instead of failing
    #[arg(long)]
    pub keep_circular_refs: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Path or URL of the specification
    pub spec: String,

    /// Reference to resolve, e.g. '#/definitions/Pet'
    pub reference: String,

    #[arg(long, value_parser = ["json", "yaml"], default_value = "json")]
    pub format: String,
}
