use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

const DEFAULT_CONFIG_PATH: &str = "config/tapemig.yaml";

/// Top-level arguments.
#[derive(Debug, Parser)]
#[command(name = "tapemig", about = "Migrate sliced tape payloads into object storage")]
pub struct Cli {
    /// YAML configuration file.
    #[arg(
        long,
        short,
        global = true,
        env = "TAPEMIG_CONFIG",
        default_value = DEFAULT_CONFIG_PATH
    )]
    pub config: PathBuf,
    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported commands.
#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Process every tape found in the input directory.
    Run,
    /// Process a single tape.
    Process(ProcessArgs),
    /// Print the recorded status of a tape.
    Status(StatusArgs),
    /// Apply database schema migrations and exit.
    Migrate,
}

impl Command {
    /// Short label used in logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Process(_) => "process",
            Self::Status(_) => "status",
            Self::Migrate => "migrate",
        }
    }
}

/// Arguments of `process`.
#[derive(Debug, Args, PartialEq, Eq)]
pub struct ProcessArgs {
    /// Tape volume identifier.
    #[arg(long)]
    pub tape_name: String,
    /// Tape image path; defaults to `<input_directory>/<tape_name>`.
    #[arg(long)]
    pub tape_location: Option<PathBuf>,
}

/// Arguments of `status`.
#[derive(Debug, Args, PartialEq, Eq)]
pub struct StatusArgs {
    /// Tape volume identifier.
    #[arg(long)]
    pub tape_name: String,
}
