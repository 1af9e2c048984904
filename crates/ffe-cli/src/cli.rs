use clap::{Args, Parser, Subcommand};
use ffexplorer::engine::config::HighlightModel;
use ffexplorer::engine::picking::PickLevel;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Force Field Explorer Developers",
    version,
    about = "ffe - replay and inspect Force Field Explorer selection sessions without a display.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the systems of a session script and replay its steps, printing every notification.
    Replay(ReplayArgs),
    /// Parse a session script and build its systems without replaying any steps.
    Check(CheckArgs),
}

/// Arguments for the `replay` subcommand.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Path to the session script in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub script: PathBuf,

    /// Path to an explorer configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the initial pick level (e.g. 'bond', 'measure-angle').
    #[arg(short = 'l', long, value_name = "LEVEL")]
    pub pick_level: Option<PickLevel>,

    /// Override how highlights follow the selection ('exclusive' or 'inherited').
    #[arg(long, value_name = "MODEL")]
    pub highlight_model: Option<HighlightModel>,

    /// Tag attached systems for parallel execution, overriding the config file.
    #[arg(long)]
    pub parallel: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S picking.default-level=residue
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the session script in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub script: PathBuf,
}
