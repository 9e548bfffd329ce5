use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "console-diag")]
#[command(about = "Diagnostics for a self-hosted platform instance: support bundles, pod logs, status")]
pub struct Cli {
    /// Kubeconfig context
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Namespace of the platform instance
    #[arg(short = 'n', long, global = true)]
    pub namespace: Option<String>,

    /// Name of the platform instance
    #[arg(long, global = true)]
    pub instance: Option<String>,

    /// Directory for bundles and exported logs
    #[arg(short = 'o', long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// YAML settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Collect cluster resources, configuration and pod logs into a zip bundle
    Bundle,

    /// Show a pod's log with severity highlighting
    Logs(LogsArgs),

    /// Summarize pod health of the instance
    Status,
}

#[derive(clap::Args)]
pub struct LogsArgs {
    /// Pod name
    pub pod: String,

    /// Only show warning, error and panic lines
    #[arg(long)]
    pub alerts_only: bool,

    /// Newest lines first
    #[arg(long)]
    pub reverse: bool,

    /// Only show lines matching this regex (case-insensitive)
    #[arg(long)]
    pub grep: Option<String>,

    /// Write the raw log to <pod>.logs in the output directory
    #[arg(long)]
    pub export: bool,

    /// Print to stdout instead of the interactive viewer
    #[arg(long)]
    pub no_tui: bool,
}
