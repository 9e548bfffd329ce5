mod archive;
mod cli;
mod collector;
mod config;
mod error;
mod kubernetes;
mod logs;
mod status;
mod types;
mod ui;
mod utils;

use anyhow::Context;
use clap::Parser;
use std::io::IsTerminal;
use tracing::{error, info};

use archive::{DirectorySink, FileSink};
use cli::{Cli, Command, LogsArgs};
use collector::Collector;
use config::Settings;
use kubernetes::{KubeSource, ResourceSource};
use logs::{LogSource, ViewOptions, compile_pattern, grep};
use types::ResourceKind;
use ui::App;
use utils::styled_line;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Determine if we'll use TUI mode (needed to configure logging appropriately)
    let use_tui = match &cli.command {
        Command::Logs(args) => !args.no_tui && std::io::stdout().is_terminal(),
        _ => false,
    };
    init_tracing(cli.verbose, use_tui);

    let settings = Settings::load(&cli)?;
    let source = KubeSource::connect(settings.context.as_deref()).await?;
    let sink = DirectorySink::new(&settings.output_dir);

    match cli.command {
        Command::Bundle => run_bundle(&source, &settings, &sink).await,
        Command::Logs(args) => run_logs(source, &settings, &sink, args, use_tui).await,
        Command::Status => run_status(&source, &settings).await,
    }
}

fn init_tracing(verbose: bool, use_tui: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    if use_tui {
        // In TUI mode: write logs to a file to avoid corrupting the display
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("/tmp/console-diag.log")
        {
            Ok(log_file) => tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(log_file))
                .init(),
            Err(_) => {
                eprintln!("Warning: Could not open /tmp/console-diag.log for logging");
                tracing_subscriber::fmt()
                    .with_env_filter(env_filter)
                    .with_writer(std::io::sink)
                    .init();
            }
        }
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run_bundle(
    source: &KubeSource,
    settings: &Settings,
    sink: &DirectorySink,
) -> anyhow::Result<()> {
    info!(
        namespace = %settings.namespace,
        instance = %settings.instance,
        "Collecting support bundle"
    );
    let collector = Collector::new(source, &settings.namespace, &settings.instance);
    match collector.download(sink).await {
        Ok(path) => {
            println!("{}", path.display());
            Ok(())
        }
        Err(e) => {
            error!(dir = %sink.dir().display(), error = %e, "Failed to save bundle");
            Err(e).context("Failed to save support bundle")
        }
    }
}

async fn run_logs(
    source: KubeSource,
    settings: &Settings,
    sink: &DirectorySink,
    args: LogsArgs,
    use_tui: bool,
) -> anyhow::Result<()> {
    let grep_regex = match &args.grep {
        Some(pattern) => Some(
            compile_pattern(pattern)
                .with_context(|| format!("Invalid regex pattern '{}'", pattern))?,
        ),
        None => None,
    };

    let text = source
        .fetch_pod_log(&args.pod, &settings.namespace)
        .await
        .with_context(|| format!("Failed to fetch logs for pod {}", args.pod))?;
    let log = LogSource::new(args.pod.clone(), text);

    if args.export {
        let path = sink
            .save(log.raw().as_bytes(), &log.export_file_name())
            .context("Failed to export logs")?;
        info!(path = %path.display(), "Exported logs");
    }

    let view = ViewOptions {
        alerts_only: args.alerts_only,
        reversed: args.reverse,
    };

    if use_tui {
        let app = App::new(log, view, grep_regex);
        ui::run_viewer(app, source, settings.namespace.clone(), sink).await
    } else {
        for line in grep(log.view(view), grep_regex.as_ref()) {
            println!("{}", styled_line(line));
        }
        Ok(())
    }
}

async fn run_status(source: &KubeSource, settings: &Settings) -> anyhow::Result<()> {
    let pods = source
        .fetch(ResourceKind::Pods, &settings.namespace)
        .await
        .with_context(|| format!("Failed to list pods in namespace {}", settings.namespace))?;
    let report = status::assess_list(&pods).context("Unexpected pod list shape")?;
    print!("{}", report);
    Ok(())
}
