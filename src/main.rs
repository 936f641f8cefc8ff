use clap::Parser;
use logtide_core::config::Config;
use logtide_console::ConsoleOptions;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "logtide", about = "logtide — multi-source log viewer with remote tailing and live search")]
struct Cli {
    /// Write debug logs to /tmp/logtide-debug.log (tail -f to inspect).
    #[arg(long)]
    debug: bool,

    /// Config file to use instead of ~/.config/logtide/config.toml.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Source to select at start-up.
    #[arg(long, short)]
    source: Option<String>,

    /// Initial filter.
    #[arg(long, short)]
    query: Option<String>,

    /// Export the selected source to this file after start-up.
    #[arg(long, short)]
    export: Option<PathBuf>,

    /// Render once and exit instead of reading commands from stdin.
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|_| Config::defaults()),
    };

    let (path, level) = if cli.debug {
        (PathBuf::from("/tmp/logtide-debug.log"), "debug".to_string())
    } else {
        (config.logging.file.clone(), config.logging.level.clone())
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    tracing_subscriber::fmt()
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
    tracing::info!(log = %path.display(), "logtide started");

    let options = ConsoleOptions {
        source: cli.source,
        query: cli.query,
        export: cli.export,
        headless: cli.headless,
    };
    logtide_console::run(config, options).await
}
