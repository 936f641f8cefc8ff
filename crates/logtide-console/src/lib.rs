//! logtide console — a line-oriented presenter over [`LogsController`].
//!
//! Reads commands from stdin and re-renders the selected source whenever
//! the pipeline reports a change (while auto-scroll is on) or a command
//! runs. Headless mode renders once and exits.

pub mod commands;
pub mod controller;
pub mod render;

pub use commands::{execute_command, Command, Flow};
pub use controller::LogsController;

use logtide_core::config::Config;
use logtide_core::LogPipeline;
use logtide_feeds::TailSettings;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Rows shown per live render.
const LIVE_ROWS: usize = 40;
/// Bursts of changes within this window produce one render.
const RENDER_DEBOUNCE: Duration = Duration::from_millis(50);

/// Start-up options from the command line.
#[derive(Debug, Clone, Default)]
pub struct ConsoleOptions {
    pub source: Option<String>,
    pub query: Option<String>,
    pub export: Option<PathBuf>,
    pub headless: bool,
}

/// Build the pipeline and controller, apply `options`, then run.
pub async fn run(config: Config, options: ConsoleOptions) -> anyhow::Result<()> {
    let pipeline = Arc::new(LogPipeline::new(&config));
    let mut controller = LogsController::new(pipeline.clone(), TailSettings::from(&config.tail));
    controller.seed_local_source();

    if let Some(source) = &options.source {
        if let Err(err) = controller.select_source(source).await {
            warn!(source = %source, error = %err, "initial source selection failed");
        }
    }
    if let Some(query) = &options.query {
        controller.set_filter(query);
    }
    pipeline.flush_index().await;

    if let Some(path) = &options.export {
        let lines = controller.export_to_file(path)?;
        info!(lines, path = %path.display(), "exported");
    }

    let result = if options.headless {
        draw(&controller, &mut std::io::stdout(), None).map_err(Into::into)
    } else {
        interactive(&mut controller).await
    };
    controller.shutdown().await;
    result
}

fn draw<W: Write>(controller: &LogsController, out: &mut W, limit: Option<usize>) -> std::io::Result<()> {
    let view = controller.view();
    render::render(out, &controller.title(&view), &view, &controller.status(), limit)?;
    out.flush()
}

async fn interactive(controller: &mut LogsController) -> anyhow::Result<()> {
    let mut changes = controller.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    draw(controller, &mut std::io::stdout(), Some(LIVE_ROWS))?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Command::parse(&line) {
                    Ok(cmd) => {
                        if execute_command(controller, cmd, &mut std::io::stdout()).await? == Flow::Quit {
                            break;
                        }
                    }
                    Err(msg) if msg.is_empty() => continue,
                    Err(msg) => println!("error: {msg}"),
                }
                controller.pipeline().flush_index().await;
                changes.borrow_and_update();
                draw(controller, &mut std::io::stdout(), Some(LIVE_ROWS))?;
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                if controller.auto_scroll() {
                    tokio::time::sleep(RENDER_DEBOUNCE).await;
                    controller.pipeline().flush_index().await;
                    changes.borrow_and_update();
                    draw(controller, &mut std::io::stdout(), Some(LIVE_ROWS))?;
                }
            }
        }
    }
    Ok(())
}
