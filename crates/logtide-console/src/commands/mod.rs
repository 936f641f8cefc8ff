// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

use crate::controller::LogsController;
use logtide_core::LogLevel;
use std::io::Write;
use std::path::PathBuf;

pub const HELP: &str = "\
commands:
  source <name>           select a log source
  filter [text]           set the filter (empty clears it)
  refresh                 reload the selected source
  clear                   drop the selected source's entries
  autoscroll              toggle live re-rendering
  export <path>           write the selected source to a file
  group <id> [origin]     show a remote log group
  log <level> <message>   add an application log entry
  sources                 list sources
  help                    show this help
  quit                    exit";

/// A parsed, validated console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Source(String),
    Filter(String),
    Refresh,
    Clear,
    AutoScroll,
    Export(PathBuf),
    Group { group: String, origin: String },
    Log { level: LogLevel, message: String },
    Sources,
    Help,
    Quit,
}

/// What the console loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

impl Command {
    /// Parse one input line.
    ///
    /// Returns `Err(message)` on failure. An empty line returns `Err("")` as
    /// a sentinel meaning "nothing to do".
    pub fn parse(input: &str) -> Result<Command, String> {
        let input = input.trim();
        if input.is_empty() {
            return Err(String::new());
        }

        let (word, rest) = input
            .split_once(char::is_whitespace)
            .map(|(w, r)| (w, r.trim()))
            .unwrap_or((input, ""));

        match word {
            "q" | "quit" | "exit" => Ok(Command::Quit),
            "help" | "?" => Ok(Command::Help),
            "sources" | "ls" => Ok(Command::Sources),
            "refresh" | "r" => Ok(Command::Refresh),
            "clear" => Ok(Command::Clear),
            "autoscroll" | "follow" => Ok(Command::AutoScroll),
            "filter" | "/" => Ok(Command::Filter(rest.to_string())),
            "source" => {
                if rest.is_empty() {
                    Err("usage: source <name>".to_string())
                } else {
                    Ok(Command::Source(rest.to_string()))
                }
            }
            "export" => {
                if rest.is_empty() {
                    Err("usage: export <path>".to_string())
                } else {
                    Ok(Command::Export(PathBuf::from(rest)))
                }
            }
            "group" => match rest.split_once(char::is_whitespace) {
                _ if rest.is_empty() => Err("usage: group <id> [origin]".to_string()),
                Some((group, origin)) => Ok(Command::Group {
                    group: group.to_string(),
                    origin: origin.trim().to_string(),
                }),
                None => Ok(Command::Group {
                    group: rest.to_string(),
                    origin: "console".to_string(),
                }),
            },
            "log" => {
                let (level, message) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "usage: log <level> <message>".to_string())?;
                let level = LogLevel::parse(level).ok_or_else(|| format!("unknown level: {level}"))?;
                Ok(Command::Log {
                    level,
                    message: message.trim().to_string(),
                })
            }
            other => Err(format!("unknown command: {other}")),
        }
    }
}

/// Execute a parsed [`Command`] against the controller.
///
/// Failures that the controller already reports on the status line are not
/// returned; only output errors are.
pub async fn execute_command<W: Write>(
    controller: &mut LogsController,
    cmd: Command,
    out: &mut W,
) -> std::io::Result<Flow> {
    match cmd {
        Command::Quit => return Ok(Flow::Quit),
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Sources => {
            let selected = controller.selected().map(|s| s.name());
            for source in controller.sources() {
                let marker = if Some(source.name()) == selected { '*' } else { ' ' };
                writeln!(out, "{marker} {:<8} {}", source.name(), source.describe())?;
            }
        }
        Command::Source(name) => {
            if let Err(err) = controller.select_source(&name).await {
                tracing::warn!(source = %name, error = %err, "source selection failed");
            }
        }
        Command::Filter(text) => controller.set_filter(&text),
        Command::Refresh => {
            if let Err(err) = controller.refresh().await {
                tracing::warn!(error = %err, "refresh failed");
            }
        }
        Command::Clear => controller.clear(),
        Command::AutoScroll => {
            controller.toggle_auto_scroll();
        }
        Command::Export(path) => {
            if let Err(err) = controller.export_to_file(&path) {
                tracing::warn!(error = %err, "export failed");
            }
        }
        Command::Group { group, origin } => {
            if let Err(err) = controller.show_remote_group(&group, &origin).await {
                tracing::warn!(group = %group, error = %err, "cannot show remote group");
            }
        }
        Command::Log { level, message } => {
            controller.add_application_log(level, &message, []);
        }
    }
    Ok(Flow::Continue)
}
