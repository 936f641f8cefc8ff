//! Export — write a view to a plain-text file.
//!
//! One line per entry, in view order:
//!
//! ```text
//! 2024-01-15 10:30:00.123 [ERROR] Database connection error
//! ```
//!
//! Timestamps are UTC. Embedded newlines in a message are written as `\n`
//! so every entry stays on one line.

use crate::error::ExportError;
use crate::types::LogEntry;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

pub fn format_line(entry: &LogEntry) -> String {
    let message = entry.message.trim_end_matches(['\r', '\n']).replace('\n', "\\n");
    format!(
        "{} [{}] {}",
        entry.ts.format("%Y-%m-%d %H:%M:%S%.3f"),
        entry.level,
        message
    )
}

/// Write `entries` to `out`. Returns the number of lines written.
pub fn write_entries<'a, W, I>(out: &mut W, entries: I) -> std::io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a Arc<LogEntry>>,
{
    let mut lines = 0;
    for entry in entries {
        writeln!(out, "{}", format_line(entry))?;
        lines += 1;
    }
    Ok(lines)
}

/// Create (or truncate) `path` and write `entries` to it.
pub fn export_to_file<'a, I>(path: &Path, entries: I) -> Result<usize, ExportError>
where
    I: IntoIterator<Item = &'a Arc<LogEntry>>,
{
    let io_err = |source: std::io::Error| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    let lines = write_entries(&mut out, entries).map_err(io_err)?;
    out.flush().map_err(io_err)?;
    Ok(lines)
}
