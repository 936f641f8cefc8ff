//! Plain-text rendering of a [`LogView`].
//!
//! One line per row. Matched message spans are wrapped in `*…*`; structured
//! fields follow the message as `key=value` pairs.

use logtide_core::types::{LogEntry, Span, FIELD_MESSAGE};
use logtide_core::view::{LogView, ViewRow};
use logtide_core::{Status, StatusTone};
use std::io::Write;

pub const MARK: char = '*';

/// Render the title, the last `limit` rows (all when `None`) and the status.
pub fn render<W: Write>(
    out: &mut W,
    title: &str,
    view: &LogView,
    status: &Status,
    limit: Option<usize>,
) -> std::io::Result<()> {
    writeln!(out, "== {title} ==")?;
    let skip = limit.map_or(0, |n| view.rows.len().saturating_sub(n));
    for row in view.rows.iter().skip(skip) {
        writeln!(out, "{}", row_line(row))?;
    }
    writeln!(out, "-- {}: {}", tone_label(status.tone), status.message)
}

pub fn row_line(row: &ViewRow) -> String {
    let entry = &row.entry;
    let spans = row.highlights.get(FIELD_MESSAGE).map(Vec::as_slice).unwrap_or(&[]);
    let mut line = format!(
        "{} {:<5} {}",
        entry.ts.format("%H:%M:%S%.3f"),
        entry.level,
        marked(entry.message.trim_end_matches(['\r', '\n']), spans).replace('\n', "\\n")
    );
    let fields = field_pairs(entry);
    if !fields.is_empty() {
        line.push_str("  ");
        line.push_str(&fields);
    }
    line
}

/// Wrap every span of `text` in [`MARK`]. Spans are sorted and disjoint.
fn marked(text: &str, spans: &[Span]) -> String {
    let mut out = String::with_capacity(text.len() + spans.len() * 2);
    let mut at = 0;
    for span in spans {
        let (start, end) = (span.start.min(text.len()), span.end.min(text.len()));
        if start < at || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            continue;
        }
        out.push_str(&text[at..start]);
        out.push(MARK);
        out.push_str(&text[start..end]);
        out.push(MARK);
        at = end;
    }
    out.push_str(&text[at..]);
    out
}

fn field_pairs(entry: &LogEntry) -> String {
    let mut keys: Vec<&String> = entry.fields.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|k| format!("{k}={}", LogEntry::field_text(&entry.fields[k])))
        .collect::<Vec<_>>()
        .join(" ")
}

fn tone_label(tone: StatusTone) -> &'static str {
    match tone {
        StatusTone::Info => "info",
        StatusTone::Ok => "ok",
        StatusTone::Warn => "warn",
        StatusTone::Error => "error",
    }
}
