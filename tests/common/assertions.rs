//! Domain-specific assertion macros for logtide harnesses.
//!
//! These wrap `pretty_assertions` and add failure messages that say which
//! rows or spans were actually produced.

// ---------------------------------------------------------------------------
// View assertions
// ---------------------------------------------------------------------------

/// Assert the messages of a `LogView`, in display order.
///
/// ```rust,ignore
/// assert_messages!(view, ["first", "second"]);
/// ```
#[macro_export]
macro_rules! assert_messages {
    ($view:expr, [$($message:expr),* $(,)?]) => {{
        let view: &logtide_core::view::LogView = &$view;
        let actual: Vec<&str> = view.rows.iter().map(|row| row.entry.message.as_str()).collect();
        let expected: Vec<&str> = vec![$($message),*];
        pretty_assertions::assert_eq!(actual, expected, "view rows (in display order)");
    }};
}

/// Assert the highlight spans of one field of a view row or search result.
///
/// ```rust,ignore
/// assert_spans!(row, "message", [(20, 25)]);
/// ```
#[macro_export]
macro_rules! assert_spans {
    ($row:expr, $field:expr, [$(($start:expr, $end:expr)),* $(,)?]) => {{
        let field: &str = $field;
        let expected: Vec<logtide_core::Span> = vec![$(logtide_core::Span::new($start, $end)),*];
        match $row.highlights.get(field) {
            Some(actual) => pretty_assertions::assert_eq!(actual, &expected, "highlights of field {:?}", field),
            None => panic!(
                "assert_spans! failed: no highlights for field {:?}.\n  Highlighted fields: {:?}",
                field,
                $row.highlights.keys().collect::<Vec<_>>()
            ),
        }
    }};
}

/// Assert that `source` holds exactly `len` entries.
#[macro_export]
macro_rules! assert_store_len {
    ($pipeline:expr, $source:expr, $len:expr) => {{
        let actual = $pipeline.store().len($source);
        assert!(
            actual == $len,
            "assert_store_len! failed for source {:?}: expected {} entries, found {}",
            $source,
            $len,
            actual
        );
    }};
}
