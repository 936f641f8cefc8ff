//! Search layer integration harness.
//!
//! # What this covers
//!
//! - **Single-term correctness**: one matching entry among eight yields one
//!   result with the exact byte span of the match.
//! - **Routing**: whitespace, quotes and wildcards route to the structured
//!   parser; a single word matches across message, level and source.
//! - **Fallback consistency**: for pure single terms the substring filter
//!   and the index surface the same entries.
//! - **Idempotence**: re-indexing an entry does not duplicate it, and
//!   evicting one of two same-key entries keeps the other findable.
//! - **Blank messages**: entries without message text still match on level
//!   and source.
//! - **Large sources**: filtered views are not cut at the result limit.
//! - **Unavailability**: a stopped index degrades to the substring filter.
//! - **Property: results ⊆ store**: queries never fabricate entries.
//!
//! # Running
//!
//! ```sh
//! cargo test --test search_harness
//! ```

mod common;
use common::*;
use logtide_core::search::{classify, QueryKind};
use logtide_core::view::LogView;
use logtide_core::{IndexError, LogLevel};
use logtide_feeds::RemoteEvent;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use std::collections::HashSet;
use std::sync::Arc;

fn messages(view: &LogView) -> HashSet<String> {
    view.rows.iter().map(|row| row.entry.message.clone()).collect()
}

// ---------------------------------------------------------------------------
// Query routing
// ---------------------------------------------------------------------------

#[rstest]
#[case("", QueryKind::Empty)]
#[case("   ", QueryKind::Empty)]
#[case("error", QueryKind::Simple)]
#[case("level:warn", QueryKind::Simple)]
#[case("db error", QueryKind::Structured)]
#[case("warn ", QueryKind::Structured)]
#[case("\"connection refused\"", QueryKind::Structured)]
#[case("time*", QueryKind::Structured)]
fn classifies_raw_queries(#[case] raw: &str, #[case] expected: QueryKind) {
    assert_eq!(classify(raw), expected);
}

// ---------------------------------------------------------------------------
// Indexed path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_term_finds_the_one_match_with_exact_span() {
    let pipeline = indexed_pipeline(100);
    ingest_all(&pipeline, one_error_in_eight()).await;

    let results = pipeline.index().unwrap().search("error", Some("app")).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].entry.message, "Database connection ERROR");
    assert_spans!(results[0], "message", [(20, 25)]);

    let filtered = pipeline.view("app", "error");
    assert!(filtered.index_error.is_none());
    assert_eq!(filtered.view.count_annotation(), "(1 of 8)");
    assert_spans!(filtered.view.rows[0], "message", [(20, 25)]);
}

#[tokio::test]
async fn single_term_matches_level_and_source() {
    let pipeline = indexed_pipeline(100);
    ingest_all(
        &pipeline,
        [
            LogEntryBuilder::new("disk almost full").level(LogLevel::Warn).at_ms(BASE_MS).build(),
            LogEntryBuilder::new("all good").at_ms(BASE_MS + 1).build(),
        ],
    )
    .await;

    let view = pipeline.view("app", "WARN").view;
    assert_messages!(view, ["disk almost full"]);
    assert_spans!(view.rows[0], "level", [(0, 4)]);

    let by_source = pipeline.view("app", "app").view;
    assert_eq!(by_source.len(), 2);
}

#[tokio::test]
async fn whitespace_routes_to_structured_query() {
    let pipeline = indexed_pipeline(100);
    ingest_all(&pipeline, one_error_in_eight()).await;

    // Both words are separate clauses, so either one matches.
    let view = pipeline.view("app", "scheduled ERROR").view;
    assert_eq!(
        messages(&view),
        HashSet::from([
            "Database connection ERROR".to_string(),
            "Scheduled job started".to_string(),
            "Scheduled job finished".to_string(),
        ])
    );

    let view = pipeline.view("app", "+scheduled -finished").view;
    assert_messages!(view, ["Scheduled job started"]);
}

#[tokio::test]
async fn phrases_fields_and_wildcards() {
    let pipeline = indexed_pipeline(100);
    ingest_all(
        &pipeline,
        [
            LogEntryBuilder::new("connection refused by upstream")
                .level(LogLevel::Error)
                .field("host", "db.internal")
                .at_ms(BASE_MS)
                .build(),
            LogEntryBuilder::new("refused connection attempt")
                .at_ms(BASE_MS + 1)
                .build(),
            LogEntryBuilder::new("request timed out").at_ms(BASE_MS + 2).build(),
        ],
    )
    .await;

    let phrase = pipeline.view("app", "\"connection refused\"").view;
    assert_messages!(phrase, ["connection refused by upstream"]);
    assert_spans!(phrase.rows[0], "message", [(0, 18)]);

    let field = pipeline.view("app", "host:db*").view;
    assert_messages!(field, ["connection refused by upstream"]);

    let wildcard = pipeline.view("app", "time*").view;
    assert_messages!(wildcard, ["request timed out"]);

    let level = pipeline.view("app", "level:error refused").view;
    assert_eq!(level.len(), 2);
}

#[tokio::test]
async fn results_are_scoped_to_the_source() {
    let pipeline = indexed_pipeline(100);
    ingest_all(
        &pipeline,
        [
            LogEntryBuilder::new("timeout talking to db").at_ms(BASE_MS).build(),
            LogEntryBuilder::new("timeout talking to cache")
                .source("remote")
                .at_ms(BASE_MS + 1)
                .build(),
        ],
    )
    .await;

    assert_messages!(pipeline.view("app", "timeout").view, ["timeout talking to db"]);
    assert_messages!(pipeline.view("remote", "timeout").view, ["timeout talking to cache"]);
}

#[tokio::test]
async fn reindexing_the_same_entry_is_idempotent() {
    let pipeline = indexed_pipeline(100);
    let entry = Arc::new(LogEntryBuilder::new("payment captured").at_ms(BASE_MS).build());
    let index = pipeline.index().unwrap();
    index.index_entry(entry.clone());
    index.index_entry(entry.clone());
    index.flush().await;

    assert_eq!(index.len(), 1);
    assert_eq!(index.search("payment", None).unwrap().len(), 1);
}

#[tokio::test]
async fn evicting_a_duplicate_keeps_the_survivor_searchable() {
    let pipeline = indexed_pipeline(2);
    let duplicate = || LogEntryBuilder::new("dup event").at_ms(BASE_MS).build();
    ingest_all(
        &pipeline,
        [duplicate(), duplicate(), LogEntryBuilder::new("other").at_ms(BASE_MS + 1).build()],
    )
    .await;

    assert_store_len!(pipeline, "app", 2);
    assert_messages!(pipeline.view("app", "dup").view, ["dup event"]);
}

#[tokio::test]
async fn blank_remote_message_still_matches_level_and_source() {
    let indexed = indexed_pipeline(100);
    let plain = plain_pipeline(100);
    for pipeline in [&indexed, &plain] {
        ingest_all(
            pipeline,
            [
                RemoteEvent::new(BASE_MS, "\n").into_entry("remote", "/aws/lambda/orders", "s-1"),
                LogEntryBuilder::new("disk almost full")
                    .source("remote")
                    .level(LogLevel::Warn)
                    .at_ms(BASE_MS + 1)
                    .build(),
            ],
        )
        .await;
    }

    assert_messages!(indexed.view("remote", "info").view, [""]);
    for term in ["info", "warn", "remote", "disk"] {
        let from_index = messages(&indexed.view("remote", term).view);
        let from_substring = messages(&plain.view("remote", term).view);
        assert_eq!(from_index, from_substring, "term {term:?}");
    }
}

#[tokio::test]
async fn filtered_view_is_not_cut_at_the_result_limit() {
    let pipeline = indexed_pipeline(1_500);
    ingest_all(
        &pipeline,
        (0..1_200).map(|i| LogEntryBuilder::new(format!("event {i}")).at_ms(BASE_MS + i).build()),
    )
    .await;

    let filtered = pipeline.view("app", "event");
    assert!(filtered.index_error.is_none());
    assert_eq!(filtered.view.count_annotation(), "(1200)");
}

#[tokio::test]
async fn oversized_wildcard_is_a_query_error_not_a_crash() {
    let pipeline = indexed_pipeline(100);
    ingest_all(&pipeline, one_error_in_eight()).await;

    let filtered = pipeline.view("app", &format!("x {}", "a*".repeat(20_000)));
    assert!(matches!(filtered.index_error, Some(IndexError::Query(_))));
    assert!(filtered.view.is_empty());
}

#[tokio::test]
async fn malformed_structured_query_falls_back_with_error() {
    let pipeline = indexed_pipeline(100);
    ingest_all(&pipeline, one_error_in_eight()).await;

    let filtered = pipeline.view("app", "\"database connection");
    assert!(matches!(filtered.index_error, Some(IndexError::Query(_))));
    assert!(filtered.view.is_empty());
}

// ---------------------------------------------------------------------------
// Fallback path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fallback_surfaces_the_same_entries_as_the_index() {
    let indexed = indexed_pipeline(100);
    let plain = plain_pipeline(100);
    let entries = one_error_in_eight();
    ingest_all(&indexed, entries.clone()).await;
    ingest_all(&plain, entries).await;

    for term in ["error", "ERROR", "connection", "job", "port", "8080", "info", "app", "nomatch"] {
        let from_index = messages(&indexed.view("app", term).view);
        let from_substring = messages(&plain.view("app", term).view);
        assert_eq!(from_index, from_substring, "term {term:?}");
    }
}

#[tokio::test]
async fn stopped_index_degrades_to_substring_filter() {
    let pipeline = indexed_pipeline(100);
    ingest_all(&pipeline, one_error_in_eight()).await;

    let index = pipeline.index().unwrap();
    pipeline.shutdown();
    while index.is_available() {
        tokio::task::yield_now().await;
    }

    let filtered = pipeline.view("app", "error");
    assert!(matches!(filtered.index_error, Some(IndexError::Unavailable)));
    assert_messages!(filtered.view, ["Database connection ERROR"]);
    assert_spans!(filtered.view.rows[0], "message", [(20, 25)]);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_results_are_a_subset_of_the_store(
        words in proptest::collection::vec("[a-z]{1,6}", 1..20),
        query in "[a-z]{1,3}",
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let pipeline = indexed_pipeline(8);
            let entries = words
                .iter()
                .enumerate()
                .map(|(i, word)| LogEntryBuilder::new(format!("{word} event")).at_ms(BASE_MS + i as i64).build());
            ingest_all(&pipeline, entries).await;

            let stored: HashSet<String> = pipeline.store().get_all("app").iter().map(|e| e.message.clone()).collect();
            let found = messages(&pipeline.view("app", &query).view);
            prop_assert!(found.is_subset(&stored));
            Ok(())
        })?;
    }
}
