#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FailingSink, GatedSink, RecordingSink, ENDPOINT};
use loglens_core::loglens_core_types::schema::REDACTED;
use loglens_core::{
    CollectorConfig, FlushOutcome, LensErrorKind, LogBuffer, LogEntry, LogLensError, LogLevel,
    RequestInfo,
};
use proptest::prelude::*;
use serde_json::json;

fn entry(message: &str) -> LogEntry {
    LogEntry::new(LogLevel::Info, "buffer_tests", message)
}

fn messages(entries: &[LogEntry]) -> Vec<String> {
    entries.iter().map(|e| e.message.clone()).collect()
}

fn manual(endpoint: &str) -> CollectorConfig {
    CollectorConfig::default().with_endpoint(endpoint)
}

#[test]
fn test_oldest_entries_are_evicted_beyond_max_logs() {
    let buffer = LogBuffer::with_config(
        CollectorConfig::default().with_max_logs(3),
        Arc::new(RecordingSink::default()),
    )
    .unwrap();

    for i in 1..=5 {
        buffer.add_log(entry(&format!("m{}", i)));
    }

    assert_eq!(buffer.len(), 3);
    assert_eq!(messages(&buffer.get_logs()), vec!["m3", "m4", "m5"]);
}

#[test]
fn test_get_logs_is_an_independent_snapshot() {
    let buffer = LogBuffer::new(Arc::new(RecordingSink::default()));
    buffer.add_log(entry("first"));

    let mut snapshot = buffer.get_logs();
    snapshot[0].message = "tampered".to_string();
    snapshot.push(entry("extra"));

    assert_eq!(messages(&buffer.get_logs()), vec!["first"]);
}

#[test]
fn test_clear_drops_everything_without_sending() {
    let sink = Arc::new(RecordingSink::default());
    let buffer = LogBuffer::with_config(manual(ENDPOINT), sink.clone()).unwrap();
    buffer.add_log(entry("a"));
    buffer.add_log(entry("b"));

    buffer.clear();

    assert!(buffer.is_empty());
    assert_eq!(sink.calls(), 0);
}

#[test]
fn test_masking_is_applied_when_entries_are_added() {
    let buffer = LogBuffer::new(Arc::new(RecordingSink::default()));
    let request = RequestInfo::new("POST", "/login")
        .with_header("Authorization", "Bearer abc")
        .with_body(json!({"user": "ada", "password": "hunter2"}));

    buffer.add_log(entry("login").with_request(request));

    let stored = &buffer.get_logs()[0];
    let request = stored.request.as_ref().unwrap();
    assert_eq!(request.headers["Authorization"], REDACTED);
    assert_eq!(request.body.as_ref().unwrap()["password"], REDACTED);
    assert_eq!(request.body.as_ref().unwrap()["user"], "ada");
}

#[test]
fn test_init_rejects_invalid_config_and_keeps_previous() {
    let buffer = LogBuffer::with_config(
        CollectorConfig::default().with_max_logs(10),
        Arc::new(RecordingSink::default()),
    )
    .unwrap();

    let err = buffer
        .init(CollectorConfig::default().with_max_logs(0))
        .unwrap_err();

    assert!(matches!(err, LogLensError::InvalidConfig { ref field, .. } if field == "maxLogs"));
    assert_eq!(buffer.config().max_logs, 10);
}

#[test]
fn test_reinit_trims_to_smaller_max_logs() {
    let buffer = LogBuffer::new(Arc::new(RecordingSink::default()));
    for i in 0..6 {
        buffer.add_log(entry(&format!("m{}", i)));
    }

    buffer
        .init(CollectorConfig::default().with_max_logs(2))
        .unwrap();

    assert_eq!(messages(&buffer.get_logs()), vec!["m4", "m5"]);
}

#[tokio::test]
async fn test_flush_of_empty_buffer_makes_no_call() {
    let sink = Arc::new(RecordingSink::default());
    let buffer = LogBuffer::with_config(manual(ENDPOINT), sink.clone()).unwrap();

    assert_eq!(buffer.flush().await, FlushOutcome::Empty);
    assert_eq!(sink.calls(), 0);
}

#[tokio::test]
async fn test_successful_flush_delivers_in_order_and_clears() {
    let sink = Arc::new(RecordingSink::default());
    let buffer = LogBuffer::with_config(manual(ENDPOINT), sink.clone()).unwrap();
    buffer.add_log(entry("one"));
    buffer.add_log(entry("two"));
    buffer.add_log(entry("three"));

    let outcome = buffer.flush().await;

    assert_eq!(outcome, FlushOutcome::Delivered(3));
    assert!(outcome.is_delivered());
    assert!(buffer.is_empty());
    let deliveries = sink.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, ENDPOINT);
    assert_eq!(messages(&deliveries[0].1), vec!["one", "two", "three"]);
}

#[tokio::test]
async fn test_failed_flush_retains_every_entry() {
    let sink = Arc::new(FailingSink::default());
    let buffer = LogBuffer::with_config(manual(ENDPOINT), sink.clone()).unwrap();
    buffer.add_log(entry("a"));
    buffer.add_log(entry("b"));

    match buffer.flush().await {
        FlushOutcome::Retained { retained, error } => {
            assert_eq!(retained, 2);
            assert_eq!(error.kind(), LensErrorKind::Transport);
            assert_eq!(error.endpoint(), Some(ENDPOINT));
        }
        other => panic!("expected Retained, got {:?}", other),
    }

    assert_eq!(messages(&buffer.get_logs()), vec!["a", "b"]);
    assert_eq!(sink.attempts(), 1);
}

#[tokio::test]
async fn test_flush_without_endpoint_keeps_entries() {
    let sink = Arc::new(RecordingSink::default());
    let buffer = LogBuffer::new(sink.clone());
    buffer.add_log(entry("orphan"));

    match buffer.send().await {
        FlushOutcome::Retained { retained, error } => {
            assert_eq!(retained, 1);
            assert_eq!(error.kind(), LensErrorKind::MissingEndpoint);
        }
        other => panic!("expected Retained, got {:?}", other),
    }
    assert_eq!(buffer.len(), 1);
    assert_eq!(sink.calls(), 0);
}

#[tokio::test]
async fn test_entries_added_during_flush_survive_it() {
    let sink = Arc::new(GatedSink::default());
    let buffer = LogBuffer::with_config(manual(ENDPOINT), sink.clone()).unwrap();
    buffer.add_log(entry("before-1"));
    buffer.add_log(entry("before-2"));

    let flushing = tokio::spawn({
        let buffer = buffer.clone();
        async move { buffer.flush().await }
    });

    sink.started.notified().await;
    buffer.add_log(entry("during"));
    sink.release.notify_one();

    assert_eq!(flushing.await.unwrap(), FlushOutcome::Delivered(2));
    assert_eq!(messages(&buffer.get_logs()), vec!["during"]);
    assert_eq!(
        messages(&sink.inner.delivered_entries()),
        vec!["before-1", "before-2"]
    );
}

#[tokio::test]
async fn test_concurrent_flush_is_coalesced() {
    let sink = Arc::new(GatedSink::default());
    let buffer = LogBuffer::with_config(manual(ENDPOINT), sink.clone()).unwrap();
    buffer.add_log(entry("only"));

    let first = tokio::spawn({
        let buffer = buffer.clone();
        async move { buffer.flush().await }
    });
    sink.started.notified().await;

    assert_eq!(buffer.flush().await, FlushOutcome::Coalesced);

    sink.release.notify_one();
    assert_eq!(first.await.unwrap(), FlushOutcome::Delivered(1));
    assert_eq!(sink.inner.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timer_delivers_buffered_entries() {
    let sink = Arc::new(RecordingSink::default());
    let config = CollectorConfig::default().with_auto_flush(ENDPOINT, Duration::from_millis(100));
    let buffer = LogBuffer::with_config(config, sink.clone()).unwrap();
    buffer.add_log(entry("tick"));

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(messages(&sink.delivered_entries()), vec!["tick"]);
    assert!(buffer.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reinit_cancels_previous_timer() {
    let sink = Arc::new(RecordingSink::default());
    let old = "http://old.test/logs";
    let buffer = LogBuffer::with_config(
        CollectorConfig::default().with_auto_flush(old, Duration::from_millis(100)),
        sink.clone(),
    )
    .unwrap();

    buffer
        .init(CollectorConfig::default().with_auto_flush(ENDPOINT, Duration::from_millis(1000)))
        .unwrap();
    buffer.add_log(entry("late"));

    tokio::time::sleep(Duration::from_millis(550)).await;
    assert_eq!(sink.calls(), 0);

    tokio::time::sleep(Duration::from_millis(600)).await;
    let deliveries = sink.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, ENDPOINT);
}

#[tokio::test(start_paused = true)]
async fn test_timer_backs_off_after_failures() {
    let sink = Arc::new(FailingSink::default());
    let config = CollectorConfig::default().with_auto_flush(ENDPOINT, Duration::from_millis(100));
    let buffer = LogBuffer::with_config(config, sink.clone()).unwrap();
    buffer.add_log(entry("stuck"));

    tokio::time::sleep(Duration::from_millis(750)).await;

    // Attempts at 100ms, 300ms and 700ms; one per tick would be seven.
    let attempts = sink.attempts();
    assert!(attempts >= 2, "expected retries, got {}", attempts);
    assert!(attempts < 5, "expected backoff, got {}", attempts);
    assert_eq!(buffer.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_flush_ignores_backoff() {
    let sink = Arc::new(FailingSink::default());
    let config = CollectorConfig::default().with_auto_flush(ENDPOINT, Duration::from_millis(100));
    let buffer = LogBuffer::with_config(config, sink.clone()).unwrap();
    buffer.add_log(entry("stuck"));

    tokio::time::sleep(Duration::from_millis(120)).await;
    let before = sink.attempts();
    assert_eq!(before, 1);

    assert!(matches!(buffer.flush().await, FlushOutcome::Retained { .. }));
    assert_eq!(sink.attempts(), before + 1);
}

#[tokio::test]
async fn test_full_buffer_triggers_background_flush() {
    let sink = Arc::new(RecordingSink::default());
    let config = CollectorConfig::default()
        .with_auto_flush(ENDPOINT, Duration::from_secs(3600))
        .with_max_logs(3);
    let buffer = LogBuffer::with_config(config, sink.clone()).unwrap();

    for i in 0..3 {
        buffer.add_log(entry(&format!("m{}", i)));
    }

    for _ in 0..50 {
        if sink.calls() > 0 {
            break;
        }
        tokio::task::yield_now().await;
    }

    assert_eq!(messages(&sink.delivered_entries()), vec!["m0", "m1", "m2"]);
}

#[test]
fn test_auto_flush_without_runtime_starts_no_timer() {
    let config = CollectorConfig::default().with_auto_flush(ENDPOINT, Duration::from_millis(100));
    let buffer = LogBuffer::with_config(config, Arc::new(RecordingSink::default())).unwrap();

    buffer.add_log(entry("kept"));
    assert_eq!(buffer.len(), 1);
}

proptest! {
    #[test]
    fn prop_buffer_keeps_the_newest_max_logs(max_logs in 1usize..20, count in 0usize..60) {
        let buffer = LogBuffer::with_config(
            CollectorConfig::default().with_max_logs(max_logs),
            Arc::new(RecordingSink::default()),
        )
        .unwrap();

        for i in 0..count {
            buffer.add_log(entry(&i.to_string()));
        }

        let kept = buffer.get_logs();
        prop_assert_eq!(kept.len(), count.min(max_logs));
        let expected: Vec<String> = (count.saturating_sub(max_logs)..count)
            .map(|i| i.to_string())
            .collect();
        prop_assert_eq!(messages(&kept), expected);
    }
}
