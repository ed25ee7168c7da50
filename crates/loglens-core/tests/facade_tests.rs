#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{lens_with, RecordingSink, ENDPOINT};
use loglens_core::loglens_core_types::schema::REDACTED;
use loglens_core::{
    init_loglens, loglens, CollectorConfig, FixedClock, FlushOutcome, LogDetails, LogLens,
    LogLevel, RequestInfo, TraceId, ZoneContext,
};
use serde_json::json;

fn lens() -> LogLens {
    lens_with(Arc::new(RecordingSink::default()), CollectorConfig::default())
}

#[test]
fn test_entries_outside_a_zone_have_no_trace_id() {
    let lens = lens();
    lens.info("starting up");

    let entry = &lens.get_logs()[0];
    assert_eq!(entry.level, LogLevel::Info);
    assert_eq!(entry.logger, "loglens");
    assert!(entry.trace_id.is_none());
}

#[test]
fn test_entries_inside_a_zone_carry_its_trace_id() {
    let lens = lens();

    lens.zone().run(ZoneContext::new().with_trace_id("trace-abc"), || {
        lens.warn("slow response");
        lens.error("gave up");
    });

    let logs = lens.get_logs();
    assert_eq!(logs[0].level, LogLevel::Warn);
    assert_eq!(logs[1].level, LogLevel::Error);
    assert!(logs.iter().all(|e| e.trace_id == Some(TraceId::from("trace-abc"))));
}

#[test]
fn test_timestamps_come_from_the_injected_clock() {
    let at = DateTime::parse_from_rfc3339("2024-01-02T03:04:05.678Z")
        .unwrap()
        .with_timezone(&Utc);
    let lens = LogLens::builder()
        .sink(Arc::new(RecordingSink::default()))
        .clock(Arc::new(FixedClock(at)))
        .build()
        .unwrap();

    lens.info("tick");

    let json = serde_json::to_value(&lens.get_logs()[0]).unwrap();
    assert_eq!(json["timestamp"], "2024-01-02T03:04:05.678Z");
    assert_eq!(json["level"], "INFO");
    assert_eq!(json["layer"], "FRONT");
    assert!(json["traceId"].is_null());
}

#[test]
fn test_error_from_records_source_chain() {
    let lens = lens();
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer hung up");
    let wrapped = loglens_core::LogLensError::Io {
        path: "/tmp/x".to_string(),
        reason: io.to_string(),
    };

    lens.error_from(&wrapped);

    let entry = &lens.get_logs()[0];
    assert_eq!(entry.level, LogLevel::Error);
    assert!(entry.message.starts_with("IO error on /tmp/x: peer hung up"));
}

#[test]
fn test_log_with_masks_request_and_response() {
    let lens = lens();
    let request = RequestInfo::new("POST", "/session")
        .with_header("Cookie", "sid=1")
        .with_body(json!({"email": "a@b.c", "password": "pw"}));

    lens.log_with(
        LogLevel::Info,
        "login attempt",
        LogDetails {
            logger: Some("auth".to_string()),
            request: Some(request),
            response: Some(json!({"token": "t0k3n", "ok": true})),
        },
    );

    let entry = &lens.get_logs()[0];
    assert_eq!(entry.logger, "auth");
    let request = entry.request.as_ref().unwrap();
    assert_eq!(request.headers["Cookie"], REDACTED);
    assert_eq!(request.body.as_ref().unwrap()["email"], "a@b.c");
    assert_eq!(request.body.as_ref().unwrap()["password"], REDACTED);
    assert_eq!(entry.response.as_ref().unwrap()["token"], REDACTED);
    assert_eq!(entry.response.as_ref().unwrap()["ok"], true);
}

#[tokio::test]
async fn test_send_and_flush_delegate_to_the_buffer() {
    let sink = Arc::new(RecordingSink::default());
    let lens = lens_with(sink.clone(), CollectorConfig::default().with_endpoint(ENDPOINT));

    lens.info("one");
    assert_eq!(lens.send().await, FlushOutcome::Delivered(1));

    lens.info("two");
    assert_eq!(lens.flush().await, FlushOutcome::Delivered(1));
    assert_eq!(sink.calls(), 2);

    lens.info("three");
    lens.clear();
    assert!(lens.get_logs().is_empty());
    assert_eq!(lens.flush().await, FlushOutcome::Empty);
}

#[test]
fn test_reinit_keeps_entries_and_applies_new_limits() {
    let lens = lens();
    for i in 0..5 {
        lens.info(format!("m{}", i));
    }

    lens.init(CollectorConfig::default().with_max_logs(2)).unwrap();
    lens.init(CollectorConfig::default().with_max_logs(2)).unwrap();

    let messages: Vec<String> = lens.get_logs().into_iter().map(|e| e.message).collect();
    assert_eq!(messages, vec!["m3", "m4"]);
    assert!(lens.zone().is_enabled());
}

#[test]
fn test_builder_rejects_invalid_config() {
    let result = LogLens::builder()
        .sink(Arc::new(RecordingSink::default()))
        .config(CollectorConfig::default().with_max_logs(0))
        .build();

    assert!(result.is_err());
}

#[test]
fn test_global_instance() {
    let first = init_loglens(CollectorConfig::default()).unwrap();
    first.info("global hello");

    let again = init_loglens(CollectorConfig::default().with_max_logs(50)).unwrap();
    assert!(std::ptr::eq(first, again));
    assert_eq!(again.buffer().config().max_logs, 50);

    let handle = loglens().unwrap();
    assert!(handle
        .get_logs()
        .iter()
        .any(|e| e.message == "global hello"));
}
