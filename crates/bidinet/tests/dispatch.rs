use std::io::{BufRead, BufReader};
use std::sync::Arc;

use bidinet::{NetworkSessionBuilder, RequestInfo, ResponseInfo, SessionConfig, TransportEvent};
use bidinet_core::memory::MemoryChannel;
use bidinet_core::CommandError;
use bidinet_observe::VecEventSink;
use bidinet_policy::{NavigableId, StaticContextTree, UserContextId};
use bytes::Bytes;
use serde_json::{json, Value};

fn context_tree() -> Arc<StaticContextTree> {
    let mut tree = StaticContextTree::new();
    tree.add_top_level(NavigableId::new("top"), UserContextId::new("default"));
    Arc::new(tree)
}

#[tokio::test]
async fn dispatch_round_trips_intercept_commands() {
    let session = NetworkSessionBuilder::new(SessionConfig::default(), context_tree())
        .build()
        .expect("session");

    let added = session
        .dispatch(
            "network.addIntercept",
            json!({
                "phases": ["beforeRequestSent"],
                "urlPatterns": [{"type": "string", "pattern": "https://example.com/*"}]
            }),
        )
        .await
        .expect("addIntercept");
    let Some(intercept) = added.get("intercept").and_then(Value::as_str) else {
        panic!("addIntercept returns an intercept id, got {added}");
    };

    let removed = session
        .dispatch("network.removeIntercept", json!({ "intercept": intercept }))
        .await
        .expect("removeIntercept");
    assert_eq!(removed, json!({}));

    let Err(error) = session
        .dispatch("network.removeIntercept", json!({ "intercept": intercept }))
        .await
    else {
        panic!("second removal must fail");
    };
    assert_eq!(error.code(), "no such intercept");
}

#[tokio::test]
async fn dispatch_reports_malformed_and_unknown_commands() {
    let session = NetworkSessionBuilder::new(SessionConfig::default(), context_tree())
        .build()
        .expect("session");

    let Err(malformed) = session
        .dispatch("network.addIntercept", json!({ "phases": "beforeRequestSent" }))
        .await
    else {
        panic!("phases must be an array");
    };
    assert!(matches!(malformed, CommandError::InvalidArgument(_)));

    let Err(empty_phases) = session
        .dispatch("network.addIntercept", json!({ "phases": [] }))
        .await
    else {
        panic!("phases must not be empty");
    };
    assert_eq!(empty_phases.code(), "invalid argument");

    let Err(unknown) = session.dispatch("network.bogus", json!({})).await else {
        panic!("unknown command");
    };
    assert_eq!(unknown.code(), "unknown command");

    let Err(missing) = session
        .dispatch("network.failRequest", json!({ "request": "42" }))
        .await
    else {
        panic!("unknown request");
    };
    assert_eq!(missing.code(), "no such request");
}

#[tokio::test]
async fn dispatch_get_data_returns_bytes_value() {
    let events = VecEventSink::default();
    let session = NetworkSessionBuilder::new(SessionConfig::default(), context_tree())
        .with_event_sink(Arc::new(events.clone()))
        .build()
        .expect("session");
    let added = session
        .dispatch(
            "network.addDataCollector",
            json!({ "dataTypes": ["response"], "maxEncodedDataSize": 1000 }),
        )
        .await
        .expect("addDataCollector");
    let collector = added["collector"].clone();

    let channel = Arc::new(MemoryChannel::new().with_body(Bytes::from_static(&[0xff, 0x00])));
    let processor = session.event_processor();
    let request = RequestInfo::new("7", "https://example.com/bin", "GET").with_context("top");
    processor.process(TransportEvent::ResponseStarted {
        request: request.clone(),
        response: ResponseInfo::new("https://example.com/bin", 200, "OK"),
        channel: channel.clone(),
        response_channel: channel.clone(),
    });
    let outcome = processor.process(TransportEvent::ResponseCompleted {
        request,
        response: ResponseInfo::new("https://example.com/bin", 200, "OK"),
        response_channel: channel.clone(),
        redirect: false,
    });
    outcome
        .collection
        .expect("collection task")
        .await
        .expect("join");
    assert!(events.snapshot().is_empty());

    let data = session
        .dispatch(
            "network.getData",
            json!({ "request": "7", "dataType": "response", "collector": collector, "disown": true }),
        )
        .await
        .expect("getData");
    assert_eq!(data, json!({ "bytes": { "type": "base64", "value": "/wA=" } }));

    let Err(gone) = session
        .dispatch("network.getData", json!({ "request": "7", "dataType": "response" }))
        .await
    else {
        panic!("disowning the only collector drops the data");
    };
    assert_eq!(gone.code(), "no such network data");
}

#[tokio::test]
async fn event_log_records_emitted_events() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log_path = dir.path().join("network-events.jsonl");
    let mut config = SessionConfig::default();
    config.events.log_path = Some(log_path.clone());
    let session = NetworkSessionBuilder::new(config, context_tree())
        .build()
        .expect("session");
    session
        .subscribe(&["network.beforeRequestSent".to_string()], None)
        .expect("subscribe");

    let channel = Arc::new(MemoryChannel::new());
    let outcome = session
        .event_processor()
        .process(TransportEvent::BeforeRequestSent {
            request: RequestInfo::new("1", "https://example.com/", "GET")
                .with_context("top")
                .with_headers(&[("Cookie", "a=1; b=2")]),
            channel,
        });
    assert!(outcome.emitted);
    drop(session);

    let file = std::fs::File::open(&log_path).expect("event log");
    let lines: Vec<Value> = BufReader::new(file)
        .lines()
        .map(|line| serde_json::from_str(&line.expect("line")).expect("json"))
        .collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["method"], "network.beforeRequestSent");
    assert_eq!(lines[0]["params"]["request"]["cookies"][1]["name"], "b");
    assert_eq!(lines[0]["params"]["isBlocked"], false);
}
