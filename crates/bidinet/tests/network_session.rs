use std::sync::Arc;

use bidinet::{
    EventProcessor, NetworkSession, NetworkSessionBuilder, ProcessOutcome, RequestInfo,
    ResponseInfo, SessionConfig, TransportEvent,
};
use bidinet_core::memory::{ChannelOp, MemoryChannel};
use bidinet_core::{
    AddDataCollectorParams, AddInterceptParams, CacheBehavior, CacheControl, ChannelError,
    CollectorType, CommandError, ContinueRequestParams, ContinueWithAuthAction,
    ContinueWithAuthParams, DataType, GetDataParams,
    ResumeAction, SetCacheBehaviorParams,
};
use bidinet_http::BytesValue;
use bidinet_observe::{NetworkEventKind, VecEventSink};
use bidinet_policy::{
    CollectorId, InterceptPhase, NavigableId, RequestId, StaticContextTree, UrlPatternSpec,
    UserContextId,
};
use bytes::Bytes;
use parking_lot::Mutex;

struct Harness {
    session: NetworkSession,
    processor: EventProcessor,
    events: VecEventSink,
}

fn context_tree() -> StaticContextTree {
    let mut tree = StaticContextTree::new();
    tree.add_top_level(NavigableId::new("top"), UserContextId::new("default"));
    assert!(tree.add_child(NavigableId::new("frame"), &NavigableId::new("top")));
    tree.add_top_level(NavigableId::new("other-top"), UserContextId::new("default"));
    tree
}

fn harness_with(config: SessionConfig) -> Harness {
    let events = VecEventSink::default();
    let session = NetworkSessionBuilder::new(config, Arc::new(context_tree()))
        .with_event_sink(Arc::new(events.clone()))
        .build()
        .expect("session");
    let processor = session.event_processor();
    Harness {
        session,
        processor,
        events,
    }
}

fn harness() -> Harness {
    let harness = harness_with(SessionConfig::default());
    harness
        .session
        .subscribe(&["network".to_string()], None)
        .expect("subscribe");
    harness
}

fn request(id: &str, url: &str) -> RequestInfo {
    RequestInfo::new(id, url, "GET").with_context("frame")
}

fn before_request_sent(
    harness: &Harness,
    id: &str,
    url: &str,
    channel: &Arc<MemoryChannel>,
) -> ProcessOutcome {
    harness.processor.process(TransportEvent::BeforeRequestSent {
        request: request(id, url),
        channel: channel.clone(),
    })
}

fn response_started(
    harness: &Harness,
    id: &str,
    url: &str,
    channel: &Arc<MemoryChannel>,
) -> ProcessOutcome {
    harness.processor.process(TransportEvent::ResponseStarted {
        request: request(id, url),
        response: ResponseInfo::new(url, 200, "OK"),
        channel: channel.clone(),
        response_channel: channel.clone(),
    })
}

fn response_completed(
    harness: &Harness,
    id: &str,
    url: &str,
    channel: &Arc<MemoryChannel>,
) -> ProcessOutcome {
    harness.processor.process(TransportEvent::ResponseCompleted {
        request: request(id, url),
        response: ResponseInfo::new(url, 200, "OK"),
        response_channel: channel.clone(),
        redirect: false,
    })
}

fn intercept_example_com(harness: &Harness, phase: InterceptPhase) {
    harness
        .session
        .add_intercept(AddInterceptParams {
            contexts: None,
            phases: vec![phase],
            url_patterns: vec![UrlPatternSpec::string("*://example.com/*")],
        })
        .expect("add intercept");
}

fn add_collector(harness: &Harness, max_encoded_data_size: u64) -> CollectorId {
    harness
        .session
        .add_data_collector(AddDataCollectorParams {
            data_types: vec![DataType::Response],
            max_encoded_data_size,
            collector_type: CollectorType::Blob,
            contexts: None,
            user_contexts: None,
        })
        .expect("add collector")
        .collector
}

fn get_data_params(id: &str) -> GetDataParams {
    GetDataParams {
        request: RequestId::new(id),
        data_type: DataType::Response,
        collector: None,
        disown: None,
    }
}

async fn collect(harness: &Harness, id: &str, body: &'static [u8]) {
    let channel = Arc::new(MemoryChannel::new().with_body(Bytes::from_static(body)));
    response_started(harness, id, "https://example.com/data", &channel);
    let outcome = response_completed(harness, id, "https://example.com/data", &channel);
    let Some(collection) = outcome.collection else {
        panic!("response body should be collected");
    };
    collection.await.expect("collection task");
}

#[tokio::test]
async fn matching_intercept_blocks_and_reports_its_id() {
    let harness = harness();
    let intercept = harness
        .session
        .add_intercept(AddInterceptParams {
            contexts: None,
            phases: vec![InterceptPhase::BeforeRequestSent],
            url_patterns: vec![UrlPatternSpec::string("*://example.com/*")],
        })
        .expect("add intercept")
        .intercept;

    let blocked_channel = Arc::new(MemoryChannel::new());
    let blocked = before_request_sent(&harness, "1", "https://example.com/a", &blocked_channel);
    assert!(blocked.is_blocked());
    assert!(matches!(
        blocked_channel.ops().as_slice(),
        [ChannelOp::Suspend(marker)] if marker.contains("beforeRequestSent")
    ));

    let passing_channel = Arc::new(MemoryChannel::new());
    let passing = before_request_sent(&harness, "2", "https://other.com/a", &passing_channel);
    assert!(!passing.is_blocked());
    assert!(passing_channel.ops().is_empty());

    let events = harness.events.take();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, NetworkEventKind::BeforeRequestSent);
    assert_eq!(events[0].top_context, NavigableId::new("top"));
    assert!(events[0].is_blocked());
    assert_eq!(events[0].params.base.intercepts, Some(vec![intercept]));
    assert!(!events[1].is_blocked());
    assert_eq!(events[1].params.base.intercepts, None);
    assert_eq!(harness.session.blocked_request_count(), 1);
}

#[tokio::test]
async fn intercepts_without_listeners_do_not_block() {
    let harness = harness_with(SessionConfig::default());
    intercept_example_com(&harness, InterceptPhase::BeforeRequestSent);
    let channel = Arc::new(MemoryChannel::new());

    let outcome = before_request_sent(&harness, "1", "https://example.com/a", &channel);
    assert!(!outcome.is_blocked());
    assert!(!outcome.emitted);
    assert!(harness.events.snapshot().is_empty());
}

#[tokio::test]
async fn requests_without_a_known_navigable_are_ignored() {
    let harness = harness();
    intercept_example_com(&harness, InterceptPhase::BeforeRequestSent);
    let channel = Arc::new(MemoryChannel::new());

    let outcome = harness.processor.process(TransportEvent::BeforeRequestSent {
        request: RequestInfo::new("1", "https://example.com/a", "GET").with_context("gone"),
        channel: channel.clone(),
    });
    assert!(!outcome.emitted);
    assert!(!outcome.is_blocked());
}

#[tokio::test]
async fn continue_request_resolves_completion_and_rejects_second_call() {
    let harness = harness();
    intercept_example_com(&harness, InterceptPhase::BeforeRequestSent);
    let channel = Arc::new(MemoryChannel::new());
    let outcome = before_request_sent(&harness, "1", "https://example.com/a", &channel);
    let Some(completion) = outcome.blocked else {
        panic!("request should be blocked");
    };

    let params = ContinueRequestParams {
        request: RequestId::new("1"),
        ..Default::default()
    };
    harness.session.continue_request(params.clone()).expect("continue");
    assert_eq!(completion.await, Ok(ResumeAction::Resume));
    assert!(matches!(
        harness.session.continue_request(params),
        Err(CommandError::NoSuchRequest(_))
    ));
    let metrics = harness.session.metrics();
    assert_eq!(metrics.requests_blocked, 1);
    assert_eq!(metrics.requests_resumed, 1);
}

#[tokio::test]
async fn client_redirect_swallows_the_next_before_request_sent() {
    let harness = harness();
    intercept_example_com(&harness, InterceptPhase::BeforeRequestSent);
    let channel = Arc::new(MemoryChannel::new());
    before_request_sent(&harness, "1", "https://example.com/a", &channel);

    harness
        .session
        .continue_request(ContinueRequestParams {
            request: RequestId::new("1"),
            url: Some("https://elsewhere.test/b".to_string()),
            ..Default::default()
        })
        .expect("continue with url");
    harness.events.take();

    let echo = before_request_sent(&harness, "1", "https://example.com/a", &channel);
    assert!(echo.suppressed);
    assert!(!echo.emitted);

    let next = before_request_sent(&harness, "1", "https://example.com/a", &channel);
    assert!(!next.suppressed);
    assert!(next.is_blocked());
}

#[tokio::test]
async fn unblocked_auth_prompt_is_forwarded() {
    let harness = harness();
    let channel = Arc::new(MemoryChannel::new());
    let outcome = harness.processor.process(TransportEvent::AuthRequired {
        request: request("1", "https://example.com/a"),
        response: ResponseInfo::new("https://example.com/a", 401, "Unauthorized")
            .with_headers(&[("WWW-Authenticate", "Basic realm=\"test\"")]),
        channel: channel.clone(),
        response_channel: channel.clone(),
        prompt: channel.clone(),
    });
    assert!(outcome.emitted);
    assert!(!outcome.is_blocked());
    assert_eq!(channel.ops(), vec![ChannelOp::ForwardPrompt]);

    let events = harness.events.take();
    let Some(response) = &events[0].params.response else {
        panic!("authRequired carries a response");
    };
    let Some(challenges) = &response.auth_challenges else {
        panic!("401 response carries auth challenges");
    };
    assert_eq!(challenges[0].scheme, "Basic");
    assert_eq!(challenges[0].realm.as_deref(), Some("test"));
}

#[tokio::test]
async fn get_data_waits_for_pending_collection() {
    let harness = harness();
    add_collector(&harness, 1_000);
    let channel = Arc::new(MemoryChannel::new());
    response_started(&harness, "1", "https://example.com/data", &channel);
    let outcome = response_completed(&harness, "1", "https://example.com/data", &channel);

    let session = harness.session.clone();
    let pending = tokio::spawn(async move { session.get_data(get_data_params("1")).await });
    tokio::task::yield_now().await;
    channel.complete_body(Ok(Bytes::from_static(b"hello")));

    let Some(collection) = outcome.collection else {
        panic!("collection should be spawned");
    };
    collection.await.expect("collection task");
    let result = pending.await.expect("get_data task").expect("data");
    assert_eq!(result.bytes, BytesValue::string("hello"));
    assert_eq!(harness.session.metrics().bodies_collected, 1);
}

#[tokio::test]
async fn get_data_on_unknown_request_is_no_such_network_data() {
    let harness = harness();
    add_collector(&harness, 1_000);
    assert!(matches!(
        harness.session.get_data(get_data_params("missing")).await,
        Err(CommandError::NoSuchNetworkData(_))
    ));
}

#[tokio::test]
async fn budget_evicts_oldest_collected_body() {
    let mut config = SessionConfig::default();
    config.data.max_total_size = 100;
    let harness = harness_with(config);
    add_collector(&harness, 100);

    collect(&harness, "a", &[b'a'; 60]).await;
    collect(&harness, "b", &[b'b'; 30]).await;
    collect(&harness, "c", &[b'c'; 50]).await;

    assert!(matches!(
        harness.session.get_data(get_data_params("a")).await,
        Err(CommandError::UnavailableNetworkData(_))
    ));
    assert!(harness.session.get_data(get_data_params("b")).await.is_ok());
    assert!(harness.session.get_data(get_data_params("c")).await.is_ok());
    assert_eq!(harness.session.collected_data_size(), 80);
    assert_eq!(harness.session.metrics().bodies_evicted, 1);
}

#[tokio::test]
async fn body_read_failure_leaves_no_data() {
    let harness = harness();
    add_collector(&harness, 1_000);
    let channel = Arc::new(MemoryChannel::new());
    channel.complete_body(Err(ChannelError::BodyUnavailable("reset".to_string())));
    response_started(&harness, "1", "https://example.com/data", &channel);
    let outcome = response_completed(&harness, "1", "https://example.com/data", &channel);
    outcome
        .collection
        .expect("collection task")
        .await
        .expect("join");

    assert!(matches!(
        harness.session.get_data(get_data_params("1")).await,
        Err(CommandError::NoSuchNetworkData(_))
    ));
    assert_eq!(harness.session.metrics().collection_failures, 1);
}

#[tokio::test]
async fn fetch_error_discards_pending_collection() {
    let harness = harness();
    add_collector(&harness, 1_000);
    let channel = Arc::new(MemoryChannel::new());
    response_started(&harness, "1", "https://example.com/data", &channel);

    let outcome = harness.processor.process(TransportEvent::FetchError {
        request: request("1", "https://example.com/data"),
        error_text: "NS_ERROR_NET_RESET".to_string(),
    });
    assert!(outcome.emitted);
    assert!(matches!(
        harness.session.get_data(get_data_params("1")).await,
        Err(CommandError::NoSuchNetworkData(_))
    ));
    let events = harness.events.take();
    let Some(last) = events.last() else {
        panic!("fetchError should be emitted");
    };
    assert_eq!(last.params.error_text.as_deref(), Some("NS_ERROR_NET_RESET"));
}

#[tokio::test]
async fn ending_the_session_releases_blocked_requests() {
    let harness = harness();
    intercept_example_com(&harness, InterceptPhase::BeforeRequestSent);
    intercept_example_com(&harness, InterceptPhase::AuthRequired);
    let plain = Arc::new(MemoryChannel::new());
    let auth = Arc::new(MemoryChannel::new());
    before_request_sent(&harness, "1", "https://example.com/a", &plain);
    let outcome = harness.processor.process(TransportEvent::AuthRequired {
        request: request("2", "https://example.com/b"),
        response: ResponseInfo::new("https://example.com/b", 401, "Unauthorized"),
        channel: auth.clone(),
        response_channel: auth.clone(),
        prompt: auth.clone(),
    });
    assert!(outcome.is_blocked());

    assert_eq!(harness.session.end(), 2);
    assert_eq!(harness.session.blocked_request_count(), 0);
    assert_eq!(plain.ops().last(), Some(&ChannelOp::Resume));
    assert_eq!(auth.ops(), vec![ChannelOp::ForwardPrompt, ChannelOp::Resume]);

    let after = before_request_sent(&harness, "3", "https://example.com/c", &plain);
    assert!(!after.is_blocked());
    assert!(!after.emitted);
}

#[tokio::test]
async fn auth_blocked_request_is_not_suspended() {
    let harness = harness();
    intercept_example_com(&harness, InterceptPhase::AuthRequired);
    let channel = Arc::new(MemoryChannel::new());
    let outcome = harness.processor.process(TransportEvent::AuthRequired {
        request: request("1", "https://example.com/private"),
        response: ResponseInfo::new("https://example.com/private", 401, "Unauthorized"),
        channel: channel.clone(),
        response_channel: channel.clone(),
        prompt: channel.clone(),
    });
    assert!(outcome.is_blocked());
    assert!(channel.ops().is_empty());

    harness
        .session
        .continue_with_auth(ContinueWithAuthParams {
            request: RequestId::new("1"),
            action: ContinueWithAuthAction::Cancel,
            credentials: None,
        })
        .expect("continue with auth");

    let ops = channel.ops();
    assert_eq!(ops, vec![ChannelOp::CancelPrompt]);
    let suspended = ops
        .iter()
        .filter(|op| matches!(op, ChannelOp::Suspend(_)))
        .count();
    let resumed = ops.iter().filter(|op| **op == ChannelOp::Resume).count();
    assert_eq!(suspended, resumed);
    assert_eq!(harness.session.blocked_request_count(), 0);
}

#[tokio::test]
async fn requests_without_interception_support_are_never_blocked() {
    let harness = harness();
    intercept_example_com(&harness, InterceptPhase::BeforeRequestSent);
    intercept_example_com(&harness, InterceptPhase::ResponseStarted);
    let channel = Arc::new(MemoryChannel::new());

    let sent = harness.processor.process(TransportEvent::BeforeRequestSent {
        request: request("1", "https://example.com/a").with_supports_interception(false),
        channel: channel.clone(),
    });
    let started = harness.processor.process(TransportEvent::ResponseStarted {
        request: request("1", "https://example.com/a").with_supports_interception(false),
        response: ResponseInfo::new("https://example.com/a", 200, "OK"),
        channel: channel.clone(),
        response_channel: channel.clone(),
    });

    assert!(sent.emitted && !sent.is_blocked());
    assert!(started.emitted && !started.is_blocked());
    assert!(channel.ops().is_empty());
    assert_eq!(harness.session.blocked_request_count(), 0);
    let events = harness.events.take();
    assert_eq!(events.len(), 2);
    for event in &events {
        assert!(!event.is_blocked());
        assert_eq!(event.params.base.intercepts, None);
    }
}

#[derive(Default)]
struct RecordingCacheControl {
    updates: Mutex<Vec<(CacheBehavior, Option<Vec<NavigableId>>)>>,
}

impl CacheControl for RecordingCacheControl {
    fn apply(
        &self,
        behavior: CacheBehavior,
        contexts: Option<&[NavigableId]>,
    ) -> Result<(), ChannelError> {
        self.updates
            .lock()
            .push((behavior, contexts.map(<[NavigableId]>::to_vec)));
        Ok(())
    }
}

#[tokio::test]
async fn cache_behavior_is_tracked_and_forwarded() {
    let cache_control = Arc::new(RecordingCacheControl::default());
    let session = NetworkSessionBuilder::new(SessionConfig::default(), Arc::new(context_tree()))
        .with_cache_control(cache_control.clone())
        .build()
        .expect("session");

    session
        .set_cache_behavior(SetCacheBehaviorParams {
            cache_behavior: CacheBehavior::Bypass,
            contexts: Some(vec![NavigableId::new("top")]),
        })
        .expect("set cache behavior");
    assert_eq!(session.cache_behavior_for(&NavigableId::new("top")), CacheBehavior::Bypass);
    assert_eq!(
        session.cache_behavior_for(&NavigableId::new("other-top")),
        CacheBehavior::Default
    );
    assert_eq!(
        cache_control.updates.lock().as_slice(),
        &[(CacheBehavior::Bypass, Some(vec![NavigableId::new("top")]))]
    );

    assert!(matches!(
        session.set_cache_behavior(SetCacheBehaviorParams {
            cache_behavior: CacheBehavior::Bypass,
            contexts: Some(vec![NavigableId::new("frame")]),
        }),
        Err(CommandError::InvalidArgument(_))
    ));
    assert_eq!(cache_control.updates.lock().len(), 1);
}

#[tokio::test]
async fn context_scoped_subscription_only_sees_its_navigable() {
    let harness = harness_with(SessionConfig::default());
    harness
        .session
        .subscribe(
            &["network.beforeRequestSent".to_string()],
            Some(&[NavigableId::new("frame")][..]),
        )
        .expect("subscribe");
    let channel = Arc::new(MemoryChannel::new());

    assert!(before_request_sent(&harness, "1", "https://example.com/a", &channel).emitted);
    let elsewhere = harness.processor.process(TransportEvent::BeforeRequestSent {
        request: RequestInfo::new("2", "https://example.com/a", "GET").with_context("other-top"),
        channel: channel.clone(),
    });
    assert!(!elsewhere.emitted);
    assert!(matches!(
        harness
            .session
            .subscribe(&["network.unknown".to_string()], None),
        Err(CommandError::InvalidArgument(_))
    ));
}
