use std::sync::Arc;

use bidinet_core::{
    AddDataCollectorParams, AddInterceptParams, BlockedRequestCoordinator, CacheBehavior,
    CacheBehaviorTable, CacheControl, CommandError, ContinueRequestParams,
    ContinueResponseParams, ContinueWithAuthParams, DataCollectorRegistry, DataQuery, DataRead,
    DisownDataParams, FailRequestParams, GetDataParams, ProvideResponseParams,
    RemoveDataCollectorParams, RemoveInterceptParams, RequestLifecycleTracker,
    SetCacheBehaviorParams,
};
use bidinet_http::BytesValue;
use bidinet_observe::{EventSink, ObserveError, SubscriptionRegistry};
use bidinet_policy::{CollectorId, ContextTree, InterceptId, InterceptRegistry, NavigableId};
use parking_lot::Mutex;
use serde::Serialize;

use crate::metrics::{NetworkMetrics, NetworkMetricsStore};
use crate::{EventProcessor, SessionConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddInterceptResult {
    pub intercept: InterceptId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddDataCollectorResult {
    pub collector: CollectorId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetDataResult {
    pub bytes: BytesValue,
}

pub(crate) struct SessionState {
    pub(crate) intercepts: InterceptRegistry,
    pub(crate) collectors: DataCollectorRegistry,
    pub(crate) blocked: BlockedRequestCoordinator,
    pub(crate) subscriptions: SubscriptionRegistry,
    pub(crate) lifecycle: RequestLifecycleTracker,
    pub(crate) cache: CacheBehaviorTable,
}

pub(crate) struct SessionShared {
    pub(crate) config: SessionConfig,
    pub(crate) contexts: Arc<dyn ContextTree>,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) cache_control: Arc<dyn CacheControl>,
    pub(crate) metrics: NetworkMetricsStore,
    pub(crate) state: Mutex<SessionState>,
}

/// Network interception state for one automation session.
///
/// Commands and transport events may arrive from any thread; all registries
/// live behind one session mutex that is never held across an await.
#[derive(Clone)]
pub struct NetworkSession {
    shared: Arc<SessionShared>,
}

impl NetworkSession {
    pub(crate) fn new(
        config: SessionConfig,
        contexts: Arc<dyn ContextTree>,
        sink: Arc<dyn EventSink>,
        cache_control: Arc<dyn CacheControl>,
    ) -> Self {
        let state = SessionState {
            intercepts: InterceptRegistry::new(),
            collectors: DataCollectorRegistry::new(config.data.max_total_size),
            blocked: BlockedRequestCoordinator::new(),
            subscriptions: SubscriptionRegistry::new(),
            lifecycle: RequestLifecycleTracker::new(config.lifecycle.max_tracked_requests),
            cache: CacheBehaviorTable::new(),
        };
        Self {
            shared: Arc::new(SessionShared {
                config,
                contexts,
                sink,
                cache_control,
                metrics: NetworkMetricsStore::default(),
                state: Mutex::new(state),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn event_processor(&self) -> EventProcessor {
        EventProcessor::new(Arc::clone(&self.shared))
    }

    pub fn metrics(&self) -> NetworkMetrics {
        self.shared.metrics.snapshot()
    }

    pub fn add_intercept(
        &self,
        params: AddInterceptParams,
    ) -> Result<AddInterceptResult, CommandError> {
        let intercept = self.shared.state.lock().intercepts.add(
            self.shared.contexts.as_ref(),
            params.contexts,
            params.phases,
            &params.url_patterns,
        )?;
        Ok(AddInterceptResult { intercept })
    }

    pub fn remove_intercept(&self, params: RemoveInterceptParams) -> Result<(), CommandError> {
        self.shared
            .state
            .lock()
            .intercepts
            .remove(&params.intercept)?;
        Ok(())
    }

    pub fn add_data_collector(
        &self,
        params: AddDataCollectorParams,
    ) -> Result<AddDataCollectorResult, CommandError> {
        let collector = self
            .shared
            .state
            .lock()
            .collectors
            .add(self.shared.contexts.as_ref(), params)?;
        Ok(AddDataCollectorResult { collector })
    }

    pub fn remove_data_collector(
        &self,
        params: RemoveDataCollectorParams,
    ) -> Result<(), CommandError> {
        self.shared
            .state
            .lock()
            .collectors
            .remove(&params.collector)
    }

    pub fn continue_request(&self, params: ContinueRequestParams) -> Result<(), CommandError> {
        let result = self.shared.state.lock().blocked.continue_request(params);
        self.record_resume(&result);
        result
    }

    pub fn continue_response(&self, params: ContinueResponseParams) -> Result<(), CommandError> {
        let result = self.shared.state.lock().blocked.continue_response(params);
        self.record_resume(&result);
        result
    }

    pub fn continue_with_auth(&self, params: ContinueWithAuthParams) -> Result<(), CommandError> {
        let result = self.shared.state.lock().blocked.continue_with_auth(params);
        self.record_resume(&result);
        result
    }

    pub fn provide_response(&self, params: ProvideResponseParams) -> Result<(), CommandError> {
        let result = self.shared.state.lock().blocked.provide_response(params);
        self.record_resume(&result);
        result
    }

    pub fn fail_request(&self, params: FailRequestParams) -> Result<(), CommandError> {
        let result = self.shared.state.lock().blocked.fail_request(params);
        if result.is_ok() {
            self.shared.metrics.record_request_failed();
        }
        result
    }

    /// Waits for a pending collection before answering.
    pub async fn get_data(&self, params: GetDataParams) -> Result<GetDataResult, CommandError> {
        let query = DataQuery {
            request: params.request,
            data_type: params.data_type,
            collector: params.collector,
            disown: params.disown.unwrap_or(false),
        };
        let read = self.shared.state.lock().collectors.read(&query)?;
        let bytes = match read {
            DataRead::Ready(bytes) => bytes,
            DataRead::Pending(waiter) => {
                waiter.wait().await;
                self.shared.state.lock().collectors.read_settled(&query)?
            }
        };
        Ok(GetDataResult { bytes })
    }

    pub fn disown_data(&self, params: DisownDataParams) -> Result<(), CommandError> {
        self.shared.state.lock().collectors.disown(
            &params.request,
            params.data_type,
            &params.collector,
        )
    }

    pub fn set_cache_behavior(&self, params: SetCacheBehaviorParams) -> Result<(), CommandError> {
        self.shared.state.lock().cache.update(
            self.shared.contexts.as_ref(),
            params.cache_behavior,
            params.contexts.as_deref(),
        )?;
        self.shared
            .cache_control
            .apply(params.cache_behavior, params.contexts.as_deref())?;
        Ok(())
    }

    pub fn cache_behavior_for(&self, context: &NavigableId) -> CacheBehavior {
        self.shared.state.lock().cache.behavior_for(context)
    }

    /// Registers listeners for `events` (`"network"` or `"network.<name>"`).
    /// Contexts are resolved to their top-level navigables.
    pub fn subscribe(
        &self,
        events: &[String],
        contexts: Option<&[NavigableId]>,
    ) -> Result<(), CommandError> {
        let contexts = self.resolve_top_level(contexts)?;
        self.shared
            .state
            .lock()
            .subscriptions
            .subscribe(events, contexts.as_deref())
            .map_err(subscription_error)
    }

    pub fn unsubscribe(
        &self,
        events: &[String],
        contexts: Option<&[NavigableId]>,
    ) -> Result<(), CommandError> {
        let contexts = self.resolve_top_level(contexts)?;
        self.shared
            .state
            .lock()
            .subscriptions
            .unsubscribe(events, contexts.as_deref())
            .map_err(subscription_error)
    }

    pub fn blocked_request_count(&self) -> usize {
        self.shared.state.lock().blocked.len()
    }

    pub fn collected_data_size(&self) -> u64 {
        self.shared.state.lock().collectors.retained_size()
    }

    /// Resumes every blocked request and drops all intercepts, collectors
    /// and subscriptions. Returns the number of requests released.
    pub fn end(&self) -> usize {
        let released = {
            let mut state = self.shared.state.lock();
            let released = state.blocked.release_all();
            state.intercepts.clear();
            state.collectors.clear();
            state.subscriptions.clear();
            state.lifecycle.clear();
            state.cache.reset();
            released
        };
        self.shared.metrics.record_requests_resumed(released as u64);
        tracing::debug!(released, "network session ended");
        released
    }

    fn record_resume(&self, result: &Result<(), CommandError>) {
        if result.is_ok() {
            self.shared.metrics.record_requests_resumed(1);
        }
    }

    fn resolve_top_level(
        &self,
        contexts: Option<&[NavigableId]>,
    ) -> Result<Option<Vec<NavigableId>>, CommandError> {
        let Some(contexts) = contexts else {
            return Ok(None);
        };
        let mut resolved: Vec<NavigableId> = Vec::with_capacity(contexts.len());
        for context in contexts {
            let Some(navigable) = self.shared.contexts.navigable(context) else {
                return Err(CommandError::NoSuchFrame(context.to_string()));
            };
            if !resolved.contains(&navigable.top) {
                resolved.push(navigable.top);
            }
        }
        Ok(Some(resolved))
    }
}

fn subscription_error(error: ObserveError) -> CommandError {
    CommandError::InvalidArgument(error.to_string())
}
