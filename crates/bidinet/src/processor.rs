use std::sync::Arc;

use bidinet_core::{
    suspend_marker, AuthPrompt, BlockedChannels, ChannelError, CollectionOutcome, DataType,
    RequestChannel, RequestLifecycleEvent, ResponseChannel, ResumeAction,
};
use bidinet_observe::{BaseParameters, NetworkEvent, NetworkEventKind};
use bidinet_policy::{InterceptId, InterceptPhase, NavigableId, RequestId};
use bytes::Bytes;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::session::{SessionShared, SessionState};
use crate::{RequestInfo, ResponseInfo, TransportEvent};

/// What the session did with one transport event.
#[derive(Debug, Default)]
pub struct ProcessOutcome {
    pub emitted: bool,
    /// The event was the echo of a client redirect and was swallowed.
    pub suppressed: bool,
    /// Set when the transaction was suspended; resolves with the action that
    /// released it.
    pub blocked: Option<oneshot::Receiver<ResumeAction>>,
    /// Background read of the response body for data collectors.
    pub collection: Option<JoinHandle<()>>,
}

impl ProcessOutcome {
    pub fn is_blocked(&self) -> bool {
        self.blocked.is_some()
    }
}

/// Turns transport notifications into protocol events, suspending
/// transactions that match an intercept and feeding data collectors.
#[derive(Clone)]
pub struct EventProcessor {
    shared: Arc<SessionShared>,
}

impl EventProcessor {
    pub(crate) fn new(shared: Arc<SessionShared>) -> Self {
        Self { shared }
    }

    /// Body collection is spawned on the current tokio runtime when there
    /// is one.
    pub fn process(&self, event: TransportEvent) -> ProcessOutcome {
        match event {
            TransportEvent::BeforeRequestSent { request, channel } => {
                self.before_request_sent(request, channel)
            }
            TransportEvent::ResponseStarted {
                request,
                response,
                channel,
                response_channel,
            } => self.response_started(request, response, channel, response_channel),
            TransportEvent::AuthRequired {
                request,
                response,
                channel,
                response_channel,
                prompt,
            } => self.auth_required(request, response, channel, response_channel, prompt),
            TransportEvent::ResponseCompleted {
                request,
                response,
                response_channel,
                redirect,
            } => self.response_completed(request, response, response_channel, redirect),
            TransportEvent::FetchError {
                request,
                error_text,
            } => self.fetch_error(request, error_text),
        }
    }

    fn before_request_sent(
        &self,
        request: RequestInfo,
        channel: Arc<dyn RequestChannel>,
    ) -> ProcessOutcome {
        let mut outcome = ProcessOutcome::default();
        let event = {
            let mut state = self.shared.state.lock();
            state
                .lifecycle
                .observe(&request.request_id, RequestLifecycleEvent::BeforeRequestSent);
            if state.blocked.take_redirect_mark(&request.request_id) {
                tracing::debug!(
                    request_id = %request.request_id,
                    "swallowed beforeRequestSent for a client redirect"
                );
                outcome.suppressed = true;
                return outcome;
            }
            let Some(top) =
                self.listening_top_context(&state, &request, NetworkEventKind::BeforeRequestSent)
            else {
                return outcome;
            };
            let intercepts = self.suspend_if_intercepted(
                &mut state,
                &request,
                &top,
                BlockedChannels::BeforeRequestSent { request: channel },
                &mut outcome,
            );
            NetworkEvent::before_request_sent(top, base_parameters(&request, intercepts))
        };
        self.emit(event, &mut outcome);
        outcome
    }

    fn response_started(
        &self,
        request: RequestInfo,
        response: ResponseInfo,
        channel: Arc<dyn RequestChannel>,
        response_channel: Arc<dyn ResponseChannel>,
    ) -> ProcessOutcome {
        let mut outcome = ProcessOutcome::default();
        let event = {
            let mut state = self.shared.state.lock();
            state
                .lifecycle
                .observe(&request.request_id, RequestLifecycleEvent::ResponseStarted);
            // Collection follows collectors, not subscriptions.
            state
                .collectors
                .begin_collection(&request.request_id, DataType::Response);
            let Some(top) =
                self.listening_top_context(&state, &request, NetworkEventKind::ResponseStarted)
            else {
                return outcome;
            };
            let intercepts = self.suspend_if_intercepted(
                &mut state,
                &request,
                &top,
                BlockedChannels::ResponseStarted {
                    request: channel,
                    response: response_channel,
                },
                &mut outcome,
            );
            NetworkEvent::response(
                NetworkEventKind::ResponseStarted,
                top,
                base_parameters(&request, intercepts),
                response.to_response_data(),
            )
        };
        self.emit(event, &mut outcome);
        outcome
    }

    fn auth_required(
        &self,
        request: RequestInfo,
        response: ResponseInfo,
        channel: Arc<dyn RequestChannel>,
        response_channel: Arc<dyn ResponseChannel>,
        prompt: Arc<dyn AuthPrompt>,
    ) -> ProcessOutcome {
        let mut outcome = ProcessOutcome::default();
        let event = {
            let mut state = self.shared.state.lock();
            state
                .lifecycle
                .observe(&request.request_id, RequestLifecycleEvent::AuthRequired);
            match self.listening_top_context(&state, &request, NetworkEventKind::AuthRequired) {
                Some(top) => {
                    let intercepts = self.suspend_if_intercepted(
                        &mut state,
                        &request,
                        &top,
                        BlockedChannels::AuthRequired {
                            request: channel,
                            response: response_channel,
                            prompt: Arc::clone(&prompt),
                        },
                        &mut outcome,
                    );
                    Some(NetworkEvent::response(
                        NetworkEventKind::AuthRequired,
                        top,
                        base_parameters(&request, intercepts),
                        response.to_response_data(),
                    ))
                }
                None => None,
            }
        };
        if let Some(event) = event {
            self.emit(event, &mut outcome);
        }
        if !outcome.is_blocked() {
            if let Err(error) = prompt.forward_prompt() {
                tracing::warn!(
                    request_id = %request.request_id,
                    error = %error,
                    "failed to forward unhandled auth prompt"
                );
            }
        }
        outcome
    }

    fn response_completed(
        &self,
        request: RequestInfo,
        response: ResponseInfo,
        response_channel: Arc<dyn ResponseChannel>,
        redirect: bool,
    ) -> ProcessOutcome {
        let mut outcome = ProcessOutcome::default();
        let (event, generation) = {
            let mut state = self.shared.state.lock();
            state
                .lifecycle
                .observe(&request.request_id, RequestLifecycleEvent::ResponseCompleted);
            let generation = if redirect {
                state
                    .collectors
                    .discard_collection(&request.request_id, DataType::Response);
                None
            } else {
                state
                    .collectors
                    .pending_generation(&request.request_id, DataType::Response)
            };
            let event = self
                .listening_top_context(&state, &request, NetworkEventKind::ResponseCompleted)
                .map(|top| {
                    NetworkEvent::response(
                        NetworkEventKind::ResponseCompleted,
                        top,
                        base_parameters(&request, Vec::new()),
                        response.to_response_data(),
                    )
                });
            (event, generation)
        };
        if let Some(generation) = generation {
            outcome.collection = self.spawn_collection(
                request.request_id.clone(),
                request.context.clone(),
                generation,
                response_channel.as_ref(),
            );
        }
        if let Some(event) = event {
            self.emit(event, &mut outcome);
        }
        outcome
    }

    fn fetch_error(&self, request: RequestInfo, error_text: String) -> ProcessOutcome {
        let mut outcome = ProcessOutcome::default();
        let event = {
            let mut state = self.shared.state.lock();
            state
                .lifecycle
                .observe(&request.request_id, RequestLifecycleEvent::FetchError);
            state
                .collectors
                .discard_collection(&request.request_id, DataType::Response);
            state.blocked.clear_redirect_mark(&request.request_id);
            self.listening_top_context(&state, &request, NetworkEventKind::FetchError)
                .map(|top| {
                    NetworkEvent::fetch_error(
                        top,
                        base_parameters(&request, Vec::new()),
                        error_text,
                    )
                })
        };
        if let Some(event) = event {
            self.emit(event, &mut outcome);
        }
        outcome
    }

    /// Top-level navigable of the request when someone listens for `kind`
    /// there.
    fn listening_top_context(
        &self,
        state: &SessionState,
        request: &RequestInfo,
        kind: NetworkEventKind,
    ) -> Option<NavigableId> {
        let context = request.context.as_ref()?;
        let navigable = self.shared.contexts.navigable(context)?;
        state
            .subscriptions
            .is_listening(kind, &navigable.top)
            .then_some(navigable.top)
    }

    fn suspend_if_intercepted(
        &self,
        state: &mut SessionState,
        request: &RequestInfo,
        top: &NavigableId,
        channels: BlockedChannels,
        outcome: &mut ProcessOutcome,
    ) -> Vec<InterceptId> {
        if !request.supports_interception {
            return Vec::new();
        }
        let phase = channels.phase();
        let intercepts = state.intercepts.matching(phase, &request.url, top);
        if intercepts.is_empty() {
            return intercepts;
        }
        let request_id = &request.request_id;
        if state.blocked.is_blocked(request_id) {
            tracing::warn!(
                request_id = %request_id,
                phase = phase.as_str(),
                "request is already blocked, not suspending it again"
            );
            return Vec::new();
        }
        // An auth prompt already holds the request; only the other phases
        // need the transport suspended.
        if phase != InterceptPhase::AuthRequired {
            if let Err(error) = channels
                .request()
                .suspend(&suspend_marker(request_id, phase))
            {
                tracing::warn!(
                    request_id = %request_id,
                    phase = phase.as_str(),
                    error = %error,
                    "failed to suspend intercepted request, letting it continue"
                );
                return Vec::new();
            }
        }
        outcome.blocked = state.blocked.register(request_id.clone(), channels);
        self.shared.metrics.record_request_blocked();
        intercepts
    }

    fn spawn_collection(
        &self,
        request_id: RequestId,
        context: Option<NavigableId>,
        generation: u64,
        response_channel: &dyn ResponseChannel,
    ) -> Option<JoinHandle<()>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                request_id = %request_id,
                "no tokio runtime to read the response body, dropping collected data"
            );
            self.shared
                .state
                .lock()
                .collectors
                .discard_collection(&request_id, DataType::Response);
            self.shared.metrics.record_collection_failure();
            return None;
        };
        let read = response_channel.read_response_body();
        let shared = Arc::clone(&self.shared);
        Some(runtime.spawn(async move {
            let body = read.await;
            finish_collection(&shared, &request_id, context.as_ref(), generation, body);
        }))
    }

    fn emit(&self, event: NetworkEvent, outcome: &mut ProcessOutcome) {
        self.shared.sink.emit(event);
        self.shared.metrics.record_event_emitted();
        outcome.emitted = true;
    }
}

fn base_parameters(request: &RequestInfo, intercepts: Vec<InterceptId>) -> BaseParameters {
    BaseParameters::new(
        request.context.clone(),
        request.navigation.clone(),
        request.redirect_count,
        request.to_request_data(),
        intercepts,
    )
}

fn finish_collection(
    shared: &SessionShared,
    request_id: &RequestId,
    context: Option<&NavigableId>,
    generation: u64,
    body: Result<Bytes, ChannelError>,
) {
    if body.is_err() {
        shared.metrics.record_collection_failure();
    }
    let top = context
        .and_then(|context| shared.contexts.navigable(context))
        .and_then(|navigable| shared.contexts.navigable(&navigable.top));
    let outcome = shared.state.lock().collectors.complete_collection(
        request_id,
        DataType::Response,
        generation,
        top.as_ref(),
        body,
    );
    if let CollectionOutcome::Stored { retained, evicted } = outcome {
        if retained {
            shared.metrics.record_body_collected();
        }
        shared.metrics.record_bodies_evicted(evicted as u64);
    }
}
