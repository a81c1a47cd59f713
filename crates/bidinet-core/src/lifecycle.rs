use std::collections::{HashMap, VecDeque};

use bidinet_policy::RequestId;

pub const DEFAULT_MAX_TRACKED_REQUESTS: usize = 16_384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestLifecycleState {
    Started,
    Requested,
    Authenticating,
    Responding,
    Completed,
    Failed,
}

impl RequestLifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestLifecycleEvent {
    BeforeRequestSent,
    AuthRequired,
    ResponseStarted,
    ResponseCompleted,
    FetchError,
}

impl RequestLifecycleEvent {
    fn target(self) -> RequestLifecycleState {
        match self {
            Self::BeforeRequestSent => RequestLifecycleState::Requested,
            Self::AuthRequired => RequestLifecycleState::Authenticating,
            Self::ResponseStarted => RequestLifecycleState::Responding,
            Self::ResponseCompleted => RequestLifecycleState::Completed,
            Self::FetchError => RequestLifecycleState::Failed,
        }
    }
}

pub fn next_request_state(
    current: RequestLifecycleState,
    event: RequestLifecycleEvent,
) -> Option<RequestLifecycleState> {
    use RequestLifecycleState::{Authenticating, Requested, Responding, Started};

    let allowed = match event {
        // A redirect re-enters the request phase with the same id.
        RequestLifecycleEvent::BeforeRequestSent => {
            matches!(current, Started | Requested | Responding)
        }
        RequestLifecycleEvent::AuthRequired | RequestLifecycleEvent::ResponseStarted => {
            matches!(current, Requested | Authenticating | Responding)
        }
        RequestLifecycleEvent::ResponseCompleted => {
            matches!(current, Authenticating | Responding)
        }
        RequestLifecycleEvent::FetchError => !current.is_terminal(),
    };
    allowed.then_some(event.target())
}

/// Bounded per-request state machine. Out-of-order events are logged and
/// the request jumps to the event's state anyway; terminal states drop the
/// entry.
#[derive(Debug)]
pub struct RequestLifecycleTracker {
    states: HashMap<RequestId, RequestLifecycleState>,
    order: VecDeque<RequestId>,
    max_tracked: usize,
}

impl Default for RequestLifecycleTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRACKED_REQUESTS)
    }
}

impl RequestLifecycleTracker {
    pub fn new(max_tracked: usize) -> Self {
        Self {
            states: HashMap::new(),
            order: VecDeque::new(),
            max_tracked: max_tracked.max(1),
        }
    }

    /// Records `event` and returns whether it was in order.
    pub fn observe(&mut self, request_id: &RequestId, event: RequestLifecycleEvent) -> bool {
        let current = match self.states.get(request_id) {
            Some(state) => *state,
            None => {
                self.order.push_back(request_id.clone());
                RequestLifecycleState::Started
            }
        };
        let (next, in_order) = match next_request_state(current, event) {
            Some(next) => (next, true),
            None => {
                tracing::debug!(
                    request_id = %request_id,
                    state = ?current,
                    event = ?event,
                    "out-of-order network lifecycle event"
                );
                (event.target(), false)
            }
        };

        if next.is_terminal() {
            self.states.remove(request_id);
            self.order.retain(|tracked| tracked != request_id);
        } else {
            self.states.insert(request_id.clone(), next);
        }

        while self.states.len() > self.max_tracked {
            let Some(evicted) = self.order.pop_front() else {
                break;
            };
            self.states.remove(&evicted);
        }
        in_order
    }

    pub fn state(&self, request_id: &RequestId) -> Option<RequestLifecycleState> {
        self.states.get(request_id).copied()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.order.clear();
    }
}
