use std::sync::Arc;

use bidinet_policy::{InterceptPhase, RequestId};
use bytes::Bytes;
use futures::future::BoxFuture;
use http::StatusCode;

use crate::{AuthCredentials, ChannelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The client failed the request.
    Aborted,
}

impl CancelReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aborted => "NS_ERROR_ABORT",
        }
    }
}

/// Response substituted for a request before it reaches the network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntheticResponse {
    pub status: Option<StatusCode>,
    pub reason_phrase: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

/// Handle to an in-flight request owned by the transport.
pub trait RequestChannel: Send + Sync {
    fn suspend(&self, marker: &str) -> Result<(), ChannelError>;

    fn resume(&self) -> Result<(), ChannelError>;

    fn cancel(&self, reason: CancelReason) -> Result<(), ChannelError>;

    fn request_headers(&self) -> Vec<(String, String)>;

    fn set_request_header(&self, name: &str, value: &str, merge: bool)
        -> Result<(), ChannelError>;

    fn clear_request_header(&self, name: &str) -> Result<(), ChannelError>;

    fn set_request_body(&self, body: Bytes) -> Result<(), ChannelError>;

    fn set_request_method(&self, method: &str) -> Result<(), ChannelError>;

    fn redirect_to(&self, url: &str) -> Result<(), ChannelError>;

    fn set_response_override(&self, response: SyntheticResponse) -> Result<(), ChannelError>;
}

/// Handle to the response of an in-flight request.
pub trait ResponseChannel: Send + Sync {
    fn response_headers(&self) -> Vec<(String, String)>;

    fn set_response_header(&self, name: &str, value: &str, merge: bool)
        -> Result<(), ChannelError>;

    fn clear_response_header(&self, name: &str) -> Result<(), ChannelError>;

    fn set_response_status(
        &self,
        status: Option<StatusCode>,
        reason_phrase: Option<&str>,
    ) -> Result<(), ChannelError>;

    /// Resolves once the full body has been received.
    fn read_response_body(&self) -> BoxFuture<'static, Result<Bytes, ChannelError>>;
}

/// Pending authentication prompt; exactly one method is expected to be called.
pub trait AuthPrompt: Send + Sync {
    fn provide_credentials(&self, credentials: Option<&AuthCredentials>)
        -> Result<(), ChannelError>;

    fn cancel_prompt(&self) -> Result<(), ChannelError>;

    fn forward_prompt(&self) -> Result<(), ChannelError>;
}

/// Transport handles kept for a suspended request; the variant fixes the
/// phase it was suspended in.
#[derive(Clone)]
pub enum BlockedChannels {
    BeforeRequestSent {
        request: Arc<dyn RequestChannel>,
    },
    ResponseStarted {
        request: Arc<dyn RequestChannel>,
        response: Arc<dyn ResponseChannel>,
    },
    AuthRequired {
        request: Arc<dyn RequestChannel>,
        response: Arc<dyn ResponseChannel>,
        prompt: Arc<dyn AuthPrompt>,
    },
}

impl BlockedChannels {
    pub fn phase(&self) -> InterceptPhase {
        match self {
            Self::BeforeRequestSent { .. } => InterceptPhase::BeforeRequestSent,
            Self::ResponseStarted { .. } => InterceptPhase::ResponseStarted,
            Self::AuthRequired { .. } => InterceptPhase::AuthRequired,
        }
    }

    pub fn request(&self) -> &Arc<dyn RequestChannel> {
        match self {
            Self::BeforeRequestSent { request }
            | Self::ResponseStarted { request, .. }
            | Self::AuthRequired { request, .. } => request,
        }
    }

    pub fn response(&self) -> Option<&Arc<dyn ResponseChannel>> {
        match self {
            Self::BeforeRequestSent { .. } => None,
            Self::ResponseStarted { response, .. } | Self::AuthRequired { response, .. } => {
                Some(response)
            }
        }
    }

    pub fn prompt(&self) -> Option<&Arc<dyn AuthPrompt>> {
        match self {
            Self::AuthRequired { prompt, .. } => Some(prompt),
            _ => None,
        }
    }
}

pub fn suspend_marker(request_id: &RequestId, phase: InterceptPhase) -> String {
    format!(
        "Request (id: {request_id}) suspended by WebDriver BiDi in {} phase",
        phase.as_str()
    )
}
