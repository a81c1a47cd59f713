use std::sync::Arc;

use bidinet_core::{AuthPrompt, RequestChannel, ResponseChannel};
use bidinet_observe::{FetchTimingInfo, RequestData, ResponseContent, ResponseData};
use bidinet_policy::{NavigableId, RequestId};

/// Request metadata reported by the transport with every event.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestInfo {
    pub request_id: RequestId,
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    /// Navigable that issued the request, if any.
    pub context: Option<NavigableId>,
    pub navigation: Option<String>,
    pub redirect_count: u32,
    pub body_size: Option<u64>,
    pub headers_size: u64,
    pub destination: String,
    pub initiator_type: Option<String>,
    pub timings: FetchTimingInfo,
    /// Whether the transport can suspend this request. Requests that cannot
    /// be suspended are never reported as blocked.
    pub supports_interception: bool,
}

impl RequestInfo {
    pub fn new(
        request_id: impl Into<RequestId>,
        url: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            url: url.into(),
            method: method.into(),
            headers: Vec::new(),
            context: None,
            navigation: None,
            redirect_count: 0,
            body_size: None,
            headers_size: 0,
            destination: String::new(),
            initiator_type: None,
            timings: FetchTimingInfo::default(),
            supports_interception: true,
        }
    }

    pub fn with_context(mut self, context: impl Into<NavigableId>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_headers(mut self, headers: &[(&str, &str)]) -> Self {
        self.headers = headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        self
    }

    pub fn with_redirect_count(mut self, redirect_count: u32) -> Self {
        self.redirect_count = redirect_count;
        self
    }

    pub fn with_supports_interception(mut self, supports_interception: bool) -> Self {
        self.supports_interception = supports_interception;
        self
    }

    pub(crate) fn to_request_data(&self) -> RequestData {
        let mut data = RequestData::new(
            self.request_id.clone(),
            self.url.clone(),
            self.method.clone(),
            &self.headers,
        );
        data.body_size = self.body_size;
        data.headers_size = self.headers_size;
        data.destination = self.destination.clone();
        data.initiator_type = self.initiator_type.clone();
        data.timings = self.timings.clone();
        data
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseInfo {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub protocol: String,
    pub from_cache: bool,
    pub mime_type: String,
    pub bytes_received: u64,
    pub headers_size: Option<u64>,
    pub body_size: Option<u64>,
    pub content_size: u64,
}

impl ResponseInfo {
    pub fn new(url: impl Into<String>, status: u16, status_text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            status_text: status_text.into(),
            headers: Vec::new(),
            protocol: String::new(),
            from_cache: false,
            mime_type: String::new(),
            bytes_received: 0,
            headers_size: None,
            body_size: None,
            content_size: 0,
        }
    }

    pub fn with_headers(mut self, headers: &[(&str, &str)]) -> Self {
        self.headers = headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        self
    }

    pub(crate) fn to_response_data(&self) -> ResponseData {
        let mut data = ResponseData::new(
            self.url.clone(),
            self.status,
            self.status_text.clone(),
            &self.headers,
        );
        data.protocol = self.protocol.clone();
        data.from_cache = self.from_cache;
        data.mime_type = self.mime_type.clone();
        data.bytes_received = self.bytes_received;
        data.headers_size = self.headers_size;
        data.body_size = self.body_size;
        data.content = ResponseContent {
            size: self.content_size,
        };
        data
    }
}

/// Network lifecycle notification from the transport, carrying the handles
/// the session may suspend or read from.
pub enum TransportEvent {
    BeforeRequestSent {
        request: RequestInfo,
        channel: Arc<dyn RequestChannel>,
    },
    ResponseStarted {
        request: RequestInfo,
        response: ResponseInfo,
        channel: Arc<dyn RequestChannel>,
        response_channel: Arc<dyn ResponseChannel>,
    },
    AuthRequired {
        request: RequestInfo,
        response: ResponseInfo,
        channel: Arc<dyn RequestChannel>,
        response_channel: Arc<dyn ResponseChannel>,
        prompt: Arc<dyn AuthPrompt>,
    },
    ResponseCompleted {
        request: RequestInfo,
        response: ResponseInfo,
        response_channel: Arc<dyn ResponseChannel>,
        /// The response redirects elsewhere, so no final body follows.
        redirect: bool,
    },
    FetchError {
        request: RequestInfo,
        error_text: String,
    },
}

impl TransportEvent {
    pub fn request(&self) -> &RequestInfo {
        match self {
            Self::BeforeRequestSent { request, .. }
            | Self::ResponseStarted { request, .. }
            | Self::AuthRequired { request, .. }
            | Self::ResponseCompleted { request, .. }
            | Self::FetchError { request, .. } => request,
        }
    }
}
