//! In-memory transport channels that record every operation, for embedders
//! without a real network stack and for tests.

use std::collections::HashSet;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::StatusCode;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::{
    AuthCredentials, AuthPrompt, CancelReason, ChannelError, RequestChannel, ResponseChannel,
    SyntheticResponse,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOp {
    Suspend(String),
    Resume,
    Cancel(CancelReason),
    SetRequestHeader { name: String, value: String, merge: bool },
    ClearRequestHeader(String),
    SetRequestBody(Bytes),
    SetRequestMethod(String),
    RedirectTo(String),
    SetResponseOverride(SyntheticResponse),
    SetResponseHeader { name: String, value: String, merge: bool },
    ClearResponseHeader(String),
    SetResponseStatus { status: Option<StatusCode>, reason_phrase: Option<String> },
    ProvideCredentials(Option<(String, String)>),
    CancelPrompt,
    ForwardPrompt,
}

/// A single in-flight request with its response and auth prompt.
#[derive(Debug)]
pub struct MemoryChannel {
    request_headers: Mutex<Vec<(String, String)>>,
    response_headers: Mutex<Vec<(String, String)>>,
    body: watch::Sender<Option<Result<Bytes, ChannelError>>>,
    ops: Mutex<Vec<ChannelOp>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChannel {
    pub fn new() -> Self {
        let (body, _) = watch::channel(None);
        Self {
            request_headers: Mutex::new(Vec::new()),
            response_headers: Mutex::new(Vec::new()),
            body,
            ops: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_request_headers(self, headers: &[(&str, &str)]) -> Self {
        *self.request_headers.lock() = to_owned_pairs(headers);
        self
    }

    pub fn with_response_headers(self, headers: &[(&str, &str)]) -> Self {
        *self.response_headers.lock() = to_owned_pairs(headers);
        self
    }

    pub fn with_body(self, body: impl Into<Bytes>) -> Self {
        self.complete_body(Ok(body.into()));
        self
    }

    /// Settles every pending and future `read_response_body` call.
    pub fn complete_body(&self, body: Result<Bytes, ChannelError>) {
        self.body.send_replace(Some(body));
    }

    /// Makes the named operation (`"resume"`, `"set_request_header"`, ...)
    /// fail from now on.
    pub fn fail_on(&self, operation: &'static str) {
        self.failing.lock().insert(operation);
    }

    pub fn ops(&self) -> Vec<ChannelOp> {
        self.ops.lock().clone()
    }

    pub fn request_headers_snapshot(&self) -> Vec<(String, String)> {
        self.request_headers.lock().clone()
    }

    pub fn response_headers_snapshot(&self) -> Vec<(String, String)> {
        self.response_headers.lock().clone()
    }

    fn record(&self, operation: &'static str, op: ChannelOp) -> Result<(), ChannelError> {
        if self.failing.lock().contains(operation) {
            return Err(ChannelError::OperationFailed {
                operation,
                reason: "injected failure".to_string(),
            });
        }
        self.ops.lock().push(op);
        Ok(())
    }
}

impl RequestChannel for MemoryChannel {
    fn suspend(&self, marker: &str) -> Result<(), ChannelError> {
        self.record("suspend", ChannelOp::Suspend(marker.to_string()))
    }

    fn resume(&self) -> Result<(), ChannelError> {
        self.record("resume", ChannelOp::Resume)
    }

    fn cancel(&self, reason: CancelReason) -> Result<(), ChannelError> {
        self.record("cancel", ChannelOp::Cancel(reason))
    }

    fn request_headers(&self) -> Vec<(String, String)> {
        self.request_headers_snapshot()
    }

    fn set_request_header(&self, name: &str, value: &str, merge: bool) -> Result<(), ChannelError> {
        self.record(
            "set_request_header",
            ChannelOp::SetRequestHeader {
                name: name.to_string(),
                value: value.to_string(),
                merge,
            },
        )?;
        set_header(&mut self.request_headers.lock(), name, value, merge);
        Ok(())
    }

    fn clear_request_header(&self, name: &str) -> Result<(), ChannelError> {
        self.record("clear_request_header", ChannelOp::ClearRequestHeader(name.to_string()))?;
        self.request_headers
            .lock()
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        Ok(())
    }

    fn set_request_body(&self, body: Bytes) -> Result<(), ChannelError> {
        self.record("set_request_body", ChannelOp::SetRequestBody(body))
    }

    fn set_request_method(&self, method: &str) -> Result<(), ChannelError> {
        self.record("set_request_method", ChannelOp::SetRequestMethod(method.to_string()))
    }

    fn redirect_to(&self, url: &str) -> Result<(), ChannelError> {
        self.record("redirect_to", ChannelOp::RedirectTo(url.to_string()))
    }

    fn set_response_override(&self, response: SyntheticResponse) -> Result<(), ChannelError> {
        self.record("set_response_override", ChannelOp::SetResponseOverride(response))
    }
}

impl ResponseChannel for MemoryChannel {
    fn response_headers(&self) -> Vec<(String, String)> {
        self.response_headers_snapshot()
    }

    fn set_response_header(&self, name: &str, value: &str, merge: bool) -> Result<(), ChannelError> {
        self.record(
            "set_response_header",
            ChannelOp::SetResponseHeader {
                name: name.to_string(),
                value: value.to_string(),
                merge,
            },
        )?;
        set_header(&mut self.response_headers.lock(), name, value, merge);
        Ok(())
    }

    fn clear_response_header(&self, name: &str) -> Result<(), ChannelError> {
        self.record("clear_response_header", ChannelOp::ClearResponseHeader(name.to_string()))?;
        self.response_headers
            .lock()
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        Ok(())
    }

    fn set_response_status(
        &self,
        status: Option<StatusCode>,
        reason_phrase: Option<&str>,
    ) -> Result<(), ChannelError> {
        self.record(
            "set_response_status",
            ChannelOp::SetResponseStatus {
                status,
                reason_phrase: reason_phrase.map(str::to_string),
            },
        )
    }

    fn read_response_body(&self) -> BoxFuture<'static, Result<Bytes, ChannelError>> {
        let mut receiver = self.body.subscribe();
        Box::pin(async move {
            match receiver.wait_for(Option::is_some).await {
                Ok(body) => body.clone().unwrap_or(Err(ChannelError::Closed)),
                Err(_) => Err(ChannelError::Closed),
            }
        })
    }
}

impl AuthPrompt for MemoryChannel {
    fn provide_credentials(&self, credentials: Option<&AuthCredentials>) -> Result<(), ChannelError> {
        self.record(
            "provide_credentials",
            ChannelOp::ProvideCredentials(
                credentials.map(|credentials| {
                    (credentials.username.clone(), credentials.password.clone())
                }),
            ),
        )
    }

    fn cancel_prompt(&self) -> Result<(), ChannelError> {
        self.record("cancel_prompt", ChannelOp::CancelPrompt)
    }

    fn forward_prompt(&self) -> Result<(), ChannelError> {
        self.record("forward_prompt", ChannelOp::ForwardPrompt)
    }
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str, merge: bool) {
    if !merge {
        headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
    }
    headers.push((name.to_string(), value.to_string()));
}

fn to_owned_pairs(headers: &[(&str, &str)]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}
