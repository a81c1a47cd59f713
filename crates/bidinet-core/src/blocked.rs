use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bidinet_http::{
    deserialize_headers, is_immutable_response_header, is_valid_http_token, parse_status_code,
    serialize_cookie_header, serialize_set_cookie_header, SetCookieHeader,
};
use bidinet_policy::{InterceptPhase, RequestId};
use tokio::sync::oneshot;

use crate::{
    AuthCredentials, BlockedChannels, CancelReason, ChannelError, CommandError,
    ContinueRequestParams, ContinueResponseParams, ContinueWithAuthAction,
    ContinueWithAuthParams, FailRequestParams, ProvideResponseParams, RequestChannel,
    SyntheticResponse,
};

/// How a suspended request is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeAction {
    Resume,
    Auth(AuthResume),
    Fail(CancelReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResume {
    ProvideCredentials(Option<AuthCredentials>),
    Cancel,
    ForwardPrompt,
}

struct BlockedRequest {
    channels: BlockedChannels,
    completion: oneshot::Sender<ResumeAction>,
}

/// Suspended requests keyed by request id, at most one per id.
///
/// Every command validates its arguments, then looks the request up, then
/// checks the phase. Channel mutations run while the entry is still
/// registered, so a failed mutation leaves the request blocked. Once the
/// resume is dispatched the entry is gone, whatever the transport reports.
#[derive(Default)]
pub struct BlockedRequestCoordinator {
    blocked: HashMap<RequestId, BlockedRequest>,
    redirected: HashSet<RequestId>,
}

impl BlockedRequestCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a suspended request. Returns `None`, leaving the existing
    /// entry untouched, when the id is already blocked.
    pub fn register(
        &mut self,
        request_id: RequestId,
        channels: BlockedChannels,
    ) -> Option<oneshot::Receiver<ResumeAction>> {
        if self.blocked.contains_key(&request_id) {
            return None;
        }
        let (completion, receiver) = oneshot::channel();
        self.blocked.insert(
            request_id,
            BlockedRequest {
                channels,
                completion,
            },
        );
        Some(receiver)
    }

    pub fn is_blocked(&self, request_id: &RequestId) -> bool {
        self.blocked.contains_key(request_id)
    }

    pub fn phase(&self, request_id: &RequestId) -> Option<InterceptPhase> {
        self.blocked
            .get(request_id)
            .map(|blocked| blocked.channels.phase())
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }

    /// Consumes the mark left by a redirecting `continue_request`.
    pub fn take_redirect_mark(&mut self, request_id: &RequestId) -> bool {
        self.redirected.remove(request_id)
    }

    pub fn clear_redirect_mark(&mut self, request_id: &RequestId) {
        self.redirected.remove(request_id);
    }

    pub fn continue_request(&mut self, params: ContinueRequestParams) -> Result<(), CommandError> {
        let body = params.body.as_ref().map(|body| body.to_bytes()).transpose()?;
        let cookie_header = params
            .cookies
            .as_deref()
            .map(serialize_cookie_header)
            .transpose()?;
        let headers = params.headers.as_deref().map(deserialize_headers).transpose()?;
        if let Some(method) = &params.method {
            if !is_valid_http_token(method) {
                return Err(CommandError::invalid_argument(format!(
                    "method must be a valid HTTP token, got {method}"
                )));
            }
        }
        if let Some(url) = &params.url {
            if url::Url::parse(url).is_err() {
                return Err(CommandError::invalid_argument(format!(
                    "url must be a valid URL, got {url}"
                )));
            }
        }

        let blocked = self.lookup(&params.request)?;
        expect_phase(blocked, &[InterceptPhase::BeforeRequestSent])?;
        let request = Arc::clone(blocked.channels.request());

        if let Some(method) = &params.method {
            request.set_request_method(method)?;
        }
        if let Some(headers) = &headers {
            for (name, _) in request.request_headers() {
                request.clear_request_header(&name)?;
            }
            for (name, value) in headers {
                request.set_request_header(name, value, true)?;
            }
        }
        if let Some(cookie_header) = &cookie_header {
            replace_cookie_header(request.as_ref(), cookie_header)?;
        }
        if let Some(body) = body {
            request.set_request_body(body)?;
        }
        if let Some(url) = &params.url {
            request.redirect_to(url)?;
            self.redirected.insert(params.request.clone());
        }

        self.release(&params.request, ResumeAction::Resume)
    }

    pub fn continue_response(
        &mut self,
        params: ContinueResponseParams,
    ) -> Result<(), CommandError> {
        let set_cookies = serialize_set_cookies(params.cookies.as_deref())?;
        let headers = match params.headers.as_deref() {
            Some(headers) => Some(mutable_response_headers(
                &params.request,
                deserialize_headers(headers)?,
            )),
            None => None,
        };
        let status = params.status_code.map(parse_status_code).transpose()?;

        let blocked = self.lookup(&params.request)?;
        expect_phase(
            blocked,
            &[InterceptPhase::ResponseStarted, InterceptPhase::AuthRequired],
        )?;
        let phase = blocked.channels.phase();
        let Some(response) = blocked.channels.response().map(Arc::clone) else {
            return Err(CommandError::Transport(ChannelError::Closed));
        };

        if let Some(headers) = &headers {
            for (name, _) in response.response_headers() {
                if !is_immutable_response_header(&name) {
                    response.clear_response_header(&name)?;
                }
            }
            for (name, value) in headers {
                response.set_response_header(name, value, true)?;
            }
        }
        for cookie in &set_cookies {
            response.set_response_header("Set-Cookie", cookie, true)?;
        }
        if status.is_some() || params.reason_phrase.is_some() {
            response.set_response_status(status, params.reason_phrase.as_deref())?;
        }

        let action = if phase == InterceptPhase::AuthRequired {
            ResumeAction::Auth(AuthResume::ProvideCredentials(params.credentials))
        } else {
            ResumeAction::Resume
        };
        self.release(&params.request, action)
    }

    pub fn continue_with_auth(
        &mut self,
        params: ContinueWithAuthParams,
    ) -> Result<(), CommandError> {
        let resume = match (params.action, params.credentials) {
            (ContinueWithAuthAction::ProvideCredentials, Some(credentials)) => {
                AuthResume::ProvideCredentials(Some(credentials))
            }
            (ContinueWithAuthAction::ProvideCredentials, None) => {
                return Err(CommandError::invalid_argument(
                    "credentials are required for the provideCredentials action",
                ))
            }
            (ContinueWithAuthAction::Cancel, _) => AuthResume::Cancel,
            (ContinueWithAuthAction::Default, _) => AuthResume::ForwardPrompt,
        };

        let blocked = self.lookup(&params.request)?;
        expect_phase(blocked, &[InterceptPhase::AuthRequired])?;
        self.release(&params.request, ResumeAction::Auth(resume))
    }

    pub fn provide_response(&mut self, params: ProvideResponseParams) -> Result<(), CommandError> {
        let body = params.body.as_ref().map(|body| body.to_bytes()).transpose()?;
        let set_cookies = serialize_set_cookies(params.cookies.as_deref())?;
        let headers = params.headers.as_deref().map(deserialize_headers).transpose()?;
        let status = params.status_code.map(parse_status_code).transpose()?;

        let blocked = self.lookup(&params.request)?;
        let action = match blocked.channels.phase() {
            InterceptPhase::BeforeRequestSent => {
                let mut response_headers = headers.unwrap_or_default();
                response_headers.extend(
                    set_cookies
                        .into_iter()
                        .map(|cookie| ("Set-Cookie".to_string(), cookie)),
                );
                blocked
                    .channels
                    .request()
                    .set_response_override(SyntheticResponse {
                        status,
                        reason_phrase: params.reason_phrase.clone(),
                        headers: response_headers,
                        body,
                    })?;
                ResumeAction::Resume
            }
            phase => {
                if let Some(argument) = params.first_optional_argument() {
                    return Err(CommandError::UnsupportedOperation(format!(
                        "the {argument} parameter is only supported in the beforeRequestSent phase, request is in {}",
                        phase.as_str()
                    )));
                }
                if phase == InterceptPhase::AuthRequired {
                    ResumeAction::Auth(AuthResume::ProvideCredentials(None))
                } else {
                    ResumeAction::Resume
                }
            }
        };
        self.release(&params.request, action)
    }

    pub fn fail_request(&mut self, params: FailRequestParams) -> Result<(), CommandError> {
        let blocked = self.lookup(&params.request)?;
        if blocked.channels.phase() == InterceptPhase::AuthRequired {
            return Err(CommandError::invalid_argument(
                "blocked request must not be in the authRequired phase",
            ));
        }
        self.release(&params.request, ResumeAction::Fail(CancelReason::Aborted))
    }

    /// Plain-resumes every blocked request for session teardown. Pending auth
    /// prompts are forwarded first; failures are logged and skipped.
    pub fn release_all(&mut self) -> usize {
        self.redirected.clear();
        let mut released = 0;
        for (request_id, blocked) in self.blocked.drain() {
            if let Some(prompt) = blocked.channels.prompt() {
                if let Err(error) = prompt.forward_prompt() {
                    tracing::warn!(
                        request_id = %request_id,
                        error = %error,
                        "failed to forward auth prompt while ending the session"
                    );
                }
            }
            if let Err(error) = blocked.channels.request().resume() {
                tracing::warn!(
                    request_id = %request_id,
                    error = %error,
                    "failed to resume blocked request while ending the session"
                );
            }
            let _ = blocked.completion.send(ResumeAction::Resume);
            released += 1;
        }
        released
    }

    fn lookup(&self, request_id: &RequestId) -> Result<&BlockedRequest, CommandError> {
        self.blocked
            .get(request_id)
            .ok_or_else(|| CommandError::NoSuchRequest(request_id.to_string()))
    }

    fn release(&mut self, request_id: &RequestId, action: ResumeAction) -> Result<(), CommandError> {
        let Some(blocked) = self.blocked.remove(request_id) else {
            return Err(CommandError::NoSuchRequest(request_id.to_string()));
        };
        let result = dispatch(&blocked.channels, &action);
        let _ = blocked.completion.send(action);
        result.map_err(CommandError::from)
    }
}

fn dispatch(channels: &BlockedChannels, action: &ResumeAction) -> Result<(), ChannelError> {
    match action {
        ResumeAction::Resume => channels.request().resume(),
        ResumeAction::Fail(reason) => {
            let request = channels.request();
            request.resume()?;
            request.cancel(*reason)
        }
        ResumeAction::Auth(resume) => {
            let Some(prompt) = channels.prompt() else {
                return channels.request().resume();
            };
            match resume {
                AuthResume::ProvideCredentials(credentials) => {
                    prompt.provide_credentials(credentials.as_ref())
                }
                AuthResume::Cancel => prompt.cancel_prompt(),
                AuthResume::ForwardPrompt => prompt.forward_prompt(),
            }
        }
    }
}

fn expect_phase(blocked: &BlockedRequest, allowed: &[InterceptPhase]) -> Result<(), CommandError> {
    let phase = blocked.channels.phase();
    if allowed.contains(&phase) {
        return Ok(());
    }
    let expected: Vec<&str> = allowed.iter().map(|phase| phase.as_str()).collect();
    Err(CommandError::invalid_argument(format!(
        "expected blocked request to be in {} phase, got {}",
        expected.join(" or "),
        phase.as_str()
    )))
}

fn replace_cookie_header(
    request: &dyn RequestChannel,
    cookie_header: &str,
) -> Result<(), ChannelError> {
    let existing = request
        .request_headers()
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("cookie"))
        .map(|(name, _)| name);
    match existing {
        Some(name) => request.set_request_header(&name, cookie_header, false),
        None => request.set_request_header("Cookie", cookie_header, false),
    }
}

fn serialize_set_cookies(
    cookies: Option<&[SetCookieHeader]>,
) -> Result<Vec<String>, CommandError> {
    let Some(cookies) = cookies else {
        return Ok(Vec::new());
    };
    cookies
        .iter()
        .map(|cookie| serialize_set_cookie_header(cookie).map_err(CommandError::from))
        .collect()
}

fn mutable_response_headers(
    request_id: &RequestId,
    headers: Vec<(String, String)>,
) -> Vec<(String, String)> {
    headers
        .into_iter()
        .filter(|(name, _)| {
            let immutable = is_immutable_response_header(name);
            if immutable {
                tracing::warn!(
                    request_id = %request_id,
                    header = %name,
                    "continueResponse cannot modify this header, skipping"
                );
            }
            !immutable
        })
        .collect()
}
