use std::time::{SystemTime, UNIX_EPOCH};

use bidinet_http::{
    extract_auth_challenges, parse_cookie_header, serialize_headers, AuthChallenge, CookieHeader,
    Header,
};
use bidinet_policy::{InterceptId, NavigableId, RequestId};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkEventKind {
    BeforeRequestSent,
    ResponseStarted,
    ResponseCompleted,
    AuthRequired,
    FetchError,
}

impl NetworkEventKind {
    pub const ALL: [NetworkEventKind; 5] = [
        Self::BeforeRequestSent,
        Self::ResponseStarted,
        Self::ResponseCompleted,
        Self::AuthRequired,
        Self::FetchError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeRequestSent => "network.beforeRequestSent",
            Self::ResponseStarted => "network.responseStarted",
            Self::ResponseCompleted => "network.responseCompleted",
            Self::AuthRequired => "network.authRequired",
            Self::FetchError => "network.fetchError",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

/// Timing marks in milliseconds relative to `time_origin`; zero when unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchTimingInfo {
    pub time_origin: f64,
    pub request_time: f64,
    pub redirect_start: f64,
    pub redirect_end: f64,
    pub fetch_start: f64,
    pub dns_start: f64,
    pub dns_end: f64,
    pub connect_start: f64,
    pub connect_end: f64,
    pub tls_start: f64,
    pub request_start: f64,
    pub response_start: f64,
    pub response_end: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    pub request: RequestId,
    pub url: String,
    pub method: String,
    pub body_size: Option<u64>,
    pub headers_size: u64,
    pub headers: Vec<Header>,
    pub cookies: Vec<CookieHeader>,
    pub destination: String,
    pub initiator_type: Option<String>,
    pub timings: FetchTimingInfo,
}

impl RequestData {
    /// Serializes raw request headers; cookies are split out of every
    /// `Cookie` header.
    pub fn new(
        request: RequestId,
        url: impl Into<String>,
        method: impl Into<String>,
        raw_headers: &[(String, String)],
    ) -> Self {
        let cookies = raw_headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("cookie"))
            .flat_map(|(_, value)| parse_cookie_header(value))
            .collect();
        Self {
            request,
            url: url.into(),
            method: method.into(),
            body_size: None,
            headers_size: 0,
            headers: serialize_headers(raw_headers),
            cookies,
            destination: String::new(),
            initiator_type: None,
            timings: FetchTimingInfo::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResponseContent {
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    pub url: String,
    pub protocol: String,
    pub status: u16,
    pub status_text: String,
    pub from_cache: bool,
    pub headers: Vec<Header>,
    pub mime_type: String,
    pub bytes_received: u64,
    pub headers_size: Option<u64>,
    pub body_size: Option<u64>,
    pub content: ResponseContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_challenges: Option<Vec<AuthChallenge>>,
}

impl ResponseData {
    /// Auth challenges are derived from the headers for 401 and 407 statuses.
    pub fn new(
        url: impl Into<String>,
        status: u16,
        status_text: impl Into<String>,
        raw_headers: &[(String, String)],
    ) -> Self {
        Self {
            url: url.into(),
            protocol: String::new(),
            status,
            status_text: status_text.into(),
            from_cache: false,
            headers: serialize_headers(raw_headers),
            mime_type: String::new(),
            bytes_received: 0,
            headers_size: None,
            body_size: None,
            content: ResponseContent::default(),
            auth_challenges: extract_auth_challenges(status, raw_headers),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Initiator {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Initiator {
    pub fn other() -> Self {
        Self {
            kind: "other".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseParameters {
    pub context: Option<NavigableId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intercepts: Option<Vec<InterceptId>>,
    pub is_blocked: bool,
    pub navigation: Option<String>,
    pub redirect_count: u32,
    pub request: RequestData,
    pub timestamp: u64,
}

impl BaseParameters {
    /// `intercepts` is only kept when non-empty, and drives `is_blocked`.
    pub fn new(
        context: Option<NavigableId>,
        navigation: Option<String>,
        redirect_count: u32,
        request: RequestData,
        intercepts: Vec<InterceptId>,
    ) -> Self {
        let is_blocked = !intercepts.is_empty();
        Self {
            context,
            intercepts: is_blocked.then_some(intercepts),
            is_blocked,
            navigation,
            redirect_count,
            request,
            timestamp: now_unix_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventParams {
    #[serde(flatten)]
    pub base: BaseParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initiator: Option<Initiator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkEvent {
    pub kind: NetworkEventKind,
    /// Top-level navigable the event is routed to.
    pub top_context: NavigableId,
    pub params: EventParams,
}

impl NetworkEvent {
    pub fn before_request_sent(top_context: NavigableId, base: BaseParameters) -> Self {
        Self::build(
            NetworkEventKind::BeforeRequestSent,
            top_context,
            base,
            Some(Initiator::other()),
            None,
            None,
        )
    }

    pub fn response(
        kind: NetworkEventKind,
        top_context: NavigableId,
        base: BaseParameters,
        response: ResponseData,
    ) -> Self {
        Self::build(kind, top_context, base, None, Some(response), None)
    }

    pub fn fetch_error(
        top_context: NavigableId,
        base: BaseParameters,
        error_text: impl Into<String>,
    ) -> Self {
        Self::build(
            NetworkEventKind::FetchError,
            top_context,
            base,
            None,
            None,
            Some(error_text.into()),
        )
    }

    fn build(
        kind: NetworkEventKind,
        top_context: NavigableId,
        base: BaseParameters,
        initiator: Option<Initiator>,
        response: Option<ResponseData>,
        error_text: Option<String>,
    ) -> Self {
        Self {
            kind,
            top_context,
            params: EventParams {
                base,
                initiator,
                response,
                error_text,
            },
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.params.base.request.request
    }

    pub fn is_blocked(&self) -> bool {
        self.params.base.is_blocked
    }

    pub fn to_message(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "event",
            "method": self.kind.as_str(),
            "params": self.params,
        })
    }
}

pub fn now_unix_ms() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::{BaseParameters, NetworkEvent, NetworkEventKind, RequestData, ResponseData};
    use bidinet_policy::{InterceptId, NavigableId, RequestId};

    fn request() -> RequestData {
        RequestData::new(
            RequestId::new("req-1"),
            "https://example.com/",
            "GET",
            &[
                ("Host".to_string(), "example.com".to_string()),
                ("Cookie".to_string(), "a=1; b=2".to_string()),
            ],
        )
    }

    #[test]
    fn event_names_round_trip() {
        for kind in NetworkEventKind::ALL {
            assert_eq!(NetworkEventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(NetworkEventKind::parse("network.unknown"), None);
        assert_eq!(NetworkEventKind::parse("beforeRequestSent"), None);
    }

    #[test]
    fn request_cookies_come_from_cookie_header() {
        let data = request();
        assert_eq!(data.headers.len(), 2);
        let names: Vec<&str> = data.cookies.iter().map(|cookie| cookie.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn unblocked_event_omits_intercepts() {
        let base = BaseParameters::new(
            Some(NavigableId::new("tab")),
            None,
            0,
            request(),
            Vec::new(),
        );
        let event = NetworkEvent::before_request_sent(NavigableId::new("tab"), base);
        let message = event.to_message();

        assert_eq!(message["type"], "event");
        assert_eq!(message["method"], "network.beforeRequestSent");
        assert_eq!(message["params"]["isBlocked"], false);
        assert!(message["params"].get("intercepts").is_none());
        assert_eq!(message["params"]["initiator"]["type"], "other");
        assert_eq!(message["params"]["request"]["request"], "req-1");
        assert_eq!(message["params"]["request"]["cookies"][1]["value"]["value"], "2");
    }

    #[test]
    fn blocked_response_event_lists_intercepts_and_challenges() {
        let intercept = InterceptId::new("intercept-1");
        let base = BaseParameters::new(
            Some(NavigableId::new("frame")),
            Some("nav-1".to_string()),
            1,
            request(),
            vec![intercept],
        );
        let response = ResponseData::new(
            "https://example.com/",
            401,
            "Unauthorized",
            &[(
                "WWW-Authenticate".to_string(),
                "Basic realm=\"site\"".to_string(),
            )],
        );
        let event = NetworkEvent::response(
            NetworkEventKind::AuthRequired,
            NavigableId::new("tab"),
            base,
            response,
        );
        let params = &event.to_message()["params"];

        assert!(event.is_blocked());
        assert_eq!(params["intercepts"], serde_json::json!(["intercept-1"]));
        assert_eq!(params["redirectCount"], 1);
        assert_eq!(params["response"]["statusText"], "Unauthorized");
        assert_eq!(
            params["response"]["authChallenges"],
            serde_json::json!([{ "scheme": "Basic", "realm": "site" }])
        );
        assert!(params.get("errorText").is_none());
    }
}
