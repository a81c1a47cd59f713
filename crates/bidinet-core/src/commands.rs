use bidinet_http::{BytesValue, CookieHeader, Header, SetCookieHeader};
use bidinet_policy::{
    CollectorId, InterceptId, InterceptPhase, NavigableId, RequestId, UrlPatternSpec,
    UserContextId,
};
use serde::{Deserialize, Serialize};

use crate::{CacheBehavior, CollectorType, DataType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialsType {
    Password,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthCredentials {
    #[serde(rename = "type")]
    pub kind: CredentialsType,
    pub username: String,
    pub password: String,
}

impl AuthCredentials {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            kind: CredentialsType::Password,
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for AuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthCredentials")
            .field("kind", &self.kind)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContinueWithAuthAction {
    Cancel,
    Default,
    ProvideCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddInterceptParams {
    #[serde(default)]
    pub contexts: Option<Vec<NavigableId>>,
    pub phases: Vec<InterceptPhase>,
    #[serde(default)]
    pub url_patterns: Vec<UrlPatternSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoveInterceptParams {
    pub intercept: InterceptId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDataCollectorParams {
    pub data_types: Vec<DataType>,
    pub max_encoded_data_size: u64,
    #[serde(default)]
    pub collector_type: CollectorType,
    #[serde(default)]
    pub contexts: Option<Vec<NavigableId>>,
    #[serde(default)]
    pub user_contexts: Option<Vec<UserContextId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoveDataCollectorParams {
    pub collector: CollectorId,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueRequestParams {
    pub request: RequestId,
    #[serde(default)]
    pub body: Option<BytesValue>,
    #[serde(default)]
    pub cookies: Option<Vec<CookieHeader>>,
    #[serde(default)]
    pub headers: Option<Vec<Header>>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueResponseParams {
    pub request: RequestId,
    #[serde(default)]
    pub cookies: Option<Vec<SetCookieHeader>>,
    #[serde(default)]
    pub credentials: Option<AuthCredentials>,
    #[serde(default)]
    pub headers: Option<Vec<Header>>,
    #[serde(default)]
    pub reason_phrase: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueWithAuthParams {
    pub request: RequestId,
    pub action: ContinueWithAuthAction,
    #[serde(default)]
    pub credentials: Option<AuthCredentials>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvideResponseParams {
    pub request: RequestId,
    #[serde(default)]
    pub body: Option<BytesValue>,
    #[serde(default)]
    pub cookies: Option<Vec<SetCookieHeader>>,
    #[serde(default)]
    pub headers: Option<Vec<Header>>,
    #[serde(default)]
    pub reason_phrase: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
}

impl ProvideResponseParams {
    /// Name of the first optional argument that was supplied, if any.
    pub fn first_optional_argument(&self) -> Option<&'static str> {
        if self.body.is_some() {
            Some("body")
        } else if self.cookies.is_some() {
            Some("cookies")
        } else if self.headers.is_some() {
            Some("headers")
        } else if self.reason_phrase.is_some() {
            Some("reasonPhrase")
        } else if self.status_code.is_some() {
            Some("statusCode")
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FailRequestParams {
    pub request: RequestId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDataParams {
    pub request: RequestId,
    pub data_type: DataType,
    #[serde(default)]
    pub collector: Option<CollectorId>,
    #[serde(default)]
    pub disown: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisownDataParams {
    pub request: RequestId,
    pub data_type: DataType,
    pub collector: CollectorId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCacheBehaviorParams {
    pub cache_behavior: CacheBehavior,
    #[serde(default)]
    pub contexts: Option<Vec<NavigableId>>,
}
