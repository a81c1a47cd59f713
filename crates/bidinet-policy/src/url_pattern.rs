use serde::{Deserialize, Serialize};
use url::Url;

use crate::PolicyError;

/// URL pattern as sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum UrlPatternSpec {
    String {
        pattern: String,
    },
    Pattern {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        protocol: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hostname: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        port: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pathname: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        search: Option<String>,
    },
}

impl UrlPatternSpec {
    pub fn string(pattern: impl Into<String>) -> Self {
        Self::String {
            pattern: pattern.into(),
        }
    }
}

/// Compiled URL pattern. `*` matches any run of characters; any other
/// character matches itself. Missing components match anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPattern {
    Glob(String),
    Components(UrlComponents),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlComponents {
    protocol: Option<String>,
    hostname: Option<String>,
    port: Option<String>,
    pathname: Option<String>,
    search: Option<String>,
}

impl UrlPattern {
    pub fn compile(spec: &UrlPatternSpec) -> Result<Self, PolicyError> {
        match spec {
            UrlPatternSpec::String { pattern } => compile_string(pattern),
            UrlPatternSpec::Pattern {
                protocol,
                hostname,
                port,
                pathname,
                search,
            } => Ok(Self::Components(UrlComponents {
                protocol: protocol.as_deref().map(normalize_protocol).transpose()?,
                hostname: hostname.as_deref().map(normalize_hostname).transpose()?,
                port: port.as_deref().map(normalize_port).transpose()?,
                pathname: pathname.as_deref().map(normalize_pathname),
                search: search
                    .as_deref()
                    .map(|search| search.strip_prefix('?').unwrap_or(search).to_string()),
            })),
        }
    }

    pub fn matches(&self, url: &Url) -> bool {
        match self {
            Self::Glob(pattern) => glob_matches(pattern, url.as_str()),
            Self::Components(components) => components.matches(url),
        }
    }
}

impl UrlComponents {
    fn matches(&self, url: &Url) -> bool {
        let port = url
            .port_or_known_default()
            .map(|port| port.to_string())
            .unwrap_or_default();
        field_matches(self.protocol.as_deref(), url.scheme())
            && field_matches(self.hostname.as_deref(), url.host_str().unwrap_or_default())
            && field_matches(self.port.as_deref(), &port)
            && field_matches(self.pathname.as_deref(), url.path())
            && field_matches(self.search.as_deref(), url.query().unwrap_or_default())
    }
}

fn field_matches(pattern: Option<&str>, value: &str) -> bool {
    pattern.map_or(true, |pattern| glob_matches(pattern, value))
}

fn compile_string(pattern: &str) -> Result<UrlPattern, PolicyError> {
    if pattern.contains('*') {
        return Ok(UrlPattern::Glob(pattern.to_string()));
    }

    let parsed = Url::parse(pattern).map_err(|error| {
        PolicyError::InvalidArgument(format!("invalid URL pattern '{pattern}': {error}"))
    })?;
    Ok(UrlPattern::Components(UrlComponents {
        protocol: Some(parsed.scheme().to_string()),
        hostname: Some(parsed.host_str().unwrap_or_default().to_string()),
        port: Some(
            parsed
                .port_or_known_default()
                .map(|port| port.to_string())
                .unwrap_or_default(),
        ),
        pathname: Some(parsed.path().to_string()),
        search: Some(parsed.query().unwrap_or_default().to_string()),
    }))
}

fn normalize_protocol(protocol: &str) -> Result<String, PolicyError> {
    let protocol = protocol.strip_suffix(':').unwrap_or(protocol);
    let valid = !protocol.is_empty()
        && protocol
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'-' | b'.' | b'*'));
    if !valid {
        return Err(PolicyError::InvalidArgument(format!(
            "invalid URL pattern protocol '{protocol}'"
        )));
    }
    Ok(protocol.to_ascii_lowercase())
}

fn normalize_hostname(hostname: &str) -> Result<String, PolicyError> {
    let bracketed = hostname.starts_with('[') && hostname.ends_with(']');
    if hostname.is_empty() || hostname.contains('/') || (!bracketed && hostname.contains(':')) {
        return Err(PolicyError::InvalidArgument(format!(
            "invalid URL pattern hostname '{hostname}'"
        )));
    }
    Ok(hostname.to_ascii_lowercase())
}

fn normalize_port(port: &str) -> Result<String, PolicyError> {
    if port.is_empty() || !port.bytes().all(|byte| byte.is_ascii_digit() || byte == b'*') {
        return Err(PolicyError::InvalidArgument(format!(
            "invalid URL pattern port '{port}'"
        )));
    }
    if port.contains('*') {
        return Ok(port.to_string());
    }
    port.parse::<u16>()
        .map(|port| port.to_string())
        .map_err(|_| PolicyError::InvalidArgument(format!("invalid URL pattern port '{port}'")))
}

fn normalize_pathname(pathname: &str) -> String {
    if pathname.starts_with('/') {
        pathname.to_string()
    } else {
        format!("/{pathname}")
    }
}

/// Glob match where `*` spans any (possibly empty) run of bytes.
pub fn glob_matches(pattern: &str, candidate: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == candidate;
    }

    let pattern = pattern.as_bytes();
    let candidate = candidate.as_bytes();
    let mut pattern_index = 0usize;
    let mut candidate_index = 0usize;
    let mut star_index: Option<usize> = None;
    let mut backtrack_index = 0usize;

    while candidate_index < candidate.len() {
        if pattern_index < pattern.len() && pattern[pattern_index] == b'*' {
            star_index = Some(pattern_index);
            pattern_index += 1;
            backtrack_index = candidate_index;
            continue;
        }

        if pattern_index < pattern.len() && pattern[pattern_index] == candidate[candidate_index] {
            pattern_index += 1;
            candidate_index += 1;
            continue;
        }

        if let Some(star) = star_index {
            pattern_index = star + 1;
            backtrack_index += 1;
            candidate_index = backtrack_index;
            continue;
        }

        return false;
    }

    while pattern_index < pattern.len() && pattern[pattern_index] == b'*' {
        pattern_index += 1;
    }

    pattern_index == pattern.len()
}
