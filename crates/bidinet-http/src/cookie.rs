use serde::{Deserialize, Serialize};

use crate::{BytesValue, HeaderCodecError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieHeader {
    pub name: String,
    pub value: BytesValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lax => "lax",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetCookieHeader {
    pub name: String,
    pub value: BytesValue,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub http_only: Option<bool>,
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default)]
    pub max_age: Option<i64>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub same_site: Option<SameSite>,
    #[serde(default)]
    pub secure: Option<bool>,
}

impl SetCookieHeader {
    pub fn new(name: impl Into<String>, value: BytesValue) -> Self {
        Self {
            name: name.into(),
            value,
            domain: None,
            http_only: None,
            expiry: None,
            max_age: None,
            path: None,
            same_site: None,
            secure: None,
        }
    }
}

/// Builds the value of a request `Cookie` header.
pub fn serialize_cookie_header(cookies: &[CookieHeader]) -> Result<String, HeaderCodecError> {
    let mut header = String::new();
    for cookie in cookies {
        if !header.is_empty() {
            header.push(';');
        }
        header.push_str(&cookie.name);
        header.push('=');
        header.push_str(&cookie.value.to_text()?);
    }
    Ok(header)
}

/// Builds the value of a single response `Set-Cookie` header.
pub fn serialize_set_cookie_header(cookie: &SetCookieHeader) -> Result<String, HeaderCodecError> {
    let mut header = format!("{}={}", cookie.name, cookie.value.to_text()?);
    if let Some(expiry) = &cookie.expiry {
        header.push_str(&format!(";Expires={expiry}"));
    }
    if let Some(max_age) = cookie.max_age {
        header.push_str(&format!(";Max-Age={max_age}"));
    }
    if let Some(domain) = &cookie.domain {
        header.push_str(&format!(";Domain={domain}"));
    }
    if let Some(path) = &cookie.path {
        header.push_str(&format!(";Path={path}"));
    }
    if cookie.secure == Some(true) {
        header.push_str(";Secure");
    }
    if cookie.http_only == Some(true) {
        header.push_str(";HttpOnly");
    }
    if let Some(same_site) = cookie.same_site {
        header.push_str(&format!(";SameSite={}", same_site.as_str()));
    }
    Ok(header)
}

/// Splits a request `Cookie` header into name/value pairs.
pub fn parse_cookie_header(value: &str) -> Vec<CookieHeader> {
    value
        .split(';')
        .filter(|segment| !segment.trim().is_empty())
        .map(|segment| {
            let (name, value) = segment.split_once('=').unwrap_or(("", segment));
            CookieHeader {
                name: name.trim().to_string(),
                value: BytesValue::string(value.trim()),
            }
        })
        .collect()
}
