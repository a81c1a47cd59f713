use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::HeaderCodecError;

/// Protocol payload carried either as raw text or as standard base64.
///
/// Serializes as `{"type": "string" | "base64", "value": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum BytesValue {
    String(String),
    Base64(String),
}

impl BytesValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn base64_encode(bytes: &[u8]) -> Self {
        Self::Base64(STANDARD.encode(bytes))
    }

    /// Uses the `string` form when the body is valid UTF-8, `base64` otherwise.
    pub fn from_body(body: &[u8]) -> Self {
        match std::str::from_utf8(body) {
            Ok(text) => Self::String(text.to_string()),
            Err(_) => Self::base64_encode(body),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Base64(_) => "base64",
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes, HeaderCodecError> {
        match self {
            Self::String(value) => Ok(Bytes::copy_from_slice(value.as_bytes())),
            Self::Base64(value) => STANDARD
                .decode(value.as_bytes())
                .map(Bytes::from)
                .map_err(|error| HeaderCodecError::InvalidBase64(error.to_string())),
        }
    }

    pub fn to_text(&self) -> Result<String, HeaderCodecError> {
        match self {
            Self::String(value) => Ok(value.clone()),
            Self::Base64(_) => {
                let bytes = self.to_bytes()?;
                String::from_utf8(bytes.to_vec()).map_err(|_| HeaderCodecError::InvalidUtf8)
            }
        }
    }
}
