use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderCodecError {
    #[error("expected header name to be a valid HTTP token, got {0:?}")]
    InvalidHeaderName(String),
    #[error("expected value of header {name:?} to be a valid header value")]
    InvalidHeaderValue { name: String },
    #[error("expected a valid base64 value: {0}")]
    InvalidBase64(String),
    #[error("expected base64 value to decode to UTF-8 text")]
    InvalidUtf8,
    #[error("expected status code to be within 100..=999, got {0}")]
    InvalidStatusCode(u16),
}
