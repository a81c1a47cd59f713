use bidinet_http::HeaderCodecError;
use bidinet_policy::PolicyError;
use thiserror::Error;

/// Failure reported by the transport layer for a channel operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("transport channel is closed")]
    Closed,
    #[error("{operation} failed: {reason}")]
    OperationFailed {
        operation: &'static str,
        reason: String,
    },
    #[error("response body is unavailable: {0}")]
    BodyUnavailable(String),
}

/// Client-visible command failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("blocked request with id {0} not found")]
    NoSuchRequest(String),
    #[error("intercept {0} not found")]
    NoSuchIntercept(String),
    #[error("network data collector with id {0} not found")]
    NoSuchNetworkCollector(String),
    #[error("{0}")]
    NoSuchNetworkData(String),
    #[error("{0}")]
    UnavailableNetworkData(String),
    #[error("{0}")]
    UnsupportedOperation(String),
    #[error("browsing context {0} not found")]
    NoSuchFrame(String),
    #[error("user context {0} not found")]
    NoSuchUserContext(String),
    #[error("unknown command {0}")]
    UnknownCommand(String),
    #[error("transport failure: {0}")]
    Transport(#[from] ChannelError),
}

impl CommandError {
    /// Stable protocol error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid argument",
            Self::NoSuchRequest(_) => "no such request",
            Self::NoSuchIntercept(_) => "no such intercept",
            Self::NoSuchNetworkCollector(_) => "no such network collector",
            Self::NoSuchNetworkData(_) => "no such network data",
            Self::UnavailableNetworkData(_) => "unavailable network data",
            Self::UnsupportedOperation(_) => "unsupported operation",
            Self::NoSuchFrame(_) => "no such frame",
            Self::NoSuchUserContext(_) => "no such user context",
            Self::UnknownCommand(_) => "unknown command",
            Self::Transport(_) => "unknown error",
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<PolicyError> for CommandError {
    fn from(error: PolicyError) -> Self {
        match error {
            PolicyError::InvalidArgument(message) => Self::InvalidArgument(message),
            PolicyError::NoSuchIntercept(id) => Self::NoSuchIntercept(id),
            PolicyError::NoSuchFrame(id) => Self::NoSuchFrame(id),
            PolicyError::NoSuchUserContext(id) => Self::NoSuchUserContext(id),
        }
    }
}

impl From<HeaderCodecError> for CommandError {
    fn from(error: HeaderCodecError) -> Self {
        Self::InvalidArgument(error.to_string())
    }
}
