use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("intercept {0} not found")]
    NoSuchIntercept(String),
    #[error("browsing context {0} not found")]
    NoSuchFrame(String),
    #[error("user context {0} not found")]
    NoSuchUserContext(String),
}
