use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObserveError {
    #[error("unknown network event '{0}'")]
    UnknownEvent(String),
    #[error("no subscription found for '{0}'")]
    NotSubscribed(String),
    #[error("{0}")]
    InvalidArgument(String),
}
