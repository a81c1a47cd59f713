use thiserror::Error;

#[derive(Debug, Error)]
pub enum BidiNetError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("event log I/O error: {0}")]
    Io(#[from] std::io::Error),
}
