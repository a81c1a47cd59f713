mod builder;
mod config;
mod dispatch;
mod error;
mod metrics;
mod processor;
mod session;
mod transport;

pub use builder::NetworkSessionBuilder;
pub use config::{
    DataConfig, EventsConfig, LifecycleConfig, SessionConfig, DEFAULT_MAX_TOTAL_DATA_SIZE,
    ENV_EVENT_LOG_FLUSH_EVERY, ENV_EVENT_LOG_PATH, ENV_MAX_TOTAL_DATA_SIZE,
};
pub use error::BidiNetError;
pub use metrics::NetworkMetrics;
pub use processor::{EventProcessor, ProcessOutcome};
pub use session::{AddDataCollectorResult, AddInterceptResult, GetDataResult, NetworkSession};
pub use transport::{RequestInfo, ResponseInfo, TransportEvent};
