mod error;
mod event;
mod event_log;
mod sink;
mod subscription;

pub use error::ObserveError;
pub use event::{
    now_unix_ms, BaseParameters, EventParams, FetchTimingInfo, Initiator, NetworkEvent,
    NetworkEventKind, RequestData, ResponseContent, ResponseData,
};
pub use event_log::{EventLogConfig, EventLogRecord, EventLogSink, EVENT_LOG_SCHEMA};
pub use sink::{EventSink, FanoutEventSink, NoopEventSink, VecEventSink};
pub use subscription::SubscriptionRegistry;
