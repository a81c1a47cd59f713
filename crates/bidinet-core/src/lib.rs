mod blocked;
mod budget;
mod cache;
mod channel;
mod collector;
mod commands;
mod data_registry;
mod error;
mod lifecycle;
pub mod memory;

pub use blocked::{AuthResume, BlockedRequestCoordinator, ResumeAction};
pub use budget::{BudgetAllocator, Reservation};
pub use cache::{CacheBehavior, CacheBehaviorTable, CacheControl, NoopCacheControl};
pub use channel::{
    suspend_marker, AuthPrompt, BlockedChannels, CancelReason, RequestChannel, ResponseChannel,
    SyntheticResponse,
};
pub use collector::{Collector, CollectorScope, CollectorType, DataType};
pub use commands::{
    AddDataCollectorParams, AddInterceptParams, AuthCredentials, ContinueRequestParams,
    ContinueResponseParams, ContinueWithAuthAction, ContinueWithAuthParams, CredentialsType,
    DisownDataParams, FailRequestParams, GetDataParams, ProvideResponseParams,
    RemoveDataCollectorParams, RemoveInterceptParams, SetCacheBehaviorParams,
};
pub use data_registry::{
    CollectedDataState, CollectionOutcome, CollectionWaiter, DataCollectorRegistry, DataKey,
    DataQuery, DataRead,
};
pub use error::{ChannelError, CommandError};
pub use lifecycle::{
    next_request_state, RequestLifecycleEvent, RequestLifecycleState, RequestLifecycleTracker,
    DEFAULT_MAX_TRACKED_REQUESTS,
};
