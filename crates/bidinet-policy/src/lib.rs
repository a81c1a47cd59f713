mod context;
mod error;
mod ids;
mod intercept;
mod url_pattern;

pub use context::{ContextTree, NavigableInfo, StaticContextTree};
pub use error::PolicyError;
pub use ids::{CollectorId, InterceptId, NavigableId, RequestId, UserContextId};
pub use intercept::{validate_top_level_contexts, Intercept, InterceptPhase, InterceptRegistry};
pub use url_pattern::{glob_matches, UrlComponents, UrlPattern, UrlPatternSpec};
