use bidinet_policy::{CollectorId, NavigableId, NavigableInfo, UserContextId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Response,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Response => "response",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectorType {
    #[default]
    Blob,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorScope {
    Global,
    Contexts(Vec<NavigableId>),
    UserContexts(Vec<UserContextId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collector {
    pub id: CollectorId,
    pub collector_type: CollectorType,
    pub data_types: Vec<DataType>,
    pub max_encoded_data_size: u64,
    pub scope: CollectorScope,
}

impl Collector {
    /// `navigable` is the top-level navigable the data belongs to.
    pub fn matches_navigable(&self, navigable: &NavigableInfo) -> bool {
        match &self.scope {
            CollectorScope::Global => true,
            CollectorScope::Contexts(contexts) => contexts.contains(&navigable.id),
            CollectorScope::UserContexts(user_contexts) => {
                user_contexts.contains(&navigable.user_context)
            }
        }
    }

    pub fn collects(&self, data_type: DataType) -> bool {
        self.data_types.contains(&data_type)
    }
}
