use std::collections::HashMap;

use bidinet_policy::{validate_top_level_contexts, ContextTree, NavigableId};
use serde::{Deserialize, Serialize};

use crate::{ChannelError, CommandError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBehavior {
    #[default]
    Default,
    Bypass,
}

impl CacheBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Bypass => "bypass",
        }
    }
}

/// Browser-side cache switch that `setCacheBehavior` updates are forwarded to.
pub trait CacheControl: Send + Sync {
    fn apply(
        &self,
        behavior: CacheBehavior,
        contexts: Option<&[NavigableId]>,
    ) -> Result<(), ChannelError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCacheControl;

impl CacheControl for NoopCacheControl {
    fn apply(
        &self,
        _behavior: CacheBehavior,
        _contexts: Option<&[NavigableId]>,
    ) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CacheBehaviorTable {
    default: CacheBehavior,
    overrides: HashMap<NavigableId, CacheBehavior>,
}

impl CacheBehaviorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `contexts` and records the behavior. Without contexts the
    /// default changes and every per-navigable override is dropped.
    pub fn update(
        &mut self,
        tree: &dyn ContextTree,
        behavior: CacheBehavior,
        contexts: Option<&[NavigableId]>,
    ) -> Result<(), CommandError> {
        let Some(contexts) = contexts else {
            self.default = behavior;
            self.overrides.clear();
            return Ok(());
        };
        validate_top_level_contexts(tree, contexts)?;
        for context in contexts {
            if behavior == self.default {
                self.overrides.remove(context);
            } else {
                self.overrides.insert(context.clone(), behavior);
            }
        }
        Ok(())
    }

    pub fn default_behavior(&self) -> CacheBehavior {
        self.default
    }

    pub fn behavior_for(&self, context: &NavigableId) -> CacheBehavior {
        self.overrides.get(context).copied().unwrap_or(self.default)
    }

    pub fn forget(&mut self, context: &NavigableId) {
        self.overrides.remove(context);
    }

    pub fn reset(&mut self) {
        self.default = CacheBehavior::Default;
        self.overrides.clear();
    }
}
