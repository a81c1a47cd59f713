use std::collections::{HashMap, HashSet};

use crate::{NavigableId, UserContextId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigableInfo {
    pub id: NavigableId,
    pub parent: Option<NavigableId>,
    pub top: NavigableId,
    pub user_context: UserContextId,
}

impl NavigableInfo {
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

/// Read-only view of the browsing context tree owned by the browser.
pub trait ContextTree: Send + Sync {
    fn navigable(&self, id: &NavigableId) -> Option<NavigableInfo>;

    fn user_context_exists(&self, id: &UserContextId) -> bool;
}

/// A context tree populated up front, for embedders that mirror the
/// browser's tree themselves.
#[derive(Debug, Clone, Default)]
pub struct StaticContextTree {
    navigables: HashMap<NavigableId, NavigableInfo>,
    user_contexts: HashSet<UserContextId>,
}

impl StaticContextTree {
    pub fn new() -> Self {
        let mut tree = Self::default();
        tree.user_contexts.insert(UserContextId::new("default"));
        tree
    }

    pub fn add_user_context(&mut self, id: UserContextId) {
        self.user_contexts.insert(id);
    }

    pub fn add_top_level(&mut self, id: NavigableId, user_context: UserContextId) {
        self.user_contexts.insert(user_context.clone());
        self.navigables.insert(
            id.clone(),
            NavigableInfo {
                top: id.clone(),
                id,
                parent: None,
                user_context,
            },
        );
    }

    /// Returns `false` when the parent is unknown.
    pub fn add_child(&mut self, id: NavigableId, parent: &NavigableId) -> bool {
        let Some(parent_info) = self.navigables.get(parent).cloned() else {
            return false;
        };
        self.navigables.insert(
            id.clone(),
            NavigableInfo {
                id,
                parent: Some(parent.clone()),
                top: parent_info.top,
                user_context: parent_info.user_context,
            },
        );
        true
    }

    pub fn remove(&mut self, id: &NavigableId) {
        self.navigables.remove(id);
        self.navigables
            .retain(|_, info| info.parent.as_ref() != Some(id) && &info.top != id);
    }
}

impl ContextTree for StaticContextTree {
    fn navigable(&self, id: &NavigableId) -> Option<NavigableInfo> {
        self.navigables.get(id).cloned()
    }

    fn user_context_exists(&self, id: &UserContextId) -> bool {
        self.user_contexts.contains(id)
    }
}
