use serde::{Deserialize, Serialize};
use url::Url;

use crate::{ContextTree, InterceptId, NavigableId, PolicyError, UrlPattern, UrlPatternSpec};

/// Point in a request's lifecycle where it may be suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterceptPhase {
    BeforeRequestSent,
    ResponseStarted,
    AuthRequired,
}

impl InterceptPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeRequestSent => "beforeRequestSent",
            Self::ResponseStarted => "responseStarted",
            Self::AuthRequired => "authRequired",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Intercept {
    pub id: InterceptId,
    pub contexts: Option<Vec<NavigableId>>,
    pub phases: Vec<InterceptPhase>,
    pub patterns: Vec<UrlPattern>,
}

impl Intercept {
    fn matches(&self, phase: InterceptPhase, url: Option<&Url>, top_context: &NavigableId) -> bool {
        if let Some(contexts) = &self.contexts {
            if !contexts.contains(top_context) {
                return false;
            }
        }
        if !self.phases.contains(&phase) {
            return false;
        }
        if self.patterns.is_empty() {
            return true;
        }
        url.is_some_and(|url| self.patterns.iter().any(|pattern| pattern.matches(url)))
    }
}

/// Active intercepts in creation order.
#[derive(Debug, Default)]
pub struct InterceptRegistry {
    intercepts: Vec<Intercept>,
}

impl InterceptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        tree: &dyn ContextTree,
        contexts: Option<Vec<NavigableId>>,
        phases: Vec<InterceptPhase>,
        patterns: &[UrlPatternSpec],
    ) -> Result<InterceptId, PolicyError> {
        if let Some(contexts) = &contexts {
            validate_top_level_contexts(tree, contexts)?;
        }
        if phases.is_empty() {
            return Err(PolicyError::InvalidArgument(
                "phases must be a non-empty array".to_string(),
            ));
        }
        let patterns = patterns
            .iter()
            .map(UrlPattern::compile)
            .collect::<Result<Vec<_>, _>>()?;

        let mut unique_phases = Vec::with_capacity(phases.len());
        for phase in phases {
            if !unique_phases.contains(&phase) {
                unique_phases.push(phase);
            }
        }

        let id = InterceptId::generate();
        self.intercepts.push(Intercept {
            id: id.clone(),
            contexts: contexts.map(dedup_contexts),
            phases: unique_phases,
            patterns,
        });
        Ok(id)
    }

    pub fn remove(&mut self, id: &InterceptId) -> Result<(), PolicyError> {
        let Some(index) = self.intercepts.iter().position(|intercept| &intercept.id == id) else {
            return Err(PolicyError::NoSuchIntercept(id.to_string()));
        };
        self.intercepts.remove(index);
        Ok(())
    }

    /// Ids of every intercept that applies, in creation order. An unparsable
    /// URL only matches intercepts without patterns.
    pub fn matching(
        &self,
        phase: InterceptPhase,
        url: &str,
        top_context: &NavigableId,
    ) -> Vec<InterceptId> {
        let parsed = Url::parse(url).ok();
        self.intercepts
            .iter()
            .filter(|intercept| intercept.matches(phase, parsed.as_ref(), top_context))
            .map(|intercept| intercept.id.clone())
            .collect()
    }

    pub fn get(&self, id: &InterceptId) -> Option<&Intercept> {
        self.intercepts.iter().find(|intercept| &intercept.id == id)
    }

    pub fn len(&self) -> usize {
        self.intercepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intercepts.is_empty()
    }

    pub fn clear(&mut self) {
        self.intercepts.clear();
    }
}

/// Checks that `contexts` is non-empty and names only existing top-level
/// navigables.
pub fn validate_top_level_contexts(
    tree: &dyn ContextTree,
    contexts: &[NavigableId],
) -> Result<(), PolicyError> {
    if contexts.is_empty() {
        return Err(PolicyError::InvalidArgument(
            "contexts must be a non-empty array".to_string(),
        ));
    }
    for context in contexts {
        let Some(navigable) = tree.navigable(context) else {
            return Err(PolicyError::NoSuchFrame(context.to_string()));
        };
        if !navigable.is_top_level() {
            return Err(PolicyError::InvalidArgument(format!(
                "context {context} is not a top-level browsing context"
            )));
        }
    }
    Ok(())
}

fn dedup_contexts(contexts: Vec<NavigableId>) -> Vec<NavigableId> {
    let mut unique = Vec::with_capacity(contexts.len());
    for context in contexts {
        if !unique.contains(&context) {
            unique.push(context);
        }
    }
    unique
}
