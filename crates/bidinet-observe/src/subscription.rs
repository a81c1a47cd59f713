use std::collections::{HashMap, HashSet};

use bidinet_policy::NavigableId;

use crate::{NetworkEventKind, ObserveError};

const MODULE_NAME: &str = "network";

/// Which network events have listeners, globally or per top-level navigable.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    global: HashSet<NetworkEventKind>,
    by_context: HashMap<NetworkEventKind, HashSet<NavigableId>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `contexts` must already be resolved to top-level navigables.
    pub fn subscribe(
        &mut self,
        events: &[String],
        contexts: Option<&[NavigableId]>,
    ) -> Result<(), ObserveError> {
        let kinds = expand_event_names(events)?;
        match contexts {
            None => self.global.extend(kinds),
            Some([]) => {
                return Err(ObserveError::InvalidArgument(
                    "contexts must be a non-empty array".to_string(),
                ))
            }
            Some(contexts) => {
                for kind in kinds {
                    self.by_context
                        .entry(kind)
                        .or_default()
                        .extend(contexts.iter().cloned());
                }
            }
        }
        Ok(())
    }

    /// Fails without changing anything when any requested pair has no
    /// subscription.
    pub fn unsubscribe(
        &mut self,
        events: &[String],
        contexts: Option<&[NavigableId]>,
    ) -> Result<(), ObserveError> {
        let kinds = expand_event_names(events)?;
        match contexts {
            None => {
                if let Some(missing) = kinds.iter().find(|kind| !self.global.contains(*kind)) {
                    return Err(ObserveError::NotSubscribed(missing.as_str().to_string()));
                }
                for kind in &kinds {
                    self.global.remove(kind);
                }
            }
            Some(contexts) => {
                for kind in &kinds {
                    let subscribed = self.by_context.get(kind);
                    if let Some(context) = contexts.iter().find(|context| {
                        !subscribed.is_some_and(|subscribed| subscribed.contains(*context))
                    }) {
                        return Err(ObserveError::NotSubscribed(format!(
                            "{} in context {context}",
                            kind.as_str()
                        )));
                    }
                }
                for kind in &kinds {
                    if let Some(subscribed) = self.by_context.get_mut(kind) {
                        for context in contexts {
                            subscribed.remove(context);
                        }
                        if subscribed.is_empty() {
                            self.by_context.remove(kind);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn is_listening(&self, kind: NetworkEventKind, top_context: &NavigableId) -> bool {
        self.global.contains(&kind)
            || self
                .by_context
                .get(&kind)
                .is_some_and(|contexts| contexts.contains(top_context))
    }

    pub fn has_listeners(&self, kind: NetworkEventKind) -> bool {
        self.global.contains(&kind) || self.by_context.contains_key(&kind)
    }

    pub fn clear(&mut self) {
        self.global.clear();
        self.by_context.clear();
    }
}

fn expand_event_names(events: &[String]) -> Result<Vec<NetworkEventKind>, ObserveError> {
    if events.is_empty() {
        return Err(ObserveError::InvalidArgument(
            "events must be a non-empty array".to_string(),
        ));
    }
    let mut kinds = Vec::new();
    for name in events {
        if name == MODULE_NAME {
            kinds.extend(NetworkEventKind::ALL);
            continue;
        }
        let Some(kind) = NetworkEventKind::parse(name) else {
            return Err(ObserveError::UnknownEvent(name.clone()));
        };
        kinds.push(kind);
    }
    kinds.dedup();
    Ok(kinds)
}
