use std::sync::Arc;

use bidinet_core::{CacheControl, NoopCacheControl};
use bidinet_observe::{EventLogConfig, EventLogSink, EventSink, FanoutEventSink, NoopEventSink};
use bidinet_policy::ContextTree;

use crate::{BidiNetError, NetworkSession, SessionConfig};

pub struct NetworkSessionBuilder {
    config: SessionConfig,
    contexts: Arc<dyn ContextTree>,
    sink: Option<Arc<dyn EventSink>>,
    cache_control: Option<Arc<dyn CacheControl>>,
}

impl NetworkSessionBuilder {
    pub fn new(config: SessionConfig, contexts: Arc<dyn ContextTree>) -> Self {
        Self {
            config,
            contexts,
            sink: None,
            cache_control: None,
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_cache_control(mut self, cache_control: Arc<dyn CacheControl>) -> Self {
        self.cache_control = Some(cache_control);
        self
    }

    /// Validates the config and opens the JSONL event log when
    /// `events.log_path` is set.
    pub fn build(self) -> Result<NetworkSession, BidiNetError> {
        self.config.validate()?;
        let sink = match &self.config.events.log_path {
            Some(path) => {
                let log = EventLogSink::new(
                    EventLogConfig::new(path.clone())
                        .with_flush_every(self.config.events.log_flush_every),
                )?;
                let mut fanout = FanoutEventSink::new(Vec::new());
                if let Some(sink) = self.sink {
                    fanout.push(sink);
                }
                fanout.push(Arc::new(log));
                Arc::new(fanout) as Arc<dyn EventSink>
            }
            None => self.sink.unwrap_or_else(|| Arc::new(NoopEventSink)),
        };
        let cache_control = self
            .cache_control
            .unwrap_or_else(|| Arc::new(NoopCacheControl));
        Ok(NetworkSession::new(
            self.config,
            self.contexts,
            sink,
            cache_control,
        ))
    }
}
