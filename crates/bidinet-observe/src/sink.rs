use std::sync::Arc;

use parking_lot::Mutex;

use crate::NetworkEvent;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: NetworkEvent);
}

#[derive(Debug, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: NetworkEvent) {}
}

/// Records every emitted event; clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct VecEventSink {
    events: Arc<Mutex<Vec<NetworkEvent>>>,
}

impl VecEventSink {
    pub fn snapshot(&self) -> Vec<NetworkEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<NetworkEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for VecEventSink {
    fn emit(&self, event: NetworkEvent) {
        self.events.lock().push(event);
    }
}

/// Forwards each event to every inner sink in order.
#[derive(Default, Clone)]
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutEventSink {
    fn emit(&self, event: NetworkEvent) {
        let Some((last, rest)) = self.sinks.split_last() else {
            return;
        };
        for sink in rest {
            sink.emit(event.clone());
        }
        last.emit(event);
    }
}
