use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkMetrics {
    pub events_emitted: u64,
    pub requests_blocked: u64,
    pub requests_resumed: u64,
    pub requests_failed: u64,
    pub bodies_collected: u64,
    pub bodies_evicted: u64,
    pub collection_failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct NetworkMetricsStore {
    events_emitted: AtomicU64,
    requests_blocked: AtomicU64,
    requests_resumed: AtomicU64,
    requests_failed: AtomicU64,
    bodies_collected: AtomicU64,
    bodies_evicted: AtomicU64,
    collection_failures: AtomicU64,
}

impl NetworkMetricsStore {
    pub(crate) fn snapshot(&self) -> NetworkMetrics {
        NetworkMetrics {
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            requests_blocked: self.requests_blocked.load(Ordering::Relaxed),
            requests_resumed: self.requests_resumed.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            bodies_collected: self.bodies_collected.load(Ordering::Relaxed),
            bodies_evicted: self.bodies_evicted.load(Ordering::Relaxed),
            collection_failures: self.collection_failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_event_emitted(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_request_blocked(&self) {
        self.requests_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_requests_resumed(&self, count: u64) {
        self.requests_resumed.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_request_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_body_collected(&self) {
        self.bodies_collected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bodies_evicted(&self, count: u64) {
        self.bodies_evicted.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_collection_failure(&self) {
        self.collection_failures.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::NetworkMetricsStore;

    #[test]
    fn network_metrics_counter_contract() {
        let store = NetworkMetricsStore::default();

        store.record_event_emitted();
        store.record_event_emitted();
        store.record_request_blocked();
        store.record_requests_resumed(3);
        store.record_request_failed();
        store.record_body_collected();
        store.record_bodies_evicted(2);
        store.record_collection_failure();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.events_emitted, 2);
        assert_eq!(snapshot.requests_blocked, 1);
        assert_eq!(snapshot.requests_resumed, 3);
        assert_eq!(snapshot.requests_failed, 1);
        assert_eq!(snapshot.bodies_collected, 1);
        assert_eq!(snapshot.bodies_evicted, 2);
        assert_eq!(snapshot.collection_failures, 1);
    }
}
