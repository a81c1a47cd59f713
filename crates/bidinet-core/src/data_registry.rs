use std::collections::{HashMap, VecDeque};

use bidinet_http::BytesValue;
use bidinet_policy::{
    validate_top_level_contexts, CollectorId, ContextTree, NavigableInfo, RequestId,
};
use bytes::Bytes;
use tokio::sync::watch;

use crate::{
    AddDataCollectorParams, BudgetAllocator, ChannelError, Collector, CollectorScope,
    CommandError, DataType,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataKey {
    pub request: RequestId,
    pub data_type: DataType,
}

impl DataKey {
    pub fn new(request: RequestId, data_type: DataType) -> Self {
        Self { request, data_type }
    }
}

#[derive(Debug)]
struct CollectedDataEntry {
    bytes: Option<Bytes>,
    size: Option<u64>,
    pending: bool,
    collectors: Vec<CollectorId>,
    generation: u64,
    completion: watch::Sender<bool>,
}

impl CollectedDataEntry {
    fn resolve(&self) {
        self.completion.send_replace(true);
    }
}

/// Read-only view of a collected data entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedDataState {
    pub pending: bool,
    pub size: Option<u64>,
    pub retained: bool,
    pub collectors: Vec<CollectorId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataQuery {
    pub request: RequestId,
    pub data_type: DataType,
    pub collector: Option<CollectorId>,
    pub disown: bool,
}

impl DataQuery {
    fn key(&self) -> DataKey {
        DataKey::new(self.request.clone(), self.data_type)
    }
}

/// Resolves once the pending collection it was taken from settles.
#[derive(Debug)]
pub struct CollectionWaiter {
    receiver: watch::Receiver<bool>,
}

impl CollectionWaiter {
    pub async fn wait(mut self) {
        // A dropped sender means the entry is gone, which also settles it.
        let _ = self.receiver.wait_for(|done| *done).await;
    }
}

#[derive(Debug)]
pub enum DataRead {
    Ready(BytesValue),
    Pending(CollectionWaiter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionOutcome {
    /// No entry exists for the key.
    Missing,
    /// The entry was replaced or already settled since the read started.
    Stale,
    /// Nobody can keep the data; the entry was removed.
    Discarded,
    /// At least one collector kept the entry. `retained` is false when the
    /// budget refused the bytes.
    Stored { retained: bool, evicted: usize },
}

/// Data collectors plus the response data they captured, under one global
/// byte budget.
#[derive(Debug)]
pub struct DataCollectorRegistry {
    collectors: Vec<Collector>,
    entries: HashMap<DataKey, CollectedDataEntry>,
    order: VecDeque<DataKey>,
    budget: BudgetAllocator,
    next_generation: u64,
}

impl DataCollectorRegistry {
    pub fn new(max_total_size: u64) -> Self {
        Self {
            collectors: Vec::new(),
            entries: HashMap::new(),
            order: VecDeque::new(),
            budget: BudgetAllocator::new(max_total_size),
            next_generation: 1,
        }
    }

    pub fn max_total_size(&self) -> u64 {
        self.budget.max_total_size()
    }

    pub fn add(
        &mut self,
        tree: &dyn ContextTree,
        params: AddDataCollectorParams,
    ) -> Result<CollectorId, CommandError> {
        if params.max_encoded_data_size == 0 {
            return Err(CommandError::invalid_argument(
                "maxEncodedDataSize must be greater than 0",
            ));
        }
        if params.max_encoded_data_size > self.max_total_size() {
            return Err(CommandError::invalid_argument(format!(
                "maxEncodedDataSize must not exceed the max total data size ({}), got {}",
                self.max_total_size(),
                params.max_encoded_data_size
            )));
        }
        if params.data_types.is_empty() {
            return Err(CommandError::invalid_argument(
                "dataTypes must be a non-empty array",
            ));
        }

        if let Some(contexts) = &params.contexts {
            validate_top_level_contexts(tree, contexts)?;
        }
        if let Some(user_contexts) = &params.user_contexts {
            if user_contexts.is_empty() {
                return Err(CommandError::invalid_argument(
                    "userContexts must be a non-empty array",
                ));
            }
            if let Some(missing) = user_contexts
                .iter()
                .find(|user_context| !tree.user_context_exists(user_context))
            {
                return Err(CommandError::NoSuchUserContext(missing.to_string()));
            }
        }

        let scope = match (params.contexts, params.user_contexts) {
            (Some(_), Some(_)) => {
                return Err(CommandError::invalid_argument(
                    "providing both contexts and userContexts is not supported",
                ))
            }
            (Some(contexts), None) => CollectorScope::Contexts(contexts),
            (None, Some(user_contexts)) => CollectorScope::UserContexts(user_contexts),
            (None, None) => CollectorScope::Global,
        };

        let mut data_types = Vec::with_capacity(params.data_types.len());
        for data_type in params.data_types {
            if !data_types.contains(&data_type) {
                data_types.push(data_type);
            }
        }
        let id = CollectorId::generate();
        self.collectors.push(Collector {
            id: id.clone(),
            collector_type: params.collector_type,
            data_types,
            max_encoded_data_size: params.max_encoded_data_size,
            scope,
        });
        Ok(id)
    }

    /// Removes the collector and drops it from every entry, deleting entries
    /// left without collectors.
    pub fn remove(&mut self, id: &CollectorId) -> Result<(), CommandError> {
        let Some(index) = self.collectors.iter().position(|collector| &collector.id == id) else {
            return Err(CommandError::NoSuchNetworkCollector(id.to_string()));
        };
        self.collectors.remove(index);

        let keys: Vec<DataKey> = self.order.iter().cloned().collect();
        for key in keys {
            self.remove_collector_from_entry(&key, id);
        }
        Ok(())
    }

    pub fn collector(&self, id: &CollectorId) -> Option<&Collector> {
        self.collectors.iter().find(|collector| &collector.id == id)
    }

    pub fn collector_count(&self) -> usize {
        self.collectors.len()
    }

    pub fn has_collector_for(&self, data_type: DataType) -> bool {
        self.collectors
            .iter()
            .any(|collector| collector.collects(data_type))
    }

    /// Creates a pending entry when some collector wants `data_type`, and
    /// returns its generation. An entry still pending is kept as is.
    pub fn begin_collection(&mut self, request: &RequestId, data_type: DataType) -> Option<u64> {
        if !self.has_collector_for(data_type) {
            return None;
        }

        let key = DataKey::new(request.clone(), data_type);
        if let Some(existing) = self.entries.get(&key) {
            if existing.pending {
                return Some(existing.generation);
            }
            self.discard(&key);
        }

        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let (completion, _) = watch::channel(false);
        self.entries.insert(
            key.clone(),
            CollectedDataEntry {
                bytes: None,
                size: None,
                pending: true,
                collectors: Vec::new(),
                generation,
                completion,
            },
        );
        self.order.push_back(key);
        Some(generation)
    }

    pub fn pending_generation(&self, request: &RequestId, data_type: DataType) -> Option<u64> {
        self.entries
            .get(&DataKey::new(request.clone(), data_type))
            .filter(|entry| entry.pending)
            .map(|entry| entry.generation)
    }

    /// Settles a pending entry with the body read from the transport.
    /// `top_navigable` is `None` when the request's navigable no longer exists.
    pub fn complete_collection(
        &mut self,
        request: &RequestId,
        data_type: DataType,
        generation: u64,
        top_navigable: Option<&NavigableInfo>,
        body: Result<Bytes, ChannelError>,
    ) -> CollectionOutcome {
        let key = DataKey::new(request.clone(), data_type);
        let Some(entry) = self.entries.get(&key) else {
            return CollectionOutcome::Missing;
        };
        if entry.generation != generation || !entry.pending {
            return CollectionOutcome::Stale;
        }

        let bytes = match body {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::debug!(
                    request_id = %request,
                    error = %error,
                    "response body read failed, no data kept"
                );
                self.discard(&key);
                return CollectionOutcome::Discarded;
            }
        };
        let Some(top_navigable) = top_navigable else {
            self.discard(&key);
            return CollectionOutcome::Discarded;
        };

        let size = bytes.len() as u64;
        let collectors: Vec<CollectorId> = self
            .collectors
            .iter()
            .filter(|collector| {
                collector.collects(data_type)
                    && collector.matches_navigable(top_navigable)
                    && size <= collector.max_encoded_data_size
            })
            .map(|collector| collector.id.clone())
            .collect();
        if collectors.is_empty() {
            self.discard(&key);
            return CollectionOutcome::Discarded;
        }

        let retained: Vec<(DataKey, u64)> = self
            .order
            .iter()
            .filter_map(|key| {
                let entry = self.entries.get(key)?;
                match (&entry.bytes, entry.size) {
                    (Some(_), Some(size)) => Some((key.clone(), size)),
                    _ => None,
                }
            })
            .collect();
        let reservation = self.budget.reserve(size, &retained);
        for evicted in &reservation.evicted {
            if let Some(entry) = self.entries.get_mut(evicted) {
                tracing::debug!(
                    request_id = %evicted.request,
                    size = entry.size.unwrap_or_default(),
                    "evicted collected data to stay within budget"
                );
                entry.bytes = None;
                entry.size = None;
            }
        }

        let Some(entry) = self.entries.get_mut(&key) else {
            return CollectionOutcome::Missing;
        };
        entry.collectors = collectors;
        if reservation.granted {
            entry.bytes = Some(bytes);
            entry.size = Some(size);
        }
        entry.pending = false;
        entry.resolve();
        CollectionOutcome::Stored {
            retained: reservation.granted,
            evicted: reservation.evicted.len(),
        }
    }

    /// Drops the entry (redirect, fetch error) and wakes its waiters.
    pub fn discard_collection(&mut self, request: &RequestId, data_type: DataType) -> bool {
        self.discard(&DataKey::new(request.clone(), data_type))
    }

    /// First step of `getData`. Returns a waiter when the entry is still
    /// pending; call [`Self::read_settled`] once it resolves.
    pub fn read(&mut self, query: &DataQuery) -> Result<DataRead, CommandError> {
        if let Some(collector) = &query.collector {
            if self.collector(collector).is_none() {
                return Err(CommandError::NoSuchNetworkCollector(collector.to_string()));
            }
        }
        if query.disown && query.collector.is_none() {
            return Err(CommandError::invalid_argument(
                "collector must be provided when disown is true",
            ));
        }

        let key = query.key();
        let Some(entry) = self.entries.get(&key) else {
            return Err(not_found(&key));
        };
        if entry.pending {
            return Ok(DataRead::Pending(CollectionWaiter {
                receiver: entry.completion.subscribe(),
            }));
        }
        self.settle(&key, query).map(DataRead::Ready)
    }

    /// Second step of `getData`, after the pending entry resolved. The entry
    /// may have been discarded meanwhile.
    pub fn read_settled(&mut self, query: &DataQuery) -> Result<BytesValue, CommandError> {
        let key = query.key();
        if self.entries.contains_key(&key) {
            return self.settle(&key, query);
        }
        match &query.collector {
            Some(collector) => Err(not_matching(&key, collector)),
            None => Err(unavailable(&key)),
        }
    }

    pub fn disown(
        &mut self,
        request: &RequestId,
        data_type: DataType,
        collector: &CollectorId,
    ) -> Result<(), CommandError> {
        if self.collector(collector).is_none() {
            return Err(CommandError::NoSuchNetworkCollector(collector.to_string()));
        }
        let key = DataKey::new(request.clone(), data_type);
        let Some(entry) = self.entries.get(&key) else {
            return Err(not_found(&key));
        };
        if !entry.collectors.contains(collector) {
            return Err(not_matching(&key, collector));
        }
        self.remove_collector_from_entry(&key, collector);
        Ok(())
    }

    pub fn state(&self, request: &RequestId, data_type: DataType) -> Option<CollectedDataState> {
        self.entries
            .get(&DataKey::new(request.clone(), data_type))
            .map(|entry| CollectedDataState {
                pending: entry.pending,
                size: entry.size,
                retained: entry.bytes.is_some(),
                collectors: entry.collectors.clone(),
            })
    }

    pub fn retained_size(&self) -> u64 {
        self.entries
            .values()
            .filter(|entry| entry.bytes.is_some())
            .filter_map(|entry| entry.size)
            .sum()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Drops every collector and entry; waiters resolve against the now
    /// empty registry.
    pub fn clear(&mut self) {
        for entry in self.entries.values() {
            entry.resolve();
        }
        self.entries.clear();
        self.order.clear();
        self.collectors.clear();
    }

    fn settle(&mut self, key: &DataKey, query: &DataQuery) -> Result<BytesValue, CommandError> {
        let Some(entry) = self.entries.get(key) else {
            return Err(not_found(key));
        };
        if let Some(collector) = &query.collector {
            if !entry.collectors.contains(collector) {
                return Err(not_matching(key, collector));
            }
        }
        let Some(bytes) = entry.bytes.as_ref().filter(|_| !entry.pending) else {
            return Err(unavailable(key));
        };
        let value = BytesValue::from_body(bytes);

        if query.disown {
            if let Some(collector) = &query.collector {
                self.remove_collector_from_entry(key, collector);
            }
        }
        Ok(value)
    }

    fn remove_collector_from_entry(&mut self, key: &DataKey, collector: &CollectorId) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        let Some(index) = entry.collectors.iter().position(|id| id == collector) else {
            return;
        };
        entry.collectors.remove(index);
        if entry.collectors.is_empty() {
            self.discard(key);
        }
    }

    fn discard(&mut self, key: &DataKey) -> bool {
        let Some(entry) = self.entries.remove(key) else {
            return false;
        };
        entry.resolve();
        self.order.retain(|ordered| ordered != key);
        true
    }
}

fn not_found(key: &DataKey) -> CommandError {
    CommandError::NoSuchNetworkData(format!(
        "network data for request id {} and data type {} not found",
        key.request,
        key.data_type.as_str()
    ))
}

fn not_matching(key: &DataKey, collector: &CollectorId) -> CommandError {
    CommandError::NoSuchNetworkData(format!(
        "network data for request id {} and data type {} does not match collector {collector}",
        key.request,
        key.data_type.as_str()
    ))
}

fn unavailable(key: &DataKey) -> CommandError {
    CommandError::UnavailableNetworkData(format!(
        "network data content for request id {} and data type {} is unavailable",
        key.request,
        key.data_type.as_str()
    ))
}
