//! Persistence boundary for cached domain records.
//!
//! The store is a key-value map over the normalized domain name. Get and
//! upsert must each be atomic; concurrent resolutions for the same name may
//! race on upsert and last write wins.

use crate::{errors::LookupError, DomainRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

#[async_trait]
pub trait DomainRecordStore: Send + Sync {
    /// Fetch the record for a normalized domain name, if one exists.
    async fn get(&self, name: &str) -> Result<Option<DomainRecord>, LookupError>;

    /// Insert or replace the record keyed by its name.
    async fn upsert(&self, record: DomainRecord) -> Result<(), LookupError>;
}

/// In-memory store backed by a concurrent hash map.
///
/// Records are never evicted; staleness is judged by the lookup service,
/// and an expired record is still wanted as serve-stale fallback data.
#[derive(Default)]
pub struct MemoryDomainStore {
    records: DashMap<String, DomainRecord>,
}

impl MemoryDomainStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl DomainRecordStore for MemoryDomainStore {
    async fn get(&self, name: &str) -> Result<Option<DomainRecord>, LookupError> {
        Ok(self.records.get(name).map(|entry| entry.value().clone()))
    }

    async fn upsert(&self, record: DomainRecord) -> Result<(), LookupError> {
        debug!("Upserting record for domain: {}", record.name);
        self.records.insert(record.name.clone(), record);
        Ok(())
    }
}
