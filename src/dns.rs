//! DNS collaborator: A-record lookups with observed TTL.
//!
//! The service only ever wants the first A record of the answer set plus
//! its TTL, so the trait surface is exactly that. Production resolution
//! goes through trust-dns; tests substitute their own implementations.

use crate::{config::Config, errors::LookupError};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use trust_dns_resolver::{
    error::ResolveErrorKind,
    proto::rr::{RData, RecordType},
    TokioAsyncResolver,
};
use tracing::debug;

/// First A record of an answer set: address and the TTL it was served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ARecord {
    pub address: String,
    pub ttl_seconds: i64,
}

#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// Query A records for `name`.
    ///
    /// `Ok(None)` means the query succeeded but the answer set was empty;
    /// that is not a failure. Transport problems surface as errors.
    async fn query_a(&self, name: &str) -> Result<Option<ARecord>, LookupError>;
}

/// Production resolver using the system DNS configuration.
pub struct SystemDnsResolver {
    resolver: TokioAsyncResolver,
    query_timeout: Duration,
}

impl SystemDnsResolver {
    pub fn new(config: Arc<Config>) -> Result<Self, LookupError> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| LookupError::Dns(format!("Failed to create DNS resolver: {}", e)))?;

        Ok(Self {
            resolver,
            query_timeout: Duration::from_secs(config.dns_timeout_seconds),
        })
    }
}

#[async_trait]
impl DnsResolver for SystemDnsResolver {
    async fn query_a(&self, name: &str) -> Result<Option<ARecord>, LookupError> {
        debug!("DNS A lookup for {}", name);

        let lookup = match timeout(
            self.query_timeout,
            self.resolver.lookup(name, RecordType::A),
        )
        .await?
        {
            Ok(lookup) => lookup,
            Err(e) => {
                // An empty answer set is a valid outcome, not a transport failure
                if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) {
                    debug!("No A records found for {}", name);
                    return Ok(None);
                }
                return Err(LookupError::Dns(format!("DNS resolution failed for {}: {}", name, e)));
            }
        };

        // First listed record wins; no load balancing or randomization
        for record in lookup.record_iter() {
            if let Some(RData::A(address)) = record.data() {
                return Ok(Some(ARecord {
                    address: address.to_string(),
                    ttl_seconds: i64::from(record.ttl()),
                }));
            }
        }

        Ok(None)
    }
}
