//! # Domain Info Service Library
//!
//! Resolves a domain name to its DNS (A record, TTL) and whois (raw
//! registration text, name servers, hosting organization) data, caches the
//! merged record keyed by normalized name, and refreshes it when the
//! observed DNS TTL elapses.
//!
//! ## Features
//!
//! - TTL-driven cache expiry with serve-stale-on-error fallback
//! - Partial-failure tolerance: the hosting-organization lookup never
//!   fails a refresh
//! - Whois server selection via static table plus IANA referral discovery
//! - Pluggable collaborators (DNS, whois, store) behind async traits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_info_service::DomainClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DomainClient::new()?;
//!     let view = client.resolve("example.com").await?;
//!
//!     println!("IP: {:?}", view.ip);
//!     println!("Name servers: {:?}", view.name_servers);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dns;
pub mod errors;
pub mod metrics;
pub mod parser;
pub mod service;
pub mod store;
pub mod tld_servers;
pub mod validation;
pub mod view;
pub mod whois;

// Re-export main types for easy access
pub use config::Config;
pub use dns::{ARecord, DnsResolver, SystemDnsResolver};
pub use errors::LookupError;
pub use service::DomainLookupService;
pub use store::{DomainRecordStore, MemoryDomainStore};
pub use view::DomainRecordView;
pub use whois::{TcpWhoisResolver, WhoisAnswer, WhoisResolver};

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// The cached unit of truth for one domain.
///
/// `name` is the sole identity key and never changes after creation;
/// everything else is rewritten on each successful refresh. `updated_at`
/// only advances when a refresh completes the merge and persist step, so a
/// failed refresh can never corrupt a previously good record.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DomainRecord {
    pub name: String,
    pub ip: Option<String>,
    pub whois_raw: Option<String>,
    pub hosted_at: Option<String>,
    pub ttl_seconds: i64,
    pub updated_at: DateTime<Utc>,
}

impl DomainRecord {
    /// A record is stale once its TTL window has elapsed. A TTL of zero or
    /// less means the last refresh observed no usable DNS answer, so the
    /// record is stale no matter how recently it was written.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        if self.ttl_seconds <= 0 {
            return true;
        }
        now > self.updated_at + Duration::seconds(self.ttl_seconds)
    }
}

/// High-level client wiring the production collaborators together: system
/// DNS, port-43 whois, in-memory store.
#[derive(Clone)]
pub struct DomainClient {
    service: Arc<DomainLookupService>,
}

impl DomainClient {
    /// Create a client with configuration loaded from the environment.
    pub fn new() -> Result<Self, LookupError> {
        let config = Arc::new(Config::load()?);
        Self::with_config(config)
    }

    /// Create a client with custom configuration.
    pub fn with_config(config: Arc<Config>) -> Result<Self, LookupError> {
        let dns = Arc::new(SystemDnsResolver::new(config.clone())?);
        let whois = Arc::new(TcpWhoisResolver::new(config));
        let store = Arc::new(MemoryDomainStore::new());

        Ok(Self {
            service: Arc::new(DomainLookupService::new(dns, whois, store)),
        })
    }

    /// Resolve a domain and project it into the external view shape.
    pub async fn resolve(&self, domain: &str) -> Result<DomainRecordView, LookupError> {
        let record = self.service.resolve(domain).await?;
        Ok(DomainRecordView::from(&record))
    }

    /// Resolve a domain to the full cached record.
    pub async fn resolve_record(&self, domain: &str) -> Result<DomainRecord, LookupError> {
        self.service.resolve(domain).await
    }
}
