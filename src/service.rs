//! The lookup orchestrator: cache check, conditional refresh, merge,
//! persist.
//!
//! A record is trusted until its observed DNS TTL elapses. Past that the
//! service re-queries both upstreams and rewrites the record in place; if
//! the upstreams are down and a previous answer exists, the stale answer is
//! served rather than failing the request.

use crate::{
    dns::DnsResolver, errors::LookupError, store::DomainRecordStore, validation,
    whois::WhoisResolver, DomainRecord,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct DomainLookupService {
    dns: Arc<dyn DnsResolver>,
    whois: Arc<dyn WhoisResolver>,
    store: Arc<dyn DomainRecordStore>,
}

impl DomainLookupService {
    pub fn new(
        dns: Arc<dyn DnsResolver>,
        whois: Arc<dyn WhoisResolver>,
        store: Arc<dyn DomainRecordStore>,
    ) -> Self {
        Self { dns, whois, store }
    }

    /// Resolve a domain name to its cached record, refreshing from the
    /// upstreams when the TTL window has elapsed.
    pub async fn resolve(&self, raw_name: &str) -> Result<DomainRecord, LookupError> {
        if !validation::is_valid(raw_name) {
            return Err(LookupError::InvalidDomain(raw_name.trim().to_string()));
        }
        let name = validation::normalize(raw_name);

        let existing = match self.store.get(&name).await? {
            Some(record) if !record.is_stale(Utc::now()) => {
                debug!("Cache hit for {}, record is fresh", name);
                return Ok(record);
            }
            other => other,
        };

        match self.refresh(&name, existing.clone()).await {
            Ok(record) => Ok(record),
            Err(e) if e.is_upstream() => match existing {
                Some(prior) => {
                    warn!("Refresh failed for {} ({}), serving stale record", name, e);
                    Ok(prior)
                }
                None => Err(LookupError::LookupFailed(e.to_string())),
            },
            Err(e) => Err(e),
        }
    }

    /// Re-query the upstreams and rewrite the record.
    ///
    /// Whois-by-name and the DNS A query are independent and run
    /// concurrently; the hosting lookup needs the resolved address and runs
    /// after. A failed hosting lookup is absorbed - the refresh still
    /// counts, with `hosted_at` unset.
    async fn refresh(
        &self,
        name: &str,
        existing: Option<DomainRecord>,
    ) -> Result<DomainRecord, LookupError> {
        debug!("Refreshing domain data for {}", name);

        let (whois_answer, a_record) =
            tokio::join!(self.whois.query(name), self.dns.query_a(name));
        let whois_answer = whois_answer?;
        let a_record = a_record?;

        // Zero A records is not an error: the record is persisted with no
        // address and a zero TTL, which marks it as immediately stale.
        let (ip, ttl_seconds) = match a_record {
            Some(a) => (Some(a.address), a.ttl_seconds),
            None => (None, 0),
        };

        let mut hosted_at = None;
        if let Some(ref address) = ip {
            match self.whois.query(address).await {
                Ok(answer) => hosted_at = answer.organization,
                Err(e) => {
                    warn!("Hosting organization lookup failed for {} ({}): {}", name, address, e);
                }
            }
        }

        let whois_raw = if whois_answer.raw.is_empty() {
            None
        } else {
            Some(whois_answer.raw)
        };

        let record = match existing {
            Some(mut record) => {
                record.ip = ip;
                record.whois_raw = whois_raw;
                record.hosted_at = hosted_at;
                record.ttl_seconds = ttl_seconds;
                record.updated_at = Utc::now();
                record
            }
            None => DomainRecord {
                name: name.to_string(),
                ip,
                whois_raw,
                hosted_at,
                ttl_seconds,
                updated_at: Utc::now(),
            },
        };

        self.store.upsert(record.clone()).await?;
        info!("Refreshed record for {} (ttl {}s)", name, record.ttl_seconds);

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dns::ARecord,
        store::MemoryDomainStore,
        whois::WhoisAnswer,
    };
    use async_trait::async_trait;
    use std::{
        net::IpAddr,
        sync::atomic::{AtomicUsize, Ordering},
    };

    const RAW_WHOIS: &str = "Domain Name: EXAMPLE.COM\n\
                             Registrar: Example Registrar, Inc.\n\
                             Name Server: ns1.example.com\n\
                             Name Server: ns2.example.com";

    struct MockDns {
        answer: Option<ARecord>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockDns {
        fn answering(address: &str, ttl_seconds: i64) -> Self {
            Self {
                answer: Some(ARecord {
                    address: address.to_string(),
                    ttl_seconds,
                }),
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn empty() -> Self {
            Self {
                answer: None,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                answer: None,
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DnsResolver for MockDns {
        async fn query_a(&self, _name: &str) -> Result<Option<ARecord>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LookupError::Dns("mock dns failure".to_string()));
            }
            Ok(self.answer.clone())
        }
    }

    struct MockWhois {
        raw: String,
        organization: Option<String>,
        fail_domain: bool,
        fail_ip: bool,
        domain_calls: AtomicUsize,
        ip_calls: AtomicUsize,
    }

    impl MockWhois {
        fn answering(raw: &str, organization: Option<&str>) -> Self {
            Self {
                raw: raw.to_string(),
                organization: organization.map(str::to_string),
                fail_domain: false,
                fail_ip: false,
                domain_calls: AtomicUsize::new(0),
                ip_calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            let mut mock = Self::answering("", None);
            mock.fail_domain = true;
            mock.fail_ip = true;
            mock
        }

        fn failing_for_ips(raw: &str) -> Self {
            let mut mock = Self::answering(raw, None);
            mock.fail_ip = true;
            mock
        }

        fn total_calls(&self) -> usize {
            self.domain_calls.load(Ordering::SeqCst) + self.ip_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WhoisResolver for MockWhois {
        async fn query(&self, target: &str) -> Result<WhoisAnswer, LookupError> {
            if target.parse::<IpAddr>().is_ok() {
                self.ip_calls.fetch_add(1, Ordering::SeqCst);
                if self.fail_ip {
                    return Err(LookupError::Whois("mock ip whois failure".to_string()));
                }
                return Ok(WhoisAnswer {
                    raw: format!("OrgName: {}", self.organization.as_deref().unwrap_or("")),
                    organization: self.organization.clone(),
                });
            }

            self.domain_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_domain {
                return Err(LookupError::Whois("mock whois failure".to_string()));
            }
            Ok(WhoisAnswer {
                raw: self.raw.clone(),
                organization: None,
            })
        }
    }

    struct FailingStore;

    #[async_trait]
    impl DomainRecordStore for FailingStore {
        async fn get(&self, _name: &str) -> Result<Option<DomainRecord>, LookupError> {
            Ok(None)
        }

        async fn upsert(&self, _record: DomainRecord) -> Result<(), LookupError> {
            Err(LookupError::Storage("mock persistence failure".to_string()))
        }
    }

    fn stale_record(name: &str, ip: &str) -> DomainRecord {
        DomainRecord {
            name: name.to_string(),
            ip: Some(ip.to_string()),
            whois_raw: Some("Name Server: old.example.com".to_string()),
            hosted_at: Some("Old Hosting".to_string()),
            ttl_seconds: 300,
            updated_at: Utc::now() - chrono::Duration::seconds(400),
        }
    }

    fn fresh_record(name: &str, ip: &str) -> DomainRecord {
        DomainRecord {
            ttl_seconds: 3600,
            updated_at: Utc::now(),
            ..stale_record(name, ip)
        }
    }

    fn build_service(
        dns: Arc<MockDns>,
        whois: Arc<MockWhois>,
    ) -> (DomainLookupService, Arc<MemoryDomainStore>) {
        let store = Arc::new(MemoryDomainStore::new());
        let service = DomainLookupService::new(dns, whois, store.clone());
        (service, store)
    }

    #[tokio::test]
    async fn rejects_invalid_input_without_touching_upstreams() {
        let dns = Arc::new(MockDns::answering("1.2.3.4", 3600));
        let whois = Arc::new(MockWhois::answering(RAW_WHOIS, None));
        let (service, _) = build_service(dns.clone(), whois.clone());

        let result = service.resolve("not a domain").await;
        assert!(matches!(result, Err(LookupError::InvalidDomain(_))));
        assert_eq!(dns.calls(), 0);
        assert_eq!(whois.total_calls(), 0);
    }

    #[tokio::test]
    async fn first_resolution_creates_and_persists_a_record() {
        let dns = Arc::new(MockDns::answering("1.2.3.4", 3600));
        let whois = Arc::new(MockWhois::answering(RAW_WHOIS, Some("Example Hosting")));
        let (service, store) = build_service(dns.clone(), whois.clone());

        let record = service.resolve("Example.COM").await.unwrap();

        assert_eq!(record.name, "example.com");
        assert_eq!(record.ip.as_deref(), Some("1.2.3.4"));
        assert_eq!(record.ttl_seconds, 3600);
        assert_eq!(record.hosted_at.as_deref(), Some("Example Hosting"));
        assert_eq!(record.whois_raw.as_deref(), Some(RAW_WHOIS));

        let stored = store.get("example.com").await.unwrap().unwrap();
        assert_eq!(stored, record);
        assert_eq!(dns.calls(), 1);
        assert_eq!(whois.total_calls(), 2); // one by name, one by ip

        let view = crate::view::DomainRecordView::from(&record);
        assert_eq!(view.name_servers, vec!["ns1.example.com", "ns2.example.com"]);
    }

    #[tokio::test]
    async fn fresh_record_is_served_with_zero_upstream_calls() {
        let dns = Arc::new(MockDns::answering("1.2.3.4", 3600));
        let whois = Arc::new(MockWhois::answering(RAW_WHOIS, None));
        let (service, store) = build_service(dns.clone(), whois.clone());

        let seeded = fresh_record("example.com", "9.9.9.9");
        store.upsert(seeded.clone()).await.unwrap();

        let record = service.resolve("example.com").await.unwrap();

        assert_eq!(record, seeded);
        assert_eq!(dns.calls(), 0);
        assert_eq!(whois.total_calls(), 0);
    }

    #[tokio::test]
    async fn second_resolution_within_ttl_does_not_requery() {
        let dns = Arc::new(MockDns::answering("1.2.3.4", 3600));
        let whois = Arc::new(MockWhois::answering(RAW_WHOIS, Some("Example Hosting")));
        let (service, _) = build_service(dns.clone(), whois.clone());

        let first = service.resolve("example.com").await.unwrap();
        let dns_calls = dns.calls();
        let whois_calls = whois.total_calls();

        let second = service.resolve("example.com").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(dns.calls(), dns_calls);
        assert_eq!(whois.total_calls(), whois_calls);
    }

    #[tokio::test]
    async fn normalized_input_shares_the_cache_key() {
        let dns = Arc::new(MockDns::answering("1.2.3.4", 3600));
        let whois = Arc::new(MockWhois::answering(RAW_WHOIS, None));
        let (service, store) = build_service(dns.clone(), whois.clone());

        service.resolve("  EXAMPLE.com ").await.unwrap();
        let calls_after_first = dns.calls();

        service.resolve("example.com").await.unwrap();

        assert_eq!(dns.calls(), calls_after_first);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn stale_record_is_refreshed_in_place() {
        let dns = Arc::new(MockDns::answering("5.6.7.8", 600));
        let whois = Arc::new(MockWhois::answering(RAW_WHOIS, Some("New Hosting")));
        let (service, store) = build_service(dns.clone(), whois.clone());

        store.upsert(stale_record("example.com", "9.9.9.9")).await.unwrap();

        let record = service.resolve("example.com").await.unwrap();

        assert_eq!(record.ip.as_deref(), Some("5.6.7.8"));
        assert_eq!(record.ttl_seconds, 600);
        assert_eq!(record.hosted_at.as_deref(), Some("New Hosting"));
        assert_eq!(dns.calls(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn hosting_lookup_failure_is_absorbed() {
        let dns = Arc::new(MockDns::answering("1.2.3.4", 3600));
        let whois = Arc::new(MockWhois::failing_for_ips(RAW_WHOIS));
        let (service, store) = build_service(dns.clone(), whois.clone());

        let record = service.resolve("example.com").await.unwrap();

        assert_eq!(record.ip.as_deref(), Some("1.2.3.4"));
        assert_eq!(record.hosted_at, None);
        assert!(store.get("example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn zero_a_records_persists_without_address() {
        let dns = Arc::new(MockDns::empty());
        let whois = Arc::new(MockWhois::answering(RAW_WHOIS, Some("Unused")));
        let (service, store) = build_service(dns.clone(), whois.clone());

        let record = service.resolve("example.com").await.unwrap();

        assert_eq!(record.ip, None);
        assert_eq!(record.ttl_seconds, 0);
        assert_eq!(record.hosted_at, None);
        assert_eq!(record.whois_raw.as_deref(), Some(RAW_WHOIS));
        assert_eq!(whois.total_calls(), 1); // no address, no hosting lookup
        assert!(store.get("example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn refresh_failure_without_prior_record_fails() {
        let dns = Arc::new(MockDns::failing());
        let whois = Arc::new(MockWhois::failing());
        let (service, store) = build_service(dns, whois);

        let result = service.resolve("example.com").await;

        assert!(matches!(result, Err(LookupError::LookupFailed(_))));
        assert!(store.get("example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn whois_failure_is_fatal_even_when_dns_answers() {
        let dns = Arc::new(MockDns::answering("1.2.3.4", 3600));
        let mut whois = MockWhois::answering("", None);
        whois.fail_domain = true;
        let (service, _) = build_service(dns, Arc::new(whois));

        let result = service.resolve("example.com").await;
        assert!(matches!(result, Err(LookupError::LookupFailed(_))));
    }

    #[tokio::test]
    async fn refresh_failure_serves_the_stale_record_unchanged() {
        let dns = Arc::new(MockDns::failing());
        let whois = Arc::new(MockWhois::failing());
        let (service, store) = build_service(dns, whois);

        let seeded = stale_record("example.com", "9.9.9.9");
        store.upsert(seeded.clone()).await.unwrap();

        let record = service.resolve("example.com").await.unwrap();

        assert_eq!(record, seeded);
        assert_eq!(store.get("example.com").await.unwrap().unwrap(), seeded);
    }

    #[tokio::test]
    async fn storage_failure_is_fatal() {
        let dns = Arc::new(MockDns::answering("1.2.3.4", 3600));
        let whois = Arc::new(MockWhois::answering(RAW_WHOIS, None));
        let service =
            DomainLookupService::new(dns, whois, Arc::new(FailingStore));

        let result = service.resolve("example.com").await;
        assert!(matches!(result, Err(LookupError::Storage(_))));
    }
}
