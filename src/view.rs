//! External projection of a cached record.
//!
//! Name servers are recomputed from the raw whois text at projection time
//! rather than stored, so the persisted schema stays minimal.

use crate::{parser, DomainRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRecordView {
    pub name: String,
    pub ip: Option<String>,
    pub hosted_at: Option<String>,
    pub name_servers: Vec<String>,
    pub who_is: Option<String>,
}

impl From<&DomainRecord> for DomainRecordView {
    fn from(record: &DomainRecord) -> Self {
        let name_servers = record
            .whois_raw
            .as_deref()
            .map(parser::extract_name_servers)
            .unwrap_or_default();

        DomainRecordView {
            name: record.name.clone(),
            ip: record.ip.clone(),
            hosted_at: record.hosted_at.clone(),
            name_servers,
            who_is: record.whois_raw.clone(),
        }
    }
}

/// Project an optional record; `None` signals not-found to the caller.
pub fn project(record: Option<&DomainRecord>) -> Option<DomainRecordView> {
    record.map(DomainRecordView::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn derives_name_servers_from_raw_whois() {
        let record = DomainRecord {
            name: "example.com".to_string(),
            ip: Some("1.2.3.4".to_string()),
            whois_raw: Some("Name Server: ns1.example.com\nnserver: ns2.example.com".to_string()),
            hosted_at: Some("Example Hosting".to_string()),
            ttl_seconds: 3600,
            updated_at: Utc::now(),
        };

        let view = DomainRecordView::from(&record);

        assert_eq!(view.name, "example.com");
        assert_eq!(view.ip.as_deref(), Some("1.2.3.4"));
        assert_eq!(view.hosted_at.as_deref(), Some("Example Hosting"));
        assert_eq!(view.name_servers, vec!["ns1.example.com", "ns2.example.com"]);
        assert_eq!(view.who_is, record.whois_raw);
    }

    #[test]
    fn empty_record_projects_empty_fields() {
        let record = DomainRecord {
            name: "example.com".to_string(),
            ip: None,
            whois_raw: None,
            hosted_at: None,
            ttl_seconds: 0,
            updated_at: Utc::now(),
        };

        let view = DomainRecordView::from(&record);
        assert!(view.name_servers.is_empty());
        assert!(view.who_is.is_none());
    }

    #[test]
    fn missing_record_projects_to_none() {
        assert_eq!(project(None), None);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let record = DomainRecord {
            name: "example.com".to_string(),
            ip: Some("1.2.3.4".to_string()),
            whois_raw: Some("Name Server: ns1.example.com".to_string()),
            hosted_at: Some("Example Hosting".to_string()),
            ttl_seconds: 3600,
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(DomainRecordView::from(&record)).unwrap();
        assert_eq!(json["hostedAt"], "Example Hosting");
        assert_eq!(json["nameServers"][0], "ns1.example.com");
        assert_eq!(json["whoIs"], "Name Server: ns1.example.com");
    }
}
