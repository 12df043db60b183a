//! Whois collaborator: raw registration text for domains and IP blocks.
//!
//! One operation, two kinds of target. Domain targets are routed to the
//! registry server for their TLD (static table first, IANA referral
//! discovery for the long tail). IP targets go to the regional internet
//! registries, starting at ARIN and following referrals to the owning RIR.

use crate::{
    config::Config,
    errors::LookupError,
    parser,
    tld_servers::{DEFAULT_IP_WHOIS_SERVER, STATIC_TLD_SERVERS},
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use publicsuffix::{List, Psl};
use std::{collections::HashMap, net::IpAddr, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::RwLock,
    time::timeout,
};
use tracing::{debug, info, warn};

// Global PSL instance - shared across all resolver instances
static PSL: Lazy<List> = Lazy::new(List::new);

const IANA_WHOIS_SERVER: &str = "whois.iana.org";

const READ_CHUNK_SIZE: usize = 4096;

/// Result of a whois query: the raw response text plus the organization
/// name scanned out of it (meaningful for IP-block queries).
#[derive(Debug, Clone)]
pub struct WhoisAnswer {
    pub raw: String,
    pub organization: Option<String>,
}

#[async_trait]
pub trait WhoisResolver: Send + Sync {
    /// Query whois for `target`, which may be a domain name or an IP
    /// literal. Same operation, different routing.
    async fn query(&self, target: &str) -> Result<WhoisAnswer, LookupError>;
}

/// Production whois client speaking the port-43 protocol.
pub struct TcpWhoisResolver {
    config: Arc<Config>,
    discovered_servers: RwLock<HashMap<String, String>>,
}

impl TcpWhoisResolver {
    pub fn new(config: Arc<Config>) -> Self {
        info!("Whois resolver initialized with IANA referral discovery");
        Self {
            config,
            discovered_servers: RwLock::new(HashMap::new()),
        }
    }

    /// Route a query to the right starting server.
    async fn starting_server(&self, target: &str) -> Result<String, LookupError> {
        if target.parse::<IpAddr>().is_ok() {
            return Ok(DEFAULT_IP_WHOIS_SERVER.to_string());
        }

        let tld = self.extract_tld(target)?;
        self.find_server_for_tld(&tld).await
    }

    /// Extract the effective TLD using the public suffix list, falling back
    /// to the last label when PSL parsing fails.
    fn extract_tld(&self, domain: &str) -> Result<String, LookupError> {
        match PSL.domain(domain.as_bytes()) {
            Some(parsed) => {
                let suffix = parsed.suffix();
                std::str::from_utf8(suffix.as_bytes())
                    .map(|tld| tld.to_string())
                    .map_err(|_| {
                        LookupError::InvalidDomain(format!("Invalid UTF-8 in TLD for {}", domain))
                    })
            }
            None => {
                warn!("Public suffix parsing failed for {}, using last label", domain);
                domain
                    .rsplit('.')
                    .next()
                    .filter(|tld| !tld.is_empty())
                    .map(|tld| tld.to_string())
                    .ok_or_else(|| {
                        LookupError::InvalidDomain(format!("No TLD found in {}", domain))
                    })
            }
        }
    }

    async fn find_server_for_tld(&self, tld: &str) -> Result<String, LookupError> {
        if let Some(server) = STATIC_TLD_SERVERS.get(tld) {
            return Ok(server.to_string());
        }

        {
            let servers = self.discovered_servers.read().await;
            if let Some(server) = servers.get(tld) {
                return Ok(server.clone());
            }
        }

        if let Some(server) = self.discover_server(tld).await {
            let mut servers = self.discovered_servers.write().await;
            servers.insert(tld.to_string(), server.clone());
            return Ok(server);
        }

        Err(LookupError::UnsupportedTld(tld.to_string()))
    }

    /// Ask IANA which server is authoritative for a TLD.
    async fn discover_server(&self, tld: &str) -> Option<String> {
        debug!("Discovering whois server for TLD: {}", tld);

        match self.raw_query(IANA_WHOIS_SERVER, tld).await {
            Ok(response) => {
                if let Some(server) = extract_referral(&response) {
                    info!("Discovered whois server for {}: {}", tld, server);
                    return Some(server);
                }
                debug!("No referral found in IANA response for {}", tld);
                None
            }
            Err(e) => {
                warn!("Failed to query IANA for TLD {}: {}", tld, e);
                None
            }
        }
    }

    async fn raw_query(&self, server: &str, query: &str) -> Result<String, LookupError> {
        let query_timeout = Duration::from_secs(self.config.whois_timeout_seconds);

        let mut stream = timeout(query_timeout, TcpStream::connect((server, 43))).await??;

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", e);
        }

        let query_line = format!("{}\r\n", query);
        stream.write_all(query_line.as_bytes()).await?;

        let mut buffer = [0u8; READ_CHUNK_SIZE];
        let mut response = Vec::new();

        loop {
            match timeout(query_timeout, stream.read(&mut buffer)).await? {
                Ok(0) => break, // EOF
                Ok(n) => {
                    response.extend_from_slice(&buffer[..n]);
                    if response.len() > self.config.max_response_size {
                        return Err(LookupError::ResponseTooLarge);
                    }
                }
                Err(e) => return Err(LookupError::IoError(e)),
            }
        }

        String::from_utf8(response).map_err(|_| LookupError::InvalidUtf8)
    }

    /// Follow registrar/RIR referrals until the response stops pointing
    /// elsewhere or the hop budget runs out.
    async fn follow_referrals(
        &self,
        initial_server: &str,
        initial_data: String,
        query: &str,
    ) -> (String, String) {
        let mut current_server = initial_server.to_string();
        let mut current_data = initial_data;
        let mut referral_count = 0;

        while referral_count < self.config.max_referrals {
            let Some(referral_server) = extract_referral(&current_data) else {
                break;
            };
            if referral_server == current_server {
                break;
            }

            debug!("Following referral from {} to {}", current_server, referral_server);
            match self.raw_query(&referral_server, query).await {
                Ok(new_data) => {
                    current_server = referral_server;
                    current_data = new_data;
                    referral_count += 1;
                }
                Err(e) => {
                    warn!("Failed to query referral server {}: {}", referral_server, e);
                    break;
                }
            }
        }

        (current_server, current_data)
    }
}

#[async_trait]
impl WhoisResolver for TcpWhoisResolver {
    async fn query(&self, target: &str) -> Result<WhoisAnswer, LookupError> {
        let target = target.trim().to_lowercase();
        if target.is_empty() {
            return Err(LookupError::Whois("Empty query target".to_string()));
        }

        let server = self.starting_server(&target).await?;
        let raw = self.raw_query(&server, &target).await?;
        let (final_server, raw) = self.follow_referrals(&server, raw, &target).await;

        debug!(
            "Whois answer for {} from {} ({} bytes)",
            target,
            final_server,
            raw.len()
        );

        let organization = parser::extract_organization(&raw);

        Ok(WhoisAnswer { raw, organization })
    }
}

/// Scan a whois response for a referral to another server.
///
/// Registries spell this several ways: IANA uses `whois:` and `refer:`,
/// registrars use `Registrar WHOIS Server:`, ARIN uses `ReferralServer:`
/// with a `whois://` scheme.
fn extract_referral(data: &str) -> Option<String> {
    for line in data.lines() {
        let line = line.trim();
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if value.is_empty() {
                continue;
            }

            let is_referral_key = (key.contains("whois") && key.contains("server"))
                || key == "whois"
                || key == "refer"
                || key == "referralserver";

            if is_referral_key {
                let server = value
                    .strip_prefix("whois://")
                    .or_else(|| value.strip_prefix("rwhois://"))
                    .unwrap_or(value);
                // Drop an explicit port suffix if present
                let server = server.split(':').next().unwrap_or(server).trim();
                if !server.is_empty() {
                    return Some(server.to_string());
                }
            }
        }
    }
    None
}
