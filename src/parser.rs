//! Line-oriented scanning of raw whois text.
//!
//! Whois output has no guaranteed schema; registrars disagree on field
//! names, casing and layout. The scanners here are deliberately tolerant:
//! they only ever return fewer results, never an error.

/// Extract name servers from raw whois text.
///
/// A line counts when it contains `name server:` or `nserver:` in any
/// casing; the value is whatever follows the first `:`, trimmed. Values are
/// collected in line order with duplicates and original casing preserved.
pub fn extract_name_servers(raw: &str) -> Vec<String> {
    let mut name_servers = Vec::new();

    for line in raw.lines() {
        let lower = line.to_lowercase();
        if lower.contains("name server:") || lower.contains("nserver:") {
            if let Some((_, value)) = line.split_once(':') {
                let value = value.trim();
                if !value.is_empty() {
                    name_servers.push(value.to_string());
                }
            }
        }
    }

    name_servers
}

/// Extract the organization name from raw whois text, as returned by
/// regional registries for IP-block queries (ARIN's `OrgName`, RIPE's
/// `org-name`, LACNIC's `owner`).
///
/// First match wins. Comment lines are skipped.
pub fn extract_organization(raw: &str) -> Option<String> {
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('%') || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if value.is_empty() {
                continue;
            }

            match key.as_str() {
                "orgname" | "org-name" | "organization" | "org" | "owner" => {
                    return Some(value.to_string());
                }
                _ => {}
            }
        }
    }

    None
}
