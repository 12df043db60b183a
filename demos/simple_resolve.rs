//! Simple example of using the domain-info-service library
//!
//! Run with: cargo run --example simple_resolve --no-default-features

use domain_info_service::DomainClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for better debugging
    tracing_subscriber::fmt()
        .with_env_filter("domain_info_service=info")
        .init();

    let client = DomainClient::new()?;

    let test_domains = vec!["google.com", "github.com", "rust-lang.org"];

    for domain in test_domains {
        println!("\nResolving: {}", domain);
        println!("{}", "-".repeat(50));

        match client.resolve(domain).await {
            Ok(view) => {
                println!("  IP: {}", view.ip.as_deref().unwrap_or("none"));
                println!("  Hosted at: {}", view.hosted_at.as_deref().unwrap_or("unknown"));
                for ns in &view.name_servers {
                    println!("  Name server: {}", ns);
                }
            }
            Err(e) => {
                println!("  Lookup failed: {}", e);
            }
        }
    }

    // A second resolution inside the TTL window is served from cache
    let again = client.resolve("google.com").await?;
    println!("\nCached answer for google.com: ip={:?}", again.ip);

    Ok(())
}
