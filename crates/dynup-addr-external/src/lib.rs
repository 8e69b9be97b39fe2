// # External Address Source
//
// This crate provides the external-IP decorator for the dynup system.
//
// ## Purpose
//
// Hosts behind NAT hold interface addresses that are not what the world
// sees. In external-IP mode the externally observed IPv4 address
// replaces the locally resolved one in every cycle; IPv6 stays locally
// sourced, since the lookup services only report v4.
//
// ## Startup Contract
//
// The external address is fetched exactly once, when the source is
// built. Any failure (transport, non-200 status, a body that is not an
// IPv4 address) is fatal at startup; the daemon must not start
// publishing a v4 address it could not confirm.

use async_trait::async_trait;
use dynup_core::traits::{AddressSet, AddressSource};
use dynup_core::{Error, Result};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tracing::info;

/// HTTP timeout for the external lookup
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Decorator source carrying the externally observed IPv4 address
///
/// Wraps another [`AddressSource`] and overwrites the IPv4 slot of
/// everything it resolves.
pub struct ExternalSource {
    /// The wrapped local source
    inner: Box<dyn AddressSource>,

    /// The address observed at startup
    external_v4: Ipv4Addr,
}

impl ExternalSource {
    /// Build the decorator, performing the one startup lookup
    ///
    /// # Parameters
    ///
    /// - `inner`: the local source whose v4 slot gets overridden
    /// - `url`: service returning the caller's IPv4 address as plain text
    ///
    /// # Returns
    ///
    /// - `Ok(ExternalSource)`: lookup succeeded
    /// - `Err(Error::ExternalAddressUnavailable)`: any lookup failure
    pub async fn new(inner: Box<dyn AddressSource>, url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .map_err(|e| Error::external_address(format!("Failed to build HTTP client: {e}")))?;

        let external_v4 = fetch_external_v4(&client, url).await?;
        info!("External IPv4 address: {}", external_v4);

        Ok(Self { inner, external_v4 })
    }

    /// Build with a known address, skipping the lookup
    ///
    /// This constructor is public for contract tests and for callers
    /// that obtained the address some other way.
    pub fn with_address(inner: Box<dyn AddressSource>, external_v4: Ipv4Addr) -> Self {
        Self { inner, external_v4 }
    }
}

#[async_trait]
impl AddressSource for ExternalSource {
    async fn current_addresses(&self) -> Result<AddressSet> {
        let mut set = self.inner.current_addresses().await?;
        set.insert(IpAddr::V4(self.external_v4));
        Ok(set)
    }
}

/// One GET to the lookup service
async fn fetch_external_v4(client: &reqwest::Client, url: &str) -> Result<Ipv4Addr> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::external_address(format!("Request to {url} failed: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::external_address(format!(
            "{url} returned HTTP {}",
            response.status()
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| Error::external_address(format!("Failed to read response body: {e}")))?;

    parse_external_body(&body)
}

/// Parse a lookup-service body into an IPv4 address
///
/// Services answer with the bare address plus assorted whitespace; an
/// IPv6 answer is rejected, there is no external IPv6 discovery here.
fn parse_external_body(body: &str) -> Result<Ipv4Addr> {
    let text = body.trim();
    match text.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => Ok(v4),
        Ok(IpAddr::V6(v6)) => Err(Error::external_address(format!(
            "Expected an IPv4 address, got {v6}"
        ))),
        Err(_) => Err(Error::external_address(format!(
            "Response is not an IP address: {text:?}"
        ))),
    }
}
