// # DreamHost DNS Record Store
//
// This crate provides the DreamHost implementation of the RecordStore
// trait for the dynup system.
//
// The DreamHost API has no in-place record update: a record is replaced
// by removing the old one and adding a new one. The store stays a thin
// request/response client; deciding what to remove or add is the
// engine's job.
//
// ## API Reference
//
// Every command is a signed GET against the API endpoint, with the
// account key, the command name, and `format=json` as query parameters.
// Responses are a JSON envelope `{"result": ..., "data": ...}` where
// `"result": "success"` marks acceptance.
//
// - List:   `cmd=dns-list_records`
// - Remove: `cmd=dns-remove_record&record=...&type=...&value=...`
// - Add:    `cmd=dns-add_record&record=...&type=...&value=...&comment=...`
//
// A remove request must carry exactly the record/type/value triple as
// reported by the listing; the API refuses requests with extra fields.
//
// ## Security Requirements
//
// - The API key NEVER appears in logs or Debug output

use async_trait::async_trait;
use dynup_core::traits::{DnsRecord, RecordKind, RecordStore};
use dynup_core::{Error, Result};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Comment attached to records this tool creates
const ADD_COMMENT: &str = "Automated DNS update by dynup";

/// Envelope result value marking an accepted command
const RESULT_SUCCESS: &str = "success";

/// DreamHost record store
///
/// Isolated, stateless, single-shot: one API call per method, full error
/// propagation to the engine.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API key.
pub struct DreamhostStore {
    /// API endpoint
    api_url: String,

    /// Account API key, sent as the `key` parameter on every request
    api_key: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for DreamhostStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DreamhostStore")
            .field("api_url", &self.api_url)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

/// Response envelope common to every command
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    result: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl ApiEnvelope {
    /// Provider-reported detail for a refused command.
    ///
    /// DreamHost puts the reason ("no_such_record", ...) in `data` when
    /// it refuses; fall back to the result word itself.
    fn detail(&self) -> String {
        self.data
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| self.result.clone())
    }
}

/// One row of the `dns-list_records` response
#[derive(Debug, Deserialize)]
struct WireRecord {
    record: String,
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(default)]
    editable: String,
}

impl WireRecord {
    /// Map a wire row into the core record type.
    ///
    /// Rows that are not address records, or whose value does not parse
    /// as an address of the declared type, yield `None`; they can never
    /// participate in reconciliation. The wire value text is kept
    /// verbatim so a removal echoes exactly what the provider stores.
    fn into_record(self) -> Option<DnsRecord> {
        let kind = match RecordKind::from_wire(&self.kind) {
            Some(kind) => kind,
            None => {
                tracing::debug!("Skipping {} record for {}", self.kind, self.record);
                return None;
            }
        };

        let address = match kind {
            RecordKind::A => self.value.trim().parse::<Ipv4Addr>().ok().map(IpAddr::V4),
            RecordKind::Aaaa => self.value.trim().parse::<Ipv6Addr>().ok().map(IpAddr::V6),
        };
        let address = match address {
            Some(address) => address,
            None => {
                tracing::debug!(
                    "Skipping {} record for {} with unparseable value {:?}",
                    self.kind,
                    self.record,
                    self.value
                );
                return None;
            }
        };

        // DreamHost reports editability as the strings "0" / "1"
        let editable = self.editable == "1";

        Some(DnsRecord {
            name: self.record,
            kind,
            address,
            value: self.value,
            editable,
        })
    }
}

impl DreamhostStore {
    /// Create a new DreamHost record store
    ///
    /// # Parameters
    ///
    /// - `api_url`: API endpoint (normally `https://api.dreamhost.com/`)
    /// - `api_key`: account API key with dns-* permissions
    ///
    /// # Returns
    ///
    /// - `Ok(DreamhostStore)`: ready to issue requests
    /// - `Err(Error::ProviderSetup)`: empty key or HTTP client
    ///   construction failure, both fatal at startup
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::provider_setup("DreamHost API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::provider_setup(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_url: api_url.into(),
            api_key,
            client,
        })
    }

    /// The remove parameter triple, exactly as the API requires.
    ///
    /// Nothing else from the record (comment, editability) may travel
    /// with a removal.
    fn remove_params(record: &DnsRecord) -> [(&'static str, String); 3] {
        [
            ("record", record.name.clone()),
            ("type", record.kind.as_str().to_string()),
            ("value", record.value.clone()),
        ]
    }

    /// The add parameter set: record/type/value plus the fixed comment
    fn add_params(hostname: &str, address: IpAddr) -> [(&'static str, String); 4] {
        [
            ("record", hostname.to_string()),
            ("type", RecordKind::for_address(address).as_str().to_string()),
            ("value", address.to_string()),
            ("comment", ADD_COMMENT.to_string()),
        ]
    }

    /// Issue one signed GET command and check the envelope.
    ///
    /// # Returns
    ///
    /// - `Ok(ApiEnvelope)`: the provider accepted the command
    /// - `Err(Error::ProviderRejected)`: envelope result was not "success"
    /// - `Err(Error::Transport)`: request failure, non-success HTTP
    ///   status, or an undecodable envelope
    async fn call(&self, cmd: &str, extra: &[(&'static str, String)]) -> Result<ApiEnvelope> {
        let mut params: Vec<(&str, String)> = vec![
            ("key", self.api_key.clone()),
            ("cmd", cmd.to_string()),
            ("format", "json".to_string()),
        ];
        for (name, value) in extra {
            params.push((name, value.clone()));
        }

        tracing::debug!("DreamHost API call: {}", cmd);

        let response = self
            .client
            .get(&self.api_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::transport(format!("{cmd} request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::transport(format!(
                "{cmd} returned HTTP {}",
                response.status()
            )));
        }

        let envelope: ApiEnvelope = response
            .json()
            .await
            .map_err(|e| Error::transport(format!("{cmd} response is not valid JSON: {e}")))?;

        if envelope.result != RESULT_SUCCESS {
            return Err(Error::rejected(cmd, envelope.detail()));
        }

        Ok(envelope)
    }
}

#[async_trait]
impl RecordStore for DreamhostStore {
    async fn list_records(&self) -> Result<Vec<DnsRecord>> {
        let envelope = self.call("dns-list_records", &[]).await?;

        let rows: Vec<WireRecord> = serde_json::from_value(envelope.data)
            .map_err(|e| Error::transport(format!("dns-list_records data is malformed: {e}")))?;

        let records: Vec<DnsRecord> = rows
            .into_iter()
            .filter_map(WireRecord::into_record)
            .collect();

        tracing::debug!("DreamHost reports {} address records", records.len());
        Ok(records)
    }

    async fn remove_record(&self, record: &DnsRecord) -> Result<()> {
        tracing::debug!(
            "Removing {} record {} = {}",
            record.kind,
            record.name,
            record.value
        );

        self.call("dns-remove_record", &Self::remove_params(record))
            .await?;
        Ok(())
    }

    async fn add_record(&self, hostname: &str, address: IpAddr) -> Result<()> {
        tracing::debug!("Adding record {} = {}", hostname, address);

        self.call("dns-add_record", &Self::add_params(hostname, address))
            .await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "dreamhost"
    }
}
