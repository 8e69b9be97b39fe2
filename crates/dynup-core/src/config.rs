//! Configuration types for the dynup system
//!
//! This module defines the settings file structure and its validation.
//! Loading the file from disk is the daemon's job; parsing and
//! validating the contents live here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Address-family token for the IPv4 interface mapping
pub const AF_INET: &str = "AF_INET";
/// Address-family token for the IPv6 interface mapping
pub const AF_INET6: &str = "AF_INET6";

/// Main dynup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Hostname whose records are managed (e.g., "home.example.com")
    pub hostname: String,

    /// Seconds between reconciliation cycles
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Path of the previous-address state file
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Path of the pid file taken as the single-instance lock
    #[serde(default = "default_pid_file")]
    pub pid_file: String,

    /// DNS provider API settings
    pub provider: ProviderSettings,

    /// Address-family token ("AF_INET" / "AF_INET6") to interface name
    #[serde(default)]
    pub interfaces: HashMap<String, String>,

    /// External-IP lookup settings
    #[serde(default)]
    pub external: ExternalSettings,
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, crate::Error> {
        toml::from_str(content)
            .map_err(|e| crate::Error::config(format!("Failed to parse configuration: {e}")))
    }

    /// Validate the configuration
    ///
    /// Interface tokens are checked separately by [`Settings::interface_map`],
    /// since an unknown token is its own failure condition with its own
    /// exit code.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.hostname.is_empty() {
            return Err(crate::Error::config("Hostname cannot be empty"));
        }
        if self.update_interval_secs == 0 {
            return Err(crate::Error::config("Update interval must be > 0"));
        }
        if self.interfaces.is_empty() {
            return Err(crate::Error::config("No interfaces configured"));
        }

        self.provider.validate()?;
        self.external.validate()?;

        Ok(())
    }

    /// Resolve the interface table into per-version interface names
    ///
    /// # Returns
    ///
    /// - `Ok(InterfaceMap)`: the recognized mappings
    /// - `Err(Error::InvalidAddressFamily)`: a token other than
    ///   "AF_INET" / "AF_INET6" appears in the table
    pub fn interface_map(&self) -> Result<InterfaceMap, crate::Error> {
        let mut map = InterfaceMap::default();
        for (family, interface) in &self.interfaces {
            match family.as_str() {
                AF_INET => map.v4 = Some(interface.clone()),
                AF_INET6 => map.v6 = Some(interface.clone()),
                other => return Err(crate::Error::invalid_family(other)),
            }
        }
        Ok(map)
    }
}

/// Interface names by IP version, resolved from the family tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceMap {
    /// Interface queried for the IPv4 candidate
    pub v4: Option<String>,
    /// Interface queried for the IPv6 candidate
    pub v6: Option<String>,
}

impl InterfaceMap {
    /// Whether no interface is mapped for either version
    pub fn is_empty(&self) -> bool {
        self.v4.is_none() && self.v6.is_none()
    }
}

/// DNS provider API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Account API key, sent with every request
    pub api_key: String,
}

impl ProviderSettings {
    /// Validate the provider settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_key.is_empty() {
            return Err(crate::Error::config("Provider API key cannot be empty"));
        }
        if self.api_url.is_empty() {
            return Err(crate::Error::config("Provider API URL cannot be empty"));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(crate::Error::config(format!(
                "Provider API URL must be http(s): {}",
                self.api_url
            )));
        }
        Ok(())
    }
}

/// External-IP lookup settings
///
/// When enabled, the externally observed IPv4 address replaces the
/// locally resolved one in every cycle. The lookup itself happens once,
/// at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalSettings {
    /// Whether external-IP mode is active
    #[serde(default)]
    pub enabled: bool,

    /// URL returning the caller's IPv4 address as plain text
    #[serde(default)]
    pub url: String,
}

impl ExternalSettings {
    /// Validate the external-IP settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.enabled && self.url.is_empty() {
            return Err(crate::Error::config(
                "External-IP mode enabled but no URL configured",
            ));
        }
        Ok(())
    }
}

fn default_update_interval_secs() -> u64 {
    300
}

fn default_state_file() -> String {
    "/var/lib/dynup/last_addresses".to_string()
}

fn default_pid_file() -> String {
    "/run/dynup.pid".to_string()
}

fn default_api_url() -> String {
    "https://api.dreamhost.com/".to_string()
}
