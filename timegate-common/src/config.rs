// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Static boot configuration: credentials, thresholds and timings.

use core::fmt;

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

/// Earliest year accepted from the time service.
pub const MIN_VALID_YEAR: u16 = 2025;
/// Time-sync attempts before the boot is declared failed.
pub const MAX_TIME_RETRIES: u8 = 5;
/// Station link budget, in one-second polls.
pub const CONNECT_TIMEOUT_SECS: u32 = 15;
/// Fixed wait between time-sync attempts (after the retry pulse).
pub const RETRY_BACKOFF_MS: u32 = 2_000;
/// Wait before restarting when the network never came up.
pub const NETWORK_FAILURE_RESTART_DELAY_MS: u32 = 5_000;
/// Window between entering the time-failure state and the restart.
/// The panic pattern plays inside this window.
pub const TIME_FAILURE_RESTART_DELAY_MS: u32 = 10_000;
pub const DEFAULT_NTP_SERVER: &str = "pool.ntp.org";

pub const MAX_NETWORKS: usize = 4;
pub const SSID_CAPACITY: usize = 32;
pub const PASSWORD_CAPACITY: usize = 64;
pub const HOST_CAPACITY: usize = 64;

/// Timezone offsets accepted by the ESP-AT `AT+CIPSNTPCFG` command.
const UTC_OFFSET_RANGE: core::ops::RangeInclusive<i8> = -12..=14;

/// One known network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Credential {
    pub ssid: String<SSID_CAPACITY>,
    pub password: String<PASSWORD_CAPACITY>,
}

impl Credential {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            ssid: String::try_from(ssid).map_err(|_| ConfigError::FieldTooLong)?,
            password: String::try_from(password).map_err(|_| ConfigError::FieldTooLong)?,
        })
    }
}

/// Known networks, in preference order.
pub type NetworkCredentials = Vec<Credential, MAX_NETWORKS>;

/// Which credential entries a connection attempt may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "kebab-case")]
pub enum CredentialPolicy {
    /// Join the first entry only; the rest of the list is ignored.
    #[default]
    FirstOnly,
    /// Try each entry in order, each with the full poll budget.
    InOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct BootConfig {
    pub networks: NetworkCredentials,
    pub credential_policy: CredentialPolicy,
    pub connect_timeout_secs: u32,
    pub min_valid_year: u16,
    pub max_time_retries: u8,
    pub retry_backoff_ms: u32,
    pub network_failure_restart_delay_ms: u32,
    pub time_failure_restart_delay_ms: u32,
    pub ntp_server: String<HOST_CAPACITY>,
    pub utc_offset_hours: i8,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            networks: Vec::new(),
            credential_policy: CredentialPolicy::FirstOnly,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            min_valid_year: MIN_VALID_YEAR,
            max_time_retries: MAX_TIME_RETRIES,
            retry_backoff_ms: RETRY_BACKOFF_MS,
            network_failure_restart_delay_ms: NETWORK_FAILURE_RESTART_DELAY_MS,
            time_failure_restart_delay_ms: TIME_FAILURE_RESTART_DELAY_MS,
            ntp_server: String::try_from(DEFAULT_NTP_SERVER).unwrap_or_default(),
            utc_offset_hours: 0,
        }
    }
}

impl BootConfig {
    /// Default timings with the given networks.
    pub fn with_networks(networks: NetworkCredentials) -> Self {
        Self {
            networks,
            ..Self::default()
        }
    }

    /// Check the invariants the boot sequence relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.networks.is_empty() {
            return Err(ConfigError::NoNetworks);
        }
        if self.networks.iter().any(|c| c.ssid.is_empty()) {
            return Err(ConfigError::EmptySsid);
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_time_retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        if !UTC_OFFSET_RANGE.contains(&self.utc_offset_hours) {
            return Err(ConfigError::OffsetOutOfRange);
        }
        Ok(())
    }
}

/// Configuration rejected by [`BootConfig::validate`] or a constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// No network credentials configured
    NoNetworks,
    /// A credential entry has an empty SSID
    EmptySsid,
    /// A string does not fit its fixed-capacity field
    FieldTooLong,
    /// Connection timeout of zero polls
    ZeroTimeout,
    /// Time-sync retry budget of zero
    ZeroRetries,
    /// UTC offset outside -12..=14 hours
    OffsetOutOfRange,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoNetworks => write!(f, "no network credentials configured"),
            Self::EmptySsid => write!(f, "network entry with empty SSID"),
            Self::FieldTooLong => write!(f, "value exceeds field capacity"),
            Self::ZeroTimeout => write!(f, "connect timeout must be at least one second"),
            Self::ZeroRetries => write!(f, "time sync needs at least one attempt"),
            Self::OffsetOutOfRange => write!(f, "UTC offset must be within -12..=14 hours"),
        }
    }
}

impl core::error::Error for ConfigError {}
