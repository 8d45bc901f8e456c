use std::time::Duration;

use hd_account::{DiscoveryConfig, DEFAULT_GAP_LIMIT, DEFAULT_SCAN_BOUND};
use hd_esplora_oracle::{DEFAULT_RETRY_COUNT, DEFAULT_RETRY_INTERVAL};
use hd_key_deriv::AddressKind;
use serde::{Deserialize, Serialize};

/// The configuration values that dictate how discovery is run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// The base URL of the Esplora API used to look up address activity.
    pub esplora_url: String,

    /// The number of consecutive unused addresses that ends a scan.
    #[serde(default = "default_gap_limit")]
    pub gap_limit: u32,

    /// The maximum number of addresses a single scan may check.
    #[serde(default = "default_scan_bound")]
    pub scan_bound: u32,

    /// How addresses are encoded from derived keys.
    ///
    /// This must match the encoding the account's addresses were stored with.
    #[serde(default)]
    pub address_kind: AddressKind,

    /// The number of times a failed Esplora query is retried.
    pub retry_count: Option<u32>,

    /// The pause between retries, in milliseconds.
    pub retry_interval: Option<u64>,

    /// The timeout for each Esplora request, in milliseconds.
    pub timeout: Option<u64>,
}

const fn default_gap_limit() -> u32 {
    DEFAULT_GAP_LIMIT
}

const fn default_scan_bound() -> u32 {
    DEFAULT_SCAN_BOUND
}

impl Config {
    pub(crate) const fn discovery(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            gap_limit: self.gap_limit,
            scan_bound: self.scan_bound,
        }
    }

    pub(crate) fn retry_count(&self) -> u32 {
        self.retry_count.unwrap_or(DEFAULT_RETRY_COUNT)
    }

    pub(crate) fn retry_interval(&self) -> Duration {
        self.retry_interval
            .map_or(DEFAULT_RETRY_INTERVAL, Duration::from_millis)
    }

    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_millis)
    }
}
