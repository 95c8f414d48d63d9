//! Configuration data structures for shipfee.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files. Every
//! section has defaults so a minimal config only needs credentials for the
//! upstream services.
use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    adapters::{
        geo_ip::DEFAULT_GEO_IP_URL, http_client::DEFAULT_USER_AGENT,
        master_data::DEFAULT_MASTER_DATA_URL, reverse_geocoder::DEFAULT_REVERSE_GEOCODE_URL,
    },
    core::{fee_table::FeeTable, region::ServiceTier},
    ports::SavedAddress,
};

/// Which cache store backs the location and quote caches
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// Process-local map, lost on restart
    #[default]
    Memory,
    /// Shared Redis server
    Redis,
}

/// Cache configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Required when `backend = "redis"`
    pub redis_url: Option<String>,
    /// Entry lifetime, parsed by humantime, e.g. "1h"
    pub ttl: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: None,
            ttl: "1h".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(&self.ttl)
    }
}

/// External lookup services
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Bound on every external call, parsed by humantime, e.g. "5s"
    pub timeout: String,
    pub geo_ip_url: String,
    pub geo_ip_token: Option<String>,
    pub reverse_geocode_url: String,
    /// Nominatim's usage policy requires an identifying User-Agent
    pub user_agent: String,
    pub master_data_url: String,
    pub master_data_token: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout: "5s".to_string(),
            geo_ip_url: DEFAULT_GEO_IP_URL.to_string(),
            geo_ip_token: None,
            reverse_geocode_url: DEFAULT_REVERSE_GEOCODE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            master_data_url: DEFAULT_MASTER_DATA_URL.to_string(),
            master_data_token: String::new(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(&self.timeout)
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

/// Main engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    pub listen_addr: String,
    pub default_service_tier: ServiceTier,
    pub cache: CacheConfig,
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
    /// Replaces the built-in fee table when present
    pub fee_table: Option<FeeTable>,
    /// Saved addresses keyed by user id
    pub address_book: HashMap<String, Vec<SavedAddress>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            default_service_tier: ServiceTier::Standard,
            cache: CacheConfig::default(),
            upstream: UpstreamConfig::default(),
            logging: LoggingConfig::default(),
            fee_table: None,
            address_book: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// The configured fee table, or the built-in one.
    pub fn fee_table(&self) -> FeeTable {
        self.fee_table.clone().unwrap_or_default()
    }
}
