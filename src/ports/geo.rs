use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::UpstreamResult;

/// Coarse location of an IP address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoIpInfo {
    pub lat: f64,
    pub lon: f64,
    /// Free-form region / province text, e.g. "Hanoi"
    pub region: String,
}

/// Street-level details from a reverse geocode
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoAddress {
    /// Ward / commune name
    #[serde(default)]
    pub quarter: Option<String>,
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// GeoIpLookup defines the port for IP geolocation
#[async_trait]
pub trait GeoIpLookup: Send + Sync + 'static {
    /// Locate an IP address
    ///
    /// # Arguments
    /// * `ip` - The caller IP, or `None` to locate the requesting host itself
    async fn lookup(&self, ip: Option<&str>) -> UpstreamResult<GeoIpInfo>;
}

/// ReverseGeocoder defines the port for coordinate to address lookups
#[async_trait]
pub trait ReverseGeocoder: Send + Sync + 'static {
    /// Resolve coordinates to address details
    async fn reverse(&self, lat: f64, lon: f64) -> UpstreamResult<GeoAddress>;
}
