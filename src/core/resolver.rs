//! Destination resolution: saved address, then IP geolocation.
//!
//! The IP path chains three lookups (geo-IP, reverse geocode, province master
//! data) and memoizes the result per caller IP. Every lookup runs under the
//! configured timeout; a timeout is reported exactly like an unreachable
//! service. The cache is written only once a location is fully resolved, so
//! a resolve dropped midway leaves nothing behind.
use std::{future::Future, net::IpAddr, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use super::{
    calculator::Endpoint,
    error::{ShippingError, ShippingResult},
    region::{self, Region},
};
use crate::ports::{
    AddressBook, CacheError, CacheResult, CacheStore, GeoIpLookup, MasterData, ProvinceRecord, ReverseGeocoder,
    UpstreamError, UpstreamResult,
};

/// Prefix of per-IP location cache keys
pub const LOCATION_CACHE_PREFIX: &str = "user:location:";
/// Key suffix used when the caller IP is unknown
pub const DEFAULT_IP_KEY: &str = "default";
/// Default lifetime of cached locations and quotes
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
/// Default bound on each external call
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Latitude / longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// A resolved shipping destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub province_name: String,
    /// `region::normalize(province_name)`
    pub province_key: String,
    pub region: Region,
    #[serde(default)]
    pub ward_name: Option<String>,
    #[serde(default)]
    pub province_id: Option<u32>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

impl Location {
    pub fn new(province_name: impl Into<String>, region: Region, ward_name: Option<String>) -> Self {
        let province_name = province_name.into();
        Self {
            province_key: region::normalize(&province_name),
            province_name,
            region,
            ward_name,
            province_id: None,
            coordinates: None,
        }
    }

    /// The calculator's view of this location.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            province: self.province_name.clone(),
            region: Some(self.region),
            ward: self.ward_name.clone(),
        }
    }
}

/// Cache key for a caller IP, `user:location:<ip>` or `user:location:default`.
pub fn location_cache_key(ip: Option<&str>) -> String {
    let ip = ip.filter(|ip| !ip.is_empty()).unwrap_or(DEFAULT_IP_KEY);
    format!("{LOCATION_CACHE_PREFIX}{ip}")
}

/// Canonical text form of `ip`, or `None` when it is not an IP address.
pub fn canonical_ip(ip: Option<&str>) -> Option<String> {
    ip.and_then(|ip| ip.trim().parse::<IpAddr>().ok())
        .map(|ip| ip.to_string())
}

/// Find the province whose name or one of its variants folds to `key`.
pub fn match_province<'a>(provinces: &'a [ProvinceRecord], key: &str) -> Option<&'a ProvinceRecord> {
    provinces.iter().find(|province| {
        region::normalize(&province.province_name) == key
            || province
                .name_extension
                .iter()
                .any(|variant| region::normalize(variant) == key)
    })
}

/// Run an upstream call under `limit`, mapping failures and timeouts to
/// [`ShippingError::UpstreamUnavailable`].
pub(crate) async fn bounded<T>(
    service: &'static str,
    limit: Duration,
    call: impl Future<Output = UpstreamResult<T>>,
) -> ShippingResult<T> {
    match timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::warn!(service, error = %e, "Upstream call failed");
            Err(ShippingError::upstream(service, e))
        }
        Err(_) => {
            tracing::warn!(service, timeout = ?limit, "Upstream call timed out");
            Err(ShippingError::upstream(service, UpstreamError::Timeout(limit)))
        }
    }
}

/// Run a cache operation under `limit`; an elapsed call becomes
/// [`CacheError::Timeout`].
pub(crate) async fn bounded_cache<T>(
    limit: Duration,
    call: impl Future<Output = CacheResult<T>>,
) -> CacheResult<T> {
    timeout(limit, call)
        .await
        .unwrap_or(Err(CacheError::Timeout(limit)))
}

/// External collaborators needed to resolve a destination
#[derive(Clone)]
pub struct ResolverPorts {
    pub address_book: Arc<dyn AddressBook>,
    pub geo_ip: Arc<dyn GeoIpLookup>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
    pub master_data: Arc<dyn MasterData>,
}

/// Resolves where a caller wants goods delivered.
pub struct LocationResolver {
    ports: ResolverPorts,
    cache: Arc<dyn CacheStore>,
    cache_ttl: Duration,
    upstream_timeout: Duration,
}

impl LocationResolver {
    pub fn new(ports: ResolverPorts, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            ports,
            cache,
            cache_ttl: DEFAULT_CACHE_TTL,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_upstream_timeout(mut self, upstream_timeout: Duration) -> Self {
        self.upstream_timeout = upstream_timeout;
        self
    }

    /// Access the master-data port (shared with address canonicalization).
    pub fn master_data(&self) -> &Arc<dyn MasterData> {
        &self.ports.master_data
    }

    pub fn upstream_timeout(&self) -> Duration {
        self.upstream_timeout
    }

    /// Resolve the destination for a caller.
    ///
    /// A complete default address of `user_id` wins; otherwise the caller IP
    /// is geolocated (cached per IP).
    pub async fn resolve(
        &self,
        user_id: Option<&str>,
        caller_ip: Option<&str>,
    ) -> ShippingResult<Location> {
        if let Some(user_id) = user_id {
            if let Some(location) = self.saved_location(user_id).await {
                tracing::debug!(user_id, province = %location.province_name, "Using saved default address");
                return Ok(location);
            }
            tracing::debug!(user_id, "No complete default address, falling back to IP lookup");
        }
        self.resolve_ip(caller_ip).await
    }

    /// Resolve a caller IP to a location, consulting the cache first.
    ///
    /// Anything that does not parse as an IP address is treated as absent.
    pub async fn resolve_ip(&self, ip: Option<&str>) -> ShippingResult<Location> {
        let ip = canonical_ip(ip);
        let key = location_cache_key(ip.as_deref());

        if let Some(location) = self.cached(&key).await {
            tracing::debug!(cache_key = %key, "Location cache hit");
            return Ok(location);
        }
        tracing::debug!(cache_key = %key, "Location cache miss, querying upstream services");

        let location = self.lookup_ip(ip.as_deref()).await?;
        self.store(&key, &location).await;
        Ok(location)
    }

    async fn saved_location(&self, user_id: &str) -> Option<Location> {
        let addresses = match self
            .call_upstream("address_book", self.ports.address_book.addresses_for(user_id))
            .await
        {
            Ok(addresses) => addresses,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Address lookup failed");
                return None;
            }
        };

        let default = addresses.into_iter().find(|address| address.is_default)?;
        match (default.province_name, default.ward_name, default.region_id) {
            (Some(province), Some(ward), Some(region))
                if !province.is_empty() && !ward.is_empty() =>
            {
                Some(Location::new(province, region, Some(ward)))
            }
            _ => None,
        }
    }

    async fn lookup_ip(&self, ip: Option<&str>) -> ShippingResult<Location> {
        let info = self.call_upstream("geo_ip", self.ports.geo_ip.lookup(ip)).await?;
        let address = self
            .call_upstream("reverse_geocode", self.ports.geocoder.reverse(info.lat, info.lon))
            .await?;
        let provinces = self
            .call_upstream("master_data", self.ports.master_data.fetch_provinces())
            .await?;

        let region_key = region::normalize(&info.region);
        let province = match_province(&provinces, &region_key).ok_or_else(|| {
            tracing::warn!(region = %info.region, "No province matches geolocated region");
            ShippingError::ProvinceNotFound(info.region.clone())
        })?;
        let region = Region::try_from(province.region_id).map_err(|e| {
            ShippingError::upstream("master_data", UpstreamError::InvalidResponse(e))
        })?;

        let mut location = Location::new(province.province_name.clone(), region, address.quarter);
        location.province_id = Some(province.province_id);
        location.coordinates = Some(Coordinates {
            lat: info.lat,
            lon: info.lon,
        });
        Ok(location)
    }

    async fn call_upstream<T>(
        &self,
        service: &'static str,
        call: impl Future<Output = UpstreamResult<T>>,
    ) -> ShippingResult<T> {
        bounded(service, self.upstream_timeout, call).await
    }

    async fn cached(&self, key: &str) -> Option<Location> {
        let raw = match bounded_cache(self.upstream_timeout, self.cache.get(key)).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Location cache read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(location) => Some(location),
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Discarding undecodable cached location");
                None
            }
        }
    }

    async fn store(&self, key: &str, location: &Location) {
        let raw = match serde_json::to_string(location) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Failed to encode location");
                return;
            }
        };
        let write = self.cache.set_with_ttl(key, raw, self.cache_ttl);
        if let Err(e) = bounded_cache(self.upstream_timeout, write).await {
            tracing::warn!(cache_key = %key, error = %e, "Location cache write failed");
        }
    }
}
