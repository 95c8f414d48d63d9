//! Memoized shipping quotes keyed by origin, weight and caller identity.
use std::{sync::Arc, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use super::{
    calculator::{Endpoint, ShipmentQuote, ShipmentRequest, ShippingCalculator, validate_weight},
    error::ShippingResult,
    region::{Region, ServiceTier},
    resolver::{
        DEFAULT_CACHE_TTL, DEFAULT_IP_KEY, Location, LocationResolver, bounded_cache, canonical_ip,
    },
};
use crate::ports::CacheStore;

/// Prefix of fee cache keys
pub const FEE_CACHE_PREFIX: &str = "shipping:fee:";

/// Source of "now" for delivery dates
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Shop address a product ships from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OriginAddress {
    #[serde(default)]
    pub province_name: Option<String>,
    #[serde(default)]
    pub region_id: Option<Region>,
}

impl OriginAddress {
    pub fn new(province_name: impl Into<String>, region: Region) -> Self {
        Self {
            province_name: Some(province_name.into()),
            region_id: Some(region),
        }
    }

    /// Province and region, when both are present.
    fn endpoint(&self) -> Option<Endpoint> {
        match (&self.province_name, self.region_id) {
            (Some(province), Some(region)) if !province.is_empty() => {
                Some(Endpoint::new(province.clone(), Some(region)))
            }
            _ => None,
        }
    }
}

/// The parts of a product that matter for shipping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductShipping {
    pub weight_kg: f64,
    #[serde(default)]
    pub origin: OriginAddress,
}

/// Who is asking for the quote
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallerIdentity {
    pub user_id: Option<String>,
    pub caller_ip: Option<String>,
}

impl CallerIdentity {
    /// A caller IP that does not parse as an address is dropped.
    pub fn new(user_id: Option<String>, caller_ip: Option<String>) -> Self {
        Self {
            user_id,
            caller_ip: canonical_ip(caller_ip.as_deref()),
        }
    }

    /// Cache partition: user id, else caller IP, else `default`.
    pub fn key(&self) -> &str {
        self.user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or_else(|| self.caller_ip.as_deref().filter(|ip| !ip.is_empty()))
            .unwrap_or(DEFAULT_IP_KEY)
    }
}

/// Quote as handed to storefront callers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub fee: Option<u64>,
    /// ISO-8601 UTC timestamp
    pub estimated_delivery_date: Option<String>,
}

impl QuoteResponse {
    pub fn is_unquotable(&self) -> bool {
        self.fee.is_none()
    }
}

/// `shipping:fee:<originProvince>:<weightKg>:<identity>`
pub fn fee_cache_key(origin_province: &str, weight_kg: f64, identity: &str) -> String {
    format!("{FEE_CACHE_PREFIX}{origin_province}:{weight_kg}:{identity}")
}

/// Quote orchestration: cache, destination resolution, pricing.
pub struct ShippingFeeCache {
    resolver: Arc<LocationResolver>,
    calculator: ShippingCalculator,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
    clock: Clock,
}

impl ShippingFeeCache {
    pub fn new(
        resolver: Arc<LocationResolver>,
        calculator: ShippingCalculator,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            resolver,
            calculator,
            cache,
            ttl: DEFAULT_CACHE_TTL,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn resolver(&self) -> &Arc<LocationResolver> {
        &self.resolver
    }

    pub fn calculator(&self) -> &ShippingCalculator {
        &self.calculator
    }

    /// Quote shipping of one product to the caller.
    ///
    /// # Returns
    /// An empty response when the product's origin is incomplete; such
    /// responses are never cached.
    pub async fn quote(
        &self,
        product: &ProductShipping,
        tier: ServiceTier,
        caller: &CallerIdentity,
    ) -> ShippingResult<QuoteResponse> {
        let Some(origin) = product.origin.endpoint() else {
            tracing::debug!("Origin incomplete, product is unquotable");
            return Ok(QuoteResponse::default());
        };
        validate_weight(product.weight_kg)?;

        let key = fee_cache_key(&origin.province, product.weight_kg, caller.key());
        if let Some(hit) = self.cached(&key).await {
            tracing::debug!(cache_key = %key, "Fee cache hit");
            return Ok(hit);
        }
        tracing::debug!(cache_key = %key, "Fee cache miss");

        let destination = self
            .resolver
            .resolve(caller.user_id.as_deref(), caller.caller_ip.as_deref())
            .await?;
        let response = self.price(origin, product.weight_kg, tier, &destination)?;
        self.store(&key, &response).await;
        Ok(response)
    }

    /// Quote several products for one caller.
    ///
    /// Cache lookups run concurrently; the destination is resolved at most
    /// once for all misses. Results keep the input order.
    pub async fn quote_many(
        &self,
        products: &[ProductShipping],
        tier: ServiceTier,
        caller: &CallerIdentity,
    ) -> ShippingResult<Vec<QuoteResponse>> {
        let mut pending = Vec::new();
        for (index, product) in products.iter().enumerate() {
            if let Some(origin) = product.origin.endpoint() {
                validate_weight(product.weight_kg)?;
                let key = fee_cache_key(&origin.province, product.weight_kg, caller.key());
                pending.push((index, origin, key));
            }
        }

        let hits = join_all(pending.iter().map(|(_, _, key)| self.cached(key))).await;
        let mut responses = vec![QuoteResponse::default(); products.len()];
        let mut misses = Vec::new();
        for ((index, origin, key), hit) in pending.into_iter().zip(hits) {
            match hit {
                Some(response) => responses[index] = response,
                None => misses.push((index, origin, key)),
            }
        }
        tracing::debug!(
            products = products.len(),
            misses = misses.len(),
            "Batch quote cache lookups done"
        );
        if misses.is_empty() {
            return Ok(responses);
        }

        let destination = self
            .resolver
            .resolve(caller.user_id.as_deref(), caller.caller_ip.as_deref())
            .await?;
        for (index, origin, key) in misses {
            let response = self.price(origin, products[index].weight_kg, tier, &destination)?;
            self.store(&key, &response).await;
            responses[index] = response;
        }
        Ok(responses)
    }

    fn price(
        &self,
        origin: Endpoint,
        weight_kg: f64,
        tier: ServiceTier,
        destination: &Location,
    ) -> ShippingResult<QuoteResponse> {
        let request = ShipmentRequest {
            weight_kg,
            origin,
            destination: destination.endpoint(),
            tier,
        };
        let quote = self.calculator.quote(&request)?;
        Ok(self.respond(quote))
    }

    fn respond(&self, quote: ShipmentQuote) -> QuoteResponse {
        let estimated_delivery_date = quote.eta_days.map(|days| {
            let eta = (self.clock)() + chrono::Duration::days(i64::from(days));
            eta.to_rfc3339_opts(SecondsFormat::Millis, true)
        });
        QuoteResponse {
            fee: quote.fee,
            estimated_delivery_date,
        }
    }

    async fn cached(&self, key: &str) -> Option<QuoteResponse> {
        let limit = self.resolver.upstream_timeout();
        let raw = match bounded_cache(limit, self.cache.get(key)).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Fee cache read failed");
                return None;
            }
        };
        match serde_json::from_str::<QuoteResponse>(&raw) {
            Ok(response) if !response.is_unquotable() => Some(response),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Discarding undecodable cached quote");
                None
            }
        }
    }

    async fn store(&self, key: &str, response: &QuoteResponse) {
        if response.is_unquotable() {
            return;
        }
        let raw = match serde_json::to_string(response) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Failed to encode quote");
                return;
            }
        };
        let write = self.cache.set_with_ttl(key, raw, self.ttl);
        if let Err(e) = bounded_cache(self.resolver.upstream_timeout(), write).await {
            tracing::warn!(cache_key = %key, error = %e, "Fee cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::TimeZone;

    use super::*;
    use crate::{
        adapters::MemoryCacheStore,
        core::{
            ShippingError,
            fakes::{FailingCache, Fakes, HangingCache},
        },
        ports::SavedAddress,
    };

    fn fixed_clock() -> Clock {
        Arc::new(|| Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap())
    }

    fn engine(fakes: &Fakes, cache: Arc<dyn CacheStore>) -> ShippingFeeCache {
        let resolver = Arc::new(LocationResolver::new(fakes.ports(), cache.clone()));
        ShippingFeeCache::new(resolver, ShippingCalculator::default(), cache).with_clock(fixed_clock())
    }

    fn hanoi_product(weight_kg: f64) -> ProductShipping {
        ProductShipping {
            weight_kg,
            origin: OriginAddress::new("Hà Nội", Region::HaNoi),
        }
    }

    fn from_ip(ip: &str) -> CallerIdentity {
        CallerIdentity::new(None, Some(ip.to_string()))
    }

    #[test]
    fn test_fee_cache_key_format() {
        assert_eq!(
            fee_cache_key("Hà Nội", 0.5, "user-1"),
            "shipping:fee:Hà Nội:0.5:user-1"
        );
        assert_eq!(fee_cache_key("Huế", 2.0, "1.2.3.4"), "shipping:fee:Huế:2:1.2.3.4");
    }

    #[test]
    fn test_identity_prefers_user_id() {
        let caller = CallerIdentity::new(Some("user-1".into()), Some("1.2.3.4".into()));
        assert_eq!(caller.key(), "user-1");
        assert_eq!(from_ip("1.2.3.4").key(), "1.2.3.4");
        assert_eq!(CallerIdentity::default().key(), "default");
        assert_eq!(from_ip("1.2.3.4/../x").key(), "default");
    }

    #[tokio::test]
    async fn test_same_province_quote_with_date() {
        let fakes = Fakes::hanoi();
        let engine = engine(&fakes, Arc::new(MemoryCacheStore::new()));

        let response = engine
            .quote(&hanoi_product(0.5), ServiceTier::Standard, &from_ip("203.0.113.7"))
            .await
            .unwrap();
        assert_eq!(response.fee, Some(22000));
        assert_eq!(
            response.estimated_delivery_date.as_deref(),
            Some("2024-03-02T08:00:00.000Z")
        );
    }

    #[tokio::test]
    async fn test_repeat_quote_recomputes_at_most_once() {
        let fakes = Fakes::hanoi();
        let cache = Arc::new(MemoryCacheStore::new());
        let engine = engine(&fakes, cache.clone());
        let caller = from_ip("203.0.113.7");

        let first = engine
            .quote(&hanoi_product(1.0), ServiceTier::Standard, &caller)
            .await
            .unwrap();
        let second = engine
            .quote(&hanoi_product(1.0), ServiceTier::Standard, &caller)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(fakes.upstream_calls(), 3);
        assert!(
            cache
                .get("shipping:fee:Hà Nội:1:203.0.113.7")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_missing_origin_region_is_unquotable_and_uncached() {
        let fakes = Fakes::hanoi();
        let cache = Arc::new(MemoryCacheStore::new());
        let engine = engine(&fakes, cache.clone());
        let product = ProductShipping {
            weight_kg: 0.5,
            origin: OriginAddress {
                province_name: Some("Hà Nội".into()),
                region_id: None,
            },
        };

        let response = engine
            .quote(&product, ServiceTier::Standard, &from_ip("203.0.113.7"))
            .await
            .unwrap();
        assert_eq!(response, QuoteResponse::default());
        assert_eq!(fakes.upstream_calls(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_weight_is_rejected_before_lookup() {
        let fakes = Fakes::hanoi();
        let engine = engine(&fakes, Arc::new(MemoryCacheStore::new()));

        let err = engine
            .quote(&hanoi_product(0.0), ServiceTier::Standard, &from_ip("203.0.113.7"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShippingError::Validation(_)));
        assert_eq!(fakes.upstream_calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_returns_quote() {
        let fakes = Fakes::hanoi();
        let engine = engine(&fakes, Arc::new(FailingCache::default()));

        let response = engine
            .quote(&hanoi_product(0.5), ServiceTier::Standard, &from_ip("203.0.113.7"))
            .await
            .unwrap();
        assert_eq!(response.fee, Some(22000));
    }

    #[tokio::test]
    async fn test_hung_cache_does_not_block_quote() {
        let fakes = Fakes::hanoi();
        let cache: Arc<dyn CacheStore> = Arc::new(HangingCache);
        let resolver = Arc::new(
            LocationResolver::new(fakes.ports(), cache.clone())
                .with_upstream_timeout(Duration::from_millis(100)),
        );
        let engine = ShippingFeeCache::new(resolver, ShippingCalculator::default(), cache);

        let response = tokio::time::timeout(
            Duration::from_secs(2),
            engine.quote(&hanoi_product(0.5), ServiceTier::Standard, &from_ip("203.0.113.7")),
        )
        .await
        .expect("quote should not hang on the cache")
        .unwrap();
        assert_eq!(response.fee, Some(22000));
    }

    #[tokio::test]
    async fn test_concurrent_misses_on_same_key_both_complete() {
        let fakes = Fakes::hanoi().with_geo_delay(Duration::from_millis(50));
        let cache = Arc::new(MemoryCacheStore::new());
        let engine = engine(&fakes, cache.clone());
        let caller = from_ip("203.0.113.7");
        let product = hanoi_product(1.0);

        let (first, second) = tokio::join!(
            engine.quote(&product, ServiceTier::Standard, &caller),
            engine.quote(&product, ServiceTier::Standard, &caller),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(first, second);
        assert_eq!(first.fee, Some(22000));
        // No lock: both callers missed and went upstream
        assert_eq!(fakes.geo_ip.calls.load(Ordering::SeqCst), 2);
        // One fee entry and one location entry, last write wins
        assert_eq!(cache.len(), 2);
        let cached = cache
            .get("shipping:fee:Hà Nội:1:203.0.113.7")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(serde_json::from_str::<QuoteResponse>(&cached).unwrap(), first);
    }

    #[tokio::test]
    async fn test_resolver_errors_propagate() {
        let fakes = Fakes::with_geo_region("Atlantis");
        let cache = Arc::new(MemoryCacheStore::new());
        let engine = engine(&fakes, cache.clone());

        let err = engine
            .quote(&hanoi_product(0.5), ServiceTier::Standard, &from_ip("203.0.113.7"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_user_default_address_drives_destination() {
        let fakes = Fakes::hanoi().with_address(
            "user-1",
            SavedAddress {
                province_name: Some("Hồ Chí Minh".into()),
                ward_name: Some("Xã Bình Chánh".into()),
                region_id: Some(Region::HoChiMinh),
                is_default: true,
            },
        );
        let engine = engine(&fakes, Arc::new(MemoryCacheStore::new()));
        let caller = CallerIdentity::new(Some("user-1".into()), Some("203.0.113.7".into()));

        let response = engine
            .quote(&hanoi_product(0.5), ServiceTier::Fast, &caller)
            .await
            .unwrap();
        // Different region, rural destination
        assert_eq!(response.fee, Some(55000));
        assert_eq!(fakes.upstream_calls(), 0);
    }

    #[tokio::test]
    async fn test_quote_many_resolves_destination_once() {
        let fakes = Fakes::hanoi();
        let cache = Arc::new(MemoryCacheStore::new());
        let engine = engine(&fakes, cache.clone());
        let caller = from_ip("203.0.113.7");

        // Warm one entry
        engine
            .quote(&hanoi_product(0.5), ServiceTier::Standard, &caller)
            .await
            .unwrap();
        // Drop the location so the batch must resolve again
        let fresh = Arc::new(MemoryCacheStore::new());
        let warm = cache
            .get("shipping:fee:Hà Nội:0.5:203.0.113.7")
            .await
            .unwrap()
            .unwrap();
        fresh
            .set_with_ttl("shipping:fee:Hà Nội:0.5:203.0.113.7", warm, DEFAULT_CACHE_TTL)
            .await
            .unwrap();
        let engine = self::engine(&fakes, fresh);
        let before = fakes.geo_ip.calls.load(Ordering::SeqCst);

        let products = vec![
            hanoi_product(0.5),
            ProductShipping {
                weight_kg: 1.0,
                origin: OriginAddress::default(),
            },
            hanoi_product(4.0),
            ProductShipping {
                weight_kg: 0.5,
                origin: OriginAddress::new("Đà Nẵng", Region::DaNang),
            },
        ];
        let responses = engine
            .quote_many(&products, ServiceTier::Standard, &caller)
            .await
            .unwrap();

        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0].fee, Some(22000));
        assert!(responses[1].is_unquotable());
        // 22000 + ceil((4 - 3) / 0.5) * 2500
        assert_eq!(responses[2].fee, Some(27000));
        // Đà Nẵng -> Hà Nội is a special route
        assert_eq!(responses[3].fee, Some(30000));
        assert_eq!(fakes.geo_ip.calls.load(Ordering::SeqCst), before + 1);
    }

    #[tokio::test]
    async fn test_quote_many_all_hits_skips_resolver() {
        let fakes = Fakes::hanoi();
        let engine = engine(&fakes, Arc::new(MemoryCacheStore::new()));
        let caller = from_ip("203.0.113.7");
        let products = vec![hanoi_product(0.5), hanoi_product(1.5)];

        engine
            .quote_many(&products, ServiceTier::Standard, &caller)
            .await
            .unwrap();
        let calls = fakes.upstream_calls();
        let again = engine
            .quote_many(&products, ServiceTier::Standard, &caller)
            .await
            .unwrap();
        assert_eq!(again[1].fee, Some(22000));
        assert_eq!(fakes.upstream_calls(), calls);
    }
}
