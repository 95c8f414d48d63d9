//! Shared in-process upstreams for the integration tests.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use shipfee::{
    adapters::{MemoryCacheStore, StaticAddressBook},
    core::{LocationResolver, ResolverPorts, ShippingCalculator, ShippingFeeCache},
    ports::{
        DistrictRecord, GeoAddress, GeoIpInfo, GeoIpLookup, MasterData, ProvinceRecord,
        ReverseGeocoder, SavedAddress, UpstreamError, UpstreamResult, WardRecord,
    },
};

/// Geo-IP, reverse geocoder and master data in one stub, counting every call.
pub struct StubUpstreams {
    pub region: String,
    pub quarter: Option<String>,
    pub calls: AtomicUsize,
    pub down: AtomicBool,
}

impl StubUpstreams {
    pub fn new(region: &str, quarter: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            region: region.to_string(),
            quarter: quarter.map(str::to_string),
            calls: AtomicUsize::new(0),
            down: AtomicBool::new(false),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self, service: &str) -> UpstreamResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(UpstreamError::Unreachable(format!("{service} refused connection")));
        }
        Ok(())
    }
}

fn province(id: u32, name: &str, extensions: &[&str], region_id: u8) -> ProvinceRecord {
    ProvinceRecord {
        province_id: id,
        province_name: name.to_string(),
        name_extension: extensions.iter().map(|s| s.to_string()).collect(),
        region_id,
    }
}

#[async_trait]
impl GeoIpLookup for StubUpstreams {
    async fn lookup(&self, _ip: Option<&str>) -> UpstreamResult<GeoIpInfo> {
        self.hit("geo_ip")?;
        Ok(GeoIpInfo {
            lat: 10.7769,
            lon: 106.7009,
            region: self.region.clone(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for StubUpstreams {
    async fn reverse(&self, _lat: f64, _lon: f64) -> UpstreamResult<GeoAddress> {
        self.hit("reverse_geocode")?;
        Ok(GeoAddress {
            quarter: self.quarter.clone(),
            ..GeoAddress::default()
        })
    }
}

#[async_trait]
impl MasterData for StubUpstreams {
    async fn fetch_provinces(&self) -> UpstreamResult<Vec<ProvinceRecord>> {
        self.hit("master_data")?;
        Ok(vec![
            province(201, "Hà Nội", &["Hanoi", "TP. Hà Nội"], 2),
            province(202, "Hồ Chí Minh", &["Ho Chi Minh City", "TP.HCM"], 1),
            province(203, "Đà Nẵng", &["Da Nang"], 3),
            province(249, "Bắc Ninh", &["Bac Ninh"], 6),
        ])
    }

    async fn fetch_districts(&self, province_id: u32) -> UpstreamResult<Vec<DistrictRecord>> {
        self.hit("master_data")?;
        Ok(vec![DistrictRecord {
            district_id: 1489,
            province_id,
            district_name: "Quận Hoàn Kiếm".to_string(),
        }])
    }

    async fn fetch_wards(&self, district_id: u32) -> UpstreamResult<Vec<WardRecord>> {
        self.hit("master_data")?;
        Ok(vec![WardRecord {
            ward_code: "1A0101".to_string(),
            district_id,
            ward_name: "Phường Tràng Tiền".to_string(),
        }])
    }
}

/// 2024-03-01 08:00 UTC
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
}

pub struct Engine {
    pub engine: ShippingFeeCache,
    pub cache: Arc<MemoryCacheStore>,
    pub upstreams: Arc<StubUpstreams>,
}

pub fn engine(upstreams: Arc<StubUpstreams>) -> Engine {
    engine_with_addresses(upstreams, HashMap::new())
}

pub fn engine_with_addresses(
    upstreams: Arc<StubUpstreams>,
    addresses: HashMap<String, Vec<SavedAddress>>,
) -> Engine {
    let cache = Arc::new(MemoryCacheStore::new());
    let ports = ResolverPorts {
        address_book: Arc::new(StaticAddressBook::new(addresses)),
        geo_ip: upstreams.clone(),
        geocoder: upstreams.clone(),
        master_data: upstreams.clone(),
    };
    let resolver = Arc::new(LocationResolver::new(ports, cache.clone()));
    let engine = ShippingFeeCache::new(resolver, ShippingCalculator::default(), cache.clone())
        .with_clock(Arc::new(fixed_now));
    Engine {
        engine,
        cache,
        upstreams,
    }
}
