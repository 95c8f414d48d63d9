//! In-memory port doubles with call counters.
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use super::resolver::ResolverPorts;
use crate::ports::{
    AddressBook, CacheError, CacheResult, CacheStore, DistrictRecord, GeoAddress, GeoIpInfo,
    GeoIpLookup, MasterData, ProvinceRecord, ReverseGeocoder, SavedAddress, UpstreamError,
    UpstreamResult, WardRecord,
};

fn outage(service: &str) -> UpstreamError {
    UpstreamError::Unreachable(format!("{service} down"))
}

#[derive(Default)]
pub struct FakeAddressBook {
    pub addresses: Mutex<HashMap<String, Vec<SavedAddress>>>,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl AddressBook for FakeAddressBook {
    async fn addresses_for(&self, user_id: &str) -> UpstreamResult<Vec<SavedAddress>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(outage("address_book"));
        }
        let addresses = self.addresses.lock().unwrap();
        Ok(addresses.get(user_id).cloned().unwrap_or_default())
    }
}

pub struct FakeGeoIp {
    pub info: GeoIpInfo,
    /// IP passed to the most recent lookup
    pub last_ip: Mutex<Option<Option<String>>>,
    pub delay_ms: AtomicU64,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl GeoIpLookup for FakeGeoIp {
    async fn lookup(&self, ip: Option<&str>) -> UpstreamResult<GeoIpInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_ip.lock().unwrap() = Some(ip.map(str::to_string));
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(outage("geo_ip"));
        }
        Ok(self.info.clone())
    }
}

pub struct FakeGeocoder {
    pub address: GeoAddress,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl ReverseGeocoder for FakeGeocoder {
    async fn reverse(&self, _lat: f64, _lon: f64) -> UpstreamResult<GeoAddress> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(outage("reverse_geocode"));
        }
        Ok(self.address.clone())
    }
}

pub struct FakeMasterData {
    pub provinces: Vec<ProvinceRecord>,
    pub districts: Vec<DistrictRecord>,
    pub wards: Vec<WardRecord>,
    pub province_calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeMasterData {
    fn check(&self) -> UpstreamResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(outage("master_data"));
        }
        Ok(())
    }
}

#[async_trait]
impl MasterData for FakeMasterData {
    async fn fetch_provinces(&self) -> UpstreamResult<Vec<ProvinceRecord>> {
        self.province_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.provinces.clone())
    }

    async fn fetch_districts(&self, province_id: u32) -> UpstreamResult<Vec<DistrictRecord>> {
        self.check()?;
        Ok(self
            .districts
            .iter()
            .filter(|d| d.province_id == province_id)
            .cloned()
            .collect())
    }

    async fn fetch_wards(&self, district_id: u32) -> UpstreamResult<Vec<WardRecord>> {
        self.check()?;
        Ok(self
            .wards
            .iter()
            .filter(|w| w.district_id == district_id)
            .cloned()
            .collect())
    }
}

/// Cache store whose every operation fails
#[derive(Default)]
pub struct FailingCache;

#[async_trait]
impl CacheStore for FailingCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Backend("connection refused".into()))
    }

    async fn set_with_ttl(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Backend("connection refused".into()))
    }
}

/// Cache whose calls never complete.
#[derive(Default)]
pub struct HangingCache;

#[async_trait]
impl CacheStore for HangingCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        std::future::pending().await
    }

    async fn set_with_ttl(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
        std::future::pending().await
    }
}

/// One fake per port, sharing a small catalogue of three provinces.
pub struct Fakes {
    pub address_book: Arc<FakeAddressBook>,
    pub geo_ip: Arc<FakeGeoIp>,
    pub geocoder: Arc<FakeGeocoder>,
    pub master_data: Arc<FakeMasterData>,
}

impl Fakes {
    pub fn provinces() -> Vec<ProvinceRecord> {
        vec![
            ProvinceRecord {
                province_id: 201,
                province_name: "Hà Nội".into(),
                name_extension: vec!["Hanoi".into(), "TP. Hà Nội".into()],
                region_id: 2,
            },
            ProvinceRecord {
                province_id: 202,
                province_name: "Hồ Chí Minh".into(),
                name_extension: vec!["Ho Chi Minh City".into(), "TP.HCM".into()],
                region_id: 1,
            },
            ProvinceRecord {
                province_id: 203,
                province_name: "Đà Nẵng".into(),
                name_extension: vec!["Da Nang".into()],
                region_id: 3,
            },
        ]
    }

    /// Geo-IP reports `region` for every address.
    pub fn with_geo_region(region: &str) -> Self {
        Self {
            address_book: Arc::new(FakeAddressBook::default()),
            geo_ip: Arc::new(FakeGeoIp {
                info: GeoIpInfo {
                    lat: 21.0245,
                    lon: 105.8412,
                    region: region.to_string(),
                },
                last_ip: Mutex::new(None),
                delay_ms: AtomicU64::new(0),
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }),
            geocoder: Arc::new(FakeGeocoder {
                address: GeoAddress {
                    quarter: Some("Phường Tràng Tiền".into()),
                    city: Some("Hà Nội".into()),
                    country: Some("Việt Nam".into()),
                    ..GeoAddress::default()
                },
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }),
            master_data: Arc::new(FakeMasterData {
                provinces: Self::provinces(),
                districts: vec![DistrictRecord {
                    district_id: 1489,
                    province_id: 201,
                    district_name: "Quận Hoàn Kiếm".into(),
                }],
                wards: vec![WardRecord {
                    ward_code: "1A0101".into(),
                    district_id: 1489,
                    ward_name: "Phường Tràng Tiền".into(),
                }],
                province_calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }),
        }
    }

    /// Every IP geolocates to central Hanoi.
    pub fn hanoi() -> Self {
        Self::with_geo_region("Hanoi")
    }

    pub fn with_address(self, user_id: &str, address: SavedAddress) -> Self {
        self.address_book
            .addresses
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .push(address);
        self
    }

    pub fn with_geo_delay(self, delay: Duration) -> Self {
        self.geo_ip
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
        self
    }

    pub fn ports(&self) -> ResolverPorts {
        ResolverPorts {
            address_book: self.address_book.clone(),
            geo_ip: self.geo_ip.clone(),
            geocoder: self.geocoder.clone(),
            master_data: self.master_data.clone(),
        }
    }

    /// Geo-IP, reverse geocode and province fetches combined.
    pub fn upstream_calls(&self) -> usize {
        self.geo_ip.calls.load(Ordering::SeqCst)
            + self.geocoder.calls.load(Ordering::SeqCst)
            + self.master_data.province_calls.load(Ordering::SeqCst)
    }
}
