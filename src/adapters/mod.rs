pub mod address_book;
pub mod geo_ip;
pub mod http_client;
pub mod http_handler;
pub mod master_data;
pub mod memory_cache;
pub mod redis_cache;
pub mod reverse_geocoder;

/// Re-export commonly used types from adapters
pub use address_book::StaticAddressBook;
pub use geo_ip::IpInfoGeoLookup;
pub use http_client::JsonHttpClient;
pub use http_handler::HttpHandler;
pub use master_data::GhnMasterData;
pub use memory_cache::MemoryCacheStore;
pub use redis_cache::RedisCacheStore;
pub use reverse_geocoder::NominatimGeocoder;
