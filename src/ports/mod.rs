//! Capability interfaces for every external collaborator of the engine.
//!
//! Core logic only ever talks to these traits; `adapters` provides the
//! network and storage implementations.
pub mod address_book;
pub mod cache_store;
pub mod geo;
pub mod master_data;

pub use address_book::{AddressBook, SavedAddress};
pub use cache_store::{CacheError, CacheResult, CacheStore};
pub use geo::{GeoAddress, GeoIpInfo, GeoIpLookup, ReverseGeocoder};
pub use master_data::{DistrictRecord, MasterData, ProvinceRecord, WardRecord};

use std::time::Duration;

use thiserror::Error;

/// Failure of an external lookup service
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Connection could not be established or was reset
    #[error("Connection error: {0}")]
    Unreachable(String),

    /// No answer within the configured timeout
    #[error("Timeout error after {0:?}")]
    Timeout(Duration),

    /// The service answered with a non-success status
    #[error("Upstream returned error status {status} for {url}")]
    BadStatus { url: String, status: u16 },

    /// The body could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type alias for upstream lookups
pub type UpstreamResult<T> = Result<T, UpstreamError>;
