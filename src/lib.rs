//! shipfee - shipping-fee determination engine.
//!
//! Given where a product ships from, its weight and who is asking, shipfee
//! classifies the route between origin and destination, prices it against a
//! per-tier fee table and estimates a delivery date. Unknown destinations are
//! resolved from the caller's saved default address or, failing that, from
//! the caller's IP through geo-IP, reverse geocoding and province master data.
//! Resolved locations and quotes are memoized with a TTL so repeated calls do
//! not hit the external services again.
//!
//! # Features
//! - Ordered route classification (same province, same region, special route,
//!   curated long-haul destinations, generic long-haul)
//! - Injectable fee tables with rural variants and weight surcharges
//! - Location resolution waterfall with bounded upstream calls
//! - TTL caching in memory or Redis; cache failures never fail a quote
//! - Batch quoting that resolves the destination once
//! - Address canonicalization against carrier master data
//! - axum HTTP surface and a CLI
//!
//! # Quick Example
//! ```
//! use shipfee::core::{
//!     Endpoint, FeeTable, Region, ServiceTier, ShipmentRequest, ShippingCalculator,
//! };
//!
//! let calculator = ShippingCalculator::new(FeeTable::builtin());
//! let quote = calculator
//!     .quote(&ShipmentRequest {
//!         weight_kg: 0.5,
//!         origin: Endpoint::new("Hà Nội", Some(Region::HaNoi)),
//!         destination: Endpoint::new("Hà Nội", Some(Region::HaNoi)),
//!         tier: ServiceTier::Standard,
//!     })
//!     .unwrap();
//! assert_eq!(quote.fee, Some(22000));
//! assert_eq!(quote.eta_days, Some(1));
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations) while keeping
//! business logic inside `core`. Pure pricing lives in `core::region`, `core::fee_table` and
//! `core::calculator`; I/O-bound orchestration lives in `core::resolver` and
//! `core::quote_cache` and only talks to the traits in `ports`.
//!
//! # Error Handling
//! Engine operations return [`core::ShippingError`]. Application plumbing (config loading,
//! CLI, server startup) returns `eyre::Result<T>` with context attached via `WrapErr`.
//!
//! # Concurrency & Data Structures
//! The in-memory cache uses `scc::HashMap`. Concurrent misses on the same key may both
//! compute; the last write wins.
pub mod config;
pub mod ports;
pub mod tracing_setup;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::HttpHandler,
    config::EngineConfig,
    core::{LocationResolver, ShippingCalculator, ShippingError, ShippingFeeCache},
};
