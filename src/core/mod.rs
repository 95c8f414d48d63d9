pub mod address;
pub mod calculator;
pub mod error;
pub mod fee_table;
pub mod quote_cache;
pub mod region;
pub mod resolver;

#[cfg(test)]
pub(crate) mod fakes;

pub use address::{AddressCanonicalizer, AddressIds, CanonicalAddress};
pub use calculator::{Endpoint, PriceBreakdown, ShipmentQuote, ShipmentRequest, ShippingCalculator};
pub use error::{ShippingError, ShippingResult};
pub use fee_table::{FeeRule, FeeTable};
pub use quote_cache::{CallerIdentity, OriginAddress, ProductShipping, QuoteResponse, ShippingFeeCache};
pub use region::{Region, RouteClass, ServiceTier};
pub use resolver::{Coordinates, Location, LocationResolver, ResolverPorts};
