use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::UpstreamResult;
use crate::core::region::Region;

/// A delivery address saved by a user
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SavedAddress {
    #[serde(default)]
    pub province_name: Option<String>,
    #[serde(default)]
    pub ward_name: Option<String>,
    #[serde(default)]
    pub region_id: Option<Region>,
    #[serde(default)]
    pub is_default: bool,
}

/// AddressBook defines the port for looking up a user's saved addresses
#[async_trait]
pub trait AddressBook: Send + Sync + 'static {
    /// List every saved address of a user
    ///
    /// # Arguments
    /// * `user_id` - The authenticated user identity
    ///
    /// # Returns
    /// The user's addresses, empty when the user is unknown
    async fn addresses_for(&self, user_id: &str) -> UpstreamResult<Vec<SavedAddress>>;
}
