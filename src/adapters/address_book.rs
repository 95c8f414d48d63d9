use std::collections::HashMap;

use async_trait::async_trait;

use crate::ports::{AddressBook, SavedAddress, UpstreamResult};

/// Address book backed by a fixed map, typically loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticAddressBook {
    addresses: HashMap<String, Vec<SavedAddress>>,
}

impl StaticAddressBook {
    pub fn new(addresses: HashMap<String, Vec<SavedAddress>>) -> Self {
        Self { addresses }
    }

    pub fn user_count(&self) -> usize {
        self.addresses.len()
    }
}

#[async_trait]
impl AddressBook for StaticAddressBook {
    async fn addresses_for(&self, user_id: &str) -> UpstreamResult<Vec<SavedAddress>> {
        Ok(self.addresses.get(user_id).cloned().unwrap_or_default())
    }
}
