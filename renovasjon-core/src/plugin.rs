//! Bundle of upstream ports implemented by a provider crate.

use std::sync::Arc;

use crate::ports::{CollectionPort, LoginPort, PropertyPort};

/// Collection of ports implementing one upstream deployment.
#[derive(Clone)]
pub struct UpstreamPlugin {
    /// Human-friendly name of the municipality.
    pub name: String,
    /// Implementation for logging in.
    pub login_port: Arc<dyn LoginPort>,
    /// Implementation for fetching collections.
    pub collection_port: Arc<dyn CollectionPort>,
    /// Implementation for searching properties.
    pub property_port: Arc<dyn PropertyPort>,
}
