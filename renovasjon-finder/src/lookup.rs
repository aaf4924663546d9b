use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use renovasjon_core::{
    AuthError, CollectionEvent, CollectionPort, CredentialManager, DateRange, FetchError,
    Property, PropertyPort, UpstreamPlugin,
};

#[derive(Debug, Error)]
pub(crate) enum LookupError {
    #[error("Login failed: {0}")]
    Auth(#[from] AuthError),
    #[error("Request failed: {0}")]
    Fetch(#[from] FetchError),
}

/// Property search and schedule preview sharing one upstream login.
pub(crate) struct PropertyLookup {
    credentials: CredentialManager,
    property_port: Arc<dyn PropertyPort>,
    collection_port: Arc<dyn CollectionPort>,
}

impl PropertyLookup {
    pub(crate) fn new(upstream: UpstreamPlugin) -> Self {
        Self {
            credentials: CredentialManager::new(upstream.login_port),
            property_port: upstream.property_port,
            collection_port: upstream.collection_port,
        }
    }

    pub(crate) async fn search(&mut self, address: &str) -> Result<Vec<Property>, LookupError> {
        let credential = self.credentials.acquire().await?;
        debug!(address, "searching properties");
        let found = self.property_port.search(&credential, address).await;
        self.settle(found)
    }

    pub(crate) async fn collections(
        &mut self,
        property: &Property,
        range: DateRange,
    ) -> Result<Vec<CollectionEvent>, LookupError> {
        let credential = self.credentials.acquire().await?;
        let fetched = self
            .collection_port
            .collections(&credential, &property.id, range)
            .await;
        self.settle(fetched)
    }

    // A failed request may mean the token expired; log in again next time.
    fn settle<T>(&mut self, result: Result<T, FetchError>) -> Result<T, LookupError> {
        if result.is_err() {
            self.credentials.invalidate();
        }
        result.map_err(LookupError::from)
    }
}
