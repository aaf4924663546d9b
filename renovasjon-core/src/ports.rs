//! Traits describing upstream and bus capabilities and their error types.

use std::error::Error as StdError;

use async_trait::async_trait;
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;

use crate::model::{CollectionEvent, Credential, DateRange, Property, PropertyId};

#[derive(thiserror::Error, Debug)]
/// Errors raised while obtaining a credential.
pub enum AuthError {
    /// Network layer failed.
    #[error("Network error during login: {0}")]
    Network(#[from] ReqwestError),
    /// Login answered with something other than HTTP 200.
    #[error("Login rejected with status {status}")]
    Rejected {
        /// HTTP status code returned by the login endpoint.
        status: u16,
    },
    /// Login succeeded but carried no token header.
    #[error("Login response carried no token")]
    MissingToken,
}

#[derive(thiserror::Error, Debug)]
/// Errors raised while fetching data with a credential.
pub enum FetchError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Upstream answered with a non-success status.
    #[error("Upstream responded with status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
    /// Body was not the expected JSON document.
    #[error("Decode error: {0}")]
    Decode(#[from] JsonError),
    /// A record carried a date that could not be parsed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

#[derive(thiserror::Error, Debug)]
/// Errors raised by the bus client while publishing.
pub enum PublishError {
    /// The bus client refused the message.
    #[error("Bus publish failed: {0}")]
    Bus(#[source] Box<dyn StdError + Send + Sync>),
}

#[async_trait]
/// Trait for obtaining a fresh credential from the upstream.
pub trait LoginPort: Send + Sync {
    /// Log in and return the issued token.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] when the login call fails or carries no token.
    async fn login(&self) -> Result<Credential, AuthError>;
}

#[async_trait]
/// Trait for fetching scheduled collections of a property.
pub trait CollectionPort: Send + Sync {
    /// Fetch collection events for a property within the given date range.
    ///
    /// An empty result is valid and means no pickups are scheduled.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on transport failure or an unexpected body.
    async fn collections(
        &self,
        credential: &Credential,
        property: &PropertyId,
        range: DateRange,
    ) -> Result<Vec<CollectionEvent>, FetchError>;
}

#[async_trait]
/// Trait for searching properties by free-text address.
pub trait PropertyPort: Send + Sync {
    /// Search properties matching `address`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on transport failure or an unexpected body.
    async fn search(
        &self,
        credential: &Credential,
        address: &str,
    ) -> Result<Vec<Property>, FetchError>;
}

#[async_trait]
/// Publish capability of the message bus.
pub trait Publisher: Send + Sync {
    /// Publish `payload` to `topic`, optionally retained by the broker.
    ///
    /// # Errors
    ///
    /// Returns a [`PublishError`] when the bus client rejects the message.
    async fn publish(&self, topic: &str, payload: String, retain: bool)
    -> Result<(), PublishError>;
}
