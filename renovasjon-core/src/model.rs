//! Domain data structures for properties, waste categories, and pickup events.

use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::slug::sensor_id;

#[derive(Clone, PartialEq, Eq)]
/// Bearer token handed out by the upstream login endpoint.
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token value.
    #[must_use]
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self(token.into())
    }

    /// Raw token value for request headers.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier of a property (`eiendomId`) known to the upstream.
pub struct PropertyId(pub String);

impl fmt::Display for PropertyId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Cadastral numbers of a property.
pub struct Cadastral {
    /// Farm number (`gnr`).
    pub gnr: String,
    /// Holding number (`bnr`).
    pub bnr: String,
}

impl fmt::Display for Cadastral {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.gnr, self.bnr)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Property returned from an address search.
pub struct Property {
    /// Identifier used when requesting collections.
    pub id: PropertyId,
    /// Street address as registered upstream.
    pub address: String,
    /// Registered owner.
    pub owner: String,
    /// Cadastral numbers.
    pub cadastral: Cadastral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Waste category tracked as one sensor.
pub struct WasteCategory {
    /// Upstream category name, also used as the display name.
    pub name: String,
    /// Icon reference, e.g. `mdi:trash-can`.
    pub icon: String,
}

impl WasteCategory {
    /// Construct a category from its name and icon.
    #[must_use]
    pub fn new<N: Into<String>, I: Into<String>>(name: N, icon: I) -> Self {
        Self {
            name: name.into(),
            icon: icon.into(),
        }
    }

    /// Bus-safe identifier derived from the name.
    #[must_use]
    pub fn sensor_id(&self) -> String {
        sensor_id(&self.name)
    }

    /// Categories tracked by the Time kommune deployment.
    #[must_use]
    pub fn reference_set() -> Vec<Self> {
        vec![
            Self::new("Matavfall", "mdi:food-apple"),
            Self::new("Papir", "mdi:newspaper-variant"),
            Self::new("Restavfall", "mdi:trash-can"),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Scheduled pickup of one category on one day.
pub struct CollectionEvent {
    /// Upstream category name.
    pub category: String,
    /// Day of the pickup.
    pub date: NaiveDate,
}

impl CollectionEvent {
    /// Construct an event.
    #[must_use]
    pub fn new<S: Into<String>>(category: S, date: NaiveDate) -> Self {
        Self {
            category: category.into(),
            date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Inclusive start/end range for requested collections.
pub struct DateRange {
    /// Start date (inclusive).
    pub start: NaiveDate,
    /// End date (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Range covering `today` and the following `days` days.
    #[must_use]
    pub fn lookahead(today: NaiveDate, days: u64) -> Self {
        Self {
            start: today,
            end: today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX),
        }
    }

    /// Whether `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
