//! Derivation of per-category sensor state from raw collection events.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::CollectionEvent;

/// State text published when a category has no upcoming pickup.
pub const DEFAULT_NONE_LABEL: &str = "Ingen planlagt";

const ISO_DATE: &str = "%Y-%m-%d";

/// Soonest pickup of `category` on or after `today`.
#[must_use]
pub fn next_collection(
    events: &[CollectionEvent],
    category: &str,
    today: NaiveDate,
) -> Option<NaiveDate> {
    events
        .iter()
        .filter(|event| event.category == category)
        .map(|event| event.date)
        .filter(|date| *date >= today)
        .min()
}

/// Whole calendar days from `today` until `date`.
///
/// Both ends are calendar dates, so the time of day the caller observed them
/// at cannot shift the result.
#[must_use]
pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    date.signed_duration_since(today).num_days()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Derived state of one category sensor.
pub struct SensorState {
    /// Next pickup, if any is scheduled.
    pub next_date: Option<NaiveDate>,
    /// Days until `next_date`.
    pub days_until: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// JSON attributes published next to the state.
pub struct SensorAttributes {
    /// Same text as the state topic.
    pub next_collection: String,
    /// Days until the pickup, `null` when none is scheduled.
    pub days_until: Option<i64>,
    /// Upstream category name.
    pub waste_type: String,
}

impl SensorState {
    /// Resolve the state of `category` as seen on `today`.
    #[must_use]
    pub fn resolve(events: &[CollectionEvent], category: &str, today: NaiveDate) -> Self {
        let next_date = next_collection(events, category, today);
        Self {
            next_date,
            days_until: next_date.map(|date| days_until(date, today)),
        }
    }

    /// ISO date of the next pickup, or `none_label`.
    #[must_use]
    pub fn state_text(&self, none_label: &str) -> String {
        self.next_date.map_or_else(
            || none_label.to_owned(),
            |date| date.format(ISO_DATE).to_string(),
        )
    }

    /// Attributes document for `category`.
    #[must_use]
    pub fn attributes(&self, category: &str, none_label: &str) -> SensorAttributes {
        SensorAttributes {
            next_collection: self.state_text(none_label),
            days_until: self.days_until,
            waste_type: category.to_owned(),
        }
    }
}
