//! Sync loop that keeps the bus sensors in step with the upstream schedule.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use crate::credential::CredentialManager;
use crate::discovery::{DiscoveryPublisher, DiscoverySettings};
use crate::model::{CollectionEvent, DateRange, PropertyId, WasteCategory};
use crate::ports::{CollectionPort, Publisher};
use crate::resolver::SensorState;

/// Days ahead of today requested on every fetch.
pub const LOOKAHEAD_DAYS: u64 = 90;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Connection lifecycle notifications from the bus client.
pub enum BusEvent {
    /// The broker accepted the connection (initially or after a reconnect).
    Connected,
    /// The bus client reported an error; it reconnects on its own.
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Lifecycle state of the scheduler.
pub enum SchedulerState {
    /// Not started yet.
    Disconnected,
    /// Waiting for the first bus connection.
    Connecting,
    /// Announced and polling.
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Result of one synchronization cycle.
pub enum CycleOutcome {
    /// Sensors were derived and published.
    Published {
        /// Number of category sensors updated.
        sensors: usize,
    },
    /// No credential could be obtained; nothing was fetched.
    AuthFailed,
    /// The fetch failed and the credential was cleared.
    FetchFailed,
}

#[derive(Debug, Clone)]
/// Static settings of the sync loop.
pub struct SyncSettings {
    /// Property whose collections are tracked.
    pub property: PropertyId,
    /// Categories published as sensors.
    pub categories: Vec<WasteCategory>,
    /// Pause between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// State text for categories without an upcoming pickup.
    pub none_label: String,
    /// Topic layout and device identity.
    pub discovery: DiscoverySettings,
}

/// Drives discovery and periodic sensor updates for one property.
pub struct SyncScheduler {
    settings: SyncSettings,
    credentials: CredentialManager,
    collection_port: Arc<dyn CollectionPort>,
    publisher: Arc<dyn Publisher>,
    discovery: DiscoveryPublisher,
    state: SchedulerState,
}

impl SyncScheduler {
    /// Create a scheduler; it stays [`SchedulerState::Disconnected`] until run.
    #[must_use]
    pub fn new(
        settings: SyncSettings,
        credentials: CredentialManager,
        collection_port: Arc<dyn CollectionPort>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let discovery = DiscoveryPublisher::new(settings.discovery.clone());
        Self {
            settings,
            credentials,
            collection_port,
            publisher,
            discovery,
            state: SchedulerState::Disconnected,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Credential holder owned by this scheduler.
    #[must_use]
    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// Wait for the bus, announce all sensors, then sync forever.
    ///
    /// The next cycle is armed only after the previous one finished, so cycles
    /// never overlap. Reconnects re-announce the sensors without starting an
    /// extra cycle. Returns once `events` is closed.
    pub async fn run(&mut self, mut events: UnboundedReceiver<BusEvent>) {
        self.state = SchedulerState::Connecting;
        info!("waiting for bus connection");
        if !wait_for_connection(&mut events).await {
            info!("bus closed before connecting");
            return;
        }

        self.state = SchedulerState::Ready;
        info!(interval = ?self.settings.interval, "bus connected, starting sync");
        self.announce().await;

        loop {
            let outcome = self.run_cycle().await;
            debug!(?outcome, "cycle finished");
            if !self.idle(&mut events).await {
                break;
            }
        }
        info!("bus event stream closed, scheduler stopped");
    }

    /// Publish the discovery config of every category.
    pub async fn announce(&self) {
        self.discovery
            .publish_all(self.publisher.as_ref(), &self.settings.categories)
            .await;
    }

    /// Run one cycle against today's local date.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.run_cycle_on(Local::now().date_naive()).await
    }

    /// Run one cycle as seen on `today`.
    ///
    /// Failures are logged and reported through the outcome; they never
    /// propagate.
    pub async fn run_cycle_on(&mut self, today: NaiveDate) -> CycleOutcome {
        let credential = match self.credentials.acquire().await {
            Ok(credential) => credential,
            Err(err) => {
                error!(%err, "login failed, skipping cycle");
                return CycleOutcome::AuthFailed;
            }
        };

        let range = DateRange::lookahead(today, LOOKAHEAD_DAYS);
        info!(property = %self.settings.property, "fetching collections");
        let fetched = self
            .collection_port
            .collections(&credential, &self.settings.property, range)
            .await;
        let events = match fetched {
            Ok(events) => events,
            Err(err) => {
                // The upstream does not say whether the token was the cause.
                self.credentials.invalidate();
                error!(%err, "fetching collections failed, credential cleared");
                return CycleOutcome::FetchFailed;
            }
        };
        debug!(count = events.len(), "fetched collection events");

        for category in &self.settings.categories {
            self.publish_sensor(category, &events, today).await;
        }

        CycleOutcome::Published {
            sensors: self.settings.categories.len(),
        }
    }

    async fn publish_sensor(
        &self,
        category: &WasteCategory,
        events: &[CollectionEvent],
        today: NaiveDate,
    ) {
        let state = SensorState::resolve(events, &category.name, today);
        let topics = self.settings.discovery.topics(&category.sensor_id());
        let text = state.state_text(&self.settings.none_label);

        if let Err(err) = self
            .publisher
            .publish(&topics.state, text.clone(), false)
            .await
        {
            warn!(category = %category.name, %err, "state publish failed");
        }

        match serde_json::to_string(&state.attributes(&category.name, &self.settings.none_label)) {
            Ok(payload) => {
                if let Err(err) = self.publisher.publish(&topics.attributes, payload, false).await {
                    warn!(category = %category.name, %err, "attributes publish failed");
                }
            }
            Err(err) => warn!(category = %category.name, %err, "attributes not serializable"),
        }

        info!(
            category = %category.name,
            next = %text,
            days_until = ?state.days_until,
            "updated sensor"
        );
    }

    // Sleeps one interval while servicing bus events; false once the bus is gone.
    async fn idle(&mut self, events: &mut UnboundedReceiver<BusEvent>) -> bool {
        let sleep = tokio::time::sleep(self.settings.interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return true,
                event = events.recv() => match event {
                    Some(BusEvent::Connected) => {
                        info!("bus reconnected, re-announcing sensors");
                        self.announce().await;
                    }
                    Some(BusEvent::Error(message)) => warn!(error = %message, "bus error"),
                    None => return false,
                },
            }
        }
    }
}

async fn wait_for_connection(events: &mut UnboundedReceiver<BusEvent>) -> bool {
    while let Some(event) = events.recv().await {
        match event {
            BusEvent::Connected => return true,
            BusEvent::Error(message) => warn!(error = %message, "bus error while connecting"),
        }
    }
    false
}
