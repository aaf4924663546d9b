//! rumqttc adapter: publish capability and connection lifecycle events.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use renovasjon_core::{BusEvent, PublishError, Publisher};

use crate::config::{BrokerAddress, MqttSettings};

// Outgoing requests buffered between the client handle and the event loop.
const REQUEST_CAPACITY: usize = 64;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Publisher backed by a rumqttc client handle.
pub(crate) struct MqttPublisher {
    client: AsyncClient,
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(
        &self,
        topic: &str,
        payload: String,
        retain: bool,
    ) -> Result<(), PublishError> {
        self.client
            .publish(topic, QoS::AtMostOnce, retain, payload)
            .await
            .map_err(|err| PublishError::Bus(Box::new(err)))
    }
}

pub(crate) fn mqtt_options(settings: &MqttSettings, broker: &BrokerAddress) -> MqttOptions {
    let mut options = MqttOptions::new(settings.client_id.clone(), broker.host.clone(), broker.port);
    options.set_keep_alive(Duration::from_secs(settings.keep_alive_secs.max(1)));
    if let Some((username, password)) = settings.credentials() {
        options.set_credentials(username, password);
    }
    options
}

/// Create the client handle and its event loop. Nothing is sent until the
/// event loop is driven.
pub(crate) fn connect(settings: &MqttSettings, broker: &BrokerAddress) -> (MqttPublisher, EventLoop) {
    let (client, event_loop) = AsyncClient::new(mqtt_options(settings, broker), REQUEST_CAPACITY);
    (MqttPublisher { client }, event_loop)
}

/// Poll the event loop forever, forwarding connection events until the
/// receiving side is dropped. rumqttc reconnects on the next poll after an
/// error.
pub(crate) async fn drive(mut event_loop: EventLoop, events: UnboundedSender<BusEvent>) {
    loop {
        let Some(event) = bus_event(event_loop.poll().await) else {
            continue;
        };

        let is_error = matches!(event, BusEvent::Error(_));
        if events.send(event).is_err() {
            debug!("scheduler gone, stopping MQTT event loop");
            break;
        }
        if is_error {
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }
}

// The scheduler logs bus errors; only trace them here.
fn bus_event(polled: Result<Event, ConnectionError>) -> Option<BusEvent> {
    match polled {
        Ok(Event::Incoming(Packet::ConnAck(ack))) => {
            info!(code = ?ack.code, "connected to MQTT broker");
            Some(BusEvent::Connected)
        }
        Ok(_) => None,
        Err(err) => {
            debug!(%err, "MQTT event loop error");
            Some(BusEvent::Error(err.to_string()))
        }
    }
}
