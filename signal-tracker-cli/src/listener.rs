//! MQTT position listener
//!
//! Runs the broker event loop on a background thread. Every publish on the
//! configured topic is parsed here and pushed onto the tracking context's
//! update channel; malformed payloads are logged, counted on the shared
//! `LinkStatus` and dropped.

use crate::config::BrokerConfig;
use anyhow::{Context, Result};
use rumqttc::{Client, ConnectReturnCode, Event, MqttOptions, Packet, QoS};
use signal_tracker::{LinkStatus, PositionUpdate, UpdateSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Capacity of the client's outgoing request queue
const REQUEST_CAPACITY: usize = 10;

/// Start the listener thread
pub fn spawn(broker: BrokerConfig, sender: UpdateSender, link: LinkStatus) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("mqtt-listener".to_string())
        .spawn(move || run(&broker, &sender, &link))
        .context("Failed to spawn MQTT listener thread")
}

pub fn mqtt_options(broker: &BrokerConfig) -> MqttOptions {
    let mut options = MqttOptions::new(broker.client_id.as_str(), broker.host.as_str(), broker.port);
    options.set_keep_alive(Duration::from_secs(broker.keep_alive_secs));
    options
}

fn run(broker: &BrokerConfig, sender: &UpdateSender, link: &LinkStatus) {
    log::info!("Connecting to MQTT broker {}:{}", broker.host, broker.port);
    let (client, mut connection) = Client::new(mqtt_options(broker), REQUEST_CAPACITY);

    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    link.set_connected(true);
                    // Subscriptions do not survive a clean-session reconnect
                    match client.subscribe(broker.topic.as_str(), QoS::AtMostOnce) {
                        Ok(()) => log::info!("Connected to MQTT broker, subscribed to {}", broker.topic),
                        Err(e) => log::error!("Failed to subscribe to {}: {}", broker.topic, e),
                    }
                } else {
                    log::error!("Failed to connect to MQTT broker: {:?}", ack.code);
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                log::trace!("Publish on {} ({} bytes)", publish.topic, publish.payload.len());
                let Some(update) = accept_payload(&publish.payload, link) else {
                    continue;
                };
                if sender.send(update).is_err() {
                    log::info!("Tracking context closed, stopping MQTT listener");
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                link.set_connected(false);
                log::warn!("Broker sent disconnect");
            }
            Ok(_) => {}
            Err(e) => {
                link.set_connected(false);
                log::error!("MQTT connection error: {}", e);
                thread::sleep(broker.reconnect_delay());
            }
        }
    }

    link.set_connected(false);
}

/// Parse a payload, counting it on `link` if it has to be dropped
pub fn accept_payload(payload: &[u8], link: &LinkStatus) -> Option<PositionUpdate> {
    let update = parse_payload(payload);
    if update.is_none() {
        link.record_malformed();
    }
    update
}

/// Parse a publish payload, logging and discarding anything malformed
pub fn parse_payload(payload: &[u8]) -> Option<PositionUpdate> {
    match PositionUpdate::from_json(payload) {
        Ok(update) => {
            log::debug!("Received: {:?}", update);
            Some(update)
        }
        Err(e) => {
            log::warn!(
                "Error parsing MQTT message: {} (payload: {})",
                e,
                String::from_utf8_lossy(payload)
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payload() {
        let update = parse_payload(br#"{"lat": 12.98, "lng": 77.605}"#).unwrap();
        assert_eq!(update, PositionUpdate::new(12.98, 77.605));
    }

    #[test]
    fn test_parse_payload_drops_garbage() {
        assert!(parse_payload(b"\xff\xfe").is_none());
        assert!(parse_payload(br#"{"lat": "twelve"}"#).is_none());
        assert!(parse_payload(b"42").is_none());
    }

    #[test]
    fn test_malformed_payloads_counted() {
        let link = LinkStatus::default();
        assert!(accept_payload(br#"{"lat": 1.0, "lng": 2.0}"#, &link).is_some());
        assert!(accept_payload(b"garbage", &link).is_none());
        assert!(accept_payload(br#"{"lat": [1]}"#, &link).is_none());
        assert_eq!(link.malformed(), 2);
    }

    #[test]
    fn test_mqtt_options_from_config() {
        let broker = BrokerConfig {
            host: "broker.local".to_string(),
            port: 1884,
            client_id: "dashboard-1".to_string(),
            keep_alive_secs: 30,
            ..BrokerConfig::default()
        };

        let options = mqtt_options(&broker);
        assert_eq!(options.broker_address(), ("broker.local".to_string(), 1884));
        assert_eq!(options.client_id(), "dashboard-1");
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
    }
}
