//! MQTT transport adapter.
//!
//! Implements [`PublishPort`] over the ESP-IDF MQTT client and feeds the
//! commands topic into [`rpc::channels`](crate::rpc::channels).
//!
//! The ESP-IDF client runs its own task and reconnects by itself.  Its
//! event callback never touches domain state: it flips the link flags
//! below and copies command payloads into the inbox.  The main loop reads
//! the flags to (re)subscribe and to arm the online ping.
//!
//! ```text
//!   esp-mqtt task ──cb──▶ LINK flags ─────────────▶ main loop (subscribe)
//!                  └────▶ channels::enqueue ──────▶ main loop (dispatch)
//!   main loop ───publish()──▶ EspMqttClient
//! ```

use core::fmt::Write as _;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::rpc::channels;
use crate::rpc::topics::Topic;

pub type BrokerUrl = heapless::String<128>;

/// `mqtt://host:port` for the configured broker.
pub fn broker_url(cfg: &SystemConfig) -> Option<BrokerUrl> {
    let mut url = BrokerUrl::new();
    write!(url, "mqtt://{}:{}", cfg.mqtt_server, cfg.mqtt_port).ok()?;
    Some(url)
}

/// Connection flags shared between the client task and the main loop.
pub struct LinkState {
    connected: AtomicBool,
    sessions: AtomicU32,
}

impl LinkState {
    pub const fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            sessions: AtomicU32::new(0),
        }
    }

    pub fn on_connected(&self) {
        self.connected.store(true, Ordering::Release);
        self.sessions.fetch_add(1, Ordering::AcqRel);
    }

    pub fn on_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Number of successful broker connections so far.
    pub fn sessions(&self) -> u32 {
        self.sessions.load(Ordering::Acquire)
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

/// Route one received message: command-topic payloads go to the inbox,
/// everything else is ignored.
pub fn route_incoming(commands_topic: &str, topic: Option<&str>, data: &[u8]) -> bool {
    match topic {
        Some(t) if t == commands_topic => channels::enqueue(data),
        Some(t) => {
            debug!("MQTT: ignoring message on '{}'", t);
            false
        }
        None => false,
    }
}

/// Tracks broker sessions seen by the main loop so each new one gets a
/// fresh subscription and online ping.
#[derive(Debug, Default)]
pub struct SessionWatch {
    seen: u32,
}

impl SessionWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once per new broker session.
    pub fn poll(&mut self, link: &LinkState) -> bool {
        let sessions = link.sessions();
        if sessions != self.seen && link.is_connected() {
            self.seen = sessions;
            info!("MQTT: session {} established", sessions);
            return true;
        }
        false
    }
}

#[cfg(target_os = "espidf")]
pub use esp::MqttLink;

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_svc::mqtt::client::{
        Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
    };
    use esp_idf_svc::sys::EspError;
    use log::{info, warn};

    use super::{LinkState, route_incoming};
    use crate::app::ports::{CommsError, PublishPort};
    use crate::config::{SystemConfig, Text};
    use crate::rpc::topics::{Topic, TopicPath};

    static LINK: LinkState = LinkState::new();

    /// The device's broker connection.
    pub struct MqttLink {
        client: EspMqttClient<'static>,
        client_name: Text,
    }

    impl MqttLink {
        pub fn connect(cfg: &SystemConfig) -> Result<Self, EspError> {
            let url = super::broker_url(cfg).unwrap_or_default();
            let commands: TopicPath = Topic::Commands.path(&cfg.mqtt_client_name);
            let conf = MqttClientConfiguration {
                client_id: Some(cfg.mqtt_client_name.as_str()),
                username: non_empty(&cfg.mqtt_username),
                password: non_empty(&cfg.mqtt_password),
                ..Default::default()
            };

            info!("MQTT: connecting to {} as '{}'", url, cfg.mqtt_client_name);
            let client = EspMqttClient::new_cb(url.as_str(), &conf, move |event| {
                match event.payload() {
                    EventPayload::Connected(_) => LINK.on_connected(),
                    EventPayload::Disconnected => {
                        LINK.on_disconnected();
                        warn!("MQTT: disconnected");
                    }
                    EventPayload::Received {
                        topic,
                        data,
                        details: Details::Complete,
                        ..
                    } => {
                        route_incoming(&commands, topic, data);
                    }
                    EventPayload::Received { .. } => {
                        warn!("MQTT: fragmented message dropped");
                    }
                    _ => {}
                }
            })?;

            Ok(Self {
                client,
                client_name: cfg.mqtt_client_name.clone(),
            })
        }

        pub fn link(&self) -> &'static LinkState {
            &LINK
        }

        pub fn subscribe_commands(&mut self) -> Result<(), CommsError> {
            let topic = Topic::Commands.path(&self.client_name);
            self.client
                .subscribe(&topic, QoS::AtMostOnce)
                .map(|_| info!("MQTT: subscribed to {}", topic))
                .map_err(|_| CommsError::PublishFailed)
        }
    }

    impl PublishPort for MqttLink {
        fn publish(&mut self, topic: Topic, payload: &[u8]) -> Result<(), CommsError> {
            if !LINK.is_connected() {
                return Err(CommsError::NotConnected);
            }
            let path = topic.path(&self.client_name);
            self.client
                .enqueue(&path, QoS::AtMostOnce, false, payload)
                .map(|_| ())
                .map_err(|_| CommsError::PublishFailed)
        }
    }

    fn non_empty(s: &str) -> Option<&str> {
        if s.is_empty() { None } else { Some(s) }
    }
}

/// Publish the `"Online"` marker on the status topic.
pub fn announce_online(publisher: &mut impl crate::app::ports::PublishPort) {
    if let Err(e) = publisher.publish(Topic::Status, b"Online") {
        warn!("MQTT: online status not sent: {}", e);
    }
}
