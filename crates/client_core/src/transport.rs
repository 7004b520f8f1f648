use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, NetworkOptions, QoS};
use uuid::Uuid;

use crate::config::BrokerSettings;
use shared::protocol::ALL_TOPICS_FILTER;

const KEEP_ALIVE: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT_SECS: u64 = 5;
const REQUEST_CHANNEL_CAPACITY: usize = 64;

/// The slice of a broker session the sync layer needs. Production code
/// wraps a rumqttc client; tests install a recording fake.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    /// Subscribes to the wildcard filter so every topic is observed.
    async fn subscribe_all(&self) -> Result<()>;
    /// Fire-and-forget retained publish; no delivery confirmation.
    async fn publish_retained(&self, topic: &str, payload: String) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
}

pub(crate) struct MqttSession {
    client: AsyncClient,
}

#[async_trait]
impl BrokerSession for MqttSession {
    async fn subscribe_all(&self) -> Result<()> {
        self.client.subscribe(ALL_TOPICS_FILTER, QoS::AtMostOnce).await?;
        Ok(())
    }

    async fn publish_retained(&self, topic: &str, payload: String) -> Result<()> {
        self.client
            .publish(topic, QoS::AtMostOnce, true, payload)
            .await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.client.disconnect().await?;
        Ok(())
    }
}

/// Builds a fresh session for one connection attempt. Nothing touches
/// the network until the returned event loop is polled. The client id
/// is regenerated per attempt and is not stable across reconnects.
pub(crate) fn open_session(settings: &BrokerSettings) -> (MqttSession, EventLoop) {
    let client_id = format!("board-{}", Uuid::new_v4().simple());
    let mut options = MqttOptions::new(client_id, settings.host.clone(), settings.port);
    options.set_keep_alive(KEEP_ALIVE);
    options.set_clean_session(true);
    // Credentials ride along only when a username is configured.
    if let Some(username) = settings.username.as_deref().filter(|u| !u.is_empty()) {
        options.set_credentials(username, settings.password.as_deref().unwrap_or_default());
    }

    let (client, mut event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
    let mut network = NetworkOptions::new();
    network.set_connection_timeout(CONNECT_TIMEOUT_SECS);
    event_loop.set_network_options(network);

    (MqttSession { client }, event_loop)
}
