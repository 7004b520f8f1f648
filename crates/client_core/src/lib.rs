use std::sync::Arc;

use rumqttc::{Event, EventLoop, Packet};
use shared::{
    domain::{ConnectionState, Workspace, WorkspaceItem},
    protocol::{self, ALL_TOPICS_FILTER, WORKSPACE_TOPIC},
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, error, info, warn};

pub mod config;
pub mod hub;
pub mod retry;
pub mod transport;

pub use config::{load_settings, BrokerSettings};
pub use hub::EventHub;
pub use retry::RetryPolicy;

use transport::BrokerSession;

/// Client for a broker-held dashboard workspace.
///
/// Owns exactly one logical broker session, keeps the in-memory
/// workspace in lockstep with the retained snapshot on the workspace
/// topic, and recovers from connection loss on a timer. All shared
/// state lives behind one mutex; transport events reach it through a
/// single driver task per connection attempt.
///
/// Nothing here returns an error to the caller: every failure is
/// logged and surfaced as a notice on the hub.
pub struct BoardClient {
    settings: BrokerSettings,
    retry: RetryPolicy,
    hub: EventHub,
    inner: Mutex<ClientShared>,
}

struct ClientShared {
    connection_state: ConnectionState,
    session: Option<Arc<dyn BrokerSession>>,
    workspace: Workspace,
    /// Bumped on every connection attempt. A driver task whose
    /// generation no longer matches must leave shared state alone.
    generation: u64,
    driver_task: Option<JoinHandle<()>>,
    retry_task: Option<JoinHandle<()>>,
    /// Consecutive failed attempts, reset on success.
    attempts: u32,
}

impl BoardClient {
    pub fn new(settings: BrokerSettings) -> Arc<Self> {
        Self::with_retry(settings, RetryPolicy::default())
    }

    pub fn with_retry(settings: BrokerSettings, retry: RetryPolicy) -> Arc<Self> {
        Arc::new(Self {
            settings,
            retry,
            hub: EventHub::default(),
            inner: Mutex::new(ClientShared {
                connection_state: ConnectionState::Offline,
                session: None,
                workspace: Workspace::default(),
                generation: 0,
                driver_task: None,
                retry_task: None,
                attempts: 0,
            }),
        })
    }

    pub fn events(&self) -> &EventHub {
        &self.hub
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.inner.lock().await.connection_state
    }

    /// Clone of the current in-memory workspace.
    pub async fn workspace(&self) -> Workspace {
        self.inner.lock().await.workspace.clone()
    }

    /// Starts the reconnect timer (if not already running) and opens a
    /// fresh session. Always begins a new attempt, superseding any in
    /// flight; the generation tag keeps the superseded driver inert.
    pub async fn connect(self: &Arc<Self>) {
        self.ensure_retry_timer().await;
        self.start_attempt().await;
    }

    /// Cancels the reconnect timer, then closes the session gracefully
    /// if currently connected. Close errors are surfaced, not fatal.
    pub async fn disconnect(&self) {
        let (retry_task, session) = {
            let mut inner = self.inner.lock().await;
            let retry_task = inner.retry_task.take();
            let session = if inner.connection_state == ConnectionState::Connected {
                inner.session.clone()
            } else {
                None
            };
            (retry_task, session)
        };
        if let Some(task) = retry_task {
            task.abort();
        }
        if let Some(session) = session {
            if let Err(err) = session.disconnect().await {
                error!(error = %err, "graceful disconnect failed");
                self.notice(&format!("failed to disconnect: {err}"));
            }
        }
    }

    /// Full cycle: close the current session and, once closure
    /// succeeds, connect again. Failure to close is surfaced and does
    /// not force a retry.
    pub async fn reconnect(self: &Arc<Self>) {
        let session = self.inner.lock().await.session.clone();
        let Some(session) = session else {
            self.connect().await;
            return;
        };
        match session.disconnect().await {
            Ok(()) => self.connect().await,
            Err(err) => {
                error!(error = %err, "failed to close session before reconnect");
                self.notice(&format!("failed to disconnect: {err}"));
            }
        }
    }

    async fn ensure_retry_timer(self: &Arc<Self>) {
        let mut inner = self.inner.lock().await;
        if inner.retry_task.is_some() {
            return;
        }
        let client = Arc::clone(self);
        let interval = self.retry.interval;
        inner.retry_task = Some(tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                let (offline, exhausted) = {
                    let inner = client.inner.lock().await;
                    (
                        inner.connection_state == ConnectionState::Offline,
                        client.retry.exhausted(inner.attempts),
                    )
                };
                if exhausted {
                    warn!("reconnect attempts exhausted");
                    break;
                }
                if offline {
                    client.start_attempt().await;
                }
            }
        }));
    }

    async fn start_attempt(self: &Arc<Self>) {
        let (generation, event_loop, changed) = {
            let mut inner = self.inner.lock().await;
            inner.generation = inner.generation.wrapping_add(1);
            inner.attempts = inner.attempts.saturating_add(1);
            if let Some(previous) = inner.driver_task.take() {
                previous.abort();
            }
            let (session, event_loop) = transport::open_session(&self.settings);
            inner.session = Some(Arc::new(session));
            let changed = inner.connection_state != ConnectionState::Connecting;
            inner.connection_state = ConnectionState::Connecting;
            (inner.generation, event_loop, changed)
        };
        if changed {
            self.hub.notify_connection_state(ConnectionState::Connecting);
        }
        info!(
            host = %self.settings.host,
            port = self.settings.port,
            "connecting to broker"
        );

        let client = Arc::clone(self);
        let driver = tokio::spawn(async move { client.drive(generation, event_loop).await });
        self.inner.lock().await.driver_task = Some(driver);
    }

    /// Pumps one session's event loop until it dies or is superseded.
    async fn drive(self: Arc<Self>, generation: u64, mut event_loop: EventLoop) {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    if !self.handle_connected(generation).await {
                        break;
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if self.stale(generation).await {
                        break;
                    }
                    let payload = String::from_utf8_lossy(&publish.payload).into_owned();
                    self.handle_message(&publish.topic, &payload).await;
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    self.handle_connection_lost(generation).await;
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    debug!(error = %err, "transport error");
                    self.handle_connection_lost(generation).await;
                    break;
                }
            }
        }
    }

    /// CONNACK arrived: state goes CONNECTED, then the wildcard
    /// subscription is installed. Subscribe failure is surfaced but
    /// leaves the connection state alone. Returns false when this
    /// attempt has been superseded.
    async fn handle_connected(&self, generation: u64) -> bool {
        let (session, changed) = {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                return false;
            }
            inner.attempts = 0;
            let changed = inner.connection_state != ConnectionState::Connected;
            inner.connection_state = ConnectionState::Connected;
            (inner.session.clone(), changed)
        };
        if changed {
            info!("connected to broker");
            self.hub.notify_connection_state(ConnectionState::Connected);
        }
        if let Some(session) = session {
            if let Err(err) = session.subscribe_all().await {
                error!(error = %err, "failed to subscribe to broker topics");
                self.notice(&format!("failed to subscribe to {ALL_TOPICS_FILTER}: {err}"));
            }
        }
        true
    }

    /// Loss (or attempt failure) is not an error: state goes OFFLINE
    /// silently and the retry timer takes it from there.
    async fn handle_connection_lost(&self, generation: u64) {
        let changed = {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                return;
            }
            inner.session = None;
            let changed = inner.connection_state != ConnectionState::Offline;
            inner.connection_state = ConnectionState::Offline;
            changed
        };
        if changed {
            info!("broker connection offline");
            self.hub.notify_connection_state(ConnectionState::Offline);
        }
    }

    async fn stale(&self, generation: u64) -> bool {
        self.inner.lock().await.generation != generation
    }

    /// Routes one inbound message: the workspace topic is special-cased,
    /// everything else passes through verbatim.
    async fn handle_message(&self, topic: &str, payload: &str) {
        debug!(topic, payload, "message arrived");
        if topic == WORKSPACE_TOPIC {
            self.apply_snapshot(payload).await;
        } else {
            self.hub.notify_data(topic, payload);
        }
    }

    /// Replaces the in-memory workspace with a parsed inbound snapshot.
    /// A malformed payload is rejected whole: the previous workspace
    /// stays in place and no partial state is adopted.
    async fn apply_snapshot(&self, payload: &str) {
        match protocol::decode_snapshot(payload) {
            Ok(workspace) => {
                {
                    let mut inner = self.inner.lock().await;
                    inner.workspace = workspace.clone();
                }
                debug!(items = workspace.items.len(), "workspace snapshot applied");
                self.hub.notify_workspace(&workspace);
            }
            Err(err) => {
                error!(error = %err, "failed to parse workspace snapshot");
                self.notice(&format!("failed to parse workspace: {err}"));
            }
        }
    }

    /// Replaces the local workspace optimistically and ships the full
    /// snapshot as a retained, fire-and-forget publish. Concurrent
    /// writers race last-publish-wins — there is no version check and
    /// no merge — and a failed publish leaves local and broker state
    /// divergent until the next inbound snapshot.
    pub async fn publish_workspace(&self, workspace: Workspace) {
        let payload = match protocol::encode_snapshot(&workspace) {
            Ok(payload) => payload,
            Err(err) => {
                error!(error = %err, "failed to serialize workspace");
                self.notice(&format!("failed to save workspace: {err}"));
                return;
            }
        };
        let session = {
            let mut inner = self.inner.lock().await;
            inner.workspace = workspace.clone();
            inner.session.clone()
        };
        self.hub.notify_workspace(&workspace);

        let Some(session) = session else {
            warn!("workspace publish skipped, no broker session");
            self.notice("failed to save workspace: not connected");
            return;
        };
        if let Err(err) = session.publish_retained(WORKSPACE_TOPIC, payload).await {
            error!(error = %err, "workspace publish failed");
            self.notice(&format!("failed to save workspace: {err}"));
        }
    }

    /// Swaps the item one position toward the front. Already-first is a
    /// silent no-op; an unknown id is reported and nothing is published.
    pub async fn move_back(&self, id: &str) {
        let current = self.workspace().await;
        let Some(index) = current.find_item(id) else {
            self.missing_item(id);
            return;
        };
        if index == 0 {
            return;
        }
        let mut items = current.items;
        items.swap(index - 1, index);
        self.publish_workspace(Workspace { items }).await;
    }

    /// Swaps the item one position toward the end. Already-last is a
    /// silent no-op.
    pub async fn move_forth(&self, id: &str) {
        let current = self.workspace().await;
        let Some(index) = current.find_item(id) else {
            self.missing_item(id);
            return;
        };
        if index + 1 == current.items.len() {
            return;
        }
        let mut items = current.items;
        items.swap(index, index + 1);
        self.publish_workspace(Workspace { items }).await;
    }

    /// Appends the item. Ids are not checked for uniqueness.
    pub async fn create_item(&self, item: WorkspaceItem) {
        let mut items = self.workspace().await.items;
        items.push(item);
        self.publish_workspace(Workspace { items }).await;
    }

    pub async fn update_item(&self, id: &str, item: WorkspaceItem) {
        let current = self.workspace().await;
        let Some(index) = current.find_item(id) else {
            self.missing_item(id);
            return;
        };
        let mut items = current.items;
        items[index] = item;
        self.publish_workspace(Workspace { items }).await;
    }

    pub async fn delete_item(&self, id: &str) {
        let current = self.workspace().await;
        let Some(index) = current.find_item(id) else {
            self.missing_item(id);
            return;
        };
        let mut items = current.items;
        items.remove(index);
        self.publish_workspace(Workspace { items }).await;
    }

    /// Read-only lookup; an unknown id is reported and yields `None`.
    pub async fn get_item(&self, id: &str) -> Option<WorkspaceItem> {
        let found = {
            let inner = self.inner.lock().await;
            inner.workspace.get_item(id).cloned()
        };
        if found.is_none() {
            self.missing_item(id);
        }
        found
    }

    fn missing_item(&self, id: &str) {
        warn!(id, "item lookup failed");
        self.notice(&format!("item with id {id} not found"));
    }

    fn notice(&self, message: &str) {
        self.hub.notify_notice(message);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
