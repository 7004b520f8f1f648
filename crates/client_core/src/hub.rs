use std::sync::{Arc, Mutex};

use shared::domain::{ConnectionState, Workspace};

pub type ConnectionStateListener = Box<dyn Fn(ConnectionState) + Send + Sync>;
pub type WorkspaceListener = Box<dyn Fn(&Workspace) + Send + Sync>;
pub type DataListener = Box<dyn Fn(&str, &str) + Send + Sync>;
pub type NoticeListener = Box<dyn Fn(&str) + Send + Sync>;

/// Fan-out point between transport internals and consumers.
///
/// Each channel holds at most one listener; registering again replaces
/// the previous one. Notification is synchronous on whatever context
/// the triggering event arrived on — a consumer that needs delivery on
/// a particular thread redispatches itself.
#[derive(Default)]
pub struct EventHub {
    connection_state: Mutex<Option<Arc<ConnectionStateListener>>>,
    workspace: Mutex<Option<Arc<WorkspaceListener>>>,
    data: Mutex<Option<Arc<DataListener>>>,
    notice: Mutex<Option<Arc<NoticeListener>>>,
}

impl EventHub {
    pub fn set_connection_state_listener(&self, listener: ConnectionStateListener) {
        if let Ok(mut slot) = self.connection_state.lock() {
            *slot = Some(Arc::new(listener));
        }
    }

    pub fn set_workspace_listener(&self, listener: WorkspaceListener) {
        if let Ok(mut slot) = self.workspace.lock() {
            *slot = Some(Arc::new(listener));
        }
    }

    pub fn set_data_listener(&self, listener: DataListener) {
        if let Ok(mut slot) = self.data.lock() {
            *slot = Some(Arc::new(listener));
        }
    }

    /// Sink for user-visible failure notifications; the platform toast
    /// layer is the intended subscriber.
    pub fn set_notice_listener(&self, listener: NoticeListener) {
        if let Ok(mut slot) = self.notice.lock() {
            *slot = Some(Arc::new(listener));
        }
    }

    pub fn notify_connection_state(&self, state: ConnectionState) {
        if let Some(listener) = slot_ref(&self.connection_state) {
            listener(state);
        }
    }

    pub fn notify_workspace(&self, workspace: &Workspace) {
        if let Some(listener) = slot_ref(&self.workspace) {
            listener(workspace);
        }
    }

    pub fn notify_data(&self, topic: &str, payload: &str) {
        if let Some(listener) = slot_ref(&self.data) {
            listener(topic, payload);
        }
    }

    pub fn notify_notice(&self, message: &str) {
        if let Some(listener) = slot_ref(&self.notice) {
            listener(message);
        }
    }
}

// Clones the slot out so the listener runs without the slot lock held;
// a listener may re-register itself.
fn slot_ref<T: ?Sized>(slot: &Mutex<Option<Arc<T>>>) -> Option<Arc<T>> {
    slot.lock().ok().and_then(|guard| guard.clone())
}
