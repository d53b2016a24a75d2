//! Debugger Channel (§4.1)
//!
//! A thin, typed wrapper over the host's raw `DebuggerBackend`: tracks the
//! set of currently-attached tabs, forwards external detachment events into
//! that set, and rejects commands sent to unattached tabs.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, Mutex};

use crate::contracts::{DebuggerBackend, DebuggerEvent};
use crate::core::{EdithError, Result};

use super::tabs::TabId;

pub struct DebuggerChannel {
    backend: Arc<dyn DebuggerBackend>,
    attached: Mutex<HashSet<TabId>>,
}

impl DebuggerChannel {
    /// Wraps `backend` and spawns a forwarding task that reflects external
    /// detachments into the attached-tab set, per §4.1's "observed and
    /// reflected" rule.
    pub fn new(backend: Arc<dyn DebuggerBackend>) -> Arc<Self> {
        let channel = Arc::new(Self {
            backend: backend.clone(),
            attached: Mutex::new(HashSet::new()),
        });

        let mut events = backend.subscribe();
        let weak = Arc::downgrade(&channel);
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                let Some(channel) = weak.upgrade() else { break };
                if let DebuggerEvent::Detached { tab_id } = event {
                    channel.attached.lock().await.remove(&tab_id);
                }
            }
        });

        channel
    }

    /// Idempotent: attaching an already-attached tab is a no-op.
    pub async fn attach(&self, tab_id: TabId) -> Result<()> {
        if self.attached.lock().await.contains(&tab_id) {
            return Ok(());
        }
        self.backend.attach(tab_id, "1.3").await?;
        self.attached.lock().await.insert(tab_id);
        Ok(())
    }

    /// Idempotent: detaching a tab that isn't attached is a no-op.
    pub async fn detach(&self, tab_id: TabId) -> Result<()> {
        if !self.attached.lock().await.remove(&tab_id) {
            return Ok(());
        }
        self.backend.detach(tab_id).await
    }

    /// Drains the attached set.
    pub async fn detach_all(&self) -> Result<()> {
        let ids: Vec<TabId> = self.attached.lock().await.drain().collect();
        for id in ids {
            let _ = self.backend.detach(id).await;
        }
        Ok(())
    }

    pub async fn send(&self, tab_id: TabId, method: &str, params: Value) -> Result<Value> {
        if !self.attached.lock().await.contains(&tab_id) {
            return Err(EdithError::NotAttached(tab_id));
        }
        self.backend.send_command(tab_id, method, params).await
    }

    pub fn on(&self) -> broadcast::Receiver<DebuggerEvent> {
        self.backend.subscribe()
    }

    pub async fn attached_tabs(&self) -> HashSet<TabId> {
        self.attached.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::backend::MockBackend;
    use serde_json::json;

    #[tokio::test]
    async fn attach_is_idempotent() {
        let backend = Arc::new(MockBackend::new());
        let channel = DebuggerChannel::new(backend.clone());
        channel.attach(1).await.unwrap();
        channel.attach(1).await.unwrap();
        assert_eq!(channel.attached_tabs().await.len(), 1);
    }

    #[tokio::test]
    async fn detach_is_idempotent() {
        let backend = Arc::new(MockBackend::new());
        let channel = DebuggerChannel::new(backend);
        channel.attach(1).await.unwrap();
        channel.detach(1).await.unwrap();
        channel.detach(1).await.unwrap();
        assert!(channel.attached_tabs().await.is_empty());
    }

    #[tokio::test]
    async fn detach_all_drains_set() {
        let backend = Arc::new(MockBackend::new());
        let channel = DebuggerChannel::new(backend);
        channel.attach(1).await.unwrap();
        channel.attach(2).await.unwrap();
        channel.detach_all().await.unwrap();
        assert!(channel.attached_tabs().await.is_empty());
        channel.detach_all().await.unwrap();
    }

    #[tokio::test]
    async fn send_on_unattached_tab_fails() {
        let backend = Arc::new(MockBackend::new());
        let channel = DebuggerChannel::new(backend);
        let err = channel.send(1, "Runtime.evaluate", json!({})).await.unwrap_err();
        assert!(matches!(err, EdithError::NotAttached(1)));
    }

    #[tokio::test]
    async fn external_detach_event_is_reflected() {
        let backend = Arc::new(MockBackend::new());
        let channel = DebuggerChannel::new(backend.clone());
        channel.attach(1).await.unwrap();
        backend.emit(DebuggerEvent::Detached { tab_id: 1 }).await;

        // give the forwarding task a turn
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(channel.attached_tabs().await.is_empty());
    }
}
