//! Tab Registry (§4.2)
//!
//! Exclusively owns tab state records. The Agent Loop mutates them only
//! through `updateState`; nothing else writes to a `Tab`.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::contracts::DebuggerBackend;
use crate::core::Result;

pub type TabId = u64;

/// Lifecycle status of one agent-owned tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabStatus {
    Pending,
    Running,
    Extracting,
    Done,
    Error,
}

/// Per-tab state record, owned exclusively by the `TabRegistry`
#[derive(Debug, Clone)]
pub struct Tab {
    pub id: TabId,
    pub attached: bool,
    pub url: String,
    pub title: String,
    pub task_description: String,
    pub status: TabStatus,
    pub extracted_data: String,
    pub error: Option<String>,
}

impl Tab {
    fn new(id: TabId, url: String, task_description: String) -> Self {
        Self {
            id,
            attached: false,
            url,
            title: String::new(),
            task_description,
            status: TabStatus::Pending,
            extracted_data: String::new(),
            error: None,
        }
    }
}

/// A partial update applied via `updateState`; `None` fields are left alone
#[derive(Debug, Clone, Default)]
pub struct TabStateUpdate {
    pub attached: Option<bool>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub status: Option<TabStatus>,
    pub extracted_data: Option<String>,
    pub error: Option<Option<String>>,
}

/// Lifecycle manager for agent-owned tabs
pub struct TabRegistry {
    backend: std::sync::Arc<dyn DebuggerBackend>,
    tabs: Mutex<HashMap<TabId, Tab>>,
}

impl TabRegistry {
    pub fn new(backend: std::sync::Arc<dyn DebuggerBackend>) -> Self {
        Self {
            backend,
            tabs: Mutex::new(HashMap::new()),
        }
    }

    /// Normalize a bare hostname (`example.com`) into `https://example.com`
    pub fn normalize_url(raw: &str) -> String {
        match url::Url::parse(raw) {
            Ok(_) => raw.to_string(),
            Err(_) => format!("https://{}", raw),
        }
    }

    pub async fn create_tab(&self, url: &str, task_description: &str) -> Result<TabId> {
        let normalized = Self::normalize_url(url);
        let tab_id = self.backend.create_tab(&normalized).await?;
        let tab = Tab::new(tab_id, normalized, task_description.to_string());
        self.tabs.lock().await.insert(tab_id, tab);
        Ok(tab_id)
    }

    pub async fn attach(&self, tab_id: TabId) -> Result<()> {
        self.backend.attach(tab_id, "1.3").await?;
        if let Some(tab) = self.tabs.lock().await.get_mut(&tab_id) {
            tab.attached = true;
        }
        Ok(())
    }

    pub async fn detach(&self, tab_id: TabId) -> Result<()> {
        self.backend.detach(tab_id).await?;
        if let Some(tab) = self.tabs.lock().await.get_mut(&tab_id) {
            tab.attached = false;
        }
        Ok(())
    }

    pub async fn close_tab(&self, tab_id: TabId) -> Result<()> {
        let _ = self.backend.detach(tab_id).await;
        let _ = self.backend.close_tab(tab_id).await;
        self.tabs.lock().await.remove(&tab_id);
        Ok(())
    }

    pub async fn detach_all(&self) -> Result<()> {
        let ids: Vec<TabId> = self.tabs.lock().await.keys().copied().collect();
        for id in ids {
            let _ = self.detach(id).await;
        }
        Ok(())
    }

    pub async fn close_all(&self) -> Result<()> {
        self.detach_all().await?;
        let ids: Vec<TabId> = self.tabs.lock().await.keys().copied().collect();
        for id in ids {
            let _ = self.close_tab(id).await;
        }
        Ok(())
    }

    pub async fn update_state(&self, tab_id: TabId, update: TabStateUpdate) {
        if let Some(tab) = self.tabs.lock().await.get_mut(&tab_id) {
            if let Some(v) = update.attached {
                tab.attached = v;
            }
            if let Some(v) = update.url {
                tab.url = v;
            }
            if let Some(v) = update.title {
                tab.title = v;
            }
            if let Some(v) = update.status {
                tab.status = v;
            }
            if let Some(v) = update.extracted_data {
                tab.extracted_data = v;
            }
            if let Some(v) = update.error {
                tab.error = v;
            }
        }
    }

    pub async fn get_state(&self, tab_id: TabId) -> Option<Tab> {
        self.tabs.lock().await.get(&tab_id).cloned()
    }

    pub async fn get_all_states(&self) -> Vec<Tab> {
        self.tabs.lock().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::backend::MockBackend;

    fn registry() -> TabRegistry {
        TabRegistry::new(std::sync::Arc::new(MockBackend::new()))
    }

    #[test]
    fn normalize_url_prefixes_bare_hostnames() {
        assert_eq!(TabRegistry::normalize_url("example.com"), "https://example.com");
        assert_eq!(
            TabRegistry::normalize_url("https://example.com"),
            "https://example.com"
        );
    }

    #[tokio::test]
    async fn create_tab_then_get_state() {
        let reg = registry();
        let id = reg.create_tab("example.com", "look around").await.unwrap();
        let tab = reg.get_state(id).await.unwrap();
        assert_eq!(tab.url, "https://example.com");
        assert_eq!(tab.status, TabStatus::Pending);
    }

    #[tokio::test]
    async fn detach_is_idempotent() {
        let reg = registry();
        let id = reg.create_tab("example.com", "").await.unwrap();
        reg.attach(id).await.unwrap();
        reg.detach(id).await.unwrap();
        reg.detach(id).await.unwrap();
        assert!(!reg.get_state(id).await.unwrap().attached);
    }

    #[tokio::test]
    async fn close_tab_is_idempotent_and_removes_state() {
        let reg = registry();
        let id = reg.create_tab("example.com", "").await.unwrap();
        reg.close_tab(id).await.unwrap();
        reg.close_tab(id).await.unwrap();
        assert!(reg.get_state(id).await.is_none());
    }

    #[tokio::test]
    async fn update_state_only_touches_provided_fields() {
        let reg = registry();
        let id = reg.create_tab("example.com", "task").await.unwrap();
        reg.update_state(
            id,
            TabStateUpdate {
                status: Some(TabStatus::Running),
                ..Default::default()
            },
        )
        .await;
        let tab = reg.get_state(id).await.unwrap();
        assert_eq!(tab.status, TabStatus::Running);
        assert_eq!(tab.task_description, "task");
    }
}
