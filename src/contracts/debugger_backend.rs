//! Browser contract (§6)
//!
//! The raw CDP-style transport the Debugger Channel (`browser::channel`)
//! wraps: `attach`, `sendCommand`, and a stream of page/network events. A
//! host exposing an equivalent protocol — embedded browser, Playwright-style
//! driver, remote CDP endpoint — can stand in for `DebuggerBackend`.

use async_trait::async_trait;
use serde_json::Value;

use crate::core::Result;

/// A tab id minted by the browser/backend
pub type TabId = u64;

/// Page/network events the backend pushes to subscribers
#[derive(Debug, Clone)]
pub enum DebuggerEvent {
    /// `Page.loadEventFired`
    LoadEventFired { tab_id: TabId },
    /// A network request started (`Network.requestWillBeSent`)
    RequestWillBeSent { tab_id: TabId, request_id: String },
    /// A network request finished (`Network.loadingFinished`)
    LoadingFinished { tab_id: TabId, request_id: String },
    /// A network request failed (`Network.loadingFailed`)
    LoadingFailed { tab_id: TabId, request_id: String },
    /// The backend observed the tab get detached outside of our control
    /// (e.g. the user opened the browser's own devtools on it)
    Detached { tab_id: TabId },
    /// A new tab/window was created, e.g. from a `target="_blank"` click
    TargetCreated { tab_id: TabId },
    /// A tab was closed
    TargetDestroyed { tab_id: TabId },
}

/// The host's raw CDP-style attach/sendCommand API
#[async_trait]
pub trait DebuggerBackend: Send + Sync {
    /// Create a new tab navigated to `url`, returning its id
    async fn create_tab(&self, url: &str) -> Result<TabId>;

    /// Attach a debugger session to a tab. Idempotent at the backend level.
    async fn attach(&self, tab_id: TabId, protocol_version: &str) -> Result<()>;

    /// Detach a debugger session. Idempotent; ok if already detached.
    async fn detach(&self, tab_id: TabId) -> Result<()>;

    /// Send a CDP-style command (e.g. `"Page.navigate"`, `"Runtime.evaluate"`,
    /// `"Input.dispatchMouseEvent"`) and return its raw JSON result.
    async fn send_command(&self, tab_id: TabId, method: &str, params: Value) -> Result<Value>;

    /// Close a tab outright
    async fn close_tab(&self, tab_id: TabId) -> Result<()>;

    /// Subscribe to page/network/target events, delivered on the owning event loop
    fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DebuggerEvent>;
}
