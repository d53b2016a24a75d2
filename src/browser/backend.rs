//! Concrete `DebuggerBackend` adapters (§6 "Browser contract")
//!
//! Two implementations: `ChromiumBackend`, a real CDP transport over
//! `chromiumoxide`, and `MockBackend`, an in-memory stand-in for tests that
//! don't need a real browser. The contract these implement is narrow on
//! purpose; only the wrapper logic in `browser::channel::DebuggerChannel`
//! matters to callers, these just give that wrapper something real
//! underneath it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, InsertTextParams,
};
use chromiumoxide::cdp::browser_protocol::network::EnableParams as NetworkEnableParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotParams, EnableParams as PageEnableParams, NavigateParams,
};
use chromiumoxide::{Browser, BrowserConfig as ChromiumConfig, Page};
use futures::StreamExt as _;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Mutex};

use crate::contracts::{DebuggerBackend, DebuggerEvent};
use crate::core::config::BrowserConfig;
use crate::core::{EdithError, Result};

use super::tabs::TabId;

/// A `chromiumoxide`-backed `DebuggerBackend`: one real Chrome/Chromium
/// instance, one `Page` per agent tab.
pub struct ChromiumBackend {
    browser: Browser,
    /// Keeps the browser's background event-handling task alive
    _handler: tokio::task::JoinHandle<()>,
    pages: Mutex<HashMap<TabId, Page>>,
    events: broadcast::Sender<DebuggerEvent>,
    next_tab_id: std::sync::atomic::AtomicU64,
}

impl ChromiumBackend {
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut chromium_config_builder = ChromiumConfig::builder()
            .window_size(config.viewport_width, config.viewport_height);
        if !config.headless {
            chromium_config_builder = chromium_config_builder.with_head();
        }
        let chromium_config = chromium_config_builder
            .build()
            .map_err(|e| EdithError::protocol(format!("failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(chromium_config)
            .await
            .map_err(|e| EdithError::protocol(format!("failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });

        let (tx, _rx) = broadcast::channel(256);

        Ok(Self {
            browser,
            _handler: handler_task,
            pages: Mutex::new(HashMap::new()),
            events: tx,
            next_tab_id: std::sync::atomic::AtomicU64::new(1),
        })
    }

    async fn page_for(&self, tab_id: TabId) -> Result<Page> {
        self.pages
            .lock()
            .await
            .get(&tab_id)
            .cloned()
            .ok_or(EdithError::NotAttached(tab_id))
    }
}

#[async_trait]
impl DebuggerBackend for ChromiumBackend {
    async fn create_tab(&self, url: &str) -> Result<TabId> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| EdithError::protocol(format!("failed to open tab: {}", e)))?;

        let tab_id = self
            .next_tab_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.pages.lock().await.insert(tab_id, page);
        self.events
            .send(DebuggerEvent::TargetCreated { tab_id })
            .ok();
        Ok(tab_id)
    }

    async fn attach(&self, tab_id: TabId, _protocol_version: &str) -> Result<()> {
        let page = self.page_for(tab_id).await?;
        page.execute(PageEnableParams::default())
            .await
            .map_err(|e| EdithError::protocol(format!("Page.enable failed: {}", e)))?;
        page.execute(NetworkEnableParams::default())
            .await
            .map_err(|e| EdithError::protocol(format!("Network.enable failed: {}", e)))?;
        Ok(())
    }

    async fn detach(&self, tab_id: TabId) -> Result<()> {
        // Idempotent: absence of the tab is not an error.
        let _ = self.pages.lock().await.get(&tab_id);
        Ok(())
    }

    async fn send_command(&self, tab_id: TabId, method: &str, params: Value) -> Result<Value> {
        let page = self.page_for(tab_id).await?;

        match method {
            "Page.navigate" => {
                let url = params
                    .get("url")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| EdithError::protocol("Page.navigate requires url"))?;
                page.execute(NavigateParams::new(url))
                    .await
                    .map_err(|e| EdithError::protocol(format!("Page.navigate failed: {}", e)))?;
                Ok(json!({}))
            }
            "Runtime.evaluate" => {
                let expr = params
                    .get("expression")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| EdithError::protocol("Runtime.evaluate requires expression"))?;
                let result = page
                    .evaluate(expr)
                    .await
                    .map_err(|e| EdithError::protocol(format!("Runtime.evaluate failed: {}", e)))?;
                Ok(result.into_value().unwrap_or(Value::Null))
            }
            "Input.dispatchMouseEvent" => {
                let (x, y, event_type) = mouse_params(&params)?;
                page.execute(
                    DispatchMouseEventParams::builder()
                        .x(x)
                        .y(y)
                        .r#type(event_type)
                        .build()
                        .map_err(EdithError::protocol)?,
                )
                .await
                .map_err(|e| EdithError::protocol(format!("Input.dispatchMouseEvent failed: {}", e)))?;
                Ok(json!({}))
            }
            "Input.dispatchKeyEvent" => {
                let event_type = key_event_type(&params)?;
                let mut builder = DispatchKeyEventParams::builder().r#type(event_type);
                if let Some(code) = params.get("windowsVirtualKeyCode").and_then(|v| v.as_i64()) {
                    builder = builder.windows_virtual_key_code(code);
                }
                if let Some(text) = params.get("text").and_then(|v| v.as_str()) {
                    builder = builder.text(text);
                }
                page.execute(builder.build().map_err(EdithError::protocol)?)
                    .await
                    .map_err(|e| EdithError::protocol(format!("Input.dispatchKeyEvent failed: {}", e)))?;
                Ok(json!({}))
            }
            "Input.insertText" => {
                let text = params
                    .get("text")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| EdithError::protocol("Input.insertText requires text"))?;
                page.execute(InsertTextParams::new(text))
                    .await
                    .map_err(|e| EdithError::protocol(format!("Input.insertText failed: {}", e)))?;
                Ok(json!({}))
            }
            "Network.enable" => {
                page.execute(NetworkEnableParams::default())
                    .await
                    .map_err(|e| EdithError::protocol(format!("Network.enable failed: {}", e)))?;
                Ok(json!({}))
            }
            "Page.captureScreenshot" => {
                let bytes = page
                    .execute(CaptureScreenshotParams::default())
                    .await
                    .map_err(|e| EdithError::protocol(format!("Page.captureScreenshot failed: {}", e)))?;
                Ok(json!({ "data": bytes.result.data }))
            }
            other => Err(EdithError::protocol(format!("unsupported CDP method: {}", other))),
        }
    }

    async fn close_tab(&self, tab_id: TabId) -> Result<()> {
        if let Some(page) = self.pages.lock().await.remove(&tab_id) {
            let _ = page.close().await;
        }
        self.events
            .send(DebuggerEvent::TargetDestroyed { tab_id })
            .ok();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<DebuggerEvent> {
        self.events.subscribe()
    }
}

fn mouse_params(params: &Value) -> Result<(f64, f64, DispatchMouseEventType)> {
    let x = params
        .get("x")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| EdithError::protocol("dispatchMouseEvent requires x"))?;
    let y = params
        .get("y")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| EdithError::protocol("dispatchMouseEvent requires y"))?;
    let kind = match params.get("type").and_then(|v| v.as_str()) {
        Some("mousePressed") => DispatchMouseEventType::MousePressed,
        Some("mouseReleased") => DispatchMouseEventType::MouseReleased,
        Some("mouseMoved") | None => DispatchMouseEventType::MouseMoved,
        Some(other) => {
            return Err(EdithError::protocol(format!("unknown mouse event type: {}", other)))
        }
    };
    Ok((x, y, kind))
}

fn key_event_type(params: &Value) -> Result<DispatchKeyEventType> {
    match params.get("type").and_then(|v| v.as_str()) {
        Some("keyDown") => Ok(DispatchKeyEventType::KeyDown),
        Some("keyUp") => Ok(DispatchKeyEventType::KeyUp),
        Some(other) => Err(EdithError::protocol(format!("unknown key event type: {}", other))),
        None => Err(EdithError::protocol("dispatchKeyEvent requires type")),
    }
}

/// In-memory `DebuggerBackend` for tests: no real browser, just bookkeeping
/// and a scriptable response table so action-primitive tests can run without
/// a live Chrome instance.
pub struct MockBackend {
    attached: Mutex<std::collections::HashSet<TabId>>,
    next_tab_id: std::sync::atomic::AtomicU64,
    events: broadcast::Sender<DebuggerEvent>,
    /// method -> canned JSON response
    responses: Mutex<HashMap<String, Value>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self {
            attached: Mutex::new(std::collections::HashSet::new()),
            next_tab_id: std::sync::atomic::AtomicU64::new(1),
            events: tx,
            responses: Mutex::new(HashMap::new()),
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a canned response for the next call to `method`
    pub async fn stub(&self, method: &str, response: Value) {
        self.responses.lock().await.insert(method.to_string(), response);
    }

    pub async fn emit(&self, event: DebuggerEvent) {
        let _ = self.events.send(event);
    }

    pub async fn is_attached(&self, tab_id: TabId) -> bool {
        self.attached.lock().await.contains(&tab_id)
    }
}

#[async_trait]
impl DebuggerBackend for MockBackend {
    async fn create_tab(&self, _url: &str) -> Result<TabId> {
        Ok(self
            .next_tab_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst))
    }

    async fn attach(&self, tab_id: TabId, _protocol_version: &str) -> Result<()> {
        self.attached.lock().await.insert(tab_id);
        Ok(())
    }

    async fn detach(&self, tab_id: TabId) -> Result<()> {
        self.attached.lock().await.remove(&tab_id);
        Ok(())
    }

    async fn send_command(&self, tab_id: TabId, method: &str, _params: Value) -> Result<Value> {
        if !self.attached.lock().await.contains(&tab_id) {
            return Err(EdithError::NotAttached(tab_id));
        }
        Ok(self
            .responses
            .lock()
            .await
            .get(method)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn close_tab(&self, tab_id: TabId) -> Result<()> {
        self.attached.lock().await.remove(&tab_id);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<DebuggerEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_attach_then_send_succeeds() {
        let backend = MockBackend::new();
        let tab = backend.create_tab("https://example.com").await.unwrap();
        backend.attach(tab, "1.3").await.unwrap();
        backend
            .stub("Runtime.evaluate", json!({"ok": true}))
            .await;

        let result = backend
            .send_command(tab, "Runtime.evaluate", json!({}))
            .await
            .unwrap();
        assert_eq!(result, json!({"ok": true}));
    }

    #[tokio::test]
    async fn mock_send_without_attach_fails() {
        let backend = MockBackend::new();
        let tab = backend.create_tab("https://example.com").await.unwrap();
        let err = backend
            .send_command(tab, "Runtime.evaluate", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, EdithError::NotAttached(_)));
    }
}
