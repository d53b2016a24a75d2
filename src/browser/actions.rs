//! Action primitives (§4.3.2)
//!
//! Every primitive here either succeeds or returns an error-shaped string;
//! none throw. A UID absent from the supplied snapshot is reported as a
//! string the LLM can read and react to, never as an `Err` that would
//! unwind the agent loop — every command failure funnels into a result
//! string rather than propagating as an error.

use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::{sleep, timeout};

use crate::contracts::DebuggerEvent;
use crate::core::config::BrowserConfig;

use super::channel::DebuggerChannel;
use super::inject::SNAPSHOT_SCRIPT;
use super::snapshot::Snapshot;
use super::tabs::TabId;

const NEW_TAB_SENTINEL: &str = "__NEW_TAB__";

async fn js_eval(channel: &DebuggerChannel, tab_id: TabId, expression: &str) -> Option<Value> {
    channel
        .send(tab_id, "Runtime.evaluate", json!({ "expression": expression }))
        .await
        .ok()
}

async fn js_eval_string(channel: &DebuggerChannel, tab_id: TabId, expression: &str) -> Option<String> {
    js_eval(channel, tab_id, expression)
        .await
        .and_then(|v| v.as_str().map(|s| s.to_string()))
}

/// `takeSnapshot(tabId)`: waits for `readyState === "complete"`, injects the
/// snapshot script, retries once after 1500ms on failure, and degrades to an
/// empty snapshot rather than propagating failure.
pub async fn take_snapshot(channel: &DebuggerChannel, tab_id: TabId, config: &BrowserConfig) -> Snapshot {
    wait_for_doc_ready(channel, tab_id, config.doc_ready_timeout_ms).await;

    if let Some(snapshot) = try_snapshot_once(channel, tab_id).await {
        return snapshot;
    }

    sleep(Duration::from_millis(1500)).await;

    if let Some(snapshot) = try_snapshot_once(channel, tab_id).await {
        return snapshot;
    }

    let url = js_eval_string(channel, tab_id, "location.href")
        .await
        .unwrap_or_default();
    let title = js_eval_string(channel, tab_id, "document.title")
        .await
        .unwrap_or_default();
    Snapshot::error(url, title, "injection failed twice")
}

async fn try_snapshot_once(channel: &DebuggerChannel, tab_id: TabId) -> Option<Snapshot> {
    let raw = js_eval_string(channel, tab_id, SNAPSHOT_SCRIPT).await?;
    serde_json::from_str(&raw).ok()
}

async fn wait_for_doc_ready(channel: &DebuggerChannel, tab_id: TabId, timeout_ms: u64) {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if let Some(state) = js_eval_string(channel, tab_id, "document.readyState").await {
            if state == "complete" {
                return;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return;
        }
        sleep(Duration::from_millis(300)).await;
    }
}

fn uid_not_found(uid: u64) -> String {
    format!(
        "Error: Element with UID {} not found in snapshot. Take a new snapshot first.",
        uid
    )
}

/// `click(uid, snapshot, tabId)`
pub async fn click(channel: &DebuggerChannel, tab_id: TabId, uid: u64, snapshot: &Snapshot) -> String {
    let Some(element) = snapshot.get_element(uid) else {
        return uid_not_found(uid);
    };

    let mut events = channel.on();

    let selector_expr = format!(
        "(function() {{
            var el = document.querySelector('[data-edith-uid=\"{uid}\"]');
            if (!el) return false;
            el.scrollIntoView({{block: 'center', behavior: 'instant'}});
            var prevTarget = el.getAttribute('target');
            if (prevTarget === '_blank') el.setAttribute('target', '_self');
            try {{ el.click(); return true; }}
            catch (e) {{ return false; }}
            finally {{ if (prevTarget === '_blank') el.setAttribute('target', prevTarget); }}
        }})()",
        uid = uid
    );

    let mut clicked = js_eval(channel, tab_id, &selector_expr)
        .await
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    if !clicked {
        let (cx, cy) = element.center();
        let press = channel
            .send(
                tab_id,
                "Input.dispatchMouseEvent",
                json!({ "type": "mousePressed", "x": cx, "y": cy }),
            )
            .await;
        let release = channel
            .send(
                tab_id,
                "Input.dispatchMouseEvent",
                json!({ "type": "mouseReleased", "x": cx, "y": cy }),
            )
            .await;
        clicked = press.is_ok() && release.is_ok();
    }

    if !clicked {
        let synthetic_expr = format!(
            "(function() {{
                var el = document.querySelector('[data-edith-uid=\"{uid}\"]');
                if (!el) return false;
                ['mousedown', 'mouseup', 'click'].forEach(function(type) {{
                    el.dispatchEvent(new MouseEvent(type, {{bubbles: true, cancelable: true}}));
                }});
                return true;
            }})()",
            uid = uid
        );
        clicked = js_eval(channel, tab_id, &synthetic_expr)
            .await
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
    }

    if !clicked {
        if let Some(href) = &element.href {
            let _ = channel
                .send(tab_id, "Page.navigate", json!({ "url": href }))
                .await;
            clicked = true;
        }
    }

    if !clicked {
        return format!("Error: failed to click element {}", uid);
    }

    sleep(Duration::from_millis(500)).await;

    let mut new_tab_ids = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let DebuggerEvent::TargetCreated { tab_id: new_id } = event {
            new_tab_ids.push(new_id);
        }
    }

    if let Some(&newest) = new_tab_ids.last() {
        let _ = channel.attach(newest).await;
        return format!("Clicked element {}. {}:{}", uid, NEW_TAB_SENTINEL, newest);
    }

    format!("Clicked element {} (\"{}\")", uid, element.name)
}

/// `type_text(text, uid, snapshot, tabId)`
pub async fn type_text(
    channel: &DebuggerChannel,
    tab_id: TabId,
    text: &str,
    uid: u64,
    snapshot: &Snapshot,
) -> String {
    let Some(element) = snapshot.get_element(uid) else {
        return uid_not_found(uid);
    };

    let focus_and_clear = format!(
        "(function() {{
            var el = document.querySelector('[data-edith-uid=\"{uid}\"]');
            if (!el) return false;
            el.scrollIntoView({{block: 'center', behavior: 'instant'}});
            el.focus();
            if (el.isContentEditable) {{
                var sel = window.getSelection();
                sel.selectAllChildren(el);
                document.execCommand('delete');
            }} else {{
                el.value = '';
                el.dispatchEvent(new Event('input', {{bubbles: true}}));
            }}
            return true;
        }})()",
        uid = uid
    );

    let focused = js_eval(channel, tab_id, &focus_and_clear)
        .await
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !focused {
        return uid_not_found(uid);
    }

    let _ = channel
        .send(tab_id, "Input.insertText", json!({ "text": text }))
        .await;

    let finish_expr = format!(
        "(function() {{
            var el = document.querySelector('[data-edith-uid=\"{uid}\"]');
            if (!el) return false;
            el.dispatchEvent(new InputEvent('input', {{data: {text:?}, inputType: 'insertText', bubbles: true}}));
            el.dispatchEvent(new Event('change', {{bubbles: true}}));
            el.dispatchEvent(new KeyboardEvent('keydown', {{bubbles: true}}));
            el.dispatchEvent(new KeyboardEvent('keyup', {{bubbles: true}}));
            return true;
        }})()",
        uid = uid,
        text = text
    );
    let _ = js_eval(channel, tab_id, &finish_expr).await;

    format!("Typed \"{}\" into element {} (\"{}\")", text, uid, element.name)
}

fn virtual_key_code(key: &str) -> i64 {
    match key {
        "Enter" => 13,
        "Tab" => 9,
        "Escape" => 27,
        "ArrowDown" => 40,
        "ArrowUp" => 38,
        "Backspace" => 8,
        _ => key.chars().next().map(|c| c as i64).unwrap_or(0),
    }
}

/// `press_key(key, tabId)`
pub async fn press_key(channel: &DebuggerChannel, tab_id: TabId, key: &str, config: &BrowserConfig) -> String {
    let before_url = js_eval_string(channel, tab_id, "location.href").await;

    let code = virtual_key_code(key);
    let _ = channel
        .send(
            tab_id,
            "Input.dispatchKeyEvent",
            json!({ "type": "keyDown", "windowsVirtualKeyCode": code, "text": key }),
        )
        .await;
    let _ = channel
        .send(
            tab_id,
            "Input.dispatchKeyEvent",
            json!({ "type": "keyUp", "windowsVirtualKeyCode": code, "text": key }),
        )
        .await;

    if key != "Enter" {
        return format!("Pressed key: {}", key);
    }

    let deadline = tokio::time::Instant::now() + Duration::from_millis(config.navigation_timeout_ms);
    loop {
        if tokio::time::Instant::now() >= deadline {
            return "Pressed key: Enter".to_string();
        }
        sleep(Duration::from_millis(300)).await;
        let current_url = js_eval_string(channel, tab_id, "location.href").await;
        if current_url != before_url {
            let load_deadline = tokio::time::Instant::now() + Duration::from_secs(8);
            while tokio::time::Instant::now() < load_deadline {
                if js_eval_string(channel, tab_id, "document.readyState").await.as_deref() == Some("complete") {
                    break;
                }
                sleep(Duration::from_millis(200)).await;
            }
            return "Pressed Enter — page navigated".to_string();
        }
    }
}

/// `scroll(direction, amount, tabId)`
pub async fn scroll(channel: &DebuggerChannel, tab_id: TabId, direction: &str, amount: Option<i64>) -> String {
    let px = amount.unwrap_or(600);
    let (dx, dy): (i64, i64) = match direction {
        "up" => (0, -px),
        "down" => (0, px),
        "left" => (-px, 0),
        "right" => (px, 0),
        other => return format!("Error: unknown scroll direction '{}'", other),
    };

    let wheel = channel
        .send(
            tab_id,
            "Input.dispatchMouseEvent",
            json!({ "type": "mouseWheel", "x": 400, "y": 300, "deltaX": dx, "deltaY": dy }),
        )
        .await;

    if wheel.is_err() {
        let fallback = format!("window.scrollBy({}, {})", dx, dy);
        let _ = js_eval(channel, tab_id, &fallback).await;
    }

    format!("Scrolled {} by {}px", direction, px)
}

/// `select_option(uid, value, snapshot, tabId)`
pub async fn select_option(
    channel: &DebuggerChannel,
    tab_id: TabId,
    uid: u64,
    value: &str,
    snapshot: &Snapshot,
) -> String {
    let Some(element) = snapshot.get_element(uid) else {
        return uid_not_found(uid);
    };
    if !element.is_select {
        return format!("Error: element {} is not a select element", uid);
    }

    let expr = format!(
        "(function() {{
            var el = document.querySelector('[data-edith-uid=\"{uid}\"]');
            if (!el) return JSON.stringify({{ok: false, options: []}});
            var wanted = {value:?};
            var idx = -1;
            for (var i = 0; i < el.options.length; i++) {{
                if (el.options[i].value === wanted) {{ idx = i; break; }}
            }}
            if (idx === -1) {{
                var lower = wanted.toLowerCase();
                for (var j = 0; j < el.options.length; j++) {{
                    if (el.options[j].text.trim().toLowerCase() === lower) {{ idx = j; break; }}
                }}
            }}
            if (idx === -1) {{
                var lower2 = wanted.toLowerCase();
                for (var k = 0; k < el.options.length; k++) {{
                    if (el.options[k].text.toLowerCase().indexOf(lower2) !== -1) {{ idx = k; break; }}
                }}
            }}
            if (idx === -1) {{
                var texts = [];
                for (var m = 0; m < el.options.length; m++) texts.push(el.options[m].text);
                return JSON.stringify({{ok: false, options: texts}});
            }}
            el.selectedIndex = idx;
            el.dispatchEvent(new Event('input', {{bubbles: true}}));
            el.dispatchEvent(new Event('change', {{bubbles: true}}));
            return JSON.stringify({{ok: true, options: []}});
        }})()",
        uid = uid,
        value = value
    );

    let Some(raw) = js_eval_string(channel, tab_id, &expr).await else {
        return format!("Error: failed to select option on element {}", uid);
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(v) if v.get("ok").and_then(|b| b.as_bool()) == Some(true) => {
            format!("Selected \"{}\" in element {}", value, uid)
        }
        Ok(v) => {
            let options: Vec<String> = v
                .get("options")
                .and_then(|o| o.as_array())
                .map(|arr| arr.iter().filter_map(|t| t.as_str().map(String::from)).collect())
                .unwrap_or_default();
            format!(
                "Error: no option matching \"{}\" in element {}. Available options: {}",
                value,
                uid,
                options.join(", ")
            )
        }
        Err(_) => format!("Error: failed to select option on element {}", uid),
    }
}

/// `hover(uid, snapshot, tabId)`
pub async fn hover(channel: &DebuggerChannel, tab_id: TabId, uid: u64, snapshot: &Snapshot) -> String {
    let Some(element) = snapshot.get_element(uid) else {
        return uid_not_found(uid);
    };

    let scroll_expr = format!(
        "(function() {{
            var el = document.querySelector('[data-edith-uid=\"{uid}\"]');
            if (el) el.scrollIntoView({{block: 'center', behavior: 'instant'}});
            return !!el;
        }})()",
        uid = uid
    );
    let _ = js_eval(channel, tab_id, &scroll_expr).await;

    let (cx, cy) = element.center();
    let _ = channel
        .send(
            tab_id,
            "Input.dispatchMouseEvent",
            json!({ "type": "mouseMoved", "x": cx, "y": cy }),
        )
        .await;

    let synthetic_expr = format!(
        "(function() {{
            var el = document.querySelector('[data-edith-uid=\"{uid}\"]');
            if (!el) return false;
            el.dispatchEvent(new MouseEvent('mouseenter', {{bubbles: false}}));
            el.dispatchEvent(new MouseEvent('mouseover', {{bubbles: true}}));
            return true;
        }})()",
        uid = uid
    );
    let _ = js_eval(channel, tab_id, &synthetic_expr).await;

    sleep(Duration::from_millis(500)).await;
    format!("Hovered over element {} (\"{}\")", uid, element.name)
}

/// `set_value(uid, value, snapshot, tabId)`
pub async fn set_value(
    channel: &DebuggerChannel,
    tab_id: TabId,
    uid: u64,
    value: &str,
    snapshot: &Snapshot,
) -> String {
    let Some(element) = snapshot.get_element(uid) else {
        return uid_not_found(uid);
    };

    let expr = format!(
        "(function() {{
            var el = document.querySelector('[data-edith-uid=\"{uid}\"]');
            if (!el) return false;
            var proto = el.tagName === 'TEXTAREA' ? window.HTMLTextAreaElement.prototype : window.HTMLInputElement.prototype;
            var setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
            setter.call(el, {value:?});
            el.dispatchEvent(new Event('input', {{bubbles: true}}));
            el.dispatchEvent(new Event('change', {{bubbles: true}}));
            el.dispatchEvent(new InputEvent('input', {{data: {value:?}, bubbles: true}}));
            return true;
        }})()",
        uid = uid,
        value = value
    );

    if js_eval(channel, tab_id, &expr).await.and_then(|v| v.as_bool()).unwrap_or(false) {
        format!("Set value of element {} (\"{}\") to \"{}\"", uid, element.name, value)
    } else {
        format!("Error: failed to set value on element {}", uid)
    }
}

/// `wait_for_network_idle(tabId, timeout=5000)`
pub async fn wait_for_network_idle(channel: &DebuggerChannel, tab_id: TabId, config: &BrowserConfig) -> String {
    let _ = channel.send(tab_id, "Network.enable", json!({})).await;

    let mut events = channel.on();
    let mut in_flight: i64 = 0;
    let mut last_activity = tokio::time::Instant::now();
    let deadline = tokio::time::Instant::now() + Duration::from_millis(config.network_idle_timeout_ms);

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return format!("Network idle wait timed out with {} request(s) pending", in_flight.max(0));
        }

        match timeout(remaining.min(Duration::from_millis(100)), events.recv()).await {
            Ok(Ok(event)) => match event {
                DebuggerEvent::RequestWillBeSent { tab_id: id, .. } if id == tab_id => {
                    in_flight += 1;
                    last_activity = tokio::time::Instant::now();
                }
                DebuggerEvent::LoadingFinished { tab_id: id, .. }
                | DebuggerEvent::LoadingFailed { tab_id: id, .. }
                    if id == tab_id =>
                {
                    in_flight = (in_flight - 1).max(0);
                    last_activity = tokio::time::Instant::now();
                }
                _ => {}
            },
            Ok(Err(_)) => return "Network idle: event stream closed".to_string(),
            Err(_) => {
                // poll tick: check idle threshold
            }
        }

        if in_flight == 0 {
            let idle_for = tokio::time::Instant::now() - last_activity;
            if idle_for >= Duration::from_millis(config.network_idle_threshold_ms) {
                return "Network is idle".to_string();
            }
        }
    }
}

/// `navigate(url, tabId)`
pub async fn navigate(channel: &DebuggerChannel, tab_id: TabId, url: &str, config: &BrowserConfig) -> String {
    let normalized = if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    };

    if channel
        .send(tab_id, "Page.navigate", json!({ "url": normalized }))
        .await
        .is_err()
    {
        return format!("Error: failed to navigate to {}", normalized);
    }

    let deadline = tokio::time::Instant::now() + Duration::from_millis(config.load_timeout_ms);
    loop {
        if tokio::time::Instant::now() >= deadline {
            break;
        }
        if js_eval_string(channel, tab_id, "document.readyState").await.as_deref() == Some("complete") {
            break;
        }
        sleep(Duration::from_millis(200)).await;
    }

    sleep(Duration::from_millis(800)).await;
    format!("Navigated to {}", normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::backend::MockBackend;
    use crate::browser::snapshot::SnapshotElement;
    use std::sync::Arc;

    fn element(uid: u64) -> SnapshotElement {
        SnapshotElement {
            uid,
            tag: "button".into(),
            role: "button".into(),
            name: "Go".into(),
            context: String::new(),
            href: None,
            input_type: None,
            value: None,
            placeholder: None,
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            is_clickable: true,
            is_input: false,
            is_video: false,
            is_select: false,
            disabled: false,
            checked: None,
            aria_expanded: None,
            options: None,
        }
    }

    #[tokio::test]
    async fn click_missing_uid_returns_error_string_not_panic() {
        let backend = Arc::new(MockBackend::new());
        let channel = DebuggerChannel::new(backend.clone());
        let tab = channel.attach(1).await.map(|_| 1u64).unwrap();
        let snapshot = Snapshot::empty("https://x.test", "X");
        let result = click(&channel, tab, 99, &snapshot).await;
        assert!(result.contains("99"));
        assert!(result.starts_with("Error"));
    }

    #[tokio::test]
    async fn type_text_missing_uid_returns_error_string() {
        let backend = Arc::new(MockBackend::new());
        let channel = DebuggerChannel::new(backend);
        channel.attach(1).await.unwrap();
        let snapshot = Snapshot::empty("https://x.test", "X");
        let result = type_text(&channel, 1, "hi", 5, &snapshot).await;
        assert!(result.starts_with("Error"));
    }

    #[tokio::test]
    async fn select_option_on_non_select_element_is_rejected() {
        let backend = Arc::new(MockBackend::new());
        let channel = DebuggerChannel::new(backend);
        channel.attach(1).await.unwrap();
        let mut snapshot = Snapshot::empty("https://x.test", "X");
        snapshot.elements.push(element(1));
        let result = select_option(&channel, 1, 1, "foo", &snapshot).await;
        assert!(result.contains("not a select"));
    }

    #[test]
    fn virtual_key_codes_match_spec_table() {
        assert_eq!(virtual_key_code("Enter"), 13);
        assert_eq!(virtual_key_code("Tab"), 9);
        assert_eq!(virtual_key_code("Escape"), 27);
    }
}
