//! Tool Catalog (§4.6)
//!
//! One shared list of declarative `{name, description, parameters}`
//! records, trimmed to browser-only tools, with a per-mode filter instead
//! of two near-duplicate catalogs.

use serde_json::json;

use crate::core::types::ToolDefinition;

/// Which terminal tool — and which omitted tool — applies to this loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    /// A top-level, single-tab agent run: terminal tool is `task_complete`,
    /// `open_browser` is available.
    SingleTab,
    /// A research sub-task: terminal tool is `extract_data`, `open_browser`
    /// is omitted (the tab is already created by the orchestrator).
    SubTask,
}

pub const MUTATING_TOOLS: &[&str] = &[
    "click",
    "type_text",
    "press_key",
    "select_option",
    "hover",
    "set_value",
    "wait_for_network_idle",
];

pub struct ToolCatalog {
    mode: ToolMode,
    definitions: Vec<ToolDefinition>,
}

impl ToolCatalog {
    pub fn for_mode(mode: ToolMode) -> Self {
        let mut definitions = shared_definitions();

        match mode {
            ToolMode::SingleTab => {
                definitions.insert(0, open_browser_definition());
                definitions.push(ToolDefinition::function(
                    "task_complete",
                    "Signal that the task is finished. Call this only when the goal has been achieved.",
                    json!({
                        "type": "object",
                        "properties": {
                            "summary": {
                                "type": "string",
                                "description": "A human-readable summary of what was accomplished"
                            }
                        },
                        "required": ["summary"]
                    }),
                ));
            }
            ToolMode::SubTask => {
                definitions.push(ToolDefinition::function(
                    "extract_data",
                    "Signal that the requested data has been extracted from this page.",
                    json!({
                        "type": "object",
                        "properties": {
                            "data": {
                                "type": "string",
                                "description": "The extracted data, as plain text"
                            }
                        },
                        "required": ["data"]
                    }),
                ));
            }
        }

        Self { mode, definitions }
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn terminal_tool_name(&self) -> &'static str {
        match self.mode {
            ToolMode::SingleTab => "task_complete",
            ToolMode::SubTask => "extract_data",
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d.function.name == name)
    }
}

fn open_browser_definition() -> ToolDefinition {
    ToolDefinition::function(
        "open_browser",
        "Open a new browser tab at the given URL and make it the active tab. Does not auto-snapshot; call take_snapshot next.",
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "URL or bare hostname to open"},
                "taskDescription": {"type": "string", "description": "Short description of what this tab is for"}
            },
            "required": ["url"]
        }),
    )
}

fn shared_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            "navigate",
            "Navigate the active tab to a URL. Does not auto-snapshot; call take_snapshot next.",
            json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "URL or bare hostname to navigate to"}
                },
                "required": ["url"]
            }),
        ),
        ToolDefinition::function(
            "take_snapshot",
            "Capture a compact, UID-indexed view of the interactive elements on the active tab.",
            json!({"type": "object", "properties": {}}),
        ),
        ToolDefinition::function(
            "click",
            "Click the element with the given UID from the most recent snapshot.",
            json!({
                "type": "object",
                "properties": {
                    "uid": {"type": "integer", "description": "Element UID from the latest snapshot"}
                },
                "required": ["uid"]
            }),
        ),
        ToolDefinition::function(
            "type_text",
            "Clear and type text into the input or editable element with the given UID.",
            json!({
                "type": "object",
                "properties": {
                    "uid": {"type": "integer"},
                    "text": {"type": "string"}
                },
                "required": ["uid", "text"]
            }),
        ),
        ToolDefinition::function(
            "press_key",
            "Dispatch a key press on the active tab.",
            json!({
                "type": "object",
                "properties": {
                    "key": {
                        "type": "string",
                        "enum": ["Enter", "Tab", "Escape", "ArrowDown", "ArrowUp", "Backspace"]
                    }
                },
                "required": ["key"]
            }),
        ),
        ToolDefinition::function(
            "scroll",
            "Scroll the active tab's viewport.",
            json!({
                "type": "object",
                "properties": {
                    "direction": {"type": "string", "enum": ["up", "down", "left", "right"]},
                    "amount": {"type": "integer", "description": "Pixels to scroll, default 600"}
                },
                "required": ["direction"]
            }),
        ),
        ToolDefinition::function(
            "select_option",
            "Select an option in the <select> element with the given UID, by value or visible text.",
            json!({
                "type": "object",
                "properties": {
                    "uid": {"type": "integer"},
                    "value": {"type": "string"}
                },
                "required": ["uid", "value"]
            }),
        ),
        ToolDefinition::function(
            "hover",
            "Move the mouse over the element with the given UID, without clicking.",
            json!({
                "type": "object",
                "properties": {"uid": {"type": "integer"}},
                "required": ["uid"]
            }),
        ),
        ToolDefinition::function(
            "set_value",
            "Directly set the value of the input element with the given UID, bypassing keystroke simulation. Use for range/number fields that type_text handles unreliably.",
            json!({
                "type": "object",
                "properties": {
                    "uid": {"type": "integer"},
                    "value": {"type": "string"}
                },
                "required": ["uid", "value"]
            }),
        ),
        ToolDefinition::function(
            "wait_for_network_idle",
            "Wait until the active tab has had no in-flight network requests for at least 500ms, up to a 5s timeout.",
            json!({"type": "object", "properties": {}}),
        ),
    ]
}
