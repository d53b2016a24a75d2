//! Snapshot data model (§3)
//!
//! An immutable value produced by observing one tab at one instant. Never
//! mutated once built; a new snapshot supersedes the previous one.

use serde::{Deserialize, Serialize};

/// A UID-indexed snapshot of one tab's interactive DOM at one instant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub url: String,
    pub title: String,
    pub elements: Vec<SnapshotElement>,
    /// First 5,000 chars of `body.innerText`
    pub raw_text: String,
}

/// One interactive DOM node captured in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotElement {
    /// Stable id, carried on the DOM node via `data-edith-uid`
    pub uid: u64,
    pub tag: String,
    pub role: String,
    /// Accessible label, truncated to 120 chars
    pub name: String,
    /// Nearest meaningful ancestor label/section, truncated to 50 chars
    pub context: String,
    pub href: Option<String>,
    /// Input subtype, e.g. "text", "checkbox" — never "password" or "hidden"
    #[serde(rename = "type")]
    pub input_type: Option<String>,
    /// Current input value. Never populated for password/hidden inputs.
    pub value: Option<String>,
    pub placeholder: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub is_clickable: bool,
    pub is_input: bool,
    pub is_video: bool,
    pub is_select: bool,
    pub disabled: bool,
    /// None when the element has no notion of checked-ness
    pub checked: Option<bool>,
    pub aria_expanded: Option<bool>,
    pub options: Option<Vec<SelectOption>>,
}

/// One `<option>` of a `<select>` element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    /// Visible text, truncated to 60 chars
    pub text: String,
    pub selected: bool,
}

impl Snapshot {
    /// An empty snapshot, used by the observation contract's graceful
    /// degradation path (script injection failed, or body has no children)
    pub fn empty(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            elements: Vec::new(),
            raw_text: String::new(),
        }
    }

    /// An empty snapshot annotated with an error sentinel, per the injected
    /// procedure's top-level try/catch fallback
    pub fn error(url: impl Into<String>, title: impl Into<String>, message: &str) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            elements: Vec::new(),
            raw_text: format!("Snapshot error: {}", message),
        }
    }

    pub fn get_element(&self, uid: u64) -> Option<&SnapshotElement> {
        self.elements.iter().find(|e| e.uid == uid)
    }

    /// Every `uid` in a well-formed snapshot is unique
    pub fn uids_unique(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.elements.iter().all(|e| seen.insert(e.uid))
    }
}

impl SnapshotElement {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(uid: u64) -> SnapshotElement {
        SnapshotElement {
            uid,
            tag: "button".into(),
            role: "button".into(),
            name: "Submit".into(),
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

    #[test]
    fn empty_snapshot_has_no_elements_and_no_error() {
        let snap = Snapshot::empty("https://x.test/", "X");
        assert!(snap.elements.is_empty());
        assert_eq!(snap.raw_text, "");
    }

    #[test]
    fn error_snapshot_carries_sentinel() {
        let snap = Snapshot::error("https://x.test/", "X", "boom");
        assert_eq!(snap.raw_text, "Snapshot error: boom");
        assert!(snap.elements.is_empty());
    }

    #[test]
    fn uids_unique_detects_duplicates() {
        let mut snap = Snapshot::empty("https://x.test/", "X");
        snap.elements.push(element(1));
        snap.elements.push(element(2));
        assert!(snap.uids_unique());
        snap.elements.push(element(2));
        assert!(!snap.uids_unique());
    }

    #[test]
    fn get_element_looks_up_by_uid() {
        let mut snap = Snapshot::empty("https://x.test/", "X");
        snap.elements.push(element(7));
        assert!(snap.get_element(7).is_some());
        assert!(snap.get_element(8).is_none());
    }
}
