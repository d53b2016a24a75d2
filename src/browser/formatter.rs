//! Snapshot Formatter (§4.6)
//!
//! Converts a `Snapshot` into the compact text block the LLM reads. Password
//! and hidden inputs are excluded at the snapshot producer already
//! (`browser::inject`); this formatter omits their values again as
//! defense-in-depth, per the non-negotiable security rule in §9.

use super::snapshot::{Snapshot, SnapshotElement};

const MAX_LINES: usize = 150;
const PAGE_TEXT_PREVIEW: usize = 800;

fn type_label(el: &SnapshotElement) -> &'static str {
    if el.is_select {
        "SELECT"
    } else if el.input_type.as_deref() == Some("checkbox") {
        "CHECKBOX"
    } else if el.input_type.as_deref() == Some("radio") {
        "RADIO"
    } else if el.is_input {
        "INPUT"
    } else if el.is_video {
        "VIDEO"
    } else if looks_like_product(el) {
        "PRODUCT"
    } else if el.tag == "button" || el.role == "button" {
        "BUTTON"
    } else {
        "LINK"
    }
}

fn looks_like_product(el: &SnapshotElement) -> bool {
    let name = el.name.to_lowercase();
    (name.contains('$') || name.contains("price") || name.contains("add to cart"))
        && !el.is_input
        && !el.is_select
}

fn tier(el: &SnapshotElement) -> u8 {
    if el.is_input || el.is_select {
        0
    } else if el.tag == "button"
        || el.role == "button"
        || el.input_type.as_deref() == Some("checkbox")
        || el.input_type.as_deref() == Some("radio")
    {
        1
    } else if looks_like_product(el) || el.is_video {
        2
    } else {
        3
    }
}

fn collapse_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_blank = false;
    for line in text.lines() {
        let is_blank = line.trim().is_empty();
        if is_blank && last_blank {
            continue;
        }
        out.push_str(line);
        out.push('\n');
        last_blank = is_blank;
    }
    out
}

fn format_element(el: &SnapshotElement) -> String {
    let mut line = format!("  {} | {} | \"{}\"", el.uid, type_label(el), el.name);

    if let Some(value) = &el.value {
        if el.input_type.as_deref() != Some("password") && el.input_type.as_deref() != Some("hidden") {
            line.push_str(&format!(" (current: \"{}\")", value));
        }
    }

    let mut flags = Vec::new();
    if let Some(checked) = el.checked {
        flags.push(if checked { "checked" } else { "unchecked" });
    }
    if let Some(expanded) = el.aria_expanded {
        flags.push(if expanded { "expanded" } else { "collapsed" });
    }
    if el.disabled {
        flags.push("disabled");
    }
    if !flags.is_empty() {
        line.push_str(&format!(" [{}]", flags.join(", ")));
    }

    if !el.context.is_empty() {
        line.push_str(&format!(" [in: {}]", el.context));
    }

    if let Some(options) = &el.options {
        let texts: Vec<String> = options
            .iter()
            .map(|o| format!("\"{}\"", o.text))
            .collect();
        line.push_str(&format!("\n        options: [→ {}]", texts.join(", ")));
    }

    line
}

/// Renders `snapshot` into the compact text block described by §4.6.
pub fn format_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    out.push_str(&format!("PAGE: {}\n", snapshot.url));
    out.push_str(&format!("TITLE: {}\n\n", snapshot.title));

    let preview: String = snapshot.raw_text.chars().take(PAGE_TEXT_PREVIEW).collect();
    out.push_str("PAGE TEXT (first 800 chars):\n");
    out.push_str(&collapse_blank_runs(&preview));
    out.push('\n');

    out.push_str(&format!("ELEMENTS ({} total):\n", snapshot.elements.len()));
    if snapshot.elements.is_empty() {
        out.push_str("  (none \u{2014} page may still be loading)\n");
    }

    let has_filters = snapshot
        .elements
        .iter()
        .any(|e| e.is_select || e.input_type.as_deref() == Some("checkbox"));
    let has_products = snapshot.elements.iter().any(looks_like_product);
    if has_filters {
        out.push_str("  \u{1F4A1} FILTERS DETECTED\n");
    }
    if has_products {
        out.push_str("  \u{1F4A1} PRODUCTS found\n");
    }

    let mut ordered: Vec<&SnapshotElement> = snapshot.elements.iter().collect();
    ordered.sort_by_key(|e| (tier(e), e.uid));

    let shown = ordered.iter().take(MAX_LINES);
    let mut line_count = 0;
    for el in shown {
        out.push_str(&format_element(el));
        out.push('\n');
        line_count += 1;
    }

    if ordered.len() > line_count {
        out.push_str(&format!(
            "  ... and {} more (scroll down to see them)\n",
            ordered.len() - line_count
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_element(uid: u64) -> SnapshotElement {
        SnapshotElement {
            uid,
            tag: "input".into(),
            role: "textbox".into(),
            name: "Search".into(),
            context: "header".into(),
            href: None,
            input_type: Some("text".into()),
            value: Some("hello".into()),
            placeholder: None,
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            is_clickable: false,
            is_input: true,
            is_video: false,
            is_select: false,
            disabled: false,
            checked: None,
            aria_expanded: None,
            options: None,
        }
    }

    fn password_element(uid: u64) -> SnapshotElement {
        let mut el = input_element(uid);
        el.role = "textbox".into();
        el.input_type = Some("password".into());
        el.value = Some("should-never-appear".into());
        el
    }

    #[test]
    fn formats_header_and_count() {
        let snap = Snapshot::empty("https://x.test", "Example");
        let out = format_snapshot(&snap);
        assert!(out.starts_with("PAGE: https://x.test\n"));
        assert!(out.contains("TITLE: Example"));
        assert!(out.contains("ELEMENTS (0 total)"));
    }

    #[test]
    fn input_type_takes_priority_in_type_ladder() {
        let mut snap = Snapshot::empty("https://x.test", "X");
        snap.elements.push(input_element(1));
        let out = format_snapshot(&snap);
        assert!(out.contains("INPUT"));
        assert!(out.contains("current: \"hello\""));
    }

    #[test]
    fn password_value_never_rendered_even_if_present_on_element() {
        let mut snap = Snapshot::empty("https://x.test", "X");
        snap.elements.push(password_element(1));
        let out = format_snapshot(&snap);
        assert!(!out.contains("should-never-appear"));
    }

    #[test]
    fn caps_at_150_lines_and_reports_remainder() {
        let mut snap = Snapshot::empty("https://x.test", "X");
        for i in 0..200 {
            snap.elements.push(input_element(i));
        }
        let out = format_snapshot(&snap);
        assert!(out.contains("... and 50 more"));
    }

    #[test]
    fn collapses_multiple_blank_lines() {
        let collapsed = collapse_blank_runs("a\n\n\n\nb\n");
        assert_eq!(collapsed, "a\n\nb\n");
    }
}
