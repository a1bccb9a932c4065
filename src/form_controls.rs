use unicode_normalization::UnicodeNormalization;

use crate::Result;
use crate::dom::{Dom, NodeId};

// setSelectionRange upper bound from the stock full-text-selection idiom.
pub(crate) const SELECTION_SPAN_MAX: usize = 99_999;

pub(crate) fn is_form_control(dom: &Dom, node_id: NodeId) -> bool {
    let Some(element) = dom.element(node_id) else {
        return false;
    };

    element.tag_name.eq_ignore_ascii_case("input")
        || element.tag_name.eq_ignore_ascii_case("select")
        || element.tag_name.eq_ignore_ascii_case("textarea")
        || element.tag_name.eq_ignore_ascii_case("button")
}

pub(crate) fn is_text_entry(dom: &Dom, node_id: NodeId) -> bool {
    let Some(element) = dom.element(node_id) else {
        return false;
    };

    if element.tag_name.eq_ignore_ascii_case("textarea") {
        return true;
    }
    if !element.tag_name.eq_ignore_ascii_case("input") {
        return false;
    }
    element
        .attrs
        .get("type")
        .map(|kind| {
            [
                "text", "search", "url", "tel", "email", "password", "hidden",
            ]
            .iter()
            .any(|entry| kind.eq_ignore_ascii_case(entry))
        })
        .unwrap_or(true)
}

pub(crate) fn is_checkbox_input(dom: &Dom, node_id: NodeId) -> bool {
    let Some(element) = dom.element(node_id) else {
        return false;
    };

    if !element.tag_name.eq_ignore_ascii_case("input") {
        return false;
    }

    element
        .attrs
        .get("type")
        .map(|kind| kind.eq_ignore_ascii_case("checkbox"))
        .unwrap_or(false)
}

pub(crate) fn is_select(dom: &Dom, node_id: NodeId) -> bool {
    dom.tag_name(node_id)
        .map(|tag| tag.eq_ignore_ascii_case("select"))
        .unwrap_or(false)
}

pub(crate) fn is_submit_control(dom: &Dom, node_id: NodeId) -> bool {
    let Some(element) = dom.element(node_id) else {
        return false;
    };

    if element.tag_name.eq_ignore_ascii_case("button") {
        return element
            .attrs
            .get("type")
            .map(|kind| kind.eq_ignore_ascii_case("submit"))
            .unwrap_or(true);
    }

    if element.tag_name.eq_ignore_ascii_case("input") {
        return element
            .attrs
            .get("type")
            .map(|kind| kind.eq_ignore_ascii_case("submit") || kind.eq_ignore_ascii_case("image"))
            .unwrap_or(false);
    }

    false
}

/// Typed text lands in control values NFC-normalized, matching what
/// composed keyboard input produces.
pub(crate) fn normalize_text(input: &str) -> String {
    input.nfc().collect()
}

pub(crate) fn select_all_text(dom: &mut Dom, node_id: NodeId) -> Result<()> {
    dom.set_selection_range(node_id, 0, SELECTION_SPAN_MAX)
}
