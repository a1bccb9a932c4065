use crate::Result;
use crate::dom::{Dom, Element, NodeId};
use crate::events::{Action, Listener};
use crate::form_controls;
use crate::page::Page;
use crate::zone_id;

/// Element identifiers and classes the enhancer wires up, plus the
/// default debounce delay. Defaults match the calendar configuration
/// form this grew out of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancerConfig {
    pub form_id: String,
    pub timezone_id: String,
    pub url_box_id: String,
    pub copy_button_id: String,
    pub trigger_id: String,
    pub row_class: String,
    pub property_class: String,
    pub operator_class: String,
    pub value_class: String,
    pub arg_class: String,
    pub auto_submit_class: String,
    pub delay_attr: String,
    pub registered_attr: String,
    pub debounce_ms: i64,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            form_id: "config-form".into(),
            timezone_id: "user-tz".into(),
            url_box_id: "url-box".into(),
            copy_button_id: "url-copy".into(),
            trigger_id: "submit-trigger".into(),
            row_class: "match-row".into(),
            property_class: "match-property".into(),
            operator_class: "match-operator".into(),
            value_class: "match-value".into(),
            arg_class: "match-arg".into(),
            auto_submit_class: "auto-submit".into(),
            delay_attr: "data-delay-ms".into(),
            registered_attr: "data-enhanced".into(),
            debounce_ms: 1000,
        }
    }
}

/// The two options handed to the enhancement library: requests stay on
/// the document origin, and its built-in indicator styling stays off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AjaxConfig {
    pub self_requests_only: bool,
    pub include_indicator_styles: bool,
}

impl Default for AjaxConfig {
    fn default() -> Self {
        Self {
            self_requests_only: true,
            include_indicator_styles: false,
        }
    }
}

/// Query argument for one matcher triplet: an empty value contributes
/// nothing, otherwise the argument is named after the operator and its
/// value is `<property>=<value>`.
pub fn compose_arg(property: &str, operator: &str, value: &str) -> Option<(String, String)> {
    if value.is_empty() {
        None
    } else {
        Some((operator.to_string(), format!("{property}={value}")))
    }
}

pub(crate) fn on_load(page: &mut Page) -> Result<()> {
    register_form(page)?;
    fill_timezone(page)?;
    if page.ajax.include_indicator_styles {
        inject_indicator_styles(page)?;
    }
    register_all(page)
}

// The scan-and-register pass run at load and after every settled swap.
// Elements already carrying the registration flag are skipped, so the
// pass is safe to repeat over partially replaced trees.
pub(crate) fn register_all(page: &mut Page) -> Result<()> {
    register_matcher_rows(page)?;
    register_copy_button(page)?;
    register_auto_submit_fields(page)
}

fn register_form(page: &mut Page) -> Result<()> {
    let Some(form) = page.dom.get_element_by_id(&page.config.form_id) else {
        let form_id = page.config.form_id.clone();
        page.trace_push(format!("[enhance] no form #{form_id}"));
        return Ok(());
    };
    if page.dom.has_attr(form, &page.config.registered_attr) {
        return Ok(());
    }

    page.listeners.add(
        form,
        "submit",
        Listener {
            action: Action::PreventDefault,
            capture: false,
        },
    );
    mark_registered(page, form)?;
    page.trace_push("[enhance] form submit interception registered".into());
    Ok(())
}

fn fill_timezone(page: &mut Page) -> Result<()> {
    let Some(field) = page.dom.get_element_by_id(&page.config.timezone_id) else {
        let timezone_id = page.config.timezone_id.clone();
        page.trace_push(format!("[enhance] no timezone field #{timezone_id}"));
        return Ok(());
    };

    let zone = page.timezone_override.clone().or_else(zone_id::host_zone);
    match zone {
        Some(zone) if zone_id::is_valid(&zone) => {
            page.dom.set_text_value(field, &zone)?;
            page.trace_push(format!("[intl] timezone set to {zone}"));
        }
        _ => page.trace_push("[intl] timezone unavailable".into()),
    }
    Ok(())
}

fn register_matcher_rows(page: &mut Page) -> Result<()> {
    let selector = format!(".{}", page.config.row_class);
    for row in page.dom.query_selector_all(&selector)? {
        if page.dom.has_attr(row, &page.config.registered_attr) {
            continue;
        }
        page.listeners.add(
            row,
            "input",
            Listener {
                action: Action::MatcherRowChanged { row },
                capture: false,
            },
        );
        mark_registered(page, row)?;
        page.trace_push("[enhance] matcher row registered".into());
    }
    Ok(())
}

fn register_copy_button(page: &mut Page) -> Result<()> {
    let Some(button) = page.dom.get_element_by_id(&page.config.copy_button_id) else {
        return Ok(());
    };
    if page.dom.has_attr(button, &page.config.registered_attr) {
        return Ok(());
    }

    page.listeners.add(
        button,
        "click",
        Listener {
            action: Action::CopyUrlField,
            capture: false,
        },
    );
    mark_registered(page, button)?;
    page.trace_push("[enhance] copy button registered".into());
    Ok(())
}

fn register_auto_submit_fields(page: &mut Page) -> Result<()> {
    let selector = format!(".{}", page.config.auto_submit_class);
    for field in page.dom.query_selector_all(&selector)? {
        if page.dom.has_attr(field, &page.config.registered_attr) {
            continue;
        }
        let delay_ms = page
            .dom
            .attr(field, &page.config.delay_attr)
            .and_then(|raw| raw.parse::<i64>().ok())
            .unwrap_or(page.config.debounce_ms);
        page.listeners.add(
            field,
            "input",
            Listener {
                action: Action::AutoSubmitChanged { field, delay_ms },
                capture: false,
            },
        );
        mark_registered(page, field)?;
        page.trace_push(format!("[enhance] auto-submit field registered delay_ms={delay_ms}"));
    }
    Ok(())
}

fn mark_registered(page: &mut Page, node: NodeId) -> Result<()> {
    let attr = page.config.registered_attr.clone();
    page.dom.set_attr(node, &attr, "")
}

/// Recomputes the hidden arg field of one matcher row from its
/// property, operator and value fields. Rows missing any of the four
/// fields are left alone.
pub(crate) fn update_row_arg(dom: &mut Dom, config: &EnhancerConfig, row: NodeId) -> Result<()> {
    let (Some(property_field), Some(operator_field), Some(value_field), Some(arg_field)) = (
        dom.find_descendant_by_class(row, &config.property_class),
        dom.find_descendant_by_class(row, &config.operator_class),
        dom.find_descendant_by_class(row, &config.value_class),
        dom.find_descendant_by_class(row, &config.arg_class),
    ) else {
        return Ok(());
    };

    let property = dom.value(property_field).unwrap_or_default().to_string();
    let operator = dom.value(operator_field).unwrap_or_default().to_string();
    let value = dom.value(value_field).unwrap_or_default().to_string();

    match compose_arg(&property, &operator, &value) {
        Some((name, arg_value)) => {
            dom.set_attr(arg_field, "name", &name)?;
            dom.set_attr(arg_field, "value", &arg_value)?;
        }
        None => {
            dom.remove_attr(arg_field, "name")?;
            dom.remove_attr(arg_field, "value")?;
        }
    }
    Ok(())
}

pub(crate) fn copy_url_field(page: &mut Page) -> Result<()> {
    let Some(url_box) = page.dom.get_element_by_id(&page.config.url_box_id) else {
        let url_box_id = page.config.url_box_id.clone();
        page.trace_push(format!("[clipboard] no url field #{url_box_id}"));
        return Ok(());
    };

    form_controls::select_all_text(&mut page.dom, url_box)?;
    let text = page.dom.value(url_box).unwrap_or_default().to_string();
    if page.secure_context {
        let copied = text.chars().count();
        page.clipboard_text = Some(text);
        page.trace_push(format!("[clipboard] copied {copied} chars"));
    } else {
        page.trace_push("[clipboard] write unsupported in insecure context".into());
    }
    Ok(())
}

const INDICATOR_CSS: &str =
    ".request-indicator{opacity:0;transition:opacity 200ms ease-in}.request-active .request-indicator{opacity:1}";

fn inject_indicator_styles(page: &mut Page) -> Result<()> {
    let parent = page
        .dom
        .descendant_elements_by_tag(page.dom.root(), "head")
        .into_iter()
        .next()
        .unwrap_or_else(|| page.dom.root());
    let style = page.dom.create_element(parent, Element::new("style"));
    page.dom.create_text(style, INDICATOR_CSS);
    Ok(())
}
