use std::collections::HashMap;

use crate::dom::{Dom, NodeId};
use crate::enhancer::{self, AjaxConfig, EnhancerConfig};
use crate::events::{Action, EventState, ListenerStore};
use crate::form_controls;
use crate::html;
use crate::location::LocationParts;
use crate::scheduler::{PendingTimer, ScheduledTask, Scheduler, TimerAction};
use crate::zone_id;
use crate::{Error, Result};

const DEFAULT_DOCUMENT_URL: &str = "http://localhost/";

#[derive(Debug)]
pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) listeners: ListenerStore,
    pub(crate) scheduler: Scheduler,
    pub(crate) config: EnhancerConfig,
    pub(crate) ajax: AjaxConfig,
    pub(crate) document_url: String,
    pub(crate) clipboard_text: Option<String>,
    pub(crate) secure_context: bool,
    pub(crate) timezone_override: Option<String>,
    debounce_handles: HashMap<NodeId, i64>,
    refresh_requests: Vec<i64>,
    native_navigations: usize,
    trace: bool,
    trace_events: bool,
    trace_timers: bool,
    trace_logs: Vec<String>,
    trace_log_limit: usize,
    trace_to_stderr: bool,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_url(DEFAULT_DOCUMENT_URL, html)
    }

    pub fn from_html_with_url(url: &str, html: &str) -> Result<Self> {
        let mut page = Self::parse_with_url(url, html)?;
        page.load()?;
        Ok(page)
    }

    /// Parses the document without running the on-load wiring, leaving
    /// room to adjust configuration first; follow with [`Page::load`].
    pub fn parse(html: &str) -> Result<Self> {
        Self::parse_with_url(DEFAULT_DOCUMENT_URL, html)
    }

    pub fn parse_with_url(url: &str, html: &str) -> Result<Self> {
        let dom = html::parse_document(html)?;
        let secure_context = is_secure_context(url);
        Ok(Self {
            dom,
            listeners: ListenerStore::default(),
            scheduler: Scheduler::new(),
            config: EnhancerConfig::default(),
            ajax: AjaxConfig::default(),
            document_url: url.to_string(),
            clipboard_text: None,
            secure_context,
            timezone_override: None,
            debounce_handles: HashMap::new(),
            refresh_requests: Vec::new(),
            native_navigations: 0,
            trace: false,
            trace_events: true,
            trace_timers: true,
            trace_logs: Vec::new(),
            trace_log_limit: 10_000,
            trace_to_stderr: true,
        })
    }

    /// Runs the page's on-load wiring: submit interception, timezone
    /// fill, and the initial scan-and-register pass. Registration is
    /// flag-gated, so calling this again attaches nothing twice.
    pub fn load(&mut self) -> Result<()> {
        enhancer::on_load(self)
    }

    pub fn set_enhancer_config(&mut self, config: EnhancerConfig) {
        self.config = config;
    }

    pub fn set_ajax_config(&mut self, config: AjaxConfig) {
        self.ajax = config;
    }

    pub fn set_timezone(&mut self, zone: &str) -> Result<()> {
        if !zone_id::is_valid(zone) {
            return Err(Error::Runtime(format!("invalid timezone identifier: {zone}")));
        }
        self.timezone_override = Some(zone.to_string());
        Ok(())
    }

    pub fn set_secure_context(&mut self, secure: bool) {
        self.secure_context = secure;
    }

    pub fn document_url(&self) -> &str {
        &self.document_url
    }

    // --- simulated user input -------------------------------------------

    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        if !form_controls::is_text_entry(&self.dom, target) {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "text entry control".to_string(),
                actual: self.control_kind(target),
            });
        }

        let normalized = form_controls::normalize_text(text);
        self.dom.set_text_value(target, &normalized)?;
        self.dispatch_event(target, "input")?;
        Ok(())
    }

    pub fn set_checked(&mut self, selector: &str, checked: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        if !form_controls::is_checkbox_input(&self.dom, target) {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "checkbox input".to_string(),
                actual: self.control_kind(target),
            });
        }

        if self.dom.checked(target)? != checked {
            self.dom.set_checked(target, checked)?;
            self.dispatch_event(target, "input")?;
            self.dispatch_event(target, "change")?;
        }
        Ok(())
    }

    pub fn select_option(&mut self, selector: &str, value: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        if !form_controls::is_select(&self.dom, target) {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "select".to_string(),
                actual: self.control_kind(target),
            });
        }

        let before = self.dom.value(target).unwrap_or_default().to_string();
        self.dom.select_set_value(target, value)?;
        let after = self.dom.value(target).unwrap_or_default().to_string();
        if before != after {
            self.dispatch_event(target, "input")?;
            self.dispatch_event(target, "change")?;
        }
        Ok(())
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }

        let click_outcome = self.dispatch_event(target, "click")?;
        if click_outcome.default_prevented {
            return Ok(());
        }

        if form_controls::is_checkbox_input(&self.dom, target) {
            let current = self.dom.checked(target)?;
            self.dom.set_checked(target, !current)?;
            self.dispatch_event(target, "input")?;
            self.dispatch_event(target, "change")?;
        }

        if form_controls::is_submit_control(&self.dom, target) {
            if let Some(form) = self.resolve_form_for_submit(target) {
                self.submit_form(form)?;
            }
        }

        Ok(())
    }

    pub fn submit(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let form = if self
            .dom
            .tag_name(target)
            .map(|tag| tag.eq_ignore_ascii_case("form"))
            .unwrap_or(false)
        {
            Some(target)
        } else {
            self.resolve_form_for_submit(target)
        };

        if let Some(form) = form {
            self.submit_form(form)?;
        }
        Ok(())
    }

    pub fn dispatch(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dispatch_event(target, event)?;
        Ok(())
    }

    // --- partial page updates -------------------------------------------

    /// Replaces the children of the swap target with the parsed
    /// fragment, then settles: the scan-and-register pass runs again
    /// over the whole document. Pending debounce timers keep running;
    /// their fire resolves the trigger element by id at fire time.
    pub fn swap_inner(&mut self, selector: &str, fragment: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dom.detach_children(target);
        html::parse_fragment_into(&mut self.dom, target, fragment)?;
        self.trace_push(format!("[swap] {selector} settled"));
        enhancer::register_all(self)
    }

    // --- virtual clock ---------------------------------------------------

    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms()
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Runtime(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.scheduler.now_ms();
        self.scheduler.advance_clock(delta_ms);
        let ran = self.run_timer_queue(Some(self.scheduler.now_ms()), false)?;
        self.trace_timer_push(format!(
            "[timer] advance delta_ms={} from={} to={} ran_due={}",
            delta_ms,
            from,
            self.scheduler.now_ms(),
            ran
        ));
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        if target_ms < self.scheduler.now_ms() {
            return Err(Error::Runtime(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.scheduler.now_ms()
            )));
        }
        let from = self.scheduler.now_ms();
        self.scheduler.set_clock(target_ms);
        let ran = self.run_timer_queue(Some(self.scheduler.now_ms()), false)?;
        self.trace_timer_push(format!(
            "[timer] advance_to from={} to={} ran_due={}",
            from,
            self.scheduler.now_ms(),
            ran
        ));
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        let from = self.scheduler.now_ms();
        let ran = self.run_timer_queue(None, true)?;
        self.trace_timer_push(format!(
            "[timer] flush from={} to={} ran={}",
            from,
            self.scheduler.now_ms(),
            ran
        ));
        Ok(())
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        let ran = self.run_timer_queue(Some(self.scheduler.now_ms()), false)?;
        self.trace_timer_push(format!(
            "[timer] run_due now_ms={} ran={}",
            self.scheduler.now_ms(),
            ran
        ));
        Ok(ran)
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.scheduler.pending()
    }

    pub fn clear_timer(&mut self, timer_id: i64) -> bool {
        self.debounce_handles.retain(|_, id| *id != timer_id);
        self.scheduler.cancel(timer_id)
    }

    pub fn clear_all_timers(&mut self) -> usize {
        self.debounce_handles.clear();
        let cleared = self.scheduler.cancel_all();
        self.trace_timer_push(format!("[timer] clear_all cleared={cleared}"));
        cleared
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Runtime(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.scheduler.step_limit = max_steps;
        Ok(())
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>, advance_clock: bool) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(task) = self.scheduler.take_next(due_limit) {
            steps += 1;
            if steps > self.scheduler.step_limit {
                return Err(Error::Runtime(format!(
                    "timer step limit exceeded after {} steps",
                    self.scheduler.step_limit
                )));
            }
            if advance_clock && task.due_at > self.scheduler.now_ms() {
                self.scheduler.set_clock(task.due_at);
            }
            self.execute_timer_task(task)?;
        }
        Ok(steps)
    }

    fn execute_timer_task(&mut self, task: ScheduledTask) -> Result<()> {
        match task.action {
            TimerAction::FireTrigger { source } => {
                if self.debounce_handles.get(&source) == Some(&task.id) {
                    self.debounce_handles.remove(&source);
                }
                self.trace_timer_push(format!("[debounce] fire timer={}", task.id));
                let Some(trigger) = self.dom.get_element_by_id(&self.config.trigger_id) else {
                    let trigger_id = self.config.trigger_id.clone();
                    self.trace_push(format!("[debounce] no trigger #{trigger_id}"));
                    return Ok(());
                };
                self.dispatch_event(trigger, "input")?;
                Ok(())
            }
        }
    }

    // --- event dispatch --------------------------------------------------

    pub(crate) fn dispatch_event(&mut self, target: NodeId, event_type: &str) -> Result<EventState> {
        let mut event = EventState::new(event_type, target);

        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }
        path.reverse();

        // Capture phase.
        if path.len() >= 2 {
            for node in path[..path.len() - 1].to_vec() {
                event.current_target = node;
                self.invoke_listeners(node, &mut event, true)?;
            }
        }

        // Target phase: capture listeners first.
        event.current_target = target;
        self.invoke_listeners(target, &mut event, true)?;
        self.invoke_listeners(target, &mut event, false)?;

        // Bubble phase.
        if path.len() >= 2 {
            for node in path[..path.len() - 1].iter().rev().copied().collect::<Vec<_>>() {
                event.current_target = node;
                self.invoke_listeners(node, &mut event, false)?;
            }
        }

        if event.event_type == "input" {
            self.observe_trigger_input(target)?;
        }
        Ok(event)
    }

    fn invoke_listeners(
        &mut self,
        node_id: NodeId,
        event: &mut EventState,
        capture: bool,
    ) -> Result<()> {
        let listeners = self.listeners.get(node_id, &event.event_type, capture);
        for listener in listeners {
            if self.trace && self.trace_events {
                let phase = if capture { "capture" } else { "bubble" };
                let line = format!(
                    "[event] {} target={} current={} phase={} default_prevented={}",
                    event.event_type,
                    self.node_label(event.target),
                    self.node_label(event.current_target),
                    phase,
                    event.default_prevented
                );
                self.trace_push(line);
            }
            self.run_action(&listener.action, event)?;
        }
        Ok(())
    }

    fn run_action(&mut self, action: &Action, event: &mut EventState) -> Result<()> {
        match action {
            Action::PreventDefault => {
                event.default_prevented = true;
                Ok(())
            }
            Action::MatcherRowChanged { row } => {
                enhancer::update_row_arg(&mut self.dom, &self.config, *row)?;
                let delay_ms = self.config.debounce_ms;
                self.restart_debounce(*row, delay_ms)
            }
            Action::AutoSubmitChanged { field, delay_ms } => {
                self.restart_debounce(*field, *delay_ms)
            }
            Action::CopyUrlField => enhancer::copy_url_field(self),
        }
    }

    // At most one pending timer per field: scheduling cancels whatever
    // was pending for the same source.
    fn restart_debounce(&mut self, source: NodeId, delay_ms: i64) -> Result<()> {
        if let Some(previous) = self.debounce_handles.remove(&source) {
            self.scheduler.cancel(previous);
        }
        let timer_id = self
            .scheduler
            .schedule(delay_ms, TimerAction::FireTrigger { source });
        self.debounce_handles.insert(source, timer_id);
        self.trace_timer_push(format!(
            "[debounce] restart timer={timer_id} delay_ms={delay_ms}"
        ));
        Ok(())
    }

    fn submit_form(&mut self, form: NodeId) -> Result<()> {
        let outcome = self.dispatch_event(form, "submit")?;
        if !outcome.default_prevented {
            self.native_navigations += 1;
            self.trace_push("[nav] form submit would navigate".into());
        }
        Ok(())
    }

    // The trigger element stands in for the enhancement library's
    // request pipeline: input events arriving there become refresh
    // requests, subject to the same-origin option.
    fn observe_trigger_input(&mut self, target: NodeId) -> Result<()> {
        let is_trigger = self.dom.attr(target, "id") == Some(self.config.trigger_id.as_str());
        if !is_trigger {
            return Ok(());
        }

        if self.ajax.self_requests_only {
            if let Some(action_url) = self.form_action_url() {
                if let Some(parts) = LocationParts::parse(&action_url) {
                    let document_origin =
                        LocationParts::parse(&self.document_url).map(|doc| doc.origin());
                    if document_origin.as_deref() != Some(parts.origin().as_str()) {
                        self.trace_push(format!(
                            "[ajax] refused cross-origin request to {action_url}"
                        ));
                        return Ok(());
                    }
                }
            }
        }

        let now = self.scheduler.now_ms();
        self.refresh_requests.push(now);
        self.trace_push(format!("[ajax] refresh request queued at {now}"));
        Ok(())
    }

    fn form_action_url(&self) -> Option<String> {
        let form = self.dom.get_element_by_id(&self.config.form_id)?;
        self.dom.attr(form, "action").map(str::to_string)
    }

    fn resolve_form_for_submit(&self, target: NodeId) -> Option<NodeId> {
        if self
            .dom
            .tag_name(target)
            .map(|tag| tag.eq_ignore_ascii_case("form"))
            .unwrap_or(false)
        {
            return Some(target);
        }
        self.dom.find_ancestor_by_tag(target, "form")
    }

    // --- inspection ------------------------------------------------------

    pub fn value(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        if !form_controls::is_form_control(&self.dom, target) {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "form control".to_string(),
                actual: self.control_kind(target),
            });
        }
        Ok(self.dom.value(target).unwrap_or_default().to_string())
    }

    pub fn text(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.text_content(target))
    }

    pub fn attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let target = self.select_one(selector)?;
        Ok(self.dom.attr(target, name).map(str::to_string))
    }

    pub fn selection(&self, selector: &str) -> Result<Option<(usize, usize)>> {
        let target = self.select_one(selector)?;
        Ok(self.dom.selection(target))
    }

    pub fn clipboard_text(&self) -> Option<&str> {
        self.clipboard_text.as_deref()
    }

    pub fn refresh_requests(&self) -> &[i64] {
        &self.refresh_requests
    }

    pub fn native_navigation_count(&self) -> usize {
        self.native_navigations
    }

    pub fn listener_count(&self, selector: &str, event: &str) -> Result<usize> {
        let target = self.select_one(selector)?;
        Ok(self.listeners.count(target, event))
    }

    // --- assertions ------------------------------------------------------

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        self.select_one(selector)?;
        Ok(())
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual.trim() != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual: actual.trim().to_string(),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target).unwrap_or_default();
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_checked(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.checked(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_attr(&self, selector: &str, name: &str, expected: Option<&str>) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.attr(target, name);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: format!("{name}={expected:?}"),
                actual: format!("{name}={actual:?}"),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    // --- trace logs ------------------------------------------------------

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.trace_logs)
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace_to_stderr = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace_events = enabled;
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.trace_timers = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Runtime(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_log_limit = max_entries;
        while self.trace_logs.len() > self.trace_log_limit {
            self.trace_logs.remove(0);
        }
        Ok(())
    }

    pub(crate) fn trace_push(&mut self, line: String) {
        if !self.trace {
            return;
        }
        if self.trace_to_stderr {
            eprintln!("{line}");
        }
        self.trace_logs.push(line);
        while self.trace_logs.len() > self.trace_log_limit {
            self.trace_logs.remove(0);
        }
    }

    fn trace_timer_push(&mut self, line: String) {
        if self.trace_timers {
            self.trace_push(line);
        }
    }

    // --- helpers ---------------------------------------------------------

    fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn control_kind(&self, node_id: NodeId) -> String {
        let tag = self.dom.tag_name(node_id).unwrap_or("node").to_string();
        match self.dom.attr(node_id, "type") {
            Some(kind) => format!("{tag}[type={kind}]"),
            None => tag,
        }
    }

    fn node_label(&self, node_id: NodeId) -> String {
        let tag = self.dom.tag_name(node_id).unwrap_or("node").to_string();
        match self.dom.attr(node_id, "id") {
            Some(id) => format!("{tag}#{id}"),
            None => tag,
        }
    }

    fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id), 200)
    }
}

fn is_secure_context(url: &str) -> bool {
    match LocationParts::parse(url) {
        Some(parts) => {
            parts.scheme == "https"
                || matches!(parts.hostname.as_str(), "localhost" | "127.0.0.1" | "[::1]")
        }
        None => false,
    }
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    let mut out = String::new();
    for (count, ch) in input.chars().enumerate() {
        if count >= max_chars {
            out.push('…');
            break;
        }
        out.push(ch);
    }
    out
}
