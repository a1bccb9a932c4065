use crate::dom::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: i64,
    pub due_at: i64,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TimerAction {
    FireTrigger { source: NodeId },
}

#[derive(Debug, Clone)]
pub(crate) struct ScheduledTask {
    pub(crate) id: i64,
    pub(crate) due_at: i64,
    pub(crate) order: i64,
    pub(crate) action: TimerAction,
}

#[derive(Debug)]
pub(crate) struct Scheduler {
    queue: Vec<ScheduledTask>,
    now_ms: i64,
    next_timer_id: i64,
    next_order: i64,
    pub(crate) step_limit: usize,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self {
            queue: Vec::new(),
            now_ms: 0,
            next_timer_id: 1,
            next_order: 0,
            step_limit: 10_000,
        }
    }

    pub(crate) fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub(crate) fn advance_clock(&mut self, delta_ms: i64) {
        self.now_ms = self.now_ms.saturating_add(delta_ms);
    }

    pub(crate) fn set_clock(&mut self, target_ms: i64) {
        self.now_ms = target_ms;
    }

    pub(crate) fn schedule(&mut self, delay_ms: i64, action: TimerAction) -> i64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let order = self.next_order;
        self.next_order += 1;
        self.queue.push(ScheduledTask {
            id,
            due_at: self.now_ms.saturating_add(delay_ms.max(0)),
            order,
            action,
        });
        id
    }

    pub(crate) fn cancel(&mut self, timer_id: i64) -> bool {
        let before = self.queue.len();
        self.queue.retain(|task| task.id != timer_id);
        self.queue.len() != before
    }

    pub(crate) fn cancel_all(&mut self) -> usize {
        let cleared = self.queue.len();
        self.queue.clear();
        cleared
    }

    pub(crate) fn pending(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .queue
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    // Removes and returns the next task in (due_at, order) sequence;
    // with a limit, only tasks due at or before it qualify.
    pub(crate) fn take_next(&mut self, due_limit: Option<i64>) -> Option<ScheduledTask> {
        let next_idx = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.map(|limit| task.due_at <= limit).unwrap_or(true))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)?;
        Some(self.queue.remove(next_idx))
    }
}
