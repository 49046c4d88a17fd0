//! CRM store: single owner of [`AppState`].
//!
//! Every operation is synchronous and either applies fully or not at all.
//! Derived values (generation, coverage gap) are recomputed in the same call
//! that changes their inputs. Subscribers hear about each change with the
//! slice that changed; no-ops notify nobody.
//!
//! Report generation is the one deferred step: the text is rendered from a
//! snapshot taken when `generate_report` is called and lands when the owner
//! calls `poll` at or after the scheduled instant. Pending publishes are
//! never cancelled, so a `clear_report` in between is overwritten when the
//! publish lands.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

use crate::calendar::{CalendarEvent, due_date_events};
use crate::coverage::CoveragePatch;
use crate::customer::CustomerPatch;
use crate::flags::FeatureFlags;
use crate::generation::classify;
use crate::report::{ReportInputs, render_report};
use crate::share::ShareTarget;
use crate::state::{AppState, ReportState, Slice};
use crate::task::{Priority, Task, TaskId, progress_percent, seed_tasks};
use crate::watchdog;

pub const DEFAULT_PUBLISH_DELAY_MS: i64 = 600;
pub const DEFAULT_SHARE_TITLE: &str = "GoldKey AI Consultation Report";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Simulated generation latency before report text appears.
    pub publish_delay: Duration,
    pub share_title: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            publish_delay: Duration::milliseconds(DEFAULT_PUBLISH_DELAY_MS),
            share_title: DEFAULT_SHARE_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&AppState, Slice)>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingPublish {
    due_at: DateTime<Utc>,
    text: String,
}

pub struct CrmStore {
    state: AppState,
    flags: FeatureFlags,
    settings: StoreSettings,
    next_task_id: u64,
    pending: Vec<PendingPublish>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for CrmStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrmStore")
            .field("state", &self.state)
            .field("flags", &self.flags)
            .field("settings", &self.settings)
            .field("next_task_id", &self.next_task_id)
            .field("pending", &self.pending.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl CrmStore {
    pub fn new(flags: FeatureFlags, settings: StoreSettings) -> Self {
        Self {
            state: AppState::default(),
            flags,
            settings,
            next_task_id: 1,
            pending: Vec::new(),
            listeners: Vec::new(),
            next_subscription: 1,
        }
    }

    /// Store preloaded with the starter task list.
    pub fn with_seed_tasks(flags: FeatureFlags, settings: StoreSettings) -> Self {
        let mut store = Self::new(flags, settings);
        store.state.tasks = seed_tasks();
        store.bump_next_id();
        store
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn flags(&self) -> FeatureFlags {
        self.flags
    }

    pub fn snapshot(&self) -> Value {
        serde_json::to_value(&self.state).unwrap_or_else(|e| {
            tracing::error!(error = %e, "state did not serialize, exporting defaults");
            watchdog::default_state()
        })
    }

    // ── subscriptions ───────────────────────────────────────────────

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&AppState, Slice) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, slice: Slice) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state, slice);
        }
    }

    // ── tasks ───────────────────────────────────────────────────────

    pub fn add_task(
        &mut self,
        title: impl Into<String>,
        priority: Priority,
        due_date: Option<NaiveDate>,
    ) -> TaskId {
        let id = self.allocate_id();

        let mut task = Task::new(id, title).with_priority(priority);
        task.due_date = due_date;

        let mut tasks = self.state.tasks.clone();
        tasks.push(task);
        self.state.tasks = tasks;
        self.notify(Slice::Tasks);
        id
    }

    /// `add_task` with medium priority and no due date.
    pub fn add_task_default(&mut self, title: impl Into<String>) -> TaskId {
        self.add_task(title, Priority::Medium, None)
    }

    pub fn toggle_task(&mut self, id: TaskId) {
        if self.state.task(id).is_none() {
            return;
        }
        self.state.tasks = self
            .state
            .tasks
            .iter()
            .map(|t| if t.id == id { t.toggled() } else { t.clone() })
            .collect();
        self.notify(Slice::Tasks);
    }

    pub fn remove_task(&mut self, id: TaskId) {
        if self.state.task(id).is_none() {
            return;
        }
        self.state.tasks = self
            .state
            .tasks
            .iter()
            .filter(|t| t.id != id)
            .cloned()
            .collect();
        if self.state.calendar_synced.contains(&id) {
            let mut synced = self.state.calendar_synced.clone();
            synced.remove(&id);
            self.state.calendar_synced = synced;
        }
        self.notify(Slice::Tasks);
    }

    pub fn progress_percent(&self) -> u8 {
        progress_percent(&self.state.tasks)
    }

    // ── customer / insurance / coverage ─────────────────────────────

    pub fn update_customer(&mut self, patch: CustomerPatch) {
        let next = self.state.customer.merged(&patch);
        if next == self.state.customer {
            return;
        }
        self.state.customer = next;
        self.notify(Slice::Customer);
    }

    /// Store `date` verbatim and reclassify. Bad input yields `Unset`.
    pub fn set_insurance_date(&mut self, date: impl Into<String>) {
        let date = date.into();
        if date == self.state.insurance_date {
            return;
        }
        self.state.generation = classify(&date);
        self.state.insurance_date = date;
        self.notify(Slice::Insurance);
    }

    /// Merge inputs and recompute the gap from the merged values. No-op when
    /// coverage calculation is disabled.
    pub fn update_coverage(&mut self, patch: CoveragePatch) {
        if !self.flags.coverage_enabled {
            return;
        }
        let next = self.state.coverage.merged(&patch);
        if next == self.state.coverage {
            return;
        }
        self.state.coverage = next;
        self.notify(Slice::Coverage);
    }

    // ── report ──────────────────────────────────────────────────────

    fn report_inputs(&self) -> ReportInputs {
        ReportInputs {
            name: self.state.customer.name.clone(),
            job: self.state.customer.job.clone(),
            generation: self.state.generation,
            hoffmann_gap: self.state.coverage.hoffmann_gap,
        }
    }

    /// Start generating a report. The text is rendered now, from the current
    /// customer/generation/coverage, and published by the first `poll` at or
    /// after the returned instant. `None` when report generation is disabled.
    pub fn generate_report(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.flags.report_enabled {
            return None;
        }
        let text = render_report(&self.report_inputs());
        let due_at = now + self.settings.publish_delay;
        self.pending.push(PendingPublish { due_at, text });

        self.state.report = ReportState {
            text: self.state.report.text.clone(),
            generating: true,
        };
        self.notify(Slice::Report);
        Some(due_at)
    }

    /// Earliest instant at which a pending publish becomes due.
    pub fn next_publish_at(&self) -> Option<DateTime<Utc>> {
        self.pending.iter().map(|p| p.due_at).min()
    }

    pub fn has_pending_publish(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Land every pending publish due at or before `now`, oldest schedule
    /// first. Returns how many landed.
    pub fn poll(&mut self, now: DateTime<Utc>) -> usize {
        if self.pending.iter().all(|p| p.due_at > now) {
            return 0;
        }
        let (due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.due_at <= now);
        self.pending = rest;

        let landed = due.len();
        for p in due {
            tracing::debug!(due_at = %p.due_at, "report published");
            self.state.report = ReportState {
                text: Some(p.text),
                generating: false,
            };
            self.notify(Slice::Report);
        }
        landed
    }

    /// Drop the current text. Leaves `generating` and pending publishes alone.
    pub fn clear_report(&mut self) {
        if self.state.report.text.is_none() {
            return;
        }
        self.state.report = ReportState {
            text: None,
            generating: self.state.report.generating,
        };
        self.notify(Slice::Report);
    }

    /// Best-effort share of the current report. Failures are logged and
    /// swallowed. Returns whether the target accepted the text.
    pub fn share_report(&self, target: &mut dyn ShareTarget) -> bool {
        let Some(text) = self.state.report.text.as_deref() else {
            return false;
        };
        match target.share(text, &self.settings.share_title) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "report share failed");
                false
            }
        }
    }

    // ── calendar ────────────────────────────────────────────────────

    /// Calendar events for open, due-dated tasks. Empty when calendar sync
    /// is disabled.
    pub fn calendar_events(&self, tz: Tz) -> Vec<CalendarEvent> {
        if !self.flags.calendar_sync_enabled {
            return Vec::new();
        }
        due_date_events(&self.state.tasks, &self.state.calendar_synced, tz)
    }

    /// Record that a task's event reached the device calendar.
    pub fn mark_synced(&mut self, id: TaskId) {
        if !self.flags.calendar_sync_enabled
            || self.state.task(id).is_none()
            || self.state.calendar_synced.contains(&id)
        {
            return;
        }
        let mut synced = self.state.calendar_synced.clone();
        synced.insert(id);
        self.state.calendar_synced = synced;
        self.notify(Slice::Calendar);
    }

    // ── recovery ────────────────────────────────────────────────────

    /// Run the watchdog over the live state and swap in repaired slices.
    pub fn recover_state(&mut self) -> bool {
        let mut repaired: Option<Value> = None;
        let live = &self.state;
        let recovered = watchdog::run_watchdog(
            || Ok(serde_json::to_value(live)?),
            |v| repaired = Some(v),
        );
        if let Some(v) = repaired {
            let (state, _) = watchdog::hydrate(&v);
            self.replace_state(state);
        }
        recovered
    }

    /// Replace the state with a host-supplied snapshot, repairing whatever
    /// does not pass the watchdog or does not decode. Pending publishes
    /// survive. Returns whether anything was repaired.
    pub fn restore(&mut self, snapshot: Value) -> bool {
        let mut repaired: Option<Value> = None;
        let shape_repaired =
            watchdog::run_watchdog(|| Ok(snapshot.clone()), |v| repaired = Some(v));
        let source = repaired.unwrap_or(snapshot);
        let (state, decode_repaired) = watchdog::hydrate(&source);
        self.replace_state(state);
        shape_repaired || decode_repaired
    }

    fn replace_state(&mut self, state: AppState) {
        self.state = state;
        self.bump_next_id();
        self.notify(Slice::All);
    }

    // Ids only move forward, even if a restore brings back lower ones.
    fn bump_next_id(&mut self) {
        if let Some(max) = self.state.max_task_id() {
            self.next_task_id = self.next_task_id.max(max.0.saturating_add(1));
        }
    }

    /// Next id from the counter. Once the counter is pinned at `u64::MAX`
    /// by a restored id, falls back to the lowest id not in use.
    fn allocate_id(&mut self) -> TaskId {
        let candidate = TaskId(self.next_task_id);
        if self.state.task(candidate).is_none() {
            self.next_task_id = self.next_task_id.saturating_add(1);
            return candidate;
        }
        let used: BTreeSet<TaskId> = self.state.tasks.iter().map(|t| t.id).collect();
        let free = (1..=u64::MAX)
            .map(TaskId)
            .find(|id| !used.contains(id))
            .unwrap_or(TaskId(0));
        tracing::warn!(task_id = %free, "task id counter exhausted, reusing a free id");
        free
    }
}
