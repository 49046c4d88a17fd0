//! Aggregate application state and its slices.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::coverage::Coverage;
use crate::customer::CustomerRecord;
use crate::generation::Generation;
use crate::task::{Task, TaskId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportState {
    pub text: Option<String>,
    pub generating: bool,
}

/// Everything the CRM screen reads. Owned by [`crate::store::CrmStore`].
///
/// Serializes to the snapshot shape the watchdog inspects:
/// `{ tasks, customer, insuranceDate, generation, coverage, report, calendarSynced }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub tasks: Vec<Task>,
    pub customer: CustomerRecord,
    /// Enrollment month as typed by the agent, stored verbatim.
    pub insurance_date: String,
    /// Always `classify(insurance_date)`.
    pub generation: Generation,
    pub coverage: Coverage,
    pub report: ReportState,
    /// Tasks already exported to the device calendar.
    pub calendar_synced: BTreeSet<TaskId>,
}

impl AppState {
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn max_task_id(&self) -> Option<TaskId> {
        self.tasks.iter().map(|t| t.id).max()
    }
}

/// Top-level slice that changed, passed to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slice {
    Tasks,
    Customer,
    Insurance,
    Coverage,
    Report,
    Calendar,
    /// Whole state replaced (restore or recovery).
    All,
}
