//! Task model for the agent's daily to-do list.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Container-assigned task identifier. Not reused within a session while
/// the counter has room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub is_done: bool,
    #[serde(default)]
    pub priority: Priority,
    /// Serialized as `YYYY-MM-DD`, absent when the task has no due date.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_date"
    )]
    pub due_date: Option<NaiveDate>,
}

impl Task {
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            is_done: false,
            priority: Priority::Medium,
            due_date: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Same task with the completion flag flipped.
    pub fn toggled(&self) -> Self {
        Self {
            is_done: !self.is_done,
            ..self.clone()
        }
    }
}

// The mobile client writes "" for "no due date"; anything unparseable reads as none.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()))
}

/// Share of completed tasks, rounded to a whole percent. Empty list is 0.
pub fn progress_percent(tasks: &[Task]) -> u8 {
    if tasks.is_empty() {
        return 0;
    }
    let done = tasks.iter().filter(|t| t.is_done).count();
    ((done as f64 / tasks.len() as f64) * 100.0).round() as u8
}

/// Starter list the mobile app opens with on a fresh install.
pub fn seed_tasks() -> Vec<Task> {
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);
    let mut out = Vec::new();
    let rows = [
        ("Auto insurance renewal notice (D-30)", Priority::High, date(2026, 3, 15)),
        ("File indemnity claim for new customer", Priority::High, date(2026, 3, 10)),
        ("Deliver whole-life proposal to Mr. Park", Priority::Medium, date(2026, 3, 12)),
        ("Submit monthly sales report", Priority::Low, date(2026, 3, 31)),
    ];
    for (i, (title, priority, due)) in rows.into_iter().enumerate() {
        let mut t = Task::new(TaskId(i as u64 + 1), title).with_priority(priority);
        t.due_date = due;
        out.push(t);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_of_empty_list_is_zero() {
        assert_eq!(progress_percent(&[]), 0);
    }

    #[test]
    fn progress_rounds_to_whole_percent() {
        let mut tasks = vec![
            Task::new(TaskId(1), "a"),
            Task::new(TaskId(2), "b"),
            Task::new(TaskId(3), "c"),
        ];
        tasks[0].is_done = true;
        assert_eq!(progress_percent(&tasks), 33);
        tasks[1].is_done = true;
        assert_eq!(progress_percent(&tasks), 67);
        tasks[2].is_done = true;
        assert_eq!(progress_percent(&tasks), 100);
    }

    #[test]
    fn toggled_flips_only_completion() {
        let t = Task::new(TaskId(7), "call back").with_priority(Priority::High);
        let once = t.toggled();
        assert!(once.is_done);
        assert_eq!(once.priority, Priority::High);
        assert_eq!(once.toggled(), t);
    }

    #[test]
    fn task_serializes_with_camel_case_and_iso_date() {
        let t = Task::new(TaskId(3), "renewal")
            .with_due_date(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap());
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["id"], 3);
        assert_eq!(v["isDone"], false);
        assert_eq!(v["priority"], "medium");
        assert_eq!(v["dueDate"], "2026-03-15");
    }

    #[test]
    fn empty_due_date_string_reads_as_none() {
        let t: Task = serde_json::from_value(serde_json::json!({
            "id": 9, "title": "x", "isDone": true, "priority": "low", "dueDate": ""
        }))
        .unwrap();
        assert_eq!(t.due_date, None);
        assert!(t.is_done);
        assert_eq!(t.priority, Priority::Low);
    }

    #[test]
    fn seed_tasks_have_unique_ids() {
        let seeds = seed_tasks();
        assert_eq!(seeds.len(), 4);
        let mut ids: Vec<_> = seeds.iter().map(|t| t.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert!(seeds.iter().all(|t| t.due_date.is_some() && !t.is_done));
    }
}
