//! Due-date calendar projection.
//!
//! Open tasks with a due date become one-hour events at 09:00 local time on
//! that date, with reminders a day and an hour ahead. Rendering to ICS keeps
//! the device-calendar write itself outside this crate.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::BTreeSet;

use crate::task::{Task, TaskId};

/// Minutes before start at which the device should alert.
pub const ALARM_LEADS_MINUTES: [i64; 2] = [24 * 60, 60];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub task_id: TaskId,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub summary: String,
    pub notes: String,
    pub synced: bool,
}

pub fn due_date_events(tasks: &[Task], synced: &BTreeSet<TaskId>, tz: Tz) -> Vec<CalendarEvent> {
    let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);
    let mut events = Vec::new();

    for t in tasks.iter().filter(|t| !t.is_done) {
        let Some(due) = t.due_date else { continue };
        // A DST gap at 09:00 has no local instant; skip rather than guess.
        let Some(start_local) = tz.from_local_datetime(&due.and_time(nine)).earliest() else {
            continue;
        };
        let start_utc = start_local.with_timezone(&Utc);

        events.push(CalendarEvent {
            task_id: t.id,
            start_utc,
            end_utc: start_utc + Duration::hours(1),
            summary: t.title.clone(),
            notes: format!("[GoldKey CRM] auto-registered: {}", t.title),
            synced: synced.contains(&t.id),
        });
    }

    events
}

/// Minimal VCALENDAR with one VEVENT (and its VALARMs) per event. Times are UTC.
pub fn events_to_ics(events: &[CalendarEvent]) -> String {
    let mut s = String::new();
    s.push_str("BEGIN:VCALENDAR\nVERSION:2.0\nPRODID:-//GoldKey CRM//EN\n");

    for e in events {
        let dtstart = e.start_utc.format("%Y%m%dT%H%M%SZ");
        let dtend = e.end_utc.format("%Y%m%dT%H%M%SZ");

        s.push_str("BEGIN:VEVENT\n");
        s.push_str(&format!("UID:goldkey-task-{}@goldkey\n", e.task_id));
        s.push_str(&format!("DTSTART:{}\n", dtstart));
        s.push_str(&format!("DTEND:{}\n", dtend));
        s.push_str(&format!("SUMMARY:{}\n", escape_ics(&e.summary)));
        s.push_str(&format!("DESCRIPTION:{}\n", escape_ics(&e.notes)));
        for lead in ALARM_LEADS_MINUTES {
            s.push_str("BEGIN:VALARM\nACTION:DISPLAY\n");
            s.push_str(&format!("TRIGGER:{}\n", ics_trigger(lead)));
            s.push_str(&format!("DESCRIPTION:{}\n", escape_ics(&e.summary)));
            s.push_str("END:VALARM\n");
        }
        s.push_str("END:VEVENT\n");
    }

    s.push_str("END:VCALENDAR\n");
    s
}

fn ics_trigger(minutes_before: i64) -> String {
    if minutes_before % (24 * 60) == 0 {
        format!("-P{}D", minutes_before / (24 * 60))
    } else if minutes_before % 60 == 0 {
        format!("-PT{}H", minutes_before / 60)
    } else {
        format!("-PT{}M", minutes_before)
    }
}

fn escape_ics(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn seoul() -> Tz {
        "Asia/Seoul".parse().unwrap()
    }

    #[test]
    fn open_due_dated_tasks_become_nine_am_events() {
        let due = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let mut done = Task::new(TaskId(2), "finished").with_due_date(due);
        done.is_done = true;
        let tasks = vec![
            Task::new(TaskId(1), "renewal call").with_due_date(due),
            done,
            Task::new(TaskId(3), "no date"),
        ];

        let events = due_date_events(&tasks, &BTreeSet::new(), seoul());
        assert_eq!(events.len(), 1);
        // 09:00 KST is 00:00 UTC.
        assert_eq!(events[0].start_utc.to_rfc3339(), "2026-03-15T00:00:00+00:00");
        assert_eq!(events[0].end_utc - events[0].start_utc, Duration::hours(1));
        assert!(!events[0].synced);
    }

    #[test]
    fn synced_flag_follows_marks() {
        let due = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let tasks = vec![Task::new(TaskId(5), "x").with_due_date(due)];
        let synced: BTreeSet<_> = [TaskId(5)].into_iter().collect();
        assert!(due_date_events(&tasks, &synced, seoul())[0].synced);
    }

    #[test]
    fn ics_contains_event_and_alarms() {
        let due = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let tasks = vec![Task::new(TaskId(4), "claim; urgent, today").with_due_date(due)];
        let ics = events_to_ics(&due_date_events(&tasks, &BTreeSet::new(), seoul()));
        assert!(ics.starts_with("BEGIN:VCALENDAR"));
        assert!(ics.contains("UID:goldkey-task-4@goldkey"));
        assert!(ics.contains("DTSTART:20260310T000000Z"));
        assert!(ics.contains("SUMMARY:claim\\; urgent\\, today"));
        assert!(ics.contains("TRIGGER:-P1D"));
        assert!(ics.contains("TRIGGER:-PT1H"));
        assert!(ics.trim_end().ends_with("END:VCALENDAR"));
    }
}
