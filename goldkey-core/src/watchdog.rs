//! Watchdog: on-demand shape check and self-repair of the state snapshot.
//!
//! Runs at explicit checkpoints (startup, after restoring a snapshot handed
//! over by the host). It is not a background monitor.
//!
//! Slices are checked independently:
//! - `customer`: object with a string `name`, else the empty customer
//! - `coverage`: object with a numeric `hoffmannGap`, else default coverage
//!   with the generation (and the date it derives from) cleared
//! - `tasks`: array, else `[]`
//!
//! Valid slices are left exactly as they were. If the snapshot itself cannot
//! be inspected the whole state falls back to defaults.

use serde_json::{Map, Value, json};
use std::collections::HashSet;

use crate::coverage::{Coverage, CoveragePatch};
use crate::customer::{CustomerRecord, Gender};
use crate::generation::classify;
use crate::state::AppState;
use crate::task::Task;

#[derive(Debug, Clone, PartialEq)]
pub struct Recovery {
    pub state: Value,
    pub recovered: bool,
}

pub fn default_customer() -> Value {
    json!({
        "name": "",
        "job": "",
        "phone": "",
        "birthYear": "",
        "gender": "",
        "subscriptionDate": ""
    })
}

pub fn default_coverage() -> Value {
    json!({
        "annualIncome": 0.0,
        "coverageGapPercent": 30.0,
        "yearsRemaining": 30.0,
        "hoffmannGap": 0
    })
}

/// Snapshot of a freshly constructed, empty [`AppState`].
pub fn default_state() -> Value {
    json!({
        "tasks": [],
        "customer": default_customer(),
        "insuranceDate": "",
        "generation": "unset",
        "coverage": default_coverage(),
        "report": { "text": null, "generating": false },
        "calendarSynced": []
    })
}

fn is_valid_customer(v: Option<&Value>) -> bool {
    matches!(v, Some(Value::Object(m)) if m.get("name").is_some_and(Value::is_string))
}

fn is_valid_coverage(v: Option<&Value>) -> bool {
    matches!(v, Some(Value::Object(m)) if m.get("hoffmannGap").is_some_and(Value::is_number))
}

fn is_valid_tasks(v: Option<&Value>) -> bool {
    matches!(v, Some(Value::Array(_)))
}

/// Repair the slices of an object-shaped snapshot.
fn repair_slices(state: &Map<String, Value>) -> Recovery {
    let mut result = state.clone();
    let mut recovered = false;

    if !is_valid_customer(state.get("customer")) {
        tracing::warn!(slice = "customer", "state slice corrupted, restored fallback");
        result.insert("customer".into(), default_customer());
        recovered = true;
    }

    if !is_valid_coverage(state.get("coverage")) {
        tracing::warn!(slice = "coverage", "state slice corrupted, restored fallback");
        result.insert("coverage".into(), default_coverage());
        result.insert("generation".into(), json!("unset"));
        result.insert("insuranceDate".into(), json!(""));
        recovered = true;
    }

    if !is_valid_tasks(state.get("tasks")) {
        tracing::warn!(slice = "tasks", "state slice corrupted, restored fallback");
        result.insert("tasks".into(), json!([]));
        recovered = true;
    }

    if recovered {
        tracing::warn!("state recovery complete, session continues");
    }

    Recovery {
        state: Value::Object(result),
        recovered,
    }
}

/// Check and repair each slice of `state`.
///
/// A non-object snapshot has no slices to inspect and is replaced wholesale
/// by [`default_state`].
pub fn validate_and_recover(state: &Value) -> Recovery {
    match state {
        Value::Object(map) => repair_slices(map),
        _ => Recovery {
            state: default_state(),
            recovered: true,
        },
    }
}

/// Entry point used at checkpoints. Reads the state through `get`, writes
/// back through `set` only when something was repaired, and reports whether
/// it did. Never fails: an unreadable or non-object state is replaced by
/// the full defaults.
pub fn run_watchdog<G, S>(get: G, set: S) -> bool
where
    G: FnOnce() -> anyhow::Result<Value>,
    S: FnOnce(Value),
{
    let current = match get() {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::error!(kind = json_kind(&other), "state is not inspectable, applying full fallback");
            set(default_state());
            return true;
        }
        Err(e) => {
            tracing::error!(error = %e, "state read failed, applying full fallback");
            set(default_state());
            return true;
        }
    };

    let Recovery { state, recovered } = repair_slices(&current);
    if recovered {
        set(state);
    }
    recovered
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode a shape-checked snapshot into typed state.
///
/// Slices that passed the shape check can still fail to decode (a task
/// missing its id, a gender outside the enum); those are reset too and
/// reported through the returned flag. Malformed task entries are dropped
/// individually, as are repeated ids. The generation is recomputed from the
/// stored date and the gap from its inputs.
pub fn hydrate(snapshot: &Value) -> (AppState, bool) {
    let empty = Map::new();
    let map = snapshot.as_object().unwrap_or(&empty);
    let mut repaired = false;
    let mut state = AppState::default();

    if let Some(Value::Array(items)) = map.get("tasks") {
        let mut seen = HashSet::new();
        for item in items {
            match serde_json::from_value::<Task>(item.clone()) {
                Ok(task) if seen.insert(task.id) => state.tasks.push(task),
                Ok(task) => {
                    tracing::warn!(task_id = %task.id, "dropping task with duplicate id");
                    repaired = true;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed task");
                    repaired = true;
                }
            }
        }
    }

    if let Some(v) = map.get("customer") {
        state.customer = hydrate_customer(v, &mut repaired);
    }

    match map.get("insuranceDate") {
        None => {}
        Some(Value::String(s)) => state.insurance_date = s.clone(),
        Some(_) => {
            tracing::warn!(slice = "insuranceDate", "insurance date is not text, cleared");
            repaired = true;
        }
    }
    state.generation = classify(&state.insurance_date);

    if let Some(v) = map.get("coverage") {
        state.coverage = hydrate_coverage(v, &mut repaired);
    }

    if let Some(v) = map.get("report") {
        match serde_json::from_value(v.clone()) {
            Ok(report) => state.report = report,
            Err(e) => {
                tracing::warn!(slice = "report", error = %e, "report did not decode, cleared");
                repaired = true;
            }
        }
    }

    if let Some(v) = map.get("calendarSynced") {
        match serde_json::from_value::<Vec<crate::task::TaskId>>(v.clone()) {
            Ok(ids) => {
                state.calendar_synced = ids
                    .into_iter()
                    .filter(|id| state.tasks.iter().any(|t| t.id == *id))
                    .collect();
            }
            Err(e) => {
                tracing::warn!(slice = "calendarSynced", error = %e, "sync marks did not decode, cleared");
                repaired = true;
            }
        }
    }

    (state, repaired)
}

// Customer fields are decoded one at a time so a bad field only costs
// itself. Unknown gender tags read as unset.
fn hydrate_customer(v: &Value, repaired: &mut bool) -> CustomerRecord {
    let Some(map) = v.as_object() else {
        tracing::warn!(slice = "customer", "customer is not an object, reset");
        *repaired = true;
        return CustomerRecord::default();
    };

    let mut text = |key: &str| -> String {
        match map.get(key) {
            None => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                tracing::warn!(slice = "customer", field = key, kind = json_kind(other), "customer field is not text, cleared");
                *repaired = true;
                String::new()
            }
        }
    };

    let mut customer = CustomerRecord {
        name: text("name"),
        job: text("job"),
        phone: text("phone"),
        birth_year: text("birthYear"),
        gender: Gender::Unset,
        subscription_date: text("subscriptionDate"),
    };

    customer.gender = match map.get("gender") {
        None => Gender::Unset,
        Some(Value::String(tag)) => Gender::from_tag(tag).unwrap_or_else(|| {
            tracing::warn!(slice = "customer", field = "gender", tag = %tag, "unknown gender tag, unset");
            *repaired = true;
            Gender::Unset
        }),
        Some(other) => {
            tracing::warn!(slice = "customer", field = "gender", kind = json_kind(other), "gender is not text, unset");
            *repaired = true;
            Gender::Unset
        }
    };

    customer
}

// Only the three inputs are read; the stored gap is any number and is
// recomputed. A gap that disagrees with its inputs counts as a repair.
fn hydrate_coverage(v: &Value, repaired: &mut bool) -> Coverage {
    let Some(map) = v.as_object() else {
        tracing::warn!(slice = "coverage", "coverage is not an object, reset");
        *repaired = true;
        return Coverage::default();
    };

    let base = Coverage::default();
    let mut number = |key: &str, fallback: f64| -> f64 {
        match map.get(key) {
            None => fallback,
            Some(Value::Number(n)) => n.as_f64().unwrap_or(fallback),
            Some(other) => {
                tracing::warn!(slice = "coverage", field = key, kind = json_kind(other), "coverage input is not a number, reset");
                *repaired = true;
                fallback
            }
        }
    };

    let patch = CoveragePatch {
        annual_income: Some(number("annualIncome", base.annual_income)),
        coverage_gap_percent: Some(number("coverageGapPercent", base.coverage_gap_percent)),
        years_remaining: Some(number("yearsRemaining", base.years_remaining)),
    };
    let coverage = base.merged(&patch);

    let stored = map.get("hoffmannGap").and_then(Value::as_f64);
    if stored != Some(coverage.hoffmann_gap as f64) {
        tracing::warn!(slice = "coverage", "stale coverage gap recomputed");
        *repaired = true;
    }
    coverage
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_snapshot() -> Value {
        json!({
            "tasks": [
                { "id": 1, "title": "renewal", "isDone": false, "priority": "high", "dueDate": "2026-03-15" }
            ],
            "customer": { "name": "Kim", "job": "driver", "phone": "", "birthYear": "1980", "gender": "male", "subscriptionDate": "" },
            "insuranceDate": "2015-05",
            "generation": "gen2",
            "coverage": { "annualIncome": 40000000.0, "coverageGapPercent": 30.0, "yearsRemaining": 30.0, "hoffmannGap": 18447 },
            "report": { "text": null, "generating": false },
            "calendarSynced": []
        })
    }

    #[test]
    fn valid_snapshot_is_untouched() {
        let s = valid_snapshot();
        let r = validate_and_recover(&s);
        assert!(!r.recovered);
        assert_eq!(r.state, s);
    }

    #[test]
    fn non_array_tasks_repaired_without_touching_siblings() {
        let mut s = valid_snapshot();
        s["tasks"] = json!({ "oops": true });
        let before_customer = serde_json::to_string(&s["customer"]).unwrap();
        let before_coverage = serde_json::to_string(&s["coverage"]).unwrap();

        let r = validate_and_recover(&s);
        assert!(r.recovered);
        assert_eq!(r.state["tasks"], json!([]));
        assert_eq!(serde_json::to_string(&r.state["customer"]).unwrap(), before_customer);
        assert_eq!(serde_json::to_string(&r.state["coverage"]).unwrap(), before_coverage);
        assert_eq!(r.state["insuranceDate"], "2015-05");
    }

    #[test]
    fn customer_without_text_name_is_reset_alone() {
        let mut s = valid_snapshot();
        s["customer"]["name"] = json!(42);
        let r = validate_and_recover(&s);
        assert!(r.recovered);
        assert_eq!(r.state["customer"], default_customer());
        assert_eq!(r.state["tasks"], s["tasks"]);
        assert_eq!(r.state["coverage"], s["coverage"]);
    }

    #[test]
    fn null_customer_is_reset() {
        let mut s = valid_snapshot();
        s["customer"] = Value::Null;
        assert_eq!(validate_and_recover(&s).state["customer"], default_customer());
    }

    #[test]
    fn coverage_with_text_gap_resets_coverage_and_generation() {
        let mut s = valid_snapshot();
        s["coverage"]["hoffmannGap"] = json!("lots");
        let r = validate_and_recover(&s);
        assert!(r.recovered);
        assert_eq!(r.state["coverage"], default_coverage());
        assert_eq!(r.state["generation"], "unset");
        assert_eq!(r.state["insuranceDate"], "");
        assert_eq!(r.state["customer"], s["customer"]);
    }

    #[test]
    fn missing_slices_are_filled() {
        let r = validate_and_recover(&json!({}));
        assert!(r.recovered);
        assert_eq!(r.state["tasks"], json!([]));
        assert_eq!(r.state["customer"], default_customer());
        assert_eq!(r.state["coverage"], default_coverage());
    }

    #[test]
    fn non_object_state_falls_back_entirely() {
        for bad in [Value::Null, json!([1, 2]), json!("state")] {
            let r = validate_and_recover(&bad);
            assert!(r.recovered);
            assert_eq!(r.state, default_state());
        }
    }

    #[test]
    fn run_watchdog_only_writes_on_repair() {
        let mut written = None;
        let repaired = run_watchdog(|| Ok(valid_snapshot()), |v| written = Some(v));
        assert!(!repaired);
        assert!(written.is_none());

        let mut bad = valid_snapshot();
        bad["tasks"] = Value::Null;
        let repaired = run_watchdog(|| Ok(bad), |v| written = Some(v));
        assert!(repaired);
        assert_eq!(written.unwrap()["tasks"], json!([]));
    }

    #[test]
    fn run_watchdog_survives_unreadable_state() {
        let mut written = None;
        let repaired = run_watchdog(|| Err(anyhow::anyhow!("store poisoned")), |v| written = Some(v));
        assert!(repaired);
        assert_eq!(written.unwrap(), default_state());

        let mut written = None;
        assert!(run_watchdog(|| Ok(json!(7)), |v| written = Some(v)));
        assert_eq!(written.unwrap(), default_state());
    }

    #[test]
    fn default_state_matches_typed_default() {
        assert_eq!(serde_json::to_value(AppState::default()).unwrap(), default_state());
    }

    #[test]
    fn hydrate_recomputes_generation_and_keeps_valid_tasks() {
        let mut s = valid_snapshot();
        s["generation"] = json!("gen4");
        s["tasks"]
            .as_array_mut()
            .unwrap()
            .extend([json!({ "title": "no id" }), json!({ "id": 1, "title": "dup" })]);

        let (state, repaired) = hydrate(&s);
        assert!(repaired);
        assert_eq!(state.generation, crate::generation::Generation::Gen2);
        assert_eq!(state.tasks.len(), 1);
        assert_eq!(state.tasks[0].title, "renewal");
        assert_eq!(state.coverage.hoffmann_gap, 18_447);
    }

    #[test]
    fn bad_customer_field_only_clears_itself() {
        let mut s = valid_snapshot();
        s["customer"]["gender"] = json!("M");
        s["customer"]["phone"] = json!(1012345678);

        let (state, repaired) = hydrate(&s);
        assert!(repaired);
        assert_eq!(state.customer.name, "Kim");
        assert_eq!(state.customer.job, "driver");
        assert_eq!(state.customer.birth_year, "1980");
        assert_eq!(state.customer.phone, "");
        assert_eq!(state.customer.gender, Gender::Unset);
    }

    #[test]
    fn fractional_stored_gap_keeps_coverage_inputs() {
        let mut s = valid_snapshot();
        s["coverage"]["hoffmannGap"] = json!(18447.0);

        let (state, repaired) = hydrate(&s);
        assert!(!repaired);
        assert_eq!(state.coverage.annual_income, 40_000_000.0);
        assert_eq!(state.coverage.hoffmann_gap, 18_447);
    }

    #[test]
    fn stale_gap_is_recomputed_from_inputs() {
        let mut s = valid_snapshot();
        s["coverage"]["hoffmannGap"] = json!(1.5);
        s["coverage"]["yearsRemaining"] = json!("thirty");

        let (state, repaired) = hydrate(&s);
        assert!(repaired);
        assert_eq!(state.coverage.annual_income, 40_000_000.0);
        assert_eq!(state.coverage.years_remaining, 30.0);
        assert_eq!(state.coverage.hoffmann_gap, 18_447);
    }

    #[test]
    fn hydrate_of_clean_snapshot_reports_no_repair() {
        let (state, repaired) = hydrate(&valid_snapshot());
        assert!(!repaired);
        assert_eq!(state.customer.name, "Kim");
    }
}
