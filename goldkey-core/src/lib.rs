//! goldkey-core: state container, derivations and watchdog for the GoldKey CRM

pub mod calendar;
pub mod coverage;
pub mod customer;
pub mod flags;
pub mod generation;
pub mod report;
pub mod share;
pub mod state;
pub mod store;
pub mod task;
pub mod watchdog;

pub use calendar::{CalendarEvent, due_date_events, events_to_ics};
pub use coverage::{Coverage, CoveragePatch, hoffmann_gap};
pub use customer::{CustomerPatch, CustomerRecord, Gender};
pub use flags::FeatureFlags;
pub use generation::{Generation, classify};
pub use report::{ReportInputs, render_report};
pub use share::ShareTarget;
pub use state::{AppState, ReportState, Slice};
pub use store::{CrmStore, StoreSettings, SubscriptionId};
pub use task::{Priority, Task, TaskId, progress_percent};
pub use watchdog::{Recovery, run_watchdog, validate_and_recover};
