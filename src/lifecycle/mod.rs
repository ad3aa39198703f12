mod accrual;
mod controller;
mod state;

pub use controller::{SessionTracker, TrackerEvent, TrackerSnapshot};
pub use state::{TrackerPhase, TrackerState};
