//! timeclock: a personal work-session tracker.
//!
//! One user, one session per calendar day: clock in, let the simulated idle
//! and screenshot accrual run, clock out, submit with a justification when
//! the day came up short, and optionally delete the day to start over. Past
//! sessions are queryable with filters and sort orders. Persistence is a
//! SQLite-backed store keyed by `{userId}_{YYYY-MM-DD}`; identity comes from
//! an injected provider; presentation is left to the embedder, which can
//! watch the tracker's event channel.

pub mod error;
pub mod history;
pub mod identity;
pub mod lifecycle;
pub mod metrics;
pub mod models;
pub mod settings;
pub mod store;

pub use error::TrackerError;
pub use identity::{FixedIdentity, IdentityProvider};
pub use lifecycle::{SessionTracker, TrackerEvent, TrackerPhase, TrackerSnapshot};
pub use models::{
    session_key, Approval, ApprovalStatus, IdleEvent, Screenshot, Session, SessionState,
};
pub use settings::{SettingsStore, TrackerSettings};
pub use store::SessionStore;
