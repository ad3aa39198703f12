use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A simulated period of inactivity. Held only in memory while a session is
/// being tracked; the persisted record keeps just the aggregate minutes and
/// the event count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdleEvent {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_minutes: u64,
}
