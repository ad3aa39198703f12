//! Session-related data models.
//!
//! A `Session` is one user's work record for one calendar day. Its identifier
//! doubles as the persistence primary key (see [`session_key`]), which is what
//! enforces the one-record-per-day invariant: saving again for the same day
//! overwrites rather than appends.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Active,
    Submitted,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Active => "Active",
            SessionState::Submitted => "Submitted",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "Pending",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
        }
    }
}

/// Reviewer decision on a submitted session. Written by an external approval
/// workflow; this crate only models the persisted shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub status: ApprovalStatus,
    pub comment: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl Approval {
    pub fn pending() -> Self {
        Self {
            status: ApprovalStatus::Pending,
            comment: None,
            approved_by: None,
            approved_at: None,
        }
    }
}

/// Opaque reference to a captured screenshot. Capture is simulated, so the
/// url points at placeholder imagery rather than a real upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Screenshot {
    pub id: String,
    pub captured_at: DateTime<Utc>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub clock_in: DateTime<Utc>,
    pub clock_out: Option<DateTime<Utc>>,
    pub total_minutes: u64,
    pub idle_minutes: u64,
    pub productive_hours: f64,
    /// How many idle events were accrued; the individual events do not
    /// outlive the active tracking window.
    pub idle_event_count: u64,
    pub screenshots: Vec<Screenshot>,
    pub state: SessionState,
    pub less_hours_comment: Option<String>,
    pub approval: Option<Approval>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Deterministic record key: `{userId}_{YYYY-MM-DD}`.
pub fn session_key(user_id: &str, date: NaiveDate) -> String {
    format!("{}_{}", user_id, date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_is_user_and_day() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(session_key("u-42", date), "u-42_2025-03-07");
    }

    #[test]
    fn session_key_zero_pads_month_and_day() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert_eq!(session_key("abc", date), "abc_2025-01-02");
    }
}
