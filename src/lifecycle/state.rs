use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::models::{IdleEvent, Screenshot, Session};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackerPhase {
    /// No active session and no submission yet today.
    Idle,
    /// Timer running, accrual processes live.
    Active,
    /// Timer stopped, totals frozen, awaiting submit or resume.
    PendingSubmission,
    /// Today's record is persisted; terminal until deleted.
    Submitted,
}

impl Default for TrackerPhase {
    fn default() -> Self {
        TrackerPhase::Idle
    }
}

/// In-memory state for one day's tracking episode.
///
/// Elapsed time combines a baseline of earlier running windows with a
/// monotonic anchor for the current one, so stopping and resuming never
/// loses or double-counts seconds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerState {
    pub phase: TrackerPhase,
    pub user_id: Option<String>,
    /// The calendar day this episode covers, fixed at clock-in.
    pub date: Option<NaiveDate>,
    pub clock_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
    pub elapsed_secs: u64,
    pub idle_minutes: u64,
    pub idle_events: Vec<IdleEvent>,
    pub screenshots: Vec<Screenshot>,
    /// Today's persisted record, present only in the Submitted phase.
    pub submitted: Option<Session>,
    #[serde(skip)]
    pub elapsed_baseline_secs: u64,
    #[serde(skip)]
    pub running_anchor: Option<Instant>,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self {
            phase: TrackerPhase::Idle,
            user_id: None,
            date: None,
            clock_in: None,
            clock_out: None,
            elapsed_secs: 0,
            idle_minutes: 0,
            idle_events: Vec::new(),
            screenshots: Vec::new(),
            submitted: None,
            elapsed_baseline_secs: 0,
            running_anchor: None,
        }
    }
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_elapsed_secs(&self) -> u64 {
        if let (TrackerPhase::Active, Some(anchor)) = (self.phase, self.running_anchor) {
            self.elapsed_baseline_secs
                .saturating_add(anchor.elapsed().as_secs())
        } else {
            self.elapsed_secs
        }
    }

    pub fn sync_elapsed_from_anchor(&mut self) {
        if let (TrackerPhase::Active, Some(anchor)) = (self.phase, self.running_anchor) {
            self.elapsed_secs = self
                .elapsed_baseline_secs
                .saturating_add(anchor.elapsed().as_secs());
        }
    }

    /// Whole tracked minutes, floored from the elapsed tick count.
    pub fn total_minutes(&self) -> u64 {
        self.current_elapsed_secs() / 60
    }

    pub fn begin(
        &mut self,
        user_id: String,
        date: NaiveDate,
        clock_in: DateTime<Utc>,
        now: Instant,
    ) {
        *self = Self {
            phase: TrackerPhase::Active,
            user_id: Some(user_id),
            date: Some(date),
            clock_in: Some(clock_in),
            clock_out: None,
            elapsed_secs: 0,
            idle_minutes: 0,
            idle_events: Vec::new(),
            screenshots: Vec::new(),
            submitted: None,
            elapsed_baseline_secs: 0,
            running_anchor: Some(now),
        };
    }

    /// Clock-out: freezes the totals and stops the anchor.
    pub fn freeze(&mut self, clock_out: DateTime<Utc>) {
        self.sync_elapsed_from_anchor();
        self.phase = TrackerPhase::PendingSubmission;
        self.clock_out = Some(clock_out);
        self.running_anchor = None;
        self.elapsed_baseline_secs = self.elapsed_secs;
    }

    /// "Stopped by mistake, keep working": returns to Active keeping the
    /// elapsed seconds, idle events, and screenshots accrued so far.
    pub fn resume(&mut self, now: Instant) {
        self.phase = TrackerPhase::Active;
        self.clock_out = None;
        self.running_anchor = Some(now);
    }

    pub fn record_idle(&mut self, event: IdleEvent) {
        self.idle_minutes = self.idle_minutes.saturating_add(event.duration_minutes);
        self.idle_events.push(event);
    }

    pub fn record_screenshot(&mut self, screenshot: Screenshot) {
        self.screenshots.push(screenshot);
    }

    /// Submission succeeded: drop the accrual buffers, keep only the
    /// persisted record.
    pub fn mark_submitted(&mut self, record: Session) {
        *self = Self {
            phase: TrackerPhase::Submitted,
            user_id: Some(record.user_id.clone()),
            date: Some(record.date),
            submitted: Some(record),
            ..Self::default()
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
