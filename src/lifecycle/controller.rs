use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::{DateTime, Local, NaiveDate, Utc};
use log::{info, warn};
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Duration, Instant},
};

use crate::{
    error::TrackerError,
    identity::IdentityProvider,
    metrics,
    models::{session_key, Approval, Session, SessionState},
    settings::TrackerSettings,
    store::SessionStore,
};

use super::{
    accrual::AccrualController,
    state::{TrackerPhase, TrackerState},
};

/// Display-ready view of the tracker, with the derived metrics computed by
/// the same pure functions used for the frozen record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub phase: TrackerPhase,
    pub elapsed_secs: u64,
    pub total_minutes: u64,
    pub idle_minutes: u64,
    pub idle_event_count: usize,
    pub screenshot_count: usize,
    pub productive_hours: f64,
    pub efficiency_percent: i64,
    pub clock_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
    /// Whether submitting right now would require a justification comment.
    /// The same rule is re-checked inside `submit`.
    pub needs_comment: bool,
    pub submitted: Option<Session>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum TrackerEvent {
    StateChanged { snapshot: TrackerSnapshot },
    Heartbeat { snapshot: TrackerSnapshot },
    SessionSubmitted { session: Session },
    SessionDeleted { session_id: String },
}

/// Resets the in-flight flag when the store call finishes, whatever the
/// outcome.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the state machine for a single day's work session: clock-in,
/// periodic accrual, clock-out, comment-gated submission, deletion.
///
/// Driven by one logical actor at a time; guards are valid-from-state
/// checks, and persistence is serialized by a single in-flight flag rather
/// than locking.
#[derive(Clone)]
pub struct SessionTracker {
    state: Arc<Mutex<TrackerState>>,
    store: SessionStore,
    identity: Arc<dyn IdentityProvider>,
    settings: TrackerSettings,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    accrual: Arc<Mutex<AccrualController>>,
    events: broadcast::Sender<TrackerEvent>,
    store_in_flight: Arc<AtomicBool>,
    accrual_seed: Option<u64>,
}

impl SessionTracker {
    pub fn new(
        store: SessionStore,
        identity: Arc<dyn IdentityProvider>,
        settings: TrackerSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Arc::new(Mutex::new(TrackerState::new())),
            store,
            identity,
            settings,
            ticker: Arc::new(Mutex::new(None)),
            accrual: Arc::new(Mutex::new(AccrualController::new())),
            events,
            store_in_flight: Arc::new(AtomicBool::new(false)),
            accrual_seed: None,
        }
    }

    /// Pins the idle-simulation RNG, making accrual reproducible.
    pub fn with_accrual_seed(mut self, seed: u64) -> Self {
        self.accrual_seed = Some(seed);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    fn require_user(&self) -> Result<String, TrackerError> {
        self.identity
            .current_user_id()
            .ok_or(TrackerError::NotAuthenticated)
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    fn begin_in_flight(&self) -> Result<InFlightGuard<'_>, TrackerError> {
        self.store_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| TrackerError::OperationInFlight)?;
        Ok(InFlightGuard(&self.store_in_flight))
    }

    fn build_snapshot(&self, state: &TrackerState) -> TrackerSnapshot {
        let elapsed_secs = state.current_elapsed_secs();
        let total_minutes = state.total_minutes();
        let productive_hours = metrics::productive_hours(total_minutes, state.idle_minutes);
        TrackerSnapshot {
            phase: state.phase,
            elapsed_secs,
            total_minutes,
            idle_minutes: state.idle_minutes,
            idle_event_count: state.idle_events.len(),
            screenshot_count: state.screenshots.len(),
            productive_hours,
            efficiency_percent: metrics::efficiency_percent(elapsed_secs, state.idle_minutes),
            clock_in: state.clock_in,
            clock_out: state.clock_out,
            needs_comment: productive_hours < self.settings.daily_target_hours,
            submitted: state.submitted.clone(),
        }
    }

    pub async fn snapshot(&self) -> TrackerSnapshot {
        let mut guard = self.state.lock().await;
        guard.sync_elapsed_from_anchor();
        self.build_snapshot(&guard)
    }

    /// Startup reconciliation: before allowing a clock-in, adopt today's
    /// submitted record from the store if one exists.
    pub async fn reconcile(&self) -> Result<TrackerSnapshot, TrackerError> {
        let user_id = self.require_user()?;
        let today = Self::today();

        if let Some(record) = self.store.get_session(&user_id, today).await? {
            if record.state == SessionState::Submitted {
                info!("Found submitted session {} for today", record.id);
                let mut guard = self.state.lock().await;
                guard.mark_submitted(record);
            }
        }

        self.emit_state_changed().await;
        Ok(self.snapshot().await)
    }

    /// Starts a fresh session for today. Rejected if one was already
    /// submitted, locally or in the store.
    pub async fn clock_in(&self) -> Result<TrackerSnapshot, TrackerError> {
        let user_id = self.require_user()?;
        let today = Self::today();

        {
            let guard = self.state.lock().await;
            match guard.phase {
                TrackerPhase::Idle => {}
                TrackerPhase::Submitted => return Err(TrackerError::AlreadySubmittedToday),
                phase => {
                    return Err(TrackerError::InvalidTransition {
                        action: "clock in",
                        phase,
                    })
                }
            }
        }

        // The local phase can be stale in a fresh process; the store is the
        // authority on whether today was already submitted.
        if let Some(record) = self.store.get_session(&user_id, today).await? {
            if record.state == SessionState::Submitted {
                return Err(TrackerError::AlreadySubmittedToday);
            }
        }

        let clock_in = Utc::now();
        {
            let mut guard = self.state.lock().await;
            guard.begin(user_id.clone(), today, clock_in, Instant::now());
        }
        info!("Clocked in user {user_id} for {today}");

        self.start_background_work().await?;
        self.emit_state_changed().await;
        Ok(self.snapshot().await)
    }

    /// Stops the timer, freezes the totals, and halts accrual. The session
    /// is not persisted until `submit`.
    pub async fn clock_out(&self) -> Result<TrackerSnapshot, TrackerError> {
        {
            let mut guard = self.state.lock().await;
            if guard.phase != TrackerPhase::Active {
                return Err(TrackerError::InvalidTransition {
                    action: "clock out",
                    phase: guard.phase,
                });
            }
            guard.freeze(Utc::now());
        }

        self.stop_background_work().await;
        info!("Clocked out; awaiting submission");

        self.emit_state_changed().await;
        Ok(self.snapshot().await)
    }

    /// "Stopped by mistake, keep working": returns from PendingSubmission to
    /// Active and resumes accrual with all buffers intact.
    pub async fn cancel_submission(&self) -> Result<TrackerSnapshot, TrackerError> {
        {
            let mut guard = self.state.lock().await;
            if guard.phase != TrackerPhase::PendingSubmission {
                return Err(TrackerError::InvalidTransition {
                    action: "resume working",
                    phase: guard.phase,
                });
            }
            guard.resume(Instant::now());
        }

        self.start_background_work().await?;
        self.emit_state_changed().await;
        Ok(self.snapshot().await)
    }

    /// Persists the frozen session. A justification comment of at least the
    /// configured length is required when productive hours fall under the
    /// daily target. On store failure the phase stays PendingSubmission so
    /// the user can retry.
    pub async fn submit(&self, comment: Option<&str>) -> Result<Session, TrackerError> {
        let record = {
            let guard = self.state.lock().await;
            if guard.phase != TrackerPhase::PendingSubmission {
                return Err(TrackerError::InvalidTransition {
                    action: "submit",
                    phase: guard.phase,
                });
            }

            let total_minutes = guard.total_minutes();
            let idle_minutes = guard.idle_minutes;
            let productive_hours = metrics::productive_hours(total_minutes, idle_minutes);

            let trimmed = comment
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            if productive_hours < self.settings.daily_target_hours {
                let long_enough = trimmed
                    .as_deref()
                    .map(|c| c.chars().count() >= self.settings.min_comment_len)
                    .unwrap_or(false);
                if !long_enough {
                    return Err(TrackerError::MissingJustification {
                        min_len: self.settings.min_comment_len,
                    });
                }
            }

            let user_id = guard
                .user_id
                .clone()
                .ok_or_else(|| TrackerError::InvalidTransition {
                    action: "submit",
                    phase: guard.phase,
                })?;
            let date = guard.date.unwrap_or_else(Self::today);
            let clock_in = guard.clock_in.unwrap_or_else(Utc::now);
            let now = Utc::now();

            Session {
                id: session_key(&user_id, date),
                user_id,
                date,
                clock_in,
                clock_out: guard.clock_out,
                total_minutes,
                idle_minutes,
                productive_hours,
                idle_event_count: guard.idle_events.len() as u64,
                screenshots: guard.screenshots.clone(),
                state: SessionState::Submitted,
                less_hours_comment: trimmed,
                approval: Some(Approval::pending()),
                created_at: now,
                updated_at: now,
            }
        };

        let _in_flight = self.begin_in_flight()?;
        if let Err(err) = self.store.upsert_session(&record).await {
            warn!("Failed to persist session {}: {err:#}", record.id);
            return Err(TrackerError::Persistence(err));
        }

        {
            let mut guard = self.state.lock().await;
            guard.mark_submitted(record.clone());
        }
        // A resume may have restarted the accrual loops while the store call
        // was in flight; the phase just left Active, so shut them down.
        self.stop_background_work().await;
        info!("Submitted session {}", record.id);

        self.emit_state_changed().await;
        let _ = self.events.send(TrackerEvent::SessionSubmitted {
            session: record.clone(),
        });

        Ok(record)
    }

    /// Deletes today's submitted record, returning to Idle so the day can be
    /// restarted. On store failure the summary stays intact for retry.
    pub async fn delete_today(&self) -> Result<TrackerSnapshot, TrackerError> {
        let session_id = {
            let guard = self.state.lock().await;
            match (&guard.phase, &guard.submitted) {
                (TrackerPhase::Submitted, Some(record)) => record.id.clone(),
                _ => {
                    return Err(TrackerError::InvalidTransition {
                        action: "delete today's session",
                        phase: guard.phase,
                    })
                }
            }
        };

        let _in_flight = self.begin_in_flight()?;
        if let Err(err) = self.store.delete_session(&session_id).await {
            warn!("Failed to delete session {session_id}: {err:#}");
            return Err(TrackerError::Persistence(err));
        }

        {
            let mut guard = self.state.lock().await;
            guard.reset();
        }
        info!("Deleted session {session_id}; day can be restarted");

        self.emit_state_changed().await;
        let _ = self.events.send(TrackerEvent::SessionDeleted { session_id });

        Ok(self.snapshot().await)
    }

    /// All of the current user's persisted sessions, newest first.
    pub async fn past_sessions(&self) -> Result<Vec<Session>, TrackerError> {
        let user_id = self.require_user()?;
        Ok(self.store.list_sessions(&user_id).await?)
    }

    async fn start_background_work(&self) -> Result<(), TrackerError> {
        self.accrual
            .lock()
            .await
            .start(self.state.clone(), self.settings.clone(), self.accrual_seed)
            .map_err(TrackerError::Persistence)?;
        self.spawn_ticker().await;
        Ok(())
    }

    async fn stop_background_work(&self) {
        if let Err(err) = self.accrual.lock().await.stop().await {
            warn!("Failed to stop accrual loops: {err:#}");
        }
        self.cancel_ticker().await;
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let heartbeat_every = self.settings.heartbeat_every_ticks.max(1);
        let tracker = self.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(1));
            let mut ticks: u32 = 0;
            loop {
                interval.tick().await;

                let snapshot = {
                    let mut guard = tracker.state.lock().await;
                    if guard.phase != TrackerPhase::Active {
                        break;
                    }
                    guard.sync_elapsed_from_anchor();
                    tracker.build_snapshot(&guard)
                };

                ticks = ticks.wrapping_add(1);
                if ticks % heartbeat_every == 0 {
                    let _ = tracker.events.send(TrackerEvent::Heartbeat { snapshot });
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    async fn emit_state_changed(&self) {
        let snapshot = self.snapshot().await;
        let _ = self.events.send(TrackerEvent::StateChanged { snapshot });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::FixedIdentity;
    use crate::models::{ApprovalStatus, IdleEvent};
    use tempfile::TempDir;

    const USER: &str = "u-1";

    // A single large jump skips over deadlines the accrual loops register
    // along the way; stepping one second at a time lets every sleep fire.
    // Sleeping (rather than advancing) parks the paused runtime so woken
    // loop tasks are polled before the next step.
    async fn advance_secs(total: u64) {
        for _ in 0..total {
            time::sleep(Duration::from_secs(1)).await;
        }
    }

    fn quiet_settings() -> TrackerSettings {
        // No random idle events; tests inject idle time explicitly.
        TrackerSettings {
            idle_probability: 0.0,
            idle_check_min_secs: 300,
            idle_check_max_secs: 300,
            ..TrackerSettings::default()
        }
    }

    fn tracker_at(dir: &TempDir) -> SessionTracker {
        let store = SessionStore::new(dir.path().join("test.sqlite3")).expect("store");
        SessionTracker::new(store, Arc::new(FixedIdentity::new(USER)), quiet_settings())
            .with_accrual_seed(7)
    }

    async fn inject_idle(tracker: &SessionTracker, minutes: u64) {
        let ended_at = Utc::now();
        let event = IdleEvent {
            id: format!("idle-{minutes}"),
            started_at: ended_at - chrono::Duration::minutes(minutes as i64),
            ended_at,
            duration_minutes: minutes,
        };
        tracker.state.lock().await.record_idle(event);
    }

    #[tokio::test(start_paused = true)]
    async fn full_day_scenario_matches_expected_metrics() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker_at(&dir);

        tracker.clock_in().await.unwrap();
        inject_idle(&tracker, 45).await;
        time::advance(Duration::from_secs(480 * 60)).await;

        let snapshot = tracker.clock_out().await.unwrap();
        assert_eq!(snapshot.phase, TrackerPhase::PendingSubmission);
        assert_eq!(snapshot.total_minutes, 480);
        assert_eq!(snapshot.idle_minutes, 45);
        assert_eq!(snapshot.productive_hours, 7.25);
        assert!(snapshot.needs_comment);

        // Under the target: no comment and a short comment are both rejected.
        assert!(matches!(
            tracker.submit(None).await,
            Err(TrackerError::MissingJustification { .. })
        ));
        assert!(matches!(
            tracker.submit(Some("Dr. appt")).await,
            Err(TrackerError::MissingJustification { .. })
        ));

        let record = tracker
            .submit(Some("Had a doctor appointment in the afternoon"))
            .await
            .unwrap();
        assert_eq!(record.total_minutes, 480);
        assert_eq!(record.idle_minutes, 45);
        assert_eq!(record.productive_hours, 7.25);
        assert_eq!(record.state, SessionState::Submitted);
        assert_eq!(
            record.approval.as_ref().map(|a| a.status),
            Some(ApprovalStatus::Pending)
        );
        assert_eq!(
            record.less_hours_comment.as_deref(),
            Some("Had a doctor appointment in the afternoon")
        );

        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.phase, TrackerPhase::Submitted);
    }

    #[tokio::test(start_paused = true)]
    async fn full_target_day_needs_no_comment() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker_at(&dir);

        tracker.clock_in().await.unwrap();
        time::advance(Duration::from_secs(8 * 3600)).await;
        let snapshot = tracker.clock_out().await.unwrap();
        assert_eq!(snapshot.productive_hours, 8.0);
        assert!(!snapshot.needs_comment);

        let record = tracker.submit(None).await.unwrap();
        assert_eq!(record.productive_hours, 8.0);
        assert!(record.less_hours_comment.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn guards_reject_out_of_phase_commands() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker_at(&dir);

        assert!(matches!(
            tracker.clock_out().await,
            Err(TrackerError::InvalidTransition { .. })
        ));
        assert!(matches!(
            tracker.submit(Some("some long explanation")).await,
            Err(TrackerError::InvalidTransition { .. })
        ));
        assert!(matches!(
            tracker.delete_today().await,
            Err(TrackerError::InvalidTransition { .. })
        ));
        // Nothing was written by the rejected commands.
        assert!(tracker.past_sessions().await.unwrap().is_empty());

        tracker.clock_in().await.unwrap();
        assert!(matches!(
            tracker.clock_in().await,
            Err(TrackerError::InvalidTransition { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_submission_resumes_the_same_episode() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker_at(&dir);

        tracker.clock_in().await.unwrap();
        time::advance(Duration::from_secs(60)).await;
        tracker.clock_out().await.unwrap();

        let resumed = tracker.cancel_submission().await.unwrap();
        assert_eq!(resumed.phase, TrackerPhase::Active);
        assert!(resumed.clock_out.is_none());

        time::advance(Duration::from_secs(60)).await;
        let snapshot = tracker.clock_out().await.unwrap();
        assert_eq!(snapshot.elapsed_secs, 120);
        assert_eq!(snapshot.total_minutes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clock_in_is_blocked_while_today_is_submitted() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker_at(&dir);

        tracker.clock_in().await.unwrap();
        time::advance(Duration::from_secs(9 * 3600)).await;
        tracker.clock_out().await.unwrap();
        tracker.submit(None).await.unwrap();

        assert!(matches!(
            tracker.clock_in().await,
            Err(TrackerError::AlreadySubmittedToday)
        ));

        // A fresh tracker over the same store learns it from persistence.
        let other = tracker_at_store(&tracker.store);
        assert!(matches!(
            other.clock_in().await,
            Err(TrackerError::AlreadySubmittedToday)
        ));
    }

    fn tracker_at_store(store: &SessionStore) -> SessionTracker {
        SessionTracker::new(
            store.clone(),
            Arc::new(FixedIdentity::new(USER)),
            quiet_settings(),
        )
        .with_accrual_seed(7)
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_adopts_todays_submitted_record() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker_at(&dir);

        tracker.clock_in().await.unwrap();
        time::advance(Duration::from_secs(9 * 3600)).await;
        tracker.clock_out().await.unwrap();
        let record = tracker.submit(None).await.unwrap();

        let restarted = tracker_at_store(&tracker.store);
        let snapshot = restarted.reconcile().await.unwrap();
        assert_eq!(snapshot.phase, TrackerPhase::Submitted);
        assert_eq!(snapshot.submitted.as_ref().map(|s| s.id.as_str()), Some(record.id.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn delete_and_resubmit_keeps_one_record_per_day() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker_at(&dir);

        for cycle in 0..3u64 {
            tracker.clock_in().await.unwrap();
            time::advance(Duration::from_secs(9 * 3600)).await;
            tracker.clock_out().await.unwrap();
            tracker.submit(None).await.unwrap();

            let sessions = tracker.past_sessions().await.unwrap();
            assert_eq!(sessions.len(), 1, "cycle {cycle}");

            if cycle < 2 {
                let snapshot = tracker.delete_today().await.unwrap();
                assert_eq!(snapshot.phase, TrackerPhase::Idle);
                assert!(tracker.past_sessions().await.unwrap().is_empty());
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn accrual_halts_outside_active() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("test.sqlite3")).unwrap();
        let settings = TrackerSettings {
            idle_probability: 1.0,
            idle_check_min_secs: 60,
            idle_check_max_secs: 60,
            screenshot_interval_secs: 120,
            ..TrackerSettings::default()
        };
        let tracker =
            SessionTracker::new(store, Arc::new(FixedIdentity::new(USER)), settings)
                .with_accrual_seed(7);

        tracker.clock_in().await.unwrap();
        advance_secs(10 * 60 + 1).await;
        let frozen = tracker.clock_out().await.unwrap();
        assert!(frozen.idle_event_count > 0);
        assert!(frozen.screenshot_count > 0);

        time::advance(Duration::from_secs(60 * 60)).await;
        let later = tracker.snapshot().await;
        assert_eq!(later.idle_event_count, frozen.idle_event_count);
        assert_eq!(later.screenshot_count, frozen.screenshot_count);
        assert_eq!(later.elapsed_secs, frozen.elapsed_secs);
    }

    #[tokio::test(start_paused = true)]
    async fn clock_in_recovers_when_a_submission_races_a_resume() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("test.sqlite3")).unwrap();
        let settings = TrackerSettings {
            idle_probability: 0.0,
            idle_check_min_secs: 60,
            idle_check_max_secs: 60,
            screenshot_interval_secs: 60,
            ..TrackerSettings::default()
        };
        let tracker =
            SessionTracker::new(store, Arc::new(FixedIdentity::new(USER)), settings)
                .with_accrual_seed(7);

        tracker.clock_in().await.unwrap();
        time::advance(Duration::from_secs(9 * 3600)).await;
        tracker.clock_out().await.unwrap();
        tracker.cancel_submission().await.unwrap();

        // A submission that was in flight when the resume happened lands
        // now: the phase flips away from Active while the accrual loops are
        // still running, and they wind down on their own.
        let date = Local::now().date_naive();
        let now = Utc::now();
        let record = Session {
            id: session_key(USER, date),
            user_id: USER.into(),
            date,
            clock_in: now,
            clock_out: Some(now),
            total_minutes: 540,
            idle_minutes: 0,
            productive_hours: 9.0,
            idle_event_count: 0,
            screenshots: Vec::new(),
            state: SessionState::Submitted,
            less_hours_comment: None,
            approval: Some(Approval::pending()),
            created_at: now,
            updated_at: now,
        };
        tracker.state.lock().await.mark_submitted(record);
        advance_secs(61).await;

        tracker.delete_today().await.unwrap();
        tracker
            .clock_in()
            .await
            .expect("a wound-down accrual must not block the next session");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_submit_leaves_the_phase_for_retry() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker_at(&dir);

        tracker.clock_in().await.unwrap();
        time::advance(Duration::from_secs(8 * 3600)).await;
        tracker.clock_out().await.unwrap();

        tracker.store.shut_down_worker();
        assert!(matches!(
            tracker.submit(None).await,
            Err(TrackerError::Persistence(_))
        ));

        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.phase, TrackerPhase::PendingSubmission);
        assert_eq!(snapshot.total_minutes, 480);

        // The in-flight flag was released; a retry reaches the store again.
        assert!(matches!(
            tracker.submit(None).await,
            Err(TrackerError::Persistence(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_delete_keeps_todays_record() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker_at(&dir);

        tracker.clock_in().await.unwrap();
        time::advance(Duration::from_secs(8 * 3600)).await;
        tracker.clock_out().await.unwrap();
        let record = tracker.submit(None).await.unwrap();

        tracker.store.shut_down_worker();
        assert!(matches!(
            tracker.delete_today().await,
            Err(TrackerError::Persistence(_))
        ));

        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.phase, TrackerPhase::Submitted);
        assert_eq!(
            snapshot.submitted.as_ref().map(|s| s.id.as_str()),
            Some(record.id.as_str())
        );
    }
}
