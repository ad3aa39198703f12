//! Background accrual while a session is Active: randomized idle-event
//! simulation and fixed-interval screenshot simulation. Both loops share one
//! cancellation token so a clock-out stops them together, and every
//! application re-checks the phase under the lock so a tick that fires after
//! the transition is a no-op.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Duration},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{IdleEvent, Screenshot};
use crate::settings::TrackerSettings;

use super::state::{TrackerPhase, TrackerState};

pub struct AccrualController {
    handles: Vec<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl AccrualController {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
            cancel_token: None,
        }
    }

    pub fn start(
        &mut self,
        state: Arc<Mutex<TrackerState>>,
        settings: TrackerSettings,
        rng_seed: Option<u64>,
    ) -> Result<()> {
        // Loops exit on their own once the phase leaves Active; a finished
        // handle must not block the next session.
        self.handles.retain(|handle| !handle.is_finished());
        if !self.handles.is_empty() {
            bail!("accrual already active");
        }

        let cancel_token = CancellationToken::new();
        let rng = match rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        self.handles.push(tokio::spawn(idle_loop(
            state.clone(),
            settings.clone(),
            rng,
            cancel_token.clone(),
        )));
        self.handles.push(tokio::spawn(screenshot_loop(
            state,
            settings,
            cancel_token.clone(),
        )));

        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        for handle in self.handles.drain(..) {
            handle.await.context("accrual task failed to join")?;
        }
        Ok(())
    }
}

/// On each randomized check, records an idle event with some probability.
async fn idle_loop(
    state: Arc<Mutex<TrackerState>>,
    settings: TrackerSettings,
    mut rng: StdRng,
    cancel_token: CancellationToken,
) {
    loop {
        let wait_secs =
            rng.gen_range(settings.idle_check_min_secs..=settings.idle_check_max_secs);

        tokio::select! {
            _ = time::sleep(Duration::from_secs(wait_secs)) => {}
            _ = cancel_token.cancelled() => {
                debug!("idle accrual loop shutting down");
                break;
            }
        }

        if rng.gen::<f64>() >= settings.idle_probability {
            continue;
        }

        let duration_minutes =
            rng.gen_range(settings.idle_min_minutes..=settings.idle_max_minutes);
        let ended_at = Utc::now();
        let event = IdleEvent {
            id: Uuid::new_v4().to_string(),
            started_at: ended_at - ChronoDuration::minutes(duration_minutes as i64),
            ended_at,
            duration_minutes,
        };

        let mut guard = state.lock().await;
        if guard.phase != TrackerPhase::Active {
            break;
        }
        debug!("simulated idle event of {duration_minutes} min");
        guard.record_idle(event);
    }
}

/// Appends one opaque screenshot reference per interval.
async fn screenshot_loop(
    state: Arc<Mutex<TrackerState>>,
    settings: TrackerSettings,
    cancel_token: CancellationToken,
) {
    let period = Duration::from_secs(settings.screenshot_interval_secs);
    // First capture happens one full interval after clock-in.
    let mut ticker = time::interval_at(time::Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel_token.cancelled() => {
                debug!("screenshot accrual loop shutting down");
                break;
            }
        }

        let id = Uuid::new_v4().to_string();
        let screenshot = Screenshot {
            url: format!("https://picsum.photos/400/300?random={id}"),
            id,
            captured_at: Utc::now(),
        };

        let mut guard = state.lock().await;
        if guard.phase != TrackerPhase::Active {
            break;
        }
        guard.record_screenshot(screenshot);
    }
}
