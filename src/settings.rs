use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Tunables for the session lifecycle and the simulated accrual processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerSettings {
    /// Productive-hours goal; submissions under it require a justification.
    pub daily_target_hours: f64,
    /// Minimum trimmed length of a required justification comment.
    pub min_comment_len: usize,
    /// Bounds for the randomized idle-check interval.
    pub idle_check_min_secs: u64,
    pub idle_check_max_secs: u64,
    /// Chance that a given idle check records an idle event.
    pub idle_probability: f64,
    /// Bounds for a recorded idle event's duration.
    pub idle_min_minutes: u64,
    pub idle_max_minutes: u64,
    /// Fixed cadence of simulated screenshot captures.
    pub screenshot_interval_secs: u64,
    /// Heartbeat event cadence, in 1-second ticks.
    pub heartbeat_every_ticks: u32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            daily_target_hours: 8.0,
            min_comment_len: 10,
            idle_check_min_secs: 120,
            idle_check_max_secs: 300,
            idle_probability: 0.3,
            idle_min_minutes: 2,
            idle_max_minutes: 9,
            screenshot_interval_secs: 600,
            heartbeat_every_ticks: 10,
        }
    }
}

/// JSON-file-backed settings, loaded once and kept behind a read-write lock.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<TrackerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            TrackerSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn tracker(&self) -> TrackerSettings {
        self.data.read().unwrap().clone()
    }

    pub fn update_tracker(&self, settings: TrackerSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            *guard = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &TrackerSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
