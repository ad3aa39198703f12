//! Headless command-line driver for the tracker. Stands in for the
//! presentation layer: reads one command per line and prints the resulting
//! state.

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use timeclock::{
    history::{self, HistoryFilters, SortField, SortOrder},
    metrics, FixedIdentity, SessionStore, SessionTracker, SettingsStore, TrackerPhase,
    TrackerSnapshot,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let data_dir = std::env::var("TIMECLOCK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("timeclock-data"));
    std::fs::create_dir_all(&data_dir)?;

    let user = std::env::var("TIMECLOCK_USER").unwrap_or_else(|_| "local".to_string());

    let store = SessionStore::new(data_dir.join("timeclock.sqlite3"))?;
    let settings_store = SettingsStore::new(data_dir.join("settings.json"))?;
    let settings = settings_store.tracker();
    let target_hours = settings.daily_target_hours;

    let tracker = SessionTracker::new(store, Arc::new(FixedIdentity::new(user)), settings);

    let snapshot = tracker.reconcile().await?;
    print_status(&snapshot);
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = match line.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        let result = match command {
            "" => continue,
            "status" => Ok(print_status(&tracker.snapshot().await)),
            "in" => tracker.clock_in().await.map(|s| print_status(&s)),
            "out" => tracker.clock_out().await.map(|s| print_status(&s)),
            "resume" => tracker.cancel_submission().await.map(|s| print_status(&s)),
            "submit" => {
                let comment = (!rest.is_empty()).then_some(rest);
                tracker.submit(comment).await.map(|record| {
                    println!(
                        "submitted {} ({} productive hours, approval pending)",
                        record.id, record.productive_hours
                    );
                })
            }
            "delete" => tracker.delete_today().await.map(|s| print_status(&s)),
            "history" => match tracker.past_sessions().await {
                Ok(sessions) => {
                    print_history(&sessions, target_hours);
                    Ok(())
                }
                Err(err) => Err(err),
            },
            "help" => Ok(print_help()),
            "quit" | "exit" => break,
            other => {
                println!("unknown command '{other}' (try 'help')");
                continue;
            }
        };

        if let Err(err) = result {
            println!("error: {err}");
        }
    }

    Ok(())
}

fn print_status(snapshot: &TrackerSnapshot) {
    match snapshot.phase {
        TrackerPhase::Idle => println!("idle: no session today; 'in' to clock in"),
        TrackerPhase::Active => {
            println!(
                "active: {} elapsed | {} idle | {:.1}h productive | {}% efficiency | {} screenshots",
                metrics::format_elapsed(snapshot.elapsed_secs),
                metrics::format_duration(snapshot.idle_minutes),
                snapshot.productive_hours,
                snapshot.efficiency_percent,
                snapshot.screenshot_count,
            );
        }
        TrackerPhase::PendingSubmission => {
            println!(
                "pending submission: {} total | {} idle | {:.2}h productive{}",
                metrics::format_duration(snapshot.total_minutes),
                metrics::format_duration(snapshot.idle_minutes),
                snapshot.productive_hours,
                if snapshot.needs_comment {
                    " | justification required on submit"
                } else {
                    ""
                },
            );
        }
        TrackerPhase::Submitted => {
            if let Some(record) = &snapshot.submitted {
                let approval = record
                    .approval
                    .as_ref()
                    .map(|a| a.status.as_str())
                    .unwrap_or("Pending");
                println!(
                    "submitted for {}: {} total | {:.2}h productive | approval {} | 'delete' to restart the day",
                    record.date,
                    metrics::format_duration(record.total_minutes),
                    record.productive_hours,
                    approval,
                );
            }
        }
    }
}

fn print_history(sessions: &[timeclock::Session], target_hours: f64) {
    if sessions.is_empty() {
        println!("no past sessions");
        return;
    }

    let today = chrono::Local::now().date_naive();
    let mut rows = history::filter_sessions(
        sessions,
        &HistoryFilters::default(),
        today,
        target_hours,
    );
    history::sort_sessions(&mut rows, SortField::Date, SortOrder::Desc);

    for session in &rows {
        let approval = session
            .approval
            .as_ref()
            .map(|a| a.status.as_str())
            .unwrap_or("Pending");
        println!(
            "{} | {} total | {} idle | {:.2}h productive | {} shots | {}",
            session.date,
            metrics::format_duration(session.total_minutes),
            metrics::format_duration(session.idle_minutes),
            session.productive_hours,
            session.screenshots.len(),
            approval,
        );
    }
}

fn print_help() {
    println!("commands: status | in | out | resume | submit [comment] | delete | history | quit");
}
