use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Row};

use crate::models::{session_key, Approval, ApprovalStatus, Screenshot, Session};
use crate::store::{
    approval_status_from_str, parse_date, parse_datetime, state_from_str, to_i64, to_u64,
    SessionStore,
};

const SESSION_COLUMNS: &str = "id, user_id, date, clock_in, clock_out, total_minutes, \
     idle_minutes, productive_hours, idle_event_count, screenshots, state, \
     less_hours_comment, approval_status, approval_comment, approved_by, approved_at, \
     created_at, updated_at";

fn row_to_session(row: &Row) -> Result<Session> {
    let clock_in: String = row.get("clock_in")?;
    let clock_out: Option<String> = row.get("clock_out")?;
    let date: String = row.get("date")?;
    let state: String = row.get("state")?;
    let screenshots_json: String = row.get("screenshots")?;
    let approval_status: Option<String> = row.get("approval_status")?;
    let approved_at: Option<String> = row.get("approved_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    let screenshots: Vec<Screenshot> = serde_json::from_str(&screenshots_json)
        .map_err(|err| anyhow!("invalid screenshots payload: {err}"))?;

    let approval = match approval_status {
        Some(status) => Some(Approval {
            status: approval_status_from_str(&status)?,
            comment: row.get("approval_comment")?,
            approved_by: row.get("approved_by")?,
            approved_at: approved_at.as_deref().map(parse_datetime).transpose()?,
        }),
        None => None,
    };

    Ok(Session {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        date: parse_date(&date)?,
        clock_in: parse_datetime(&clock_in)?,
        clock_out: clock_out.as_deref().map(parse_datetime).transpose()?,
        total_minutes: to_u64(row.get("total_minutes")?)?,
        idle_minutes: to_u64(row.get("idle_minutes")?)?,
        productive_hours: row.get("productive_hours")?,
        idle_event_count: to_u64(row.get("idle_event_count")?)?,
        screenshots,
        state: state_from_str(&state)?,
        less_hours_comment: row.get("less_hours_comment")?,
        approval,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

impl SessionStore {
    /// Writes the full record, replacing any existing row for the same
    /// user/day key. The overwrite-not-append semantics are what make the
    /// one-session-per-day invariant hold across resubmissions.
    pub async fn upsert_session(&self, session: &Session) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            let screenshots = serde_json::to_string(&record.screenshots)
                .map_err(|err| anyhow!("failed to encode screenshots: {err}"))?;
            let approval = record.approval.as_ref();
            conn.execute(
                "INSERT INTO sessions (id, user_id, date, clock_in, clock_out, total_minutes, \
                     idle_minutes, productive_hours, idle_event_count, screenshots, state, \
                     less_hours_comment, approval_status, approval_comment, approved_by, \
                     approved_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                 ON CONFLICT(id) DO UPDATE SET
                     clock_in = excluded.clock_in,
                     clock_out = excluded.clock_out,
                     total_minutes = excluded.total_minutes,
                     idle_minutes = excluded.idle_minutes,
                     productive_hours = excluded.productive_hours,
                     idle_event_count = excluded.idle_event_count,
                     screenshots = excluded.screenshots,
                     state = excluded.state,
                     less_hours_comment = excluded.less_hours_comment,
                     approval_status = excluded.approval_status,
                     approval_comment = excluded.approval_comment,
                     approved_by = excluded.approved_by,
                     approved_at = excluded.approved_at,
                     updated_at = excluded.updated_at",
                params![
                    record.id,
                    record.user_id,
                    record.date.format("%Y-%m-%d").to_string(),
                    record.clock_in.to_rfc3339(),
                    record.clock_out.as_ref().map(|dt| dt.to_rfc3339()),
                    to_i64(record.total_minutes)?,
                    to_i64(record.idle_minutes)?,
                    record.productive_hours,
                    to_i64(record.idle_event_count)?,
                    screenshots,
                    record.state.as_str(),
                    record.less_hours_comment,
                    approval.map(|a| a.status.as_str()),
                    approval.and_then(|a| a.comment.clone()),
                    approval.and_then(|a| a.approved_by.clone()),
                    approval.and_then(|a| a.approved_at.map(|dt| dt.to_rfc3339())),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Point lookup by the composite key. A missing row is a normal
    /// "no session yet" signal, not an error.
    pub async fn get_session(&self, user_id: &str, date: NaiveDate) -> Result<Option<Session>> {
        let id = session_key(user_id, date);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
            ))?;

            let mut rows = stmt.query(params![id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_session(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// All of a user's sessions, newest date first.
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE user_id = ?1
                 ORDER BY date DESC"
            ))?;

            let mut rows = stmt.query(params![user_id])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }

    /// Sessions with `start <= date <= end`, newest date first.
    pub async fn get_sessions_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Session>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date DESC"
            ))?;

            let mut rows = stmt.query(params![
                user_id,
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string(),
            ])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }

    /// Removes a record. Deleting an already-absent id is not an error.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
            Ok(())
        })
        .await
    }

    /// Records a reviewer decision. Invoked by the external approval
    /// workflow, never by the lifecycle itself.
    pub async fn update_approval(
        &self,
        session_id: &str,
        status: ApprovalStatus,
        comment: Option<String>,
        reviewer: Option<String>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let now = Utc::now().to_rfc3339();
            let rows_affected = conn.execute(
                "UPDATE sessions
                 SET approval_status = ?1,
                     approval_comment = ?2,
                     approved_by = ?3,
                     approved_at = ?4,
                     updated_at = ?5
                 WHERE id = ?6",
                params![status.as_str(), comment, reviewer, now, now, session_id],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("session not found"));
            }

            Ok(())
        })
        .await
    }
}
