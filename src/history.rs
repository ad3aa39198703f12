//! Filtering and sorting for the past-sessions view. Pure functions over
//! already-loaded records; the store handles the per-user query itself.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{ApprovalStatus, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusFilter {
    All,
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateRangeFilter {
    All,
    Week,
    Month,
    Quarter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HoursFilter {
    All,
    /// Productive hours at or above the daily target.
    Full,
    /// Productive hours below the daily target.
    Partial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryFilters {
    pub status: StatusFilter,
    pub date_range: DateRangeFilter,
    pub hours_range: HoursFilter,
    /// Free-text match against the date and both comment fields.
    pub search: Option<String>,
}

impl Default for HistoryFilters {
    fn default() -> Self {
        Self {
            status: StatusFilter::All,
            date_range: DateRangeFilter::All,
            hours_range: HoursFilter::All,
            search: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Date,
    Hours,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    Asc,
    Desc,
}

fn approval_status(session: &Session) -> ApprovalStatus {
    session
        .approval
        .as_ref()
        .map(|a| a.status)
        .unwrap_or(ApprovalStatus::Pending)
}

fn status_rank(status: ApprovalStatus) -> u8 {
    match status {
        ApprovalStatus::Approved => 3,
        ApprovalStatus::Pending => 2,
        ApprovalStatus::Rejected => 1,
    }
}

fn matches_search(session: &Session, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    if session
        .date
        .format("%Y-%m-%d")
        .to_string()
        .contains(&needle)
    {
        return true;
    }
    let comment_matches = |comment: &Option<String>| {
        comment
            .as_deref()
            .map(|c| c.to_lowercase().contains(&needle))
            .unwrap_or(false)
    };
    comment_matches(&session.less_hours_comment)
        || session
            .approval
            .as_ref()
            .map(|a| comment_matches(&a.comment))
            .unwrap_or(false)
}

pub fn filter_sessions(
    sessions: &[Session],
    filters: &HistoryFilters,
    today: NaiveDate,
    target_hours: f64,
) -> Vec<Session> {
    sessions
        .iter()
        .filter(|session| {
            let status = approval_status(session);
            let status_ok = match filters.status {
                StatusFilter::All => true,
                StatusFilter::Pending => status == ApprovalStatus::Pending,
                StatusFilter::Approved => status == ApprovalStatus::Approved,
                StatusFilter::Rejected => status == ApprovalStatus::Rejected,
            };
            if !status_ok {
                return false;
            }

            let hours_ok = match filters.hours_range {
                HoursFilter::All => true,
                HoursFilter::Full => session.productive_hours >= target_hours,
                HoursFilter::Partial => session.productive_hours < target_hours,
            };
            if !hours_ok {
                return false;
            }

            let cutoff = match filters.date_range {
                DateRangeFilter::All => None,
                DateRangeFilter::Week => Some(today - Duration::days(7)),
                DateRangeFilter::Month => Some(today - Duration::days(30)),
                DateRangeFilter::Quarter => Some(today - Duration::days(90)),
            };
            if let Some(cutoff) = cutoff {
                if session.date < cutoff {
                    return false;
                }
            }

            match filters.search.as_deref() {
                Some(needle) if !needle.trim().is_empty() => {
                    matches_search(session, needle.trim())
                }
                _ => true,
            }
        })
        .cloned()
        .collect()
}

pub fn sort_sessions(sessions: &mut [Session], field: SortField, order: SortOrder) {
    sessions.sort_by(|a, b| {
        let ordering = match field {
            SortField::Date => a.date.cmp(&b.date),
            SortField::Hours => a
                .productive_hours
                .partial_cmp(&b.productive_hours)
                .unwrap_or(std::cmp::Ordering::Equal),
            SortField::Status => {
                status_rank(approval_status(a)).cmp(&status_rank(approval_status(b)))
            }
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{session_key, Approval, SessionState};
    use chrono::{TimeZone, Utc};

    fn session(date: NaiveDate, hours: f64, status: Option<ApprovalStatus>) -> Session {
        let clock_in = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        Session {
            id: session_key("u-1", date),
            user_id: "u-1".into(),
            date,
            clock_in,
            clock_out: Some(clock_in),
            total_minutes: (hours * 60.0) as u64,
            idle_minutes: 0,
            productive_hours: hours,
            idle_event_count: 0,
            screenshots: Vec::new(),
            state: SessionState::Submitted,
            less_hours_comment: None,
            approval: status.map(|s| Approval {
                status: s,
                comment: None,
                approved_by: None,
                approved_at: None,
            }),
            created_at: clock_in,
            updated_at: clock_in,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn status_filter_treats_missing_approval_as_pending() {
        let sessions = vec![
            session(day(2025, 3, 1), 8.0, None),
            session(day(2025, 3, 2), 8.0, Some(ApprovalStatus::Approved)),
            session(day(2025, 3, 3), 8.0, Some(ApprovalStatus::Rejected)),
        ];
        let filters = HistoryFilters {
            status: StatusFilter::Pending,
            ..Default::default()
        };

        let kept = filter_sessions(&sessions, &filters, day(2025, 3, 10), 8.0);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].date, day(2025, 3, 1));
    }

    #[test]
    fn hours_filter_splits_on_the_target() {
        let sessions = vec![
            session(day(2025, 3, 1), 7.9, None),
            session(day(2025, 3, 2), 8.0, None),
            session(day(2025, 3, 3), 9.5, None),
        ];

        let full = filter_sessions(
            &sessions,
            &HistoryFilters {
                hours_range: HoursFilter::Full,
                ..Default::default()
            },
            day(2025, 3, 10),
            8.0,
        );
        assert_eq!(full.len(), 2);

        let partial = filter_sessions(
            &sessions,
            &HistoryFilters {
                hours_range: HoursFilter::Partial,
                ..Default::default()
            },
            day(2025, 3, 10),
            8.0,
        );
        assert_eq!(partial.len(), 1);
        assert_eq!(partial[0].date, day(2025, 3, 1));
    }

    #[test]
    fn week_filter_keeps_only_recent_days() {
        let sessions = vec![
            session(day(2025, 3, 1), 8.0, None),
            session(day(2025, 3, 9), 8.0, None),
        ];
        let filters = HistoryFilters {
            date_range: DateRangeFilter::Week,
            ..Default::default()
        };

        let kept = filter_sessions(&sessions, &filters, day(2025, 3, 10), 8.0);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].date, day(2025, 3, 9));
    }

    #[test]
    fn search_matches_date_and_comments() {
        let mut with_comment = session(day(2025, 3, 5), 6.0, None);
        with_comment.less_hours_comment = Some("Had a Doctor appointment".into());
        let sessions = vec![with_comment, session(day(2025, 4, 1), 8.0, None)];

        let by_comment = filter_sessions(
            &sessions,
            &HistoryFilters {
                search: Some("doctor".into()),
                ..Default::default()
            },
            day(2025, 4, 10),
            8.0,
        );
        assert_eq!(by_comment.len(), 1);
        assert_eq!(by_comment[0].date, day(2025, 3, 5));

        let by_date = filter_sessions(
            &sessions,
            &HistoryFilters {
                search: Some("2025-04".into()),
                ..Default::default()
            },
            day(2025, 4, 10),
            8.0,
        );
        assert_eq!(by_date.len(), 1);
        assert_eq!(by_date[0].date, day(2025, 4, 1));
    }

    #[test]
    fn sorts_by_hours_in_both_orders() {
        let mut sessions = vec![
            session(day(2025, 3, 1), 8.0, None),
            session(day(2025, 3, 2), 6.0, None),
            session(day(2025, 3, 3), 9.0, None),
        ];

        sort_sessions(&mut sessions, SortField::Hours, SortOrder::Asc);
        let hours: Vec<f64> = sessions.iter().map(|s| s.productive_hours).collect();
        assert_eq!(hours, vec![6.0, 8.0, 9.0]);

        sort_sessions(&mut sessions, SortField::Hours, SortOrder::Desc);
        let hours: Vec<f64> = sessions.iter().map(|s| s.productive_hours).collect();
        assert_eq!(hours, vec![9.0, 8.0, 6.0]);
    }

    #[test]
    fn sorts_by_status_rank() {
        let mut sessions = vec![
            session(day(2025, 3, 1), 8.0, Some(ApprovalStatus::Rejected)),
            session(day(2025, 3, 2), 8.0, Some(ApprovalStatus::Approved)),
            session(day(2025, 3, 3), 8.0, Some(ApprovalStatus::Pending)),
        ];

        sort_sessions(&mut sessions, SortField::Status, SortOrder::Desc);
        let statuses: Vec<ApprovalStatus> =
            sessions.iter().map(|s| s.approval.as_ref().unwrap().status).collect();
        assert_eq!(
            statuses,
            vec![
                ApprovalStatus::Approved,
                ApprovalStatus::Pending,
                ApprovalStatus::Rejected
            ]
        );
    }
}
