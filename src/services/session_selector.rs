use chrono::NaiveDateTime;

use crate::models::session::{ClassSession, SessionStatus};

fn is_candidate(session: &ClassSession, now: NaiveDateTime) -> bool {
    session.date == now.date() && session.status.is_open()
}

fn within_window(session: &ClassSession, now: NaiveDateTime) -> bool {
    session.starts_at() <= now && now <= session.ends_at()
}

/// Picks the session attendance should currently be recorded against.
///
/// Only today's scheduled or running sessions with `start <= now <= end`
/// qualify, both ends inclusive. A session already marked in progress wins;
/// otherwise the earliest start does.
pub fn select_active(sessions: &[ClassSession], now: NaiveDateTime) -> Option<&ClassSession> {
    sessions
        .iter()
        .filter(|s| is_candidate(s, now) && within_window(s, now))
        .min_by_key(|s| (s.status != SessionStatus::InProgress, s.starts_at(), s.id))
}

/// Today's sessions that have not started yet, soonest first
pub fn upcoming(sessions: &[ClassSession], now: NaiveDateTime) -> Vec<&ClassSession> {
    let mut later: Vec<&ClassSession> = sessions
        .iter()
        .filter(|s| is_candidate(s, now) && s.starts_at() > now)
        .collect();
    later.sort_by_key(|s| (s.starts_at(), s.id));
    later
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::SessionType;
    use crate::models::Amount;
    use chrono::{Duration, NaiveDate, NaiveTime};

    fn session(id: i64, start: (u32, u32), end: (u32, u32), status: SessionStatus) -> ClassSession {
        ClassSession {
            id,
            schedule: None,
            teacher: 1,
            student: None,
            group: Some(1),
            date: NaiveDate::from_ymd_opt(2024, 10, 7).unwrap(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            session_type: SessionType::Group,
            payment: Amount::default(),
            status,
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 7)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_window_is_start_through_end() {
        let sessions = vec![session(1, (10, 0), (11, 0), SessionStatus::Scheduled)];
        assert!(select_active(&sessions, at(9, 59)).is_none());
        assert_eq!(select_active(&sessions, at(10, 0)).map(|s| s.id), Some(1));
        assert_eq!(select_active(&sessions, at(11, 0)).map(|s| s.id), Some(1));
        assert!(select_active(&sessions, at(11, 1)).is_none());
    }

    #[test]
    fn test_in_progress_preferred_and_closed_skipped() {
        let sessions = vec![
            session(1, (9, 0), (10, 30), SessionStatus::Cancelled),
            session(2, (9, 0), (10, 30), SessionStatus::Scheduled),
            session(3, (9, 30), (10, 30), SessionStatus::InProgress),
        ];
        assert_eq!(select_active(&sessions, at(9, 40)).map(|s| s.id), Some(3));

        let without_running = &sessions[..2];
        assert_eq!(select_active(without_running, at(9, 40)).map(|s| s.id), Some(2));
    }

    #[test]
    fn test_other_days_ignored() {
        let sessions = vec![session(1, (9, 0), (10, 0), SessionStatus::Scheduled)];
        let tomorrow = at(9, 30) + Duration::days(1);
        assert!(select_active(&sessions, tomorrow).is_none());
        assert!(upcoming(&sessions, tomorrow).is_empty());
    }

    #[test]
    fn test_upcoming_sorted() {
        let sessions = vec![
            session(1, (14, 0), (15, 0), SessionStatus::Scheduled),
            session(2, (11, 0), (12, 0), SessionStatus::Scheduled),
            session(3, (8, 0), (9, 0), SessionStatus::Completed),
        ];
        let ids: Vec<i64> = upcoming(&sessions, at(10, 0)).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
