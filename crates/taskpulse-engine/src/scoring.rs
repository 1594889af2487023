//! Scoring engine: per-task delay score and the member aggregate fold.

use taskpulse_core::error::Result;
use taskpulse_core::types::TaskRecord;
use taskpulse_store::MirrorDb;

/// Full marks for an on-time completion.
const ON_TIME_SCORE: f64 = 10.0;
/// Penalty per day late.
const LATE_PENALTY_PER_DAY: f64 = 0.5;

/// Compute the delay score for one task.
///
/// A manual override always wins. Otherwise the task must be completed,
/// carry a completion date, and have had a deadline; anything else is
/// unscorable. On-time completion earns full marks; each day late costs
/// half a point, floored at zero.
pub fn delay_score(task: &TaskRecord) -> Option<f64> {
    if let Some(v) = task.score_override {
        return Some(v);
    }
    if !task.completed {
        return None;
    }
    let completed_on = task.completed_on?;
    let deadline = task.deadline?.date_naive();

    if completed_on <= deadline {
        Some(ON_TIME_SCORE)
    } else {
        let days_late = (completed_on - deadline).num_days() as f64;
        Some((ON_TIME_SCORE - LATE_PENALTY_PER_DAY * days_late).max(0.0))
    }
}

/// Fold one task's score into its assignee's running average.
///
/// No-op when the task is unscorable or has no assignee. The store claims
/// `score_counted` and updates the aggregate in one transaction, so
/// concurrent passes credit each scoring event at most once. Returns
/// whether this call performed the fold.
pub fn credit_task(store: &MirrorDb, task: &TaskRecord) -> Result<bool> {
    let Some(score) = delay_score(task) else {
        return Ok(false);
    };
    let Some(member_id) = task.member_id.as_deref() else {
        tracing::debug!("Task '{}' scored {score} but has no assignee", task.title);
        return Ok(false);
    };
    store.credit_score(task.id, member_id, score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use taskpulse_core::types::TaskRecord;

    fn task(deadline_day: Option<u32>, completed_day: Option<u32>) -> TaskRecord {
        TaskRecord {
            id: 1,
            card_id: Some("card-1".into()),
            title: "t".into(),
            description: String::new(),
            deadline: deadline_day.map(|d| Utc.with_ymd_and_hms(2026, 3, d, 17, 0, 0).unwrap()),
            member_id: Some("m-1".into()),
            full_name: None,
            username: None,
            completed: completed_day.is_some(),
            completed_on: completed_day.map(|d| NaiveDate::from_ymd_opt(2026, 3, d).unwrap()),
            score_override: None,
            score_counted: false,
            assignment_notified: false,
            overdue_notified: false,
            escalation_notified: false,
            completion_notified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_on_time_full_marks() {
        assert_eq!(delay_score(&task(Some(10), Some(10))), Some(10.0));
        // early is still full marks
        assert_eq!(delay_score(&task(Some(10), Some(8))), Some(10.0));
    }

    #[test]
    fn test_three_days_late() {
        assert_eq!(delay_score(&task(Some(10), Some(13))), Some(8.5));
    }

    #[test]
    fn test_very_late_floors_at_zero() {
        // 30 days late: 10 - 15 → floored
        let mut t = task(Some(1), None);
        t.completed = true;
        t.completed_on = Some(NaiveDate::from_ymd_opt(2026, 3, 31).unwrap());
        assert_eq!(delay_score(&t), Some(0.0));
    }

    #[test]
    fn test_unscorable_states() {
        // not completed
        assert_eq!(delay_score(&task(Some(10), None)), None);
        // no deadline
        assert_eq!(delay_score(&task(None, Some(10))), None);
        // completed flag without a date
        let mut t = task(Some(10), None);
        t.completed = true;
        assert_eq!(delay_score(&t), None);
    }

    #[test]
    fn test_override_wins() {
        let mut t = task(Some(10), Some(13));
        t.score_override = Some(3.25);
        assert_eq!(delay_score(&t), Some(3.25));
        // even on an otherwise unscorable task
        let mut t = task(None, None);
        t.score_override = Some(7.0);
        assert_eq!(delay_score(&t), Some(7.0));
    }

    #[test]
    fn test_credit_task_roundtrip() {
        let dir = std::env::temp_dir().join("taskpulse-scoring-credit");
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        let db = MirrorDb::open(&dir.join("mirror.db")).unwrap();

        let (id, _) = db.upsert_snapshot("card-1", "t", "", None).unwrap();
        let mut t = task(Some(10), Some(13));
        t.id = id;

        assert!(credit_task(&db, &t).unwrap());
        let m = db.get_member("m-1").unwrap().unwrap();
        assert_eq!(m.historical_score, Some(8.5));
        assert_eq!(m.total_tasks_counted, 1);

        // the same scoring event never folds twice
        assert!(!credit_task(&db, &t).unwrap());
        assert_eq!(db.get_member("m-1").unwrap().unwrap().total_tasks_counted, 1);

        // unscorable and unassigned tasks are no-ops
        let mut bare = task(Some(10), None);
        bare.id = id;
        assert!(!credit_task(&db, &bare).unwrap());
        let mut nobody = task(Some(10), Some(10));
        nobody.id = id;
        nobody.member_id = None;
        assert!(!credit_task(&db, &nobody).unwrap());
        std::fs::remove_dir_all(&dir).ok();
    }
}
