//! The shared data model: mirrored tasks and scored members.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A unit of tracked work, mirrored from one external board card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Local row id.
    pub id: i64,
    /// External board card id. Stable and unique; null only for tasks
    /// created locally before their first push to the board.
    pub card_id: Option<String>,
    pub title: String,
    pub description: String,
    pub deadline: Option<DateTime<Utc>>,
    /// First member on the card. Multi-assignee cards are not supported;
    /// only the first member is tracked.
    pub member_id: Option<String>,
    /// Cached display name, filled by member enrichment.
    pub full_name: Option<String>,
    /// Cached handle, filled by member enrichment.
    pub username: Option<String>,
    pub completed: bool,
    /// Set when `completed` transitions true, cleared when it transitions
    /// false. Defined iff `completed` is true.
    pub completed_on: Option<NaiveDate>,
    /// Manual score, takes precedence over the computed delay score.
    pub score_override: Option<f64>,
    /// True once this task's score has been folded into its assignee's
    /// running aggregate.
    pub score_counted: bool,
    pub assignment_notified: bool,
    pub overdue_notified: bool,
    pub escalation_notified: bool,
    pub completion_notified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Display name for the assignee, falling back to the handle and then
    /// the raw member id.
    pub fn assignee_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.username.as_deref().filter(|s| !s.is_empty()))
            .or(self.member_id.as_deref())
            .unwrap_or("unassigned")
    }
}

/// An external assignee with a derived running score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRecord {
    /// External member id, unique.
    pub member_id: String,
    pub email: String,
    pub full_name: String,
    pub username: String,
    /// Running mean of every score folded in so far; null until the first
    /// fold. Updated incrementally, never recomputed from scratch.
    pub historical_score: Option<f64>,
    /// Number of folds behind `historical_score`.
    pub total_tasks_counted: i64,
}

/// The four at-most-once notification conditions, one flag column each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Assignment,
    Overdue,
    Escalation,
    Completion,
}

impl NotifyKind {
    /// Flag column backing this condition.
    pub fn column(&self) -> &'static str {
        match self {
            NotifyKind::Assignment => "assignment_notified",
            NotifyKind::Overdue => "overdue_notified",
            NotifyKind::Escalation => "escalation_notified",
            NotifyKind::Completion => "completion_notified",
        }
    }
}
