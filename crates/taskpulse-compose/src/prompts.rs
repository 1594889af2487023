//! Prompt builders for every notification kind.
//!
//! Each builder returns the user prompt for one message; the persona comes
//! from config and rides in as the system prompt. Prompts are parameterized
//! by task title, description, deadline, assignee name, and the recipient
//! role (assignee vs supervisor).

use chrono::{DateTime, Duration, NaiveDate, Utc};
use taskpulse_core::types::TaskRecord;

/// Who the message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Assignee,
    Supervisor,
}

fn deadline_text(task: &TaskRecord) -> String {
    task.deadline
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "not set".into())
}

/// Prompt for the "task assigned" message.
pub fn assignment(task: &TaskRecord, supervisor_name: &str, recipient: Recipient) -> String {
    let mut prompt = format!(
        "Write a professional email about a newly assigned task titled: {}. \
         Task details: {}. Deadline is {}. ",
        task.title,
        task.description,
        deadline_text(task)
    );
    match recipient {
        Recipient::Supervisor => prompt.push_str(&format!(
            "Write in short, summarized form to the supervisor named \"{}\" that employee {} \
             has received a newly assigned task.",
            supervisor_name,
            task.assignee_name()
        )),
        Recipient::Assignee => prompt.push_str(&format!(
            "Write in short, summarized form to the employee named \"{}\" about the task.",
            task.assignee_name()
        )),
    }
    prompt
}

/// Prompt for the first overdue notice, referencing elapsed time.
pub fn overdue(
    task: &TaskRecord,
    now: DateTime<Utc>,
    supervisor_name: &str,
    recipient: Recipient,
) -> String {
    let elapsed = task
        .deadline
        .map(|d| now - d)
        .unwrap_or_else(Duration::zero);
    let mut prompt = format!(
        "Write a professional email about the overdue task titled: {}. \
         Task details: {}. Deadline was {} and it has been overdue for {} hour(s). ",
        task.title,
        task.description,
        deadline_text(task),
        elapsed.num_hours().max(0)
    );
    match recipient {
        Recipient::Supervisor => prompt.push_str(&format!(
            "Write in short, summarized form to the supervisor named \"{}\" that employee {} \
             has not completed the task.",
            supervisor_name,
            task.assignee_name()
        )),
        Recipient::Assignee => prompt.push_str(&format!(
            "Write in short, summarized form to the employee named \"{}\": please complete the \
             task as soon as possible, and mention that their task score goes down the longer \
             completion is delayed.",
            task.assignee_name()
        )),
    }
    prompt
}

/// Prompt for the escalated overdue notice with explicit days and hours.
pub fn escalation(
    task: &TaskRecord,
    now: DateTime<Utc>,
    supervisor_name: &str,
    recipient: Recipient,
) -> String {
    let elapsed = task
        .deadline
        .map(|d| now - d)
        .unwrap_or_else(Duration::zero);
    let days = elapsed.num_days().max(0);
    let hours = (elapsed.num_hours() - days * 24).max(0);
    let mut prompt = format!(
        "Write a professional email about the overdue task titled: {}. \
         Task details: {}. Deadline was {} and it is already overdue by {days} day(s) and \
         {hours} hour(s). ",
        task.title,
        task.description,
        deadline_text(task)
    );
    match recipient {
        Recipient::Supervisor => prompt.push_str(&format!(
            "Write in short, summarized form to the supervisor named \"{}\" that employee {} \
             has not completed the task.",
            supervisor_name,
            task.assignee_name()
        )),
        Recipient::Assignee => prompt.push_str(&format!(
            "Write in short, summarized form to the employee named \"{}\": please complete the \
             task as soon as possible, and mention that their task score goes down the longer \
             completion is delayed.",
            task.assignee_name()
        )),
    }
    prompt
}

/// Prompt for the completion summary, supervisor only.
pub fn completion(task: &TaskRecord, supervisor_name: &str) -> String {
    format!(
        "Write a professional email to a supervisor that the task titled: {} is completed. \
         Task details: {}. Deadline was {}. \
         Write in short, summarized form to the supervisor named \"{}\" that employee {} has \
         completed the task.",
        task.title,
        task.description,
        deadline_text(task),
        supervisor_name,
        task.assignee_name()
    )
}

/// Prompt for the daily work summary.
pub fn daily_summary(date: NaiveDate, updates: &str, supervisor_name: &str) -> String {
    format!(
        "Summarize the following work updates for the supervisor {} from {}:\n\n{}",
        supervisor_name,
        date.format("%Y-%m-%d"),
        updates
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_task() -> TaskRecord {
        TaskRecord {
            id: 1,
            card_id: Some("card-1".into()),
            title: "Ship the release".into(),
            description: "cut and tag".into(),
            deadline: Some(Utc.with_ymd_and_hms(2026, 8, 5, 12, 0, 0).unwrap()),
            member_id: Some("m-1".into()),
            full_name: Some("Dev One".into()),
            username: Some("devone".into()),
            completed: false,
            completed_on: None,
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
    fn test_assignment_addresses_role() {
        let task = sample_task();
        let to_dev = assignment(&task, "Alex", Recipient::Assignee);
        assert!(to_dev.contains("Ship the release"));
        assert!(to_dev.contains("Dev One"));
        assert!(!to_dev.contains("Alex"));

        let to_boss = assignment(&task, "Alex", Recipient::Supervisor);
        assert!(to_boss.contains("Alex"));
        assert!(to_boss.contains("newly assigned"));
    }

    #[test]
    fn test_escalation_counts_days_and_hours() {
        let task = sample_task();
        // 2 days 5 hours past the deadline
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 17, 0, 0).unwrap();
        let prompt = escalation(&task, now, "Alex", Recipient::Supervisor);
        assert!(prompt.contains("2 day(s)"));
        assert!(prompt.contains("5 hour(s)"));
    }

    #[test]
    fn test_overdue_mentions_elapsed() {
        let task = sample_task();
        let now = Utc.with_ymd_and_hms(2026, 8, 5, 15, 0, 0).unwrap();
        let prompt = overdue(&task, now, "Alex", Recipient::Assignee);
        assert!(prompt.contains("3 hour(s)"));
        assert!(prompt.contains("score goes down"));
    }
}
