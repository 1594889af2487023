//! Notification dispatcher: four independent scans over the mirror, each
//! idempotent through its own at-most-once flag.
//!
//! A scan composes every message for a task before sending anything, and
//! flips the flag only after every send for that task succeeded. Failed
//! composition or delivery leaves the flag false, so the next scan retries.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use taskpulse_compose::Composer;
use taskpulse_compose::prompts::{self, Recipient};
use taskpulse_core::config::NotifyConfig;
use taskpulse_core::error::{Error, Result};
use taskpulse_core::types::{NotifyKind, TaskRecord};
use taskpulse_mail::MailTransport;
use taskpulse_store::MirrorDb;

/// Hours past the deadline before the escalation variant fires.
const ESCALATION_GRACE_HOURS: i64 = 24;

/// How many notices each scan sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchOutcome {
    pub assignments: usize,
    pub overdue: usize,
    pub escalations: usize,
    pub completions: usize,
}

/// Scans local tasks for condition/flag combinations and emits one message
/// per condition per task.
pub struct Dispatcher {
    store: Arc<MirrorDb>,
    composer: Arc<dyn Composer>,
    mail: Arc<dyn MailTransport>,
    persona: String,
    notify: NotifyConfig,
}

impl Dispatcher {
    pub fn new(
        store: Arc<MirrorDb>,
        composer: Arc<dyn Composer>,
        mail: Arc<dyn MailTransport>,
        persona: &str,
        notify: NotifyConfig,
    ) -> Self {
        Self {
            store,
            composer,
            mail,
            persona: persona.to_string(),
            notify,
        }
    }

    /// Run all four scans. The scans are independent and order-insensitive;
    /// a task may be picked up by several in the same pass since the flags
    /// are disjoint.
    pub async fn run_all(&self) -> Result<DispatchOutcome> {
        Ok(DispatchOutcome {
            assignments: self.scan_assignments().await?,
            overdue: self.scan_overdue().await?,
            escalations: self.scan_escalations().await?,
            completions: self.scan_completions().await?,
        })
    }

    /// Newly assigned, still-open tasks.
    pub async fn scan_assignments(&self) -> Result<usize> {
        let mut sent = 0;
        for task in self.store.assignment_candidates()? {
            let subject_pair = (
                format!("Assigned task: {}", task.title),
                format!("Task assigned to employee: {}", task.title),
            );
            let prompts = (
                prompts::assignment(&task, &self.notify.supervisor_name, Recipient::Assignee),
                prompts::assignment(&task, &self.notify.supervisor_name, Recipient::Supervisor),
            );
            sent += self
                .notify_pair(&task, NotifyKind::Assignment, subject_pair, prompts)
                .await;
        }
        Ok(sent)
    }

    /// Open tasks past their deadline.
    pub async fn scan_overdue(&self) -> Result<usize> {
        let now = Utc::now();
        let mut sent = 0;
        for task in self.store.overdue_candidates(now)? {
            let subject_pair = (
                format!("Task Overdue: {}", task.title),
                format!("Employee Task Overdue: {}", task.title),
            );
            let prompts = (
                prompts::overdue(&task, now, &self.notify.supervisor_name, Recipient::Assignee),
                prompts::overdue(&task, now, &self.notify.supervisor_name, Recipient::Supervisor),
            );
            sent += self
                .notify_pair(&task, NotifyKind::Overdue, subject_pair, prompts)
                .await;
        }
        Ok(sent)
    }

    /// Open tasks more than the grace period past their deadline.
    pub async fn scan_escalations(&self) -> Result<usize> {
        let now = Utc::now();
        let cutoff = now - Duration::hours(ESCALATION_GRACE_HOURS);
        let mut sent = 0;
        for task in self.store.escalation_candidates(cutoff)? {
            let subject_pair = (
                format!("Task Overdue: {}", task.title),
                format!("Employee Task Overdue: {}", task.title),
            );
            let prompts = (
                prompts::escalation(&task, now, &self.notify.supervisor_name, Recipient::Assignee),
                prompts::escalation(&task, now, &self.notify.supervisor_name, Recipient::Supervisor),
            );
            sent += self
                .notify_pair(&task, NotifyKind::Escalation, subject_pair, prompts)
                .await;
        }
        Ok(sent)
    }

    /// Completed tasks, supervisor only.
    pub async fn scan_completions(&self) -> Result<usize> {
        let mut sent = 0;
        for task in self.store.completion_candidates()? {
            let outcome: Result<bool> = async {
                let body = self
                    .composer
                    .compose(
                        &self.persona,
                        &prompts::completion(&task, &self.notify.supervisor_name),
                    )
                    .await?;
                self.mail
                    .send(
                        &format!("Task is completed: {}", task.title),
                        &body,
                        &[self.notify.supervisor_email.clone()],
                    )
                    .await?;
                self.store.try_mark_notified(task.id, NotifyKind::Completion)
            }
            .await;
            match outcome {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!("Completion notice for '{}' failed: {e}", task.title),
            }
        }
        Ok(sent)
    }

    /// Compose and deliver the assignee + supervisor pair for one task,
    /// then flip the flag. Returns 1 when this pass won the flip.
    async fn notify_pair(
        &self,
        task: &TaskRecord,
        kind: NotifyKind,
        (assignee_subject, supervisor_subject): (String, String),
        (assignee_prompt, supervisor_prompt): (String, String),
    ) -> usize {
        let outcome: Result<bool> = async {
            let member_id = task
                .member_id
                .as_deref()
                .ok_or_else(|| Error::Send(format!("Task '{}' has no assignee", task.title)))?;
            let member = self
                .store
                .get_member(member_id)?
                .filter(|m| !m.email.is_empty())
                .ok_or_else(|| Error::Send(format!("No email registered for member {member_id}")))?;

            // Both bodies must compose before anything is sent.
            let assignee_body = self.composer.compose(&self.persona, &assignee_prompt).await?;
            let supervisor_body = self
                .composer
                .compose(&self.persona, &supervisor_prompt)
                .await?;

            self.mail
                .send(&assignee_subject, &assignee_body, &[member.email.clone()])
                .await?;
            self.mail
                .send(
                    &supervisor_subject,
                    &supervisor_body,
                    &[self.notify.supervisor_email.clone()],
                )
                .await?;

            self.store.try_mark_notified(task.id, kind)
        }
        .await;

        match outcome {
            Ok(true) => 1,
            Ok(false) => 0,
            Err(e) => {
                tracing::warn!("{kind:?} notice for '{}' failed: {e}", task.title);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeComposer {
        fail: AtomicBool,
    }

    #[async_trait]
    impl Composer for FakeComposer {
        async fn compose(&self, _system: &str, user: &str) -> Result<String> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Compose("generation timed out".into()));
            }
            Ok(format!("composed: {}", &user[..user.len().min(40)]))
        }
    }

    #[derive(Default)]
    struct FakeMailer {
        sent: Mutex<Vec<(String, Vec<String>)>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl MailTransport for FakeMailer {
        async fn send(&self, subject: &str, _body: &str, to: &[String]) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Send("smtp down".into()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((subject.to_string(), to.to_vec()));
            Ok(())
        }
    }

    struct Rig {
        dispatcher: Dispatcher,
        store: Arc<MirrorDb>,
        composer: Arc<FakeComposer>,
        mailer: Arc<FakeMailer>,
        dir: std::path::PathBuf,
    }

    fn setup(name: &str) -> Rig {
        let dir = std::env::temp_dir().join(format!("taskpulse-dispatch-{name}"));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        let store = Arc::new(MirrorDb::open(&dir.join("mirror.db")).unwrap());
        let composer = Arc::new(FakeComposer {
            fail: AtomicBool::new(false),
        });
        let mailer = Arc::new(FakeMailer::default());
        let dispatcher = Dispatcher::new(
            store.clone(),
            composer.clone(),
            mailer.clone(),
            "You are a test assistant.",
            NotifyConfig {
                supervisor_email: "boss@example.com".into(),
                supervisor_name: "Alex".into(),
            },
        );
        Rig {
            dispatcher,
            store,
            composer,
            mailer,
            dir,
        }
    }

    /// Open task assigned to m-1 with the given deadline offset in hours.
    fn seed_task(store: &MirrorDb, card: &str, deadline_hours_from_now: i64) -> i64 {
        let due = Utc::now() + Duration::hours(deadline_hours_from_now);
        let (id, _) = store.upsert_snapshot(card, &format!("task {card}"), "", Some(due)).unwrap();
        store.set_assignment(id, "m-1", Some("Dev One"), Some("devone")).unwrap();
        id
    }

    #[tokio::test]
    async fn test_assignment_notifies_both_once() {
        let rig = setup("assign");
        rig.store.set_member_email("m-1", "dev@example.com").unwrap();
        seed_task(&rig.store, "c1", 48);

        assert_eq!(rig.dispatcher.scan_assignments().await.unwrap(), 1);
        let sent = rig.mailer.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, vec!["dev@example.com".to_string()]);
        assert_eq!(sent[1].1, vec!["boss@example.com".to_string()]);

        // Second pass with no state change sends nothing.
        assert_eq!(rig.dispatcher.scan_assignments().await.unwrap(), 0);
        assert_eq!(rig.mailer.sent.lock().unwrap().len(), 2);
        std::fs::remove_dir_all(&rig.dir).ok();
    }

    #[tokio::test]
    async fn test_overdue_flag_lifecycle() {
        let rig = setup("overdue");
        rig.store.set_member_email("m-1", "dev@example.com").unwrap();
        let id = seed_task(&rig.store, "c1", -3); // 3 hours late

        assert_eq!(rig.dispatcher.scan_overdue().await.unwrap(), 1);
        assert!(rig.store.get(id).unwrap().unwrap().overdue_notified);

        // not yet a day late, so escalation stays quiet
        assert_eq!(rig.dispatcher.scan_escalations().await.unwrap(), 0);

        assert_eq!(rig.dispatcher.scan_overdue().await.unwrap(), 0);
        std::fs::remove_dir_all(&rig.dir).ok();
    }

    #[tokio::test]
    async fn test_escalation_gated_by_own_flag() {
        let rig = setup("escalate");
        rig.store.set_member_email("m-1", "dev@example.com").unwrap();
        let id = seed_task(&rig.store, "c1", -30); // 30 hours late

        let outcome = rig.dispatcher.run_all().await.unwrap();
        // both the overdue and escalation conditions match in one pass
        assert_eq!(outcome.overdue, 1);
        assert_eq!(outcome.escalations, 1);

        let task = rig.store.get(id).unwrap().unwrap();
        assert!(task.overdue_notified);
        assert!(task.escalation_notified);

        let outcome = rig.dispatcher.run_all().await.unwrap();
        assert_eq!(outcome.overdue + outcome.escalations, 0);
        std::fs::remove_dir_all(&rig.dir).ok();
    }

    #[tokio::test]
    async fn test_compose_failure_leaves_flag_for_retry() {
        let rig = setup("compose-fail");
        rig.store.set_member_email("m-1", "dev@example.com").unwrap();
        let id = seed_task(&rig.store, "c1", 48);

        rig.composer.fail.store(true, Ordering::SeqCst);
        assert_eq!(rig.dispatcher.scan_assignments().await.unwrap(), 0);
        assert!(rig.mailer.sent.lock().unwrap().is_empty());
        assert!(!rig.store.get(id).unwrap().unwrap().assignment_notified);

        // Generation recovers; the notice goes out on the next scan.
        rig.composer.fail.store(false, Ordering::SeqCst);
        assert_eq!(rig.dispatcher.scan_assignments().await.unwrap(), 1);
        std::fs::remove_dir_all(&rig.dir).ok();
    }

    #[tokio::test]
    async fn test_send_failure_leaves_flag_for_retry() {
        let rig = setup("send-fail");
        rig.store.set_member_email("m-1", "dev@example.com").unwrap();
        let id = seed_task(&rig.store, "c1", -3);

        rig.mailer.fail.store(true, Ordering::SeqCst);
        assert_eq!(rig.dispatcher.scan_overdue().await.unwrap(), 0);
        assert!(!rig.store.get(id).unwrap().unwrap().overdue_notified);

        rig.mailer.fail.store(false, Ordering::SeqCst);
        assert_eq!(rig.dispatcher.scan_overdue().await.unwrap(), 1);
        std::fs::remove_dir_all(&rig.dir).ok();
    }

    #[tokio::test]
    async fn test_missing_member_email_blocks_assignee_leg() {
        let rig = setup("no-email");
        let id = seed_task(&rig.store, "c1", 48); // member never registered

        assert_eq!(rig.dispatcher.scan_assignments().await.unwrap(), 0);
        assert!(rig.mailer.sent.lock().unwrap().is_empty());
        assert!(!rig.store.get(id).unwrap().unwrap().assignment_notified);
        std::fs::remove_dir_all(&rig.dir).ok();
    }

    #[tokio::test]
    async fn test_completion_goes_to_supervisor_only() {
        let rig = setup("completion");
        let id = seed_task(&rig.store, "c1", 48);
        rig.store
            .set_completion(id, true, Some(Utc::now().date_naive()))
            .unwrap();

        assert_eq!(rig.dispatcher.scan_completions().await.unwrap(), 1);
        let sent = rig.mailer.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, vec!["boss@example.com".to_string()]);
        assert!(sent[0].0.contains("completed"));

        assert_eq!(rig.dispatcher.scan_completions().await.unwrap(), 0);
        std::fs::remove_dir_all(&rig.dir).ok();
    }

    #[tokio::test]
    async fn test_assignment_and_overdue_match_same_pass() {
        let rig = setup("multi");
        rig.store.set_member_email("m-1", "dev@example.com").unwrap();
        let id = seed_task(&rig.store, "c1", -3);

        let outcome = rig.dispatcher.run_all().await.unwrap();
        assert_eq!(outcome.assignments, 1);
        assert_eq!(outcome.overdue, 1);
        let task = rig.store.get(id).unwrap().unwrap();
        assert!(task.assignment_notified && task.overdue_notified);
        std::fs::remove_dir_all(&rig.dir).ok();
    }
}
