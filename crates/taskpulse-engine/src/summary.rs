//! Daily summary: prior-day activity digested for the supervisor.
//!
//! No per-task flags here: idempotency lives in the scheduler's named-job
//! registry, which registers the daily job exactly once.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use taskpulse_board::ActivitySource;
use taskpulse_compose::{Composer, prompts};
use taskpulse_core::config::NotifyConfig;
use taskpulse_core::error::Result;
use taskpulse_mail::MailTransport;

/// Summarizes yesterday's activity feed into one supervisor email.
pub struct DailySummary {
    activity: Arc<dyn ActivitySource>,
    composer: Arc<dyn Composer>,
    mail: Arc<dyn MailTransport>,
    persona: String,
    notify: NotifyConfig,
}

impl DailySummary {
    pub fn new(
        activity: Arc<dyn ActivitySource>,
        composer: Arc<dyn Composer>,
        mail: Arc<dyn MailTransport>,
        persona: &str,
        notify: NotifyConfig,
    ) -> Self {
        Self {
            activity,
            composer,
            mail,
            persona: persona.to_string(),
            notify,
        }
    }

    /// Summarize the day before today.
    pub async fn run(&self) -> Result<()> {
        self.run_for((Utc::now() - Duration::days(1)).date_naive())
            .await
    }

    /// Summarize one specific day.
    pub async fn run_for(&self, date: NaiveDate) -> Result<()> {
        let updates = self.activity.updates_for(date).await?;
        if updates.is_empty() {
            tracing::info!("No activity recorded for {date}, skipping summary");
            return Ok(());
        }

        let digest = updates
            .iter()
            .map(|u| format!("- {}", u.description))
            .collect::<Vec<_>>()
            .join("\n");
        let body = self
            .composer
            .compose(
                &self.persona,
                &prompts::daily_summary(date, &digest, &self.notify.supervisor_name),
            )
            .await?;

        self.mail
            .send(
                &format!("Daily Work Summary for {date}"),
                &body,
                &[self.notify.supervisor_email.clone()],
            )
            .await?;
        tracing::info!("Daily summary for {date} sent to the supervisor");
        Ok(())
    }
}
