//! Activity feed client: prior-day work updates for the daily summary.

use async_trait::async_trait;
use chrono::NaiveDate;
use taskpulse_core::config::ActivityConfig;
use taskpulse_core::error::{Error, Result};

use crate::{ActivityLog, ActivitySource};

/// HTTP client for the external activity service.
pub struct ActivityClient {
    config: ActivityConfig,
    client: reqwest::Client,
}

impl ActivityClient {
    pub fn new(config: ActivityConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("Client build: {e}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ActivitySource for ActivityClient {
    async fn updates_for(&self, date: NaiveDate) -> Result<Vec<ActivityLog>> {
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[("date", date.format("%Y-%m-%d").to_string())])
            .send()
            .await
            .map_err(|e| Error::Http(format!("Activity fetch: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http(format!("Activity fetch: {status}")));
        }
        response
            .json()
            .await
            .map_err(|e| Error::Http(format!("Activity fetch: invalid body: {e}")))
    }
}
