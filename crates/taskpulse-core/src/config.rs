//! taskpulse configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub activity: ActivityConfig,
}

impl PulseConfig {
    /// Load config from the default path (~/.taskpulse/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::Error::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::Error::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::Error::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the taskpulse home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".taskpulse")
    }
}

/// External board API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_board_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub board_id: String,
    /// List whose membership denotes completion, matched case-insensitively.
    #[serde(default = "default_done_list")]
    pub done_list: String,
    /// List that locally pushed cards land on while open.
    #[serde(default)]
    pub inbox_list_id: String,
    #[serde(default = "default_board_timeout")]
    pub timeout_secs: u64,
}

fn default_board_url() -> String {
    "https://api.trello.com/1".into()
}
fn default_done_list() -> String {
    "Done".into()
}
fn default_board_timeout() -> u64 {
    30
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            base_url: default_board_url(),
            api_key: String::new(),
            token: String::new(),
            board_id: String::new(),
            done_list: default_done_list(),
            inbox_list_id: String::new(),
            timeout_secs: default_board_timeout(),
        }
    }
}

/// Text-generation (OpenAI-compatible) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Bounded token length per composition call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    /// Assistant persona injected as the system prompt.
    #[serde(default = "default_persona")]
    pub persona: String,
}

fn default_llm_endpoint() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".into()
}
fn default_max_tokens() -> u32 {
    280
}
fn default_llm_timeout() -> u64 {
    60
}
fn default_persona() -> String {
    "You are a helpful management assistant, and your name is 'Pulse-bot'.".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: String::new(),
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
            persona: default_persona(),
        }
    }
}

/// Outbound SMTP configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}
fn default_smtp_port() -> u16 {
    587
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            email: String::new(),
            password: String::new(),
            display_name: None,
        }
    }
}

/// Notification recipients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Fixed supervisor recipient for every notification kind.
    #[serde(default)]
    pub supervisor_email: String,
    #[serde(default = "default_supervisor_name")]
    pub supervisor_name: String,
}

fn default_supervisor_name() -> String {
    "the supervisor".into()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            supervisor_email: String::new(),
            supervisor_name: default_supervisor_name(),
        }
    }
}

/// Background job cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_reconcile_secs")]
    pub reconcile_secs: u64,
    /// Assignment / overdue / completion scan interval.
    #[serde(default = "default_notify_secs")]
    pub notify_secs: u64,
    #[serde(default = "default_escalation_secs")]
    pub escalation_secs: u64,
    /// Daily summary wall-clock trigger, 5-field cron.
    #[serde(default = "default_summary_cron")]
    pub summary_cron: String,
}

fn default_reconcile_secs() -> u64 {
    60
}
fn default_notify_secs() -> u64 {
    60
}
fn default_escalation_secs() -> u64 {
    90
}
fn default_summary_cron() -> String {
    "0 8 * * *".into()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            reconcile_secs: default_reconcile_secs(),
            notify_secs: default_notify_secs(),
            escalation_secs: default_escalation_secs(),
            summary_cron: default_summary_cron(),
        }
    }
}

/// Webhook gateway server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public callback URL the board delivers webhook events to.
    #[serde(default)]
    pub callback_url: String,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8460
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            callback_url: String::new(),
        }
    }
}

/// Local mirror database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "~/.taskpulse/mirror.db".into()
}

impl StoreConfig {
    /// Database path with a leading `~/` expanded to the home directory.
    pub fn resolved_path(&self) -> PathBuf {
        match self.db_path.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(rest),
            None => PathBuf::from(&self.db_path),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Daily-activity service consumed by the summary job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_activity_timeout")]
    pub timeout_secs: u64,
}

fn default_activity_timeout() -> u64 {
    30
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_secs: default_activity_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = PulseConfig::default();
        assert_eq!(cfg.board.done_list, "Done");
        assert_eq!(cfg.llm.max_tokens, 280);
        assert_eq!(cfg.schedule.reconcile_secs, 60);
        assert_eq!(cfg.schedule.summary_cron, "0 8 * * *");
    }

    #[test]
    fn test_partial_toml() {
        let cfg: PulseConfig = toml::from_str(
            r#"
            [board]
            board_id = "abc123"
            done_list = "Shipped"

            [notify]
            supervisor_email = "boss@example.com"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.board.board_id, "abc123");
        assert_eq!(cfg.board.done_list, "Shipped");
        assert_eq!(cfg.notify.supervisor_email, "boss@example.com");
        // untouched sections keep their defaults
        assert_eq!(cfg.mail.smtp_port, 587);
    }
}
