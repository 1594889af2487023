//! # taskpulse Board
//!
//! HTTP clients for the two external services the core consumes:
//! the collaboration board (cards, lists, members, webhooks) and the
//! daily-activity feed. Pure I/O; no mirror policy lives here.

pub mod activity;
pub mod client;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use taskpulse_core::error::Result;

/// One card as the board reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub due: Option<DateTime<Utc>>,
    #[serde(rename = "idList", default)]
    pub list_id: Option<String>,
    #[serde(rename = "idMembers", default)]
    pub member_ids: Vec<String>,
}

/// A board list (column).
#[derive(Debug, Clone, Deserialize)]
pub struct BoardList {
    pub id: String,
    pub name: String,
}

/// A board member profile.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardMember {
    pub id: String,
    #[serde(rename = "fullName", default)]
    pub full_name: String,
    #[serde(default)]
    pub username: String,
}

/// An existing webhook registration on the board token.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookInfo {
    pub id: String,
    #[serde(rename = "callbackURL")]
    pub callback_url: String,
}

/// A local card edit to push out to the board.
#[derive(Debug, Clone, Default)]
pub struct CardDraft {
    /// Existing card to update; `None` creates a new card.
    pub card_id: Option<String>,
    pub name: String,
    pub desc: String,
    pub due: Option<DateTime<Utc>>,
    pub member_ids: Vec<String>,
    /// Routes the card to the done list instead of the inbox list.
    pub completed: bool,
}

/// One prior-day activity record from the activity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub date: NaiveDate,
    pub description: String,
}

/// The board API surface the engines consume.
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// Full card set for the configured board.
    async fn list_cards(&self) -> Result<Vec<CardSnapshot>>;
    async fn get_list(&self, list_id: &str) -> Result<BoardList>;
    async fn get_member(&self, member_id: &str) -> Result<BoardMember>;
    async fn board_members(&self) -> Result<Vec<BoardMember>>;
    /// Create or update a card; returns the board's view of it.
    async fn upsert_card(&self, draft: &CardDraft) -> Result<CardSnapshot>;
    async fn delete_card(&self, card_id: &str) -> Result<bool>;
    async fn list_webhooks(&self) -> Result<Vec<WebhookInfo>>;
    async fn create_webhook(&self, callback_url: &str) -> Result<()>;
}

/// The activity feed consumed by the daily summary.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    async fn updates_for(&self, date: NaiveDate) -> Result<Vec<ActivityLog>>;
}

pub use activity::ActivityClient;
pub use client::BoardClient;
