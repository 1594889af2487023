//! Error taxonomy. Every failure in the core is scoped to one unit of
//! work (one card, one task, one message) and none is fatal to the
//! process.

use thiserror::Error;

/// All taskpulse errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The board card list could not be fetched. Aborts the current
    /// reconciliation pass; retried on the next schedule tick.
    #[error("board fetch failed: {0}")]
    Fetch(String),

    /// A per-card member or list lookup failed. The task persists without
    /// enrichment and is picked up again on the next pass.
    #[error("enrichment failed: {0}")]
    Enrichment(String),

    /// Text generation failed or timed out. The associated notification
    /// flag stays false so the send is retried on the next scan.
    #[error("composition failed: {0}")]
    Compose(String),

    /// SMTP delivery failed. Same retry semantics as `Compose`.
    #[error("mail send failed: {0}")]
    Send(String),

    /// The member aggregate update hit a write conflict after retries.
    #[error("scoring conflict: {0}")]
    ScoringRace(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
