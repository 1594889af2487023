//! # taskpulse Compose
//!
//! The text-generation collaborator: an OpenAI-compatible chat-completions
//! client behind the `Composer` trait, plus the prompt builders for every
//! notification kind. The dispatcher never sends a partial message: a
//! failed or timed-out generation is a dispatch failure for that message.

pub mod openai_compatible;
pub mod prompts;

use async_trait::async_trait;
use taskpulse_core::error::Result;

/// Produces one message body from a system persona and a user prompt.
#[async_trait]
pub trait Composer: Send + Sync {
    async fn compose(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

pub use openai_compatible::OpenAiCompatibleComposer;
