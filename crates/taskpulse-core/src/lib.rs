//! # taskpulse Core
//!
//! Shared foundation for the taskpulse workspace: configuration loading,
//! the error taxonomy, and the task/member data model that the store and
//! all three engines agree on.

pub mod config;
pub mod error;
pub mod types;

pub use config::PulseConfig;
pub use error::{Error, Result};
pub use types::{MemberRecord, NotifyKind, TaskRecord};
