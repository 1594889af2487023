//! # taskpulse Scheduler
//!
//! Cooperative background jobs on tokio timers: fixed intervals for the
//! reconcile and notification scans, one wall-clock cron slot for the
//! daily summary.
//!
//! Registration is idempotent by job name: the registry is the single
//! place scheduling state lives, checked-then-inserted under a lock, so a
//! second registration of the same name is a logged no-op rather than a
//! duplicate loop. Every tick body runs in its own spawned task: a stuck
//! external call delays nothing but itself.

pub mod cron;
pub mod registry;

pub use cron::CronSpec;
pub use registry::{JobRegistry, Schedule};
