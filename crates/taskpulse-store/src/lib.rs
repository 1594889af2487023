//! # taskpulse Store
//!
//! SQLite persistence for the board mirror: task records keyed by external
//! card id and member records keyed by external member id.
//!
//! Two write patterns carry the correctness guarantees the engines rely on:
//! - notification flags and `score_counted` are flipped with conditional
//!   `UPDATE ... WHERE flag = 0` writes, so concurrent passes keep
//!   at-most-once semantics;
//! - the member aggregate fold runs inside one immediate transaction that
//!   claims `score_counted` and updates the running mean together.

pub mod sqlite;

pub use sqlite::MirrorDb;
