//! # taskpulse Gateway
//!
//! The inbound HTTP surface: the board's webhook callback, a health
//! probe, and a read-only listing of the local mirror. The webhook
//! handler acknowledges the trigger and runs the sync out of band; a
//! full reconcile pass would not fit the board's delivery timeout.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, serve};
