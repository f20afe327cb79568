//! Javelin - endpoint uptime monitoring engine.
//!
//! Polls independently scheduled targets, validates their responses, keeps a
//! bounded latency history and an incident ledger per target, and alerts on
//! status transitions.

pub mod activity;
pub mod config;
pub mod notify;
pub mod probe;
pub mod scheduler;
pub mod store;
pub mod web;
