//! Target store module.
//!
//! Holds the monitored targets, their history and incident ledgers, and the
//! persisted snapshot document.

pub mod document;
mod history;
mod models;
mod targets;

pub use document::DocumentError;
pub use history::*;
pub use models::*;
pub use targets::*;
