//! # kibitz-memory
//!
//! In-memory conversation records for Kibitz, bounded either by an idle
//! window or by a turn capacity. Nothing outlives the process.

pub mod store;

pub use store::ConversationStore;
