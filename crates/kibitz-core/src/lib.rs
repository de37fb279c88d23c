//! # kibitz-core
//!
//! Core types, traits, configuration, and the conversation policies for the
//! Kibitz persona bot: prompt assembly, engine selection, mention rendering,
//! and interjection.

pub mod clock;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod interject;
pub mod mentions;
pub mod message;
pub mod traits;
pub mod turn;

pub use config::shellexpand;
