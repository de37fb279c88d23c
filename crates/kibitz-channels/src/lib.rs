//! # kibitz-channels
//!
//! Chat platform integrations for Kibitz.

pub mod slack;

pub use slack::SlackPlatform;
