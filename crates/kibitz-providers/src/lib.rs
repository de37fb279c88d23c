//! # kibitz-providers
//!
//! Completion backends for Kibitz and the retrying fetcher that turns raw
//! completions into usable replies.

pub mod fetcher;
pub mod openai;

pub use fetcher::{ResponseFetcher, RetryPolicy};
pub use openai::OpenAiProvider;
