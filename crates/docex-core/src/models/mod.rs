//! Data models: configuration, documents, extraction records, outcomes.

pub mod amount;
pub mod config;
pub mod document;
pub mod outcome;
pub mod record;
