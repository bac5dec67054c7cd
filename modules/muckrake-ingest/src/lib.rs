//! Ingestion pipeline: fetch the external feed, rewrite each item through
//! the generative model, persist the day's edition, and track the whole run
//! as a pollable job record.

pub mod feed;
pub mod generator;
pub mod job;
pub mod orchestrator;
pub mod scheduler;

pub use feed::{FeedSource, RssFeedSource};
pub use generator::{AiGenerator, ArticleGenerator, GeneratedDraft};
pub use job::{await_terminal, JobTracker};
pub use orchestrator::IngestOrchestrator;
pub use scheduler::{IngestScheduler, RunHistory, RunSummary};
