//! Bridge Core - role-aware summary pipeline for technical text
//!
//! Turns a block of technical text (a PR diff, commit log, or ticket) into
//! three audience-specific summaries - Developer, PM, Support - optionally
//! grounded in context retrieved from a corpus of prior project text:
//! - Embedding + vector-store retrieval (best-effort, degrades to no context)
//! - Role-specific prompt composition (pure)
//! - Streaming generation via the Gemini API
//! - Fan-out: one independent stream per role, failures isolated per stream
//!
//! The sole entry point is [`Summarizer`]: [`Summarizer::summarize_all`]
//! returns one [`SummaryStream`] per role; [`Summarizer::summarize_one`] is
//! the synchronous drain for request/response callers.

pub mod config;
pub mod embedding;
pub mod error;
pub mod prompt;
pub mod provider;
pub mod retrieval;
pub mod storage;
pub mod summarize;
pub mod types;

pub use config::Config;
pub use error::{GenerateError, StreamFailure, SummarizeError};
pub use prompt::compose;
pub use retrieval::ContextRetriever;
pub use summarize::{collect_all, Summarizer, SummaryEventStream, SummaryStream};
pub use types::{ContextPassage, PromptBundle, Role, SummaryEvent, SummaryResult};
