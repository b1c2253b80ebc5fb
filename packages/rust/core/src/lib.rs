//! Enrichment pipeline for LinkLens.
//!
//! Builds prompts, calls the generative service, normalizes its output into
//! fixed schemas and falls back to deterministic local output on any failure.

pub mod client;
pub mod fallback;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod store;

pub use client::{GenerationParams, GenerativeClient, ModelError};
pub use normalize::{ContractError, Schema, clip, parse_response};
pub use pipeline::{AddLinkResult, EnrichError, Enricher, ProgressReporter, SilentProgress};
pub use prompts::{Prompt, TaskKind};
pub use store::InsightStore;
