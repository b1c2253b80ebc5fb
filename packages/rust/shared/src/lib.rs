//! Shared types, error model, and configuration for LinkLens.
//!
//! This crate is the foundation depended on by all other LinkLens crates.
//! It provides:
//! - [`LinkLensError`]: the unified error type
//! - Wire and domain types ([`ContentDescriptor`], [`ClassificationResult`],
//!   [`InsightResult`], [`CommentSuggestions`], [`PipelineResult`])
//! - Configuration ([`AppConfig`], [`GenerativeConfig`], [`ExtractorConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExtractorConfig, ExtractorSection, GenerativeConfig, GenerativeSection,
    StorageSection, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_api_key,
};
pub use error::{LinkLensError, Result};
pub use types::{
    Category, ClassificationResult, CommentAngle, CommentSuggestion, CommentSuggestions,
    ContentDescriptor, ContentRecord, EnrichmentRequest, ExtractedMetadata, ExtractionResponse,
    InsightBody, InsightResult, Insights, KeyPoint, PipelineResult, SourceType, limits,
};
