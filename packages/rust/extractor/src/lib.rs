//! Page metadata extraction and platform strategies.
//!
//! This crate provides:
//! - [`MetadataExtractor`]: fetches a URL and derives a [`ContentDescriptor`]
//! - [`strategies`]: hostname-keyed platform strategies with selector overrides
//! - [`StrategyRegistry`]: picks the strategy for a URL (generic is always last)
//!
//! [`ContentDescriptor`]: linklens_shared::ContentDescriptor

pub mod extractor;
pub mod strategies;

pub use extractor::{ExtractError, MetadataExtractor, describe_document};
pub use strategies::{
    GenericStrategy, PlatformArticleStrategy, PlatformStrategy, PlatformVideoStrategy,
    RawMetadata, StrategyRegistry,
};
