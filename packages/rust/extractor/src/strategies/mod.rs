//! Platform strategy trait and built-in strategies for metadata extraction.
//!
//! Strategies are keyed by hostname. Each one names the [`SourceType`] it
//! produces and may patch the generic metadata with platform-specific
//! selectors when the generic tags come up empty.

mod generic;
mod wechat;

use linklens_shared::SourceType;
use scraper::Html;
use url::Url;

pub use generic::{GenericStrategy, read_generic};
pub use wechat::{PlatformArticleStrategy, PlatformVideoStrategy};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Metadata read from a document before post-processing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMetadata {
    pub title: String,
    pub description: String,
    pub thumbnail: String,
}

/// Trait for hostname-specific extraction behavior.
///
/// Strategies are tried in priority order; `GenericStrategy` is the always-last fallback.
pub trait PlatformStrategy: Send + Sync {
    /// Whether this strategy handles the given URL.
    fn matches(&self, url: &Url) -> bool;

    /// Source classification for matching URLs.
    fn source_type(&self) -> SourceType;

    /// Patch generic metadata from platform-specific markup.
    fn apply_overrides(&self, _doc: &Html, _meta: &mut RawMetadata) {}

    /// Human-readable strategy name for tracing.
    fn name(&self) -> &str;
}

/// True when `url`'s host is `domain` or a subdomain of it.
pub(crate) fn host_matches(url: &Url, domain: &str) -> bool {
    match url.host_str() {
        Some(host) => {
            let host = host.to_ascii_lowercase();
            host == domain || host.ends_with(&format!(".{domain}"))
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered strategies in priority order.
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn PlatformStrategy>>,
}

impl StrategyRegistry {
    /// Create a registry with all built-in strategies (platform-specific first, generic last).
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(PlatformArticleStrategy),
                Box::new(PlatformVideoStrategy),
                Box::new(GenericStrategy),
            ],
        }
    }

    /// Register an additional strategy ahead of the generic fallback.
    pub fn register(&mut self, strategy: Box<dyn PlatformStrategy>) {
        let at = self.strategies.len().saturating_sub(1);
        self.strategies.insert(at, strategy);
    }

    /// Select the strategy for a URL. Always returns one (GenericStrategy is the fallback).
    pub fn select(&self, url: &Url) -> &dyn PlatformStrategy {
        self.strategies
            .iter()
            .find(|s| s.matches(url))
            .map(|s| s.as_ref())
            .unwrap_or(&GenericStrategy)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
