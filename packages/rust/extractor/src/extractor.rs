//! Single-page metadata extractor.
//!
//! Issues one GET (mobile identity, bounded redirects, whole-request timeout),
//! parses the markup, and reduces it to a [`ContentDescriptor`]. Failures are
//! returned to the caller as-is: there is no text that can stand in for a page
//! that could not be read.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;
use scraper::Html;
use tracing::{debug, info, instrument, warn};
use url::Url;

use linklens_shared::{ContentDescriptor, ExtractorConfig, limits};

use crate::strategies::{RawMetadata, StrategyRegistry, read_generic};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a URL could not be turned into a descriptor.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("refusing to fetch {0}: private or non-http target")]
    Blocked(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("parse error: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// MetadataExtractor
// ---------------------------------------------------------------------------

/// Fetches pages and derives content descriptors.
pub struct MetadataExtractor {
    config: ExtractorConfig,
    client: Client,
    registry: StrategyRegistry,
}

impl MetadataExtractor {
    /// Create an extractor with the given configuration.
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExtractError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            registry: StrategyRegistry::new(),
        })
    }

    /// Replace the strategy table (e.g. to add a platform).
    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Fetch `raw_url` and extract its descriptor.
    #[instrument(skip_all, fields(url = %raw_url))]
    pub async fn extract(&self, raw_url: &str) -> Result<ContentDescriptor, ExtractError> {
        let url = parse_url(raw_url)?;

        if !self.config.allow_private_hosts && is_private_target(&url) {
            warn!(%url, "blocked private target");
            return Err(ExtractError::Blocked(url.to_string()));
        }

        let body = self.fetch(&url).await?;
        let descriptor = describe_with(&self.registry, &url, &body);

        info!(
            source = descriptor.source_type.as_str(),
            has_title = !descriptor.title.is_empty(),
            has_description = !descriptor.description.is_empty(),
            "metadata extracted"
        );

        Ok(descriptor)
    }

    async fn fetch(&self, url: &Url) -> Result<String, ExtractError> {
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| self.classify_transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Fetch(format!("{url}: HTTP {status}")));
        }

        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_markup(content_type) {
                return Err(ExtractError::Parse(format!(
                    "{url}: not a markup document ({content_type})"
                )));
            }
        }

        response
            .text()
            .await
            .map_err(|e| self.classify_transport(url, e))
    }

    fn classify_transport(&self, url: &Url, e: reqwest::Error) -> ExtractError {
        if e.is_timeout() {
            ExtractError::Timeout(self.config.timeout)
        } else if e.is_decode() {
            ExtractError::Parse(format!("{url}: body decode failed: {e}"))
        } else {
            ExtractError::Fetch(format!("{url}: {e}"))
        }
    }
}

/// Reduce an already-fetched document to a descriptor using the built-in strategies.
pub fn describe_document(url: &Url, html: &str) -> ContentDescriptor {
    describe_with(&StrategyRegistry::new(), url, html)
}

fn describe_with(registry: &StrategyRegistry, url: &Url, html: &str) -> ContentDescriptor {
    let doc = Html::parse_document(html);
    let strategy = registry.select(url);

    let mut meta: RawMetadata = read_generic(&doc);
    strategy.apply_overrides(&doc, &mut meta);
    debug!(strategy = strategy.name(), "strategy applied");

    ContentDescriptor {
        url: url.to_string(),
        title: cut(&meta.title, limits::TITLE_CHARS),
        description: cut(&meta.description, limits::DESCRIPTION_CHARS),
        thumbnail: resolve_thumbnail(url, meta.thumbnail.trim()),
        source_type: strategy.source_type(),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_url(raw: &str) -> Result<Url, ExtractError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing URL".into(),
        });
    }
    Url::parse(trimmed).map_err(|e| ExtractError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Trim, then hard-cut to `max` characters.
fn cut(s: &str, max: usize) -> String {
    let trimmed = s.trim();
    match trimmed.char_indices().nth(max) {
        Some((idx, _)) => trimmed[..idx].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Resolve a relative thumbnail against the page URL.
fn resolve_thumbnail(page: &Url, thumbnail: &str) -> String {
    if thumbnail.is_empty() {
        return String::new();
    }
    match Url::parse(thumbnail) {
        Ok(abs) => abs.to_string(),
        Err(_) => page
            .join(thumbnail)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| thumbnail.to_string()),
    }
}

fn is_markup(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.starts_with("text/") || ct.contains("html") || ct.contains("xml")
}

/// Check if a URL targets a potentially dangerous resource.
fn is_private_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(v4));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fe80::/10 (link-local)
                || (first & 0xffc0) == 0xfe80
                // fc00::/7 (unique local)
                || (first & 0xfe00) == 0xfc00
        }
    }
}
