//! Messaging-platform strategies (official-account articles and channel videos).

use super::generic::element_text;
use super::{PlatformStrategy, RawMetadata, host_matches};
use linklens_shared::SourceType;
use scraper::{Html, Selector};
use url::Url;

const ARTICLE_HOST: &str = "mp.weixin.qq.com";
const VIDEO_HOSTS: [&str; 2] = ["channels.weixin.qq.com", "video.weixin.qq.com"];

/// Characters of body text used when an article has no description tag.
const BODY_EXCERPT_CHARS: usize = 200;

/// Official-account articles. Their share pages often carry empty meta tags.
pub struct PlatformArticleStrategy;

impl PlatformStrategy for PlatformArticleStrategy {
    fn matches(&self, url: &Url) -> bool {
        host_matches(url, ARTICLE_HOST)
    }

    fn source_type(&self) -> SourceType {
        SourceType::PlatformArticle
    }

    fn apply_overrides(&self, doc: &Html, meta: &mut RawMetadata) {
        if meta.title.trim().is_empty() {
            meta.title = element_text(doc, "#activity-name")
                .or_else(|| element_text(doc, "#js_article_title"))
                .unwrap_or_default();
        }

        if meta.description.trim().is_empty() {
            meta.description = body_excerpt(doc).unwrap_or_default();
        }
    }

    fn name(&self) -> &str {
        "platform-article"
    }
}

/// Channel videos. Classified only; no markup overrides.
pub struct PlatformVideoStrategy;

impl PlatformStrategy for PlatformVideoStrategy {
    fn matches(&self, url: &Url) -> bool {
        VIDEO_HOSTS.iter().any(|h| host_matches(url, h))
    }

    fn source_type(&self) -> SourceType {
        SourceType::PlatformVideo
    }

    fn name(&self) -> &str {
        "platform-video"
    }
}

/// Leading text of the article body, whitespace-collapsed.
fn body_excerpt(doc: &Html) -> Option<String> {
    let sel = Selector::parse("#js_content").unwrap();
    let el = doc.select(&sel).next()?;
    let text = el.text().collect::<Vec<_>>().join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let excerpt: String = collapsed.chars().take(BODY_EXCERPT_CHARS).collect();
    let excerpt = excerpt.trim().to_string();
    (!excerpt.is_empty()).then_some(excerpt)
}
