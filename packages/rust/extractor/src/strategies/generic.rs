//! Generic (fallback) strategy and the shared meta-tag reader.
//!
//! Always matches. Reads Open Graph tags first, then plain `name=` meta tags,
//! then the document `<title>`.

use super::{PlatformStrategy, RawMetadata};
use linklens_shared::SourceType;
use scraper::{Html, Selector};
use url::Url;

/// Strategy for arbitrary pages. Always matches as the lowest-priority fallback.
pub struct GenericStrategy;

impl PlatformStrategy for GenericStrategy {
    fn matches(&self, _url: &Url) -> bool {
        true
    }

    fn source_type(&self) -> SourceType {
        SourceType::External
    }

    fn name(&self) -> &str {
        "generic"
    }
}

/// Read title, description and thumbnail from standard meta tags.
pub fn read_generic(doc: &Html) -> RawMetadata {
    let title = first_meta(doc, &[r#"meta[property="og:title"]"#, r#"meta[name="title"]"#])
        .or_else(|| element_text(doc, "title"))
        .unwrap_or_default();

    let description = first_meta(
        doc,
        &[r#"meta[property="og:description"]"#, r#"meta[name="description"]"#],
    )
    .unwrap_or_default();

    let thumbnail = first_meta(doc, &[r#"meta[property="og:image"]"#, r#"meta[name="image"]"#])
        .unwrap_or_default();

    RawMetadata {
        title,
        description,
        thumbnail,
    }
}

/// First non-blank `content` attribute among the selectors, in priority order.
fn first_meta(doc: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|sel_str| {
        let sel = Selector::parse(sel_str).unwrap();
        doc.select(&sel)
            .filter_map(|el| el.value().attr("content"))
            .map(str::trim)
            .find(|c| !c.is_empty())
            .map(String::from)
    })
}

/// Trimmed text of the first element matching `selector`, if non-blank.
pub(crate) fn element_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn og_tags_take_priority() {
        let html = r#"<html><head>
            <title>Document Title</title>
            <meta name="title" content="Name Title">
            <meta property="og:title" content="OG Title">
            <meta name="description" content="Name description">
            <meta property="og:description" content="OG description">
            <meta name="image" content="https://cdn.example.com/name.png">
            <meta property="og:image" content="https://cdn.example.com/og.png">
        </head><body></body></html>"#;

        let meta = read_generic(&Html::parse_document(html));
        assert_eq!(meta.title, "OG Title");
        assert_eq!(meta.description, "OG description");
        assert_eq!(meta.thumbnail, "https://cdn.example.com/og.png");
    }

    #[test]
    fn falls_back_through_priority_chain() {
        let html = r#"<html><head>
            <title>Document Title</title>
            <meta name="description" content="Name description">
            <meta name="image" content="/img/cover.jpg">
        </head></html>"#;

        let meta = read_generic(&Html::parse_document(html));
        assert_eq!(meta.title, "Document Title");
        assert_eq!(meta.description, "Name description");
        assert_eq!(meta.thumbnail, "/img/cover.jpg");
    }

    #[test]
    fn name_title_beats_document_title() {
        let html = r#"<html><head>
            <title>Document Title</title>
            <meta name="title" content="Name Title">
        </head></html>"#;
        assert_eq!(read_generic(&Html::parse_document(html)).title, "Name Title");
    }

    #[test]
    fn blank_og_value_is_skipped() {
        let html = r#"<html><head>
            <meta property="og:title" content="   ">
            <title>Real Title</title>
        </head></html>"#;
        assert_eq!(read_generic(&Html::parse_document(html)).title, "Real Title");
    }

    #[test]
    fn empty_document_yields_empty_fields() {
        let meta = read_generic(&Html::parse_document("<html><body><p>hi</p></body></html>"));
        assert_eq!(meta, RawMetadata::default());
    }
}
