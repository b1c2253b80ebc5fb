//! Core domain and wire types for LinkLens enrichment.
//!
//! Field names serialize in camelCase to match the entry-point wire contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Length and count budgets enforced after parsing, never trusted from the model.
pub mod limits {
    /// Extracted title, hard cut.
    pub const TITLE_CHARS: usize = 100;
    /// Extracted description, hard cut.
    pub const DESCRIPTION_CHARS: usize = 500;

    pub const MAX_TAGS: usize = 5;
    pub const SUMMARY_CHARS: usize = 100;

    pub const MAX_KEY_POINTS: usize = 5;
    pub const KEY_POINT_TITLE_CHARS: usize = 30;
    pub const KEY_POINT_CONTENT_CHARS: usize = 150;
    pub const MIN_IMPORTANCE: u8 = 1;
    pub const MAX_IMPORTANCE: u8 = 5;
    pub const INSIGHT_FIELD_CHARS: usize = 200;
    pub const MAX_QUESTIONS: usize = 5;
    pub const QUESTION_CHARS: usize = 100;

    pub const MAX_SUGGESTIONS: usize = 3;
    pub const SUGGESTION_CHARS: usize = 300;
}

// ---------------------------------------------------------------------------
// ContentDescriptor
// ---------------------------------------------------------------------------

/// Where a piece of content was published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceType {
    #[default]
    External,
    #[serde(alias = "wechat_article")]
    PlatformArticle,
    #[serde(alias = "wechat_video")]
    PlatformVideo,
}

impl SourceType {
    /// Wire name, also used as the storage column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::External => "external",
            Self::PlatformArticle => "platformArticle",
            Self::PlatformVideo => "platformVideo",
        }
    }

    /// Inverse of [`SourceType::as_str`]; unknown values map to `External`.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "platformArticle" | "wechat_article" => Self::PlatformArticle,
            "platformVideo" | "wechat_video" => Self::PlatformVideo,
            _ => Self::External,
        }
    }
}

/// Structured metadata derived from a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDescriptor {
    pub url: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub source_type: SourceType,
}

/// A persisted content record, as held by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: String,
    #[serde(flatten)]
    pub descriptor: ContentDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationResult>,
    /// Opaque insight blob (serialized [`InsightResult`]), if one was generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_insight: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// The fixed category taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technology,
    Life,
    Entertainment,
    Work,
    Learning,
    Reading,
    Video,
    Music,
    Shopping,
    Food,
    Travel,
    Health,
    Finance,
    #[default]
    Other,
}

impl Category {
    /// Every member, in display order (`Other` last).
    pub const ALL: [Category; 14] = [
        Self::Technology,
        Self::Life,
        Self::Entertainment,
        Self::Work,
        Self::Learning,
        Self::Reading,
        Self::Video,
        Self::Music,
        Self::Shopping,
        Self::Food,
        Self::Travel,
        Self::Health,
        Self::Finance,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technology => "technology",
            Self::Life => "life",
            Self::Entertainment => "entertainment",
            Self::Work => "work",
            Self::Learning => "learning",
            Self::Reading => "reading",
            Self::Video => "video",
            Self::Music => "music",
            Self::Shopping => "shopping",
            Self::Food => "food",
            Self::Travel => "travel",
            Self::Health => "health",
            Self::Finance => "finance",
            Self::Other => "other",
        }
    }

    /// Localized display label, also accepted from the model.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Technology => "技术",
            Self::Life => "生活",
            Self::Entertainment => "娱乐",
            Self::Work => "工作",
            Self::Learning => "学习",
            Self::Reading => "阅读",
            Self::Video => "视频",
            Self::Music => "音乐",
            Self::Shopping => "购物",
            Self::Food => "美食",
            Self::Travel => "旅行",
            Self::Health => "健康",
            Self::Finance => "财经",
            Self::Other => "其他",
        }
    }

    /// Look up a taxonomy member by wire name (case-insensitive) or localized label.
    pub fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw) || c.label() == raw)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized classification output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

// ---------------------------------------------------------------------------
// Deep insight
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPoint {
    pub title: String,
    pub content: String,
    pub importance: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Insights {
    pub value: String,
    pub inspiration: String,
    pub application: String,
    pub connection: String,
}

/// The model-derived (or fallback) part of an insight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InsightBody {
    pub key_points: Vec<KeyPoint>,
    pub insights: Insights,
    pub questions: Vec<String>,
}

/// A complete insight as returned and persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightResult {
    #[serde(flatten)]
    pub body: InsightBody,
    pub generated_at: DateTime<Utc>,
    /// Model identifier, or `"fallback"` for locally synthesized output.
    pub model_version: String,
}

// ---------------------------------------------------------------------------
// Comment suggestions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentAngle {
    Practical,
    Growth,
    Critical,
}

impl CommentAngle {
    pub const ALL: [CommentAngle; 3] = [Self::Practical, Self::Growth, Self::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Practical => "practical",
            Self::Growth => "growth",
            Self::Critical => "critical",
        }
    }

    /// Human label used in prompts and accepted back from the model.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Practical => "practical application",
            Self::Growth => "personal growth",
            Self::Critical => "critical thinking",
        }
    }

    fn localized_label(&self) -> &'static str {
        match self {
            Self::Practical => "实践应用",
            Self::Growth => "个人成长",
            Self::Critical => "深度思考",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Practical => "🎯",
            Self::Growth => "🌱",
            Self::Critical => "🧠",
        }
    }

    /// Accepts the wire name, the English label, or the localized label.
    pub fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|a| {
            a.as_str().eq_ignore_ascii_case(raw)
                || a.label().eq_ignore_ascii_case(raw)
                || a.localized_label() == raw
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSuggestion {
    pub angle: CommentAngle,
    pub content: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSuggestions {
    #[serde(default)]
    pub suggestions: Vec<CommentSuggestion>,
}

// ---------------------------------------------------------------------------
// Entry-point envelopes
// ---------------------------------------------------------------------------

/// Request accepted by the classify / insight / comment-assist entry points.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnrichmentRequest {
    pub content_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub prior_insight: Option<InsightBody>,
    pub user_draft: Option<String>,
}

/// Always-successful response envelope for the enrichment entry points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult<T> {
    pub success: bool,
    pub data: T,
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> PipelineResult<T> {
    /// Model-derived data.
    pub fn generated(data: T) -> Self {
        Self {
            success: true,
            data,
            fallback: false,
            cached: None,
            error: None,
        }
    }

    /// Previously persisted data; generation was skipped.
    pub fn cached(data: T) -> Self {
        Self {
            success: true,
            data,
            fallback: false,
            cached: Some(true),
            error: None,
        }
    }

    /// Locally synthesized data, optionally carrying the originating failure.
    pub fn fallback(data: T, error: Option<String>) -> Self {
        Self {
            success: true,
            data,
            fallback: true,
            cached: None,
            error,
        }
    }
}

/// Metadata payload of the extraction entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedMetadata {
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub source: SourceType,
}

impl From<&ContentDescriptor> for ExtractedMetadata {
    fn from(d: &ContentDescriptor) -> Self {
        Self {
            title: d.title.clone(),
            description: d.description.clone(),
            thumbnail: d.thumbnail.clone(),
            source: d.source_type,
        }
    }
}

/// Response of the extraction entry point, the only one that can report failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtractedMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExtractionResponse {
    pub fn ok(descriptor: &ContentDescriptor) -> Self {
        Self {
            success: true,
            data: Some(ExtractedMetadata::from(descriptor)),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_lookup_accepts_wire_and_localized_names() {
        assert_eq!(Category::from_label("technology"), Some(Category::Technology));
        assert_eq!(Category::from_label(" Finance "), Some(Category::Finance));
        assert_eq!(Category::from_label("美食"), Some(Category::Food));
        assert_eq!(Category::from_label("科技"), None);
        assert_eq!(Category::ALL.last(), Some(&Category::Other));
    }

    #[test]
    fn comment_angle_lookup() {
        assert_eq!(CommentAngle::from_label("practical"), Some(CommentAngle::Practical));
        assert_eq!(CommentAngle::from_label("Personal Growth"), Some(CommentAngle::Growth));
        assert_eq!(CommentAngle::from_label("深度思考"), Some(CommentAngle::Critical));
        assert_eq!(CommentAngle::from_label("humor"), None);
    }

    #[test]
    fn source_type_wire_names() {
        let json = serde_json::to_string(&SourceType::PlatformArticle).unwrap();
        assert_eq!(json, r#""platformArticle""#);
        let legacy: SourceType = serde_json::from_str(r#""wechat_video""#).unwrap();
        assert_eq!(legacy, SourceType::PlatformVideo);
        assert_eq!(SourceType::from_wire("nonsense"), SourceType::External);
    }

    #[test]
    fn insight_result_flattens_body() {
        let result = InsightResult {
            body: InsightBody {
                key_points: vec![KeyPoint {
                    title: "Point".into(),
                    content: "Detail".into(),
                    importance: 1,
                }],
                insights: Insights::default(),
                questions: vec!["Why?".into()],
            },
            generated_at: Utc::now(),
            model_version: "qwen-turbo".into(),
        };

        let value = serde_json::to_value(&result).expect("serialize");
        assert!(value.get("keyPoints").is_some());
        assert!(value.get("generatedAt").is_some());
        assert_eq!(value["modelVersion"], "qwen-turbo");

        let parsed: InsightResult = serde_json::from_value(value).expect("deserialize");
        assert_eq!(parsed, result);
    }

    #[test]
    fn envelope_omits_absent_optionals() {
        let env = PipelineResult::generated(ClassificationResult::default());
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains(r#""success":true"#));
        assert!(json.contains(r#""fallback":false"#));
        assert!(!json.contains("cached"));
        assert!(!json.contains("error"));

        let env = PipelineResult::fallback(ClassificationResult::default(), Some("timeout".into()));
        assert!(env.success);
        assert!(env.fallback);
        assert_eq!(env.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn request_accepts_partial_camel_case() {
        let req: EnrichmentRequest =
            serde_json::from_str(r#"{"contentId":"abc","userDraft":"nice read"}"#).unwrap();
        assert_eq!(req.content_id.as_deref(), Some("abc"));
        assert_eq!(req.user_draft.as_deref(), Some("nice read"));
        assert!(req.title.is_none());
        assert!(req.prior_insight.is_none());
    }

    #[test]
    fn extraction_failure_has_no_data() {
        let resp = ExtractionResponse::failed("timed out");
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"success":false,"message":"timed out"}"#);
    }
}
