//! Model-output parsing and schema normalization.
//!
//! Raw model text goes through one generic pipeline: strip a markdown fence,
//! locate the first balanced JSON object, deserialize it, then hand the value
//! to a [`Schema`] that enforces every budget and enumeration itself. Nothing
//! the model says about lengths, counts or categories is trusted.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use linklens_shared::limits;
use linklens_shared::{
    Category, ClassificationResult, CommentAngle, CommentSuggestion, CommentSuggestions,
    InsightBody, Insights, KeyPoint,
};

/// Icon used when a suggestion arrives without one.
pub const DEFAULT_ICON: &str = "💡";

const ELLIPSIS: &str = "...";

static OPEN_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^```(?:json)?[ \t]*\r?\n?").unwrap());
static CLOSE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n?```$").unwrap());

/// A model response that could not be turned into a usable result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("no-json-found: model output contains no JSON object")]
    NoJsonFound,

    #[error("malformed-json: {0}")]
    MalformedJson(String),

    #[error("empty-result: {schema} payload carries no usable content")]
    EmptyResult { schema: &'static str },
}

/// Describes one target shape: how to normalize a parsed value and when the
/// outcome is too thin to count as an answer.
pub trait Schema {
    type Output: Serialize + Clone + PartialEq + std::fmt::Debug;

    /// Short name used in logs and errors.
    const NAME: &'static str;

    /// Enforce every field rule. Must never fail; missing data becomes empty.
    fn normalize(value: &Value) -> Self::Output;

    /// Whether a normalized output is semantically vacuous.
    fn is_vacuous(output: &Self::Output) -> bool;
}

/// Parse raw model text into the normalized output of `S`.
pub fn parse_response<S: Schema>(raw: &str) -> Result<S::Output, ContractError> {
    let text = strip_fence(raw);
    let span = first_json_object(text).ok_or(ContractError::NoJsonFound)?;
    let value: Value =
        serde_json::from_str(span).map_err(|e| ContractError::MalformedJson(e.to_string()))?;

    let output = S::normalize(&value);
    if S::is_vacuous(&output) {
        return Err(ContractError::EmptyResult { schema: S::NAME });
    }
    Ok(output)
}

/// Remove a leading and/or trailing markdown code fence.
pub fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let start = OPEN_FENCE.find(trimmed).map_or(0, |m| m.end());
    let body = &trimmed[start..];
    let end = CLOSE_FENCE.find(body).map_or(body.len(), |m| m.start());
    body[..end].trim()
}

/// Locate the first balanced `{...}` span, ignoring braces inside string
/// literals. Returns `None` if no object opens or the first one never closes.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Clip to `max` characters: trim, and only if still too long cut to
/// `max - 3` characters and append an ellipsis.
pub fn clip(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    if max <= ELLIPSIS.len() {
        return trimmed.chars().take(max).collect();
    }
    let mut out: String = trimmed.chars().take(max - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

/// Non-blank trimmed string value of `key`.
fn text_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    field(obj, key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn array_field<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    field(obj, key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn root(value: &Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

/// Importance from a number or numeric string, clamped to the allowed range.
fn importance(value: Option<&Value>) -> Option<u8> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    let clamped = n.round().clamp(
        f64::from(limits::MIN_IMPORTANCE),
        f64::from(limits::MAX_IMPORTANCE),
    );
    Some(clamped as u8)
}

fn position_importance(index: usize) -> u8 {
    let position = (index + 1).min(usize::from(limits::MAX_IMPORTANCE));
    position as u8
}

// ---------------------------------------------------------------------------
// Schemas
// ---------------------------------------------------------------------------

/// Category, tags and one-line summary.
pub struct ClassificationSchema;

impl Schema for ClassificationSchema {
    type Output = ClassificationResult;
    const NAME: &'static str = "classification";

    fn normalize(value: &Value) -> ClassificationResult {
        let obj = root(value);

        let category = text_field(&obj, "category")
            .and_then(Category::from_label)
            .unwrap_or(Category::Other);

        let mut tags: Vec<String> = Vec::new();
        for tag in array_field(&obj, "tags")
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        tags.truncate(limits::MAX_TAGS);

        let summary = text_field(&obj, "summary")
            .map(|s| clip(s, limits::SUMMARY_CHARS))
            .unwrap_or_default();

        ClassificationResult {
            category,
            tags,
            summary,
        }
    }

    fn is_vacuous(output: &ClassificationResult) -> bool {
        output.category == Category::Other && output.tags.is_empty() && output.summary.is_empty()
    }
}

/// Key points, insight paragraphs and guided questions.
pub struct InsightSchema;

impl Schema for InsightSchema {
    type Output = InsightBody;
    const NAME: &'static str = "insight";

    fn normalize(value: &Value) -> InsightBody {
        let obj = root(value);

        let key_points = array_field(&obj, "keyPoints")
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|kp| {
                let title = text_field(kp, "title")?;
                let content = text_field(kp, "content")?;
                Some((kp, title, content))
            })
            .take(limits::MAX_KEY_POINTS)
            .enumerate()
            .map(|(i, (kp, title, content))| KeyPoint {
                title: clip(title, limits::KEY_POINT_TITLE_CHARS),
                content: clip(content, limits::KEY_POINT_CONTENT_CHARS),
                importance: importance(field(kp, "importance"))
                    .unwrap_or_else(|| position_importance(i)),
            })
            .collect();

        let insights_obj = field(&obj, "insights")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let paragraph = |key: &str| {
            text_field(&insights_obj, key)
                .map(|s| clip(s, limits::INSIGHT_FIELD_CHARS))
                .unwrap_or_default()
        };
        let insights = Insights {
            value: paragraph("value"),
            inspiration: paragraph("inspiration"),
            application: paragraph("application"),
            connection: paragraph("connection"),
        };

        let questions = array_field(&obj, "questions")
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .take(limits::MAX_QUESTIONS)
            .map(|q| clip(q, limits::QUESTION_CHARS))
            .collect();

        InsightBody {
            key_points,
            insights,
            questions,
        }
    }

    fn is_vacuous(output: &InsightBody) -> bool {
        output.key_points.is_empty()
            && output.insights.value.is_empty()
            && output.questions.is_empty()
    }
}

/// Up to three angled comment drafts.
pub struct CommentSchema;

impl Schema for CommentSchema {
    type Output = CommentSuggestions;
    const NAME: &'static str = "comment-suggestions";

    fn normalize(value: &Value) -> CommentSuggestions {
        let obj = root(value);

        let suggestions = array_field(&obj, "suggestions")
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|s| {
                let angle = text_field(s, "angle").and_then(CommentAngle::from_label)?;
                let content = text_field(s, "content")?;
                let icon = text_field(s, "icon").unwrap_or(DEFAULT_ICON);
                Some(CommentSuggestion {
                    angle,
                    content: clip(content, limits::SUGGESTION_CHARS),
                    icon: icon.to_string(),
                })
            })
            .take(limits::MAX_SUGGESTIONS)
            .collect();

        CommentSuggestions { suggestions }
    }

    fn is_vacuous(output: &CommentSuggestions) -> bool {
        output.suggestions.is_empty()
    }
}
