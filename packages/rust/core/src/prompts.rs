//! Prompt builders for the three generation tasks.
//!
//! Every builder is a pure function of its input: identical requests produce
//! byte-identical prompts, so [`prompt_fingerprint`] is a stable cache key.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use linklens_shared::limits;
use linklens_shared::{Category, CommentAngle, EnrichmentRequest, InsightBody};

/// Placeholder for absent input fields.
const NONE: &str = "(none)";

/// Key points quoted back to the model when drafting comments.
const SUMMARY_KEY_POINTS: usize = 3;

const JSON_ONLY: &str = "Respond with a single JSON object only. Do not add any prose before \
     or after it and do not wrap it in markdown code fences.";

/// The generation task a prompt is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Classify,
    Insight,
    CommentAssist,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::Insight => "insight",
            Self::CommentAssist => "comment_assist",
        }
    }

    /// System message sent ahead of the user prompt.
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Self::Classify => {
                "You are a precise content classifier. You assign saved web content to \
                 exactly one category from a fixed list and always answer in strict JSON."
            }
            Self::Insight => {
                "You are a content analysis expert who distills articles into key points, \
                 practical insights and reflective questions. You always answer in strict JSON."
            }
            Self::CommentAssist => {
                "You are a thoughtful writing assistant who helps readers turn their reading \
                 into short personal reflections. You always answer in strict JSON."
            }
        }
    }
}

/// A built prompt: system message plus user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub task: TaskKind,
    pub system: &'static str,
    pub user: String,
}

impl Prompt {
    fn new(task: TaskKind, user: String) -> Self {
        Self {
            task,
            system: task.system_prompt(),
            user,
        }
    }

    /// SHA-256 fingerprint of the full prompt.
    pub fn fingerprint(&self) -> String {
        prompt_fingerprint(self.task, self.system, &self.user)
    }
}

/// Hex SHA-256 over task, system message and user message.
pub fn prompt_fingerprint(task: TaskKind, system: &str, user: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(task.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(system.as_bytes());
    hasher.update([0]);
    hasher.update(user.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn or_none(value: &Option<String>) -> &str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NONE)
}

fn content_fields(out: &mut String, req: &EnrichmentRequest, with_summary: bool) {
    let _ = writeln!(out, "Title: {}", or_none(&req.title));
    let _ = writeln!(out, "Description: {}", or_none(&req.description));
    if with_summary {
        let _ = writeln!(out, "Summary: {}", or_none(&req.summary));
    }
    let _ = writeln!(out, "URL: {}", or_none(&req.url));
}

/// Build the classification prompt. The category list is inlined.
pub fn build_classify_prompt(req: &EnrichmentRequest) -> Prompt {
    let categories = Category::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = String::new();
    out.push_str("Classify the following saved content.\n\n");
    content_fields(&mut out, req, false);
    let _ = write!(
        out,
        "\nRules:\n\
         - category: exactly one of [{categories}]. Use \"other\" if nothing fits.\n\
         - tags: at most {max_tags} short keywords describing the topic.\n\
         - summary: one sentence of at most {summary} characters.\n\n\
         {JSON_ONLY}\n\n\
         Output format:\n\
         {{\"category\": \"technology\", \"tags\": [\"keyword\", \"keyword\"], \"summary\": \"One-sentence summary\"}}\n",
        max_tags = limits::MAX_TAGS,
        summary = limits::SUMMARY_CHARS,
    );
    Prompt::new(TaskKind::Classify, out)
}

/// Build the deep-insight prompt with per-field length guidance.
pub fn build_insight_prompt(req: &EnrichmentRequest) -> Prompt {
    let mut out = String::new();
    out.push_str("Produce a deep reading insight for the following content.\n\n");
    content_fields(&mut out, req, true);
    let _ = write!(
        out,
        "\nProvide:\n\
         1. keyPoints: 3 to {max_kp} key points ordered by importance. Each has a title \
         (at most {kp_title} characters), content (at most {kp_content} characters) and \
         importance (integer 1 to 5, 1 is most important).\n\
         2. insights: value (why it is worth reading), inspiration (what it sparks), \
         application (how to apply it) and connection (how it links to other knowledge). \
         Each at most {field} characters.\n\
         3. questions: 3 to {max_q} open questions for reflection, each at most {q} characters.\n\n\
         {JSON_ONLY}\n\n\
         Output format:\n\
         {{\n  \"keyPoints\": [{{\"title\": \"Point title\", \"content\": \"Point detail\", \"importance\": 1}}],\n  \
         \"insights\": {{\"value\": \"...\", \"inspiration\": \"...\", \"application\": \"...\", \"connection\": \"...\"}},\n  \
         \"questions\": [\"Question?\"]\n}}\n",
        max_kp = limits::MAX_KEY_POINTS,
        kp_title = limits::KEY_POINT_TITLE_CHARS,
        kp_content = limits::KEY_POINT_CONTENT_CHARS,
        field = limits::INSIGHT_FIELD_CHARS,
        max_q = limits::MAX_QUESTIONS,
        q = limits::QUESTION_CHARS,
    );
    Prompt::new(TaskKind::Insight, out)
}

/// Build the comment-assist prompt from the title, any prior insight and
/// the user's draft.
pub fn build_comment_prompt(req: &EnrichmentRequest) -> Prompt {
    let angles = CommentAngle::ALL
        .iter()
        .map(|a| format!("{} ({})", a.as_str(), a.label()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = String::new();
    out.push_str("Draft reading reflections for the following content.\n\n");
    let _ = writeln!(out, "Title: {}", or_none(&req.title));
    let _ = writeln!(
        out,
        "Insight summary:\n{}",
        summarize_insight(req.prior_insight.as_ref())
    );
    let _ = writeln!(out, "User draft: {}", or_none(&req.user_draft));
    let _ = write!(
        out,
        "\nWrite {max} suggestions, one per angle: {angles}. Each suggestion is first person, \
         builds on the user draft when there is one, and is at most {chars} characters.\n\n\
         {JSON_ONLY}\n\n\
         Output format:\n\
         {{\"suggestions\": [{{\"angle\": \"practical\", \"content\": \"Reflection text\", \"icon\": \"🎯\"}}]}}\n",
        max = limits::MAX_SUGGESTIONS,
        chars = limits::SUGGESTION_CHARS,
    );
    Prompt::new(TaskKind::CommentAssist, out)
}

/// Condense a prior insight for the comment prompt.
pub fn summarize_insight(insight: Option<&InsightBody>) -> String {
    let Some(insight) = insight else {
        return "(no prior insight)".to_string();
    };

    let mut out = String::new();
    for (i, kp) in insight.key_points.iter().take(SUMMARY_KEY_POINTS).enumerate() {
        let _ = writeln!(out, "{}. {}: {}", i + 1, kp.title, kp.content);
    }
    if !insight.insights.value.is_empty() {
        let _ = writeln!(out, "Value: {}", insight.insights.value);
    }
    if !insight.insights.inspiration.is_empty() {
        let _ = writeln!(out, "Inspiration: {}", insight.insights.inspiration);
    }

    let trimmed = out.trim_end();
    if trimmed.is_empty() {
        "(no prior insight)".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linklens_shared::{Insights, KeyPoint};

    fn request() -> EnrichmentRequest {
        EnrichmentRequest {
            title: Some("Designing Data Pipelines".into()),
            description: Some("Notes on idempotent stages".into()),
            url: Some("https://example.com/post".into()),
            ..Default::default()
        }
    }

    #[test]
    fn builders_are_deterministic() {
        let req = request();
        assert_eq!(build_classify_prompt(&req), build_classify_prompt(&req));
        assert_eq!(build_insight_prompt(&req), build_insight_prompt(&req));
        assert_eq!(build_comment_prompt(&req), build_comment_prompt(&req));
        assert_eq!(
            build_insight_prompt(&req).fingerprint(),
            build_insight_prompt(&req).fingerprint()
        );
    }

    #[test]
    fn fingerprint_differs_by_task_and_input() {
        let req = request();
        let classify = build_classify_prompt(&req).fingerprint();
        let insight = build_insight_prompt(&req).fingerprint();
        assert_ne!(classify, insight);

        let other = EnrichmentRequest {
            title: Some("Another title".into()),
            ..request()
        };
        assert_ne!(classify, build_classify_prompt(&other).fingerprint());
        assert_eq!(classify.len(), 64);
    }

    #[test]
    fn classify_prompt_inlines_every_category() {
        let prompt = build_classify_prompt(&request());
        for category in Category::ALL {
            assert!(prompt.user.contains(category.as_str()), "{category}");
        }
        assert!(prompt.user.contains("Title: Designing Data Pipelines"));
        assert!(prompt.user.contains("JSON object only"));
        assert!(prompt.user.contains(r#"{"category": "technology""#));
    }

    #[test]
    fn missing_fields_use_placeholder() {
        let prompt = build_insight_prompt(&EnrichmentRequest::default());
        assert!(prompt.user.contains("Title: (none)"));
        assert!(prompt.user.contains("Summary: (none)"));
        assert!(prompt.user.contains("\"keyPoints\""));
    }

    #[test]
    fn comment_prompt_embeds_insight_summary_and_draft() {
        let insight = InsightBody {
            key_points: (1..=4)
                .map(|i| KeyPoint {
                    title: format!("K{i}"),
                    content: format!("C{i}"),
                    importance: 1,
                })
                .collect(),
            insights: Insights {
                value: "Worth it".into(),
                ..Default::default()
            },
            questions: vec![],
        };
        let req = EnrichmentRequest {
            prior_insight: Some(insight),
            user_draft: Some("I liked the part on retries".into()),
            ..request()
        };

        let prompt = build_comment_prompt(&req);
        assert!(prompt.user.contains("1. K1: C1\n2. K2: C2\n3. K3: C3\nValue: Worth it"));
        assert!(!prompt.user.contains("K4"));
        assert!(prompt.user.contains("User draft: I liked the part on retries"));
        assert!(prompt.user.contains("practical (practical application)"));
        assert_eq!(prompt.system, TaskKind::CommentAssist.system_prompt());
    }

    #[test]
    fn empty_insight_summary_uses_placeholder() {
        assert_eq!(summarize_insight(None), "(no prior insight)");
        assert_eq!(
            summarize_insight(Some(&InsightBody::default())),
            "(no prior insight)"
        );
    }
}
