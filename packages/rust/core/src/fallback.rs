//! Deterministic local substitutes for model output.
//!
//! Everything here is a pure function of the request. Outputs pass through the
//! same clipping as model results so they satisfy identical budgets.

use linklens_shared::limits;
use linklens_shared::{
    Category, ClassificationResult, CommentAngle, CommentSuggestion, CommentSuggestions,
    EnrichmentRequest, InsightBody, Insights, KeyPoint,
};

use crate::normalize::clip;

/// Model version reported on synthesized insights.
pub const FALLBACK_MODEL_VERSION: &str = "fallback";

const UNTITLED: &str = "this content";

/// Keyword rules checked in order; the first rule with any hit wins.
const KEYWORD_RULES: &[(Category, &[&str])] = &[
    (
        Category::Technology,
        &[
            "代码", "编程", "开发", "前端", "后端", "算法", "api", "github", "npm", "code",
            "javascript", "python", "rust", "react", "vue", "programming", "developer",
        ],
    ),
    (
        Category::Video,
        &["视频", "video", "bilibili", "youtube", "抖音", "快手", "channels.weixin"],
    ),
    (
        Category::Music,
        &["音乐", "歌曲", "网易云", "qq音乐", "music", "spotify", "song"],
    ),
    (
        Category::Learning,
        &["学习", "课程", "教程", "培训", "考试", "大学", "教育", "course", "tutorial", "lesson"],
    ),
    (
        Category::Reading,
        &["阅读", "书籍", "小说", "文章", "图书", "book", "novel", "reading"],
    ),
    (
        Category::Work,
        &["工作", "招聘", "简历", "职场", "办公", "面试", "career", "resume", "interview", "hiring"],
    ),
    (
        Category::Shopping,
        &["购物", "淘宝", "京东", "拼多多", "商品", "优惠", "电商", "shopping", "taobao", "coupon"],
    ),
    (
        Category::Food,
        &["美食", "菜谱", "餐厅", "食物", "烹饪", "recipe", "restaurant", "cooking"],
    ),
    (
        Category::Travel,
        &["旅行", "旅游", "酒店", "机票", "景点", "出行", "travel", "hotel", "flight"],
    ),
    (
        Category::Health,
        &["健康", "医疗", "健身", "养生", "运动", "减肥", "health", "fitness", "workout"],
    ),
    (
        Category::Finance,
        &["财经", "股票", "基金", "理财", "投资", "金融", "finance", "stock", "invest"],
    ),
    (
        Category::Entertainment,
        &["游戏", "电竞", "娱乐", "直播", "game", "esports", "movie"],
    ),
    (
        Category::Life,
        &["生活", "日常", "家居", "宠物", "家庭", "lifestyle", "pet", "home"],
    ),
];

/// Heuristic classification from title, description and url. Never invents
/// tags or a summary.
pub fn local_classify(title: &str, description: &str, url: &str) -> ClassificationResult {
    let haystack = format!("{title} {description} {url}").to_lowercase();

    let category = KEYWORD_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_keyword(&haystack, k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other);

    ClassificationResult {
        category,
        tags: Vec::new(),
        summary: String::new(),
    }
}

/// Latin keywords match whole words (an optional plural `s` is allowed);
/// CJK keywords match anywhere.
fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    if !keyword.is_ascii() {
        return haystack.contains(keyword);
    }
    let is_word = |c: char| c.is_ascii_alphanumeric();
    haystack.match_indices(keyword).any(|(at, _)| {
        let before = haystack[..at].chars().next_back();
        let mut rest = haystack[at + keyword.len()..].chars().peekable();
        if rest.peek() == Some(&'s') {
            rest.next();
        }
        !before.is_some_and(is_word) && !rest.next().is_some_and(is_word)
    })
}

fn field(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn title_of(req: &EnrichmentRequest) -> &str {
    field(&req.title).unwrap_or(UNTITLED)
}

/// Local classification of a request.
pub fn fallback_classification(req: &EnrichmentRequest) -> ClassificationResult {
    local_classify(
        field(&req.title).unwrap_or_default(),
        field(&req.description).unwrap_or_default(),
        field(&req.url).unwrap_or_default(),
    )
}

/// A generic insight built from the title and the best available summary.
pub fn fallback_insight(req: &EnrichmentRequest) -> InsightBody {
    let title = title_of(req);
    let gist = field(&req.summary)
        .or_else(|| field(&req.description))
        .unwrap_or("No summary is available yet. Read the original for details.");

    InsightBody {
        key_points: vec![KeyPoint {
            title: clip("Main idea", limits::KEY_POINT_TITLE_CHARS),
            content: clip(gist, limits::KEY_POINT_CONTENT_CHARS),
            importance: limits::MIN_IMPORTANCE,
        }],
        insights: Insights {
            value: clip(
                &format!("\"{title}\" is worth keeping. Read it closely and relate it to your own experience."),
                limits::INSIGHT_FIELD_CHARS,
            ),
            inspiration: clip(
                "Everyone takes something different from a piece. Note down your own takeaways.",
                limits::INSIGHT_FIELD_CHARS,
            ),
            application: clip(
                "Think about where these ideas could apply in your work or daily life.",
                limits::INSIGHT_FIELD_CHARS,
            ),
            connection: clip(
                "Try linking this piece to what you already know on the topic.",
                limits::INSIGHT_FIELD_CHARS,
            ),
        },
        questions: [
            "What problem does this content address?",
            "What did you take away from it?",
            "How could you put these ideas into practice?",
        ]
        .into_iter()
        .map(|q| clip(q, limits::QUESTION_CHARS))
        .collect(),
    }
}

/// One suggestion per angle, built around the title and, when present, the
/// leading key point of a prior insight.
pub fn fallback_suggestions(req: &EnrichmentRequest) -> CommentSuggestions {
    let title = title_of(req);
    let lead = req
        .prior_insight
        .as_ref()
        .and_then(|i| i.key_points.first())
        .map(|kp| kp.title.trim())
        .filter(|t| !t.is_empty());

    let practical = match lead {
        Some(point) => format!(
            "\"{title}\" offers practical ideas, especially around {point}. I plan to try them in my own work and see how they hold up, adapting them to the situation rather than copying them wholesale."
        ),
        None => format!(
            "\"{title}\" offers practical ideas. I plan to try them in my own work and see how they hold up, adapting them to the situation rather than copying them wholesale."
        ),
    };
    let growth = format!(
        "Reading \"{title}\" made me revisit how I think about this topic. Some points challenged my assumptions, and that friction is exactly where growth happens."
    );
    let critical = format!(
        "\"{title}\" raises valuable points, but they deserve a critical look: where do they apply, what are their limits, and how do they compare with other views?"
    );

    let suggestions = CommentAngle::ALL
        .into_iter()
        .zip([practical, growth, critical])
        .map(|(angle, content)| CommentSuggestion {
            angle,
            content: clip(&content, limits::SUGGESTION_CHARS),
            icon: angle.icon().to_string(),
        })
        .collect();

    CommentSuggestions { suggestions }
}
