//! Enrichment orchestration.
//!
//! Each entry point runs `build prompt → call model → parse/normalize` and
//! substitutes the local fallback on any failure, so classify, insight and
//! comment-assist always succeed. Only link parsing can report failure.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use linklens_extractor::{ExtractError, MetadataExtractor};
use linklens_shared::{
    AppConfig, ClassificationResult, CommentSuggestions, ContentDescriptor, ContentRecord,
    EnrichmentRequest, ExtractionResponse, ExtractorConfig, GenerativeConfig, InsightResult,
    LinkLensError, PipelineResult, Result,
};
use linklens_storage::Storage;

use crate::client::{GenerativeClient, ModelError};
use crate::fallback::{
    FALLBACK_MODEL_VERSION, fallback_classification, fallback_insight, fallback_suggestions,
};
use crate::normalize::{ClassificationSchema, CommentSchema, ContractError, InsightSchema, Schema};
use crate::prompts::{
    Prompt, TaskKind, build_classify_prompt, build_comment_prompt, build_insight_prompt,
};
use crate::store::InsightStore;

/// Why an enrichment fell back to local output.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("not-configured: no API key for the generative service")]
    NotConfigured,

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// Result of the `add` flow.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLinkResult {
    pub id: String,
    pub descriptor: ContentDescriptor,
    pub classification: PipelineResult<ClassificationResult>,
}

/// Progress callback for the `add` flow.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the flow completes.
    fn done(&self, result: &AddLinkResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &AddLinkResult) {}
}

/// Runs every enrichment entry point.
pub struct Enricher {
    extractor: MetadataExtractor,
    client: Option<GenerativeClient>,
    store: Option<Arc<dyn InsightStore>>,
}

impl Enricher {
    /// Without a client every enrichment takes the fallback path.
    pub fn new(extractor: MetadataExtractor, client: Option<GenerativeClient>) -> Self {
        Self {
            extractor,
            client,
            store: None,
        }
    }

    /// Build the extractor and (if a key is present) the model client.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let extractor = MetadataExtractor::new(ExtractorConfig::from(config))
            .map_err(|e| LinkLensError::config(format!("extractor: {e}")))?;
        let client = GenerativeClient::from_config(&GenerativeConfig::from(config))
            .map_err(|e| LinkLensError::config(format!("generative client: {e}")))?;

        if client.is_none() {
            info!(
                env = %config.generative.api_key_env,
                "no API key found; enrichment will use local fallbacks"
            );
        }
        Ok(Self::new(extractor, client))
    }

    /// Attach the store used for insight caching and record hydration.
    pub fn with_store(mut self, store: Arc<dyn InsightStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Extract metadata for a URL. The only entry point that can fail.
    #[instrument(skip(self))]
    pub async fn parse_link(&self, url: &str) -> ExtractionResponse {
        match self.extractor.extract(url).await {
            Ok(descriptor) => {
                info!(source = descriptor.source_type.as_str(), "link parsed");
                ExtractionResponse::ok(&descriptor)
            }
            Err(e) => {
                warn!(error = %e, "link parsing failed");
                ExtractionResponse::failed(e.to_string())
            }
        }
    }

    /// Classify content into the fixed taxonomy.
    #[instrument(skip_all, fields(content_id = req.content_id.as_deref().unwrap_or("-")))]
    pub async fn classify(&self, req: &EnrichmentRequest) -> PipelineResult<ClassificationResult> {
        let req = self.hydrated(req).await;
        match self.run::<ClassificationSchema>(build_classify_prompt(&req)).await {
            Ok(result) => PipelineResult::generated(result),
            Err(e) => degrade(TaskKind::Classify, e, fallback_classification(&req)),
        }
    }

    /// Produce a deep insight, served from the store when one exists.
    #[instrument(skip_all, fields(content_id = req.content_id.as_deref().unwrap_or("-")))]
    pub async fn insight(&self, req: &EnrichmentRequest) -> PipelineResult<InsightResult> {
        let target = match (req.content_id.clone(), self.store.clone()) {
            (Some(id), Some(store)) => Some((id, store)),
            _ => None,
        };

        if let Some((id, store)) = &target {
            if let Some(cached) = cached_insight(store.as_ref(), id).await {
                info!("returning stored insight");
                return PipelineResult::cached(cached);
            }
        }
        let req = self.hydrated(req).await;

        match self.run::<InsightSchema>(build_insight_prompt(&req)).await {
            Ok(body) => {
                let result = InsightResult {
                    body,
                    generated_at: Utc::now(),
                    model_version: self.model_version(),
                };
                if let Some((id, store)) = &target {
                    persist_insight(store.as_ref(), id, &result).await;
                }
                PipelineResult::generated(result)
            }
            Err(e) => {
                let result = InsightResult {
                    body: fallback_insight(&req),
                    generated_at: Utc::now(),
                    model_version: FALLBACK_MODEL_VERSION.to_string(),
                };
                degrade(TaskKind::Insight, e, result)
            }
        }
    }

    /// Draft up to three comment suggestions.
    #[instrument(skip_all, fields(content_id = req.content_id.as_deref().unwrap_or("-")))]
    pub async fn assist_comment(&self, req: &EnrichmentRequest) -> PipelineResult<CommentSuggestions> {
        let req = self.hydrated(req).await;
        match self.run::<CommentSchema>(build_comment_prompt(&req)).await {
            Ok(suggestions) => PipelineResult::generated(suggestions),
            Err(e) => degrade(TaskKind::CommentAssist, e, fallback_suggestions(&req)),
        }
    }

    /// The request with gaps filled from the stored record, when a store is
    /// attached and the request names a content id. Lookup failures are
    /// logged and the request is used as given.
    async fn hydrated(&self, req: &EnrichmentRequest) -> EnrichmentRequest {
        let mut req = req.clone();
        let (Some(id), Some(store)) = (req.content_id.clone(), self.store.as_ref()) else {
            return req;
        };
        match store.get_content(&id).await {
            Ok(Some(record)) => hydrate(&mut req, &record),
            Ok(None) => debug!("no content record for id"),
            Err(e) => warn!(error = %e, "content lookup failed"),
        }
        req
    }

    /// Extract a URL, store it and persist its classification.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn add_link(
        &self,
        storage: &Storage,
        url: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<AddLinkResult> {
        progress.phase("Fetching page metadata");
        let descriptor = self
            .extractor
            .extract(url)
            .await
            .map_err(extract_failure)?;

        progress.phase("Saving link");
        let id = storage.insert_content(&descriptor).await?;

        progress.phase("Classifying");
        let req = EnrichmentRequest {
            content_id: Some(id.clone()),
            title: Some(descriptor.title.clone()),
            description: Some(descriptor.description.clone()),
            url: Some(descriptor.url.clone()),
            ..Default::default()
        };
        let classification = self.classify(&req).await;
        storage.set_classification(&id, &classification.data).await?;

        let result = AddLinkResult {
            id,
            descriptor,
            classification,
        };
        info!(
            id = %result.id,
            category = result.classification.data.category.as_str(),
            fallback = result.classification.fallback,
            "link added"
        );
        progress.done(&result);
        Ok(result)
    }

    /// Generic generate → parse → normalize step shared by every task.
    async fn run<S: Schema>(&self, prompt: Prompt) -> std::result::Result<S::Output, EnrichError> {
        let client = self.client.as_ref().ok_or(EnrichError::NotConfigured)?;
        debug!(
            task = prompt.task.as_str(),
            fingerprint = %prompt.fingerprint(),
            "prompt built"
        );
        let raw = client.generate(&prompt).await?;
        let output = crate::normalize::parse_response::<S>(&raw)?;
        debug!(schema = S::NAME, "model output normalized");
        Ok(output)
    }

    fn model_version(&self) -> String {
        self.client
            .as_ref()
            .map(|c| c.model().to_string())
            .unwrap_or_else(|| FALLBACK_MODEL_VERSION.to_string())
    }
}

/// Log the failure and wrap the local substitute. An unconfigured service is
/// expected, so it carries no error string.
fn degrade<T>(task: TaskKind, err: EnrichError, data: T) -> PipelineResult<T> {
    match err {
        EnrichError::NotConfigured => {
            debug!(task = task.as_str(), "generative service not configured; using fallback");
            PipelineResult::fallback(data, None)
        }
        err => {
            warn!(task = task.as_str(), error = %err, "enrichment failed; using fallback");
            PipelineResult::fallback(data, Some(err.to_string()))
        }
    }
}

/// Carry the extraction failure kind into the shared error type.
fn extract_failure(err: ExtractError) -> LinkLensError {
    match err {
        ExtractError::Parse(message) => LinkLensError::parse(message),
        ExtractError::InvalidUrl { .. } | ExtractError::Blocked(_) => {
            LinkLensError::validation(err.to_string())
        }
        ExtractError::Fetch(_) | ExtractError::Timeout(_) => LinkLensError::Network(err.to_string()),
    }
}

async fn cached_insight(store: &dyn InsightStore, id: &str) -> Option<InsightResult> {
    match store.get_insight(id).await {
        Ok(Some(blob)) => match serde_json::from_str(&blob) {
            Ok(insight) => Some(insight),
            Err(e) => {
                warn!(error = %e, "stored insight is unreadable; regenerating");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "insight lookup failed");
            None
        }
    }
}

async fn persist_insight(store: &dyn InsightStore, id: &str, result: &InsightResult) {
    let blob = match serde_json::to_string(result) {
        Ok(blob) => blob,
        Err(e) => {
            warn!(error = %e, "failed to serialize insight");
            return;
        }
    };
    if let Err(e) = store.set_insight(id, &blob).await {
        warn!(error = %e, "failed to persist insight");
    }
}

/// Fill request fields the caller left empty from the stored record.
fn hydrate(req: &mut EnrichmentRequest, record: &ContentRecord) {
    fn fill(slot: &mut Option<String>, value: &str) {
        let missing = slot.as_deref().is_none_or(|s| s.trim().is_empty());
        if missing && !value.trim().is_empty() {
            *slot = Some(value.to_string());
        }
    }

    let d = &record.descriptor;
    fill(&mut req.title, &d.title);
    fill(&mut req.description, &d.description);
    fill(&mut req.url, &d.url);
    if let Some(c) = &record.classification {
        fill(&mut req.summary, &c.summary);
    }
    if req.prior_insight.is_none() {
        req.prior_insight = record
            .ai_insight
            .as_deref()
            .and_then(|blob| serde_json::from_str::<InsightResult>(blob).ok())
            .map(|insight| insight.body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use linklens_shared::{Category, ClassificationResult, InsightBody, KeyPoint, SourceType};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<HashMap<String, ContentRecord>>,
        insights: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl InsightStore for MemoryStore {
        async fn get_content(&self, id: &str) -> Result<Option<ContentRecord>> {
            Ok(self.records.lock().unwrap().get(id).cloned())
        }

        async fn get_insight(&self, id: &str) -> Result<Option<String>> {
            Ok(self.insights.lock().unwrap().get(id).cloned())
        }

        async fn set_insight(&self, id: &str, insight_json: &str) -> Result<()> {
            self.insights
                .lock()
                .unwrap()
                .insert(id.to_string(), insight_json.to_string());
            Ok(())
        }
    }

    struct UnavailableStore;

    #[async_trait]
    impl InsightStore for UnavailableStore {
        async fn get_content(&self, _id: &str) -> Result<Option<ContentRecord>> {
            Err(LinkLensError::Storage("database is locked".into()))
        }

        async fn get_insight(&self, _id: &str) -> Result<Option<String>> {
            Err(LinkLensError::Storage("database is locked".into()))
        }

        async fn set_insight(&self, _id: &str, _insight_json: &str) -> Result<()> {
            Err(LinkLensError::Storage("database is locked".into()))
        }
    }

    fn record(id: &str, title: &str) -> ContentRecord {
        ContentRecord {
            id: id.to_string(),
            descriptor: ContentDescriptor {
                url: "https://example.com/post".into(),
                title: title.to_string(),
                description: "Stored description".into(),
                thumbnail: String::new(),
                source_type: SourceType::External,
            },
            classification: Some(ClassificationResult {
                category: Category::Technology,
                tags: vec![],
                summary: "Stored summary".into(),
            }),
            ai_insight: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn generative_config(base_url: &str) -> GenerativeConfig {
        GenerativeConfig {
            api_key: Some("test-key".into()),
            base_url: base_url.to_string(),
            model: "test-model".into(),
            classify_timeout: Duration::from_millis(300),
            insight_timeout: Duration::from_millis(300),
            comment_timeout: Duration::from_millis(300),
        }
    }

    fn enricher(server: Option<&MockServer>) -> Enricher {
        let extractor = MetadataExtractor::new(ExtractorConfig {
            allow_private_hosts: true,
            ..Default::default()
        })
        .unwrap();
        let client = server.map(|s| {
            GenerativeClient::from_config(&generative_config(&s.uri()))
                .unwrap()
                .unwrap()
        });
        Enricher::new(extractor, client)
    }

    async fn model_replying(content: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            })))
            .mount(&server)
            .await;
        server
    }

    fn titled(title: &str) -> EnrichmentRequest {
        EnrichmentRequest {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    fn insight_payload() -> String {
        json!({
            "keyPoints": [{"title": "Stages", "content": "Keep stages idempotent", "importance": 1}],
            "insights": {"value": "Practical guide", "inspiration": "", "application": "", "connection": ""},
            "questions": ["Where do retries bite?"]
        })
        .to_string()
    }

    // --- classify ---

    #[tokio::test]
    async fn classify_normalizes_model_output() {
        let server = model_replying("```json\n{\"category\":\"科技\",\"tags\":[\"x\"]}\n```").await;
        let out = enricher(Some(&server)).classify(&titled("Anything")).await;

        assert!(out.success);
        assert!(!out.fallback);
        assert_eq!(out.data.category, Category::Other);
        assert_eq!(out.data.tags, vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn vacuous_classification_uses_local_rules() {
        let server = model_replying(r#"{"category": "nonsense"}"#).await;
        let out = enricher(Some(&server))
            .classify(&titled("Python packaging guide"))
            .await;

        assert!(out.fallback);
        assert_eq!(out.data.category, Category::Technology);
        assert!(out.error.unwrap().contains("empty-result"));
    }

    #[tokio::test]
    async fn unconfigured_classify_falls_back_silently() {
        let out = enricher(None).classify(&titled("Weekend hiking travel plan")).await;
        assert!(out.success);
        assert!(out.fallback);
        assert_eq!(out.error, None);
        assert_eq!(out.data.category, Category::Travel);
    }

    #[tokio::test]
    async fn classify_with_unknown_content_id_still_succeeds() {
        let out = enricher(None)
            .with_store(Arc::new(MemoryStore::default()))
            .classify(&EnrichmentRequest {
                content_id: Some("nope".into()),
                ..titled("Python tutorial")
            })
            .await;

        assert!(out.success);
        assert!(out.fallback);
        assert_eq!(out.data.category, Category::Technology);
    }

    #[tokio::test]
    async fn classify_survives_store_errors() {
        let out = enricher(None)
            .with_store(Arc::new(UnavailableStore))
            .classify(&EnrichmentRequest {
                content_id: Some("c1".into()),
                ..titled("Weekend hiking travel plan")
            })
            .await;

        assert!(out.success);
        assert_eq!(out.data.category, Category::Travel);
    }

    #[tokio::test]
    async fn classify_fills_blank_fields_from_record() {
        let store = Arc::new(MemoryStore::default());
        store
            .records
            .lock()
            .unwrap()
            .insert("c4".into(), record("c4", "Python packaging guide"));

        let out = enricher(None)
            .with_store(store)
            .classify(&EnrichmentRequest {
                content_id: Some("c4".into()),
                title: Some("   ".into()),
                ..Default::default()
            })
            .await;

        assert_eq!(out.data.category, Category::Technology);
    }

    // --- insight ---

    #[tokio::test]
    async fn unconfigured_insight_is_fallback_with_title() {
        let out = enricher(None)
            .insight(&titled("Designing Data Pipelines"))
            .await;

        assert!(out.success);
        assert!(out.fallback);
        assert_eq!(out.cached, None);
        assert_eq!(out.data.model_version, "fallback");
        assert!(out.data.body.insights.value.contains("Designing Data Pipelines"));
    }

    #[tokio::test]
    async fn timed_out_insight_matches_unconfigured_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"choices": []}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let req = titled("Designing Data Pipelines");
        let timed_out = enricher(Some(&server)).insight(&req).await;
        let unconfigured = enricher(None).insight(&req).await;

        assert!(timed_out.success);
        assert!(timed_out.fallback);
        assert!(timed_out.error.as_deref().unwrap().starts_with("timeout"));
        assert_eq!(timed_out.data.body, unconfigured.data.body);
        assert_eq!(timed_out.data.model_version, unconfigured.data.model_version);
    }

    #[tokio::test]
    async fn auth_failure_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let out = enricher(Some(&server)).insight(&titled("T")).await;
        assert!(out.fallback);
        assert!(out.error.unwrap().contains("auth-error"));
    }

    #[tokio::test]
    async fn stored_insight_short_circuits_generation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let stored = InsightResult {
            body: fallback_insight(&titled("Earlier")),
            generated_at: Utc::now(),
            model_version: "test-model".into(),
        };
        let store = Arc::new(MemoryStore::default());
        store
            .insights
            .lock()
            .unwrap()
            .insert("c1".into(), serde_json::to_string(&stored).unwrap());

        let out = enricher(Some(&server))
            .with_store(store)
            .insight(&EnrichmentRequest {
                content_id: Some("c1".into()),
                ..Default::default()
            })
            .await;

        assert_eq!(out.cached, Some(true));
        assert!(!out.fallback);
        assert_eq!(out.data, stored);
    }

    #[tokio::test]
    async fn generated_insight_is_hydrated_and_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Title: Stored Title"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": insight_payload()}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::default());
        store
            .records
            .lock()
            .unwrap()
            .insert("c2".into(), record("c2", "Stored Title"));

        let out = enricher(Some(&server))
            .with_store(store.clone())
            .insight(&EnrichmentRequest {
                content_id: Some("c2".into()),
                ..Default::default()
            })
            .await;

        assert!(!out.fallback);
        assert_eq!(out.data.model_version, "test-model");
        assert_eq!(out.data.body.key_points[0].title, "Stages");

        let blob = store.insights.lock().unwrap().get("c2").cloned().unwrap();
        let persisted: InsightResult = serde_json::from_str(&blob).unwrap();
        assert_eq!(persisted, out.data);
    }

    #[tokio::test]
    async fn fallback_insight_is_not_persisted() {
        let store = Arc::new(MemoryStore::default());
        store
            .records
            .lock()
            .unwrap()
            .insert("c3".into(), record("c3", "Stored Title"));

        let out = enricher(None)
            .with_store(store.clone())
            .insight(&EnrichmentRequest {
                content_id: Some("c3".into()),
                ..Default::default()
            })
            .await;

        assert!(out.fallback);
        assert!(out.data.body.insights.value.contains("Stored Title"));
        assert_eq!(out.data.body.key_points[0].content, "Stored summary");
        assert!(store.insights.lock().unwrap().is_empty());
    }

    // --- comment assist ---

    #[tokio::test]
    async fn comment_suggestions_from_model() {
        let payload = json!({"suggestions": [
            {"angle": "practical", "content": "I will try this at work", "icon": "🎯"},
            {"angle": "growth", "content": "This changed my view"},
        ]})
        .to_string();
        let server = model_replying(&payload).await;

        let out = enricher(Some(&server)).assist_comment(&titled("T")).await;
        assert!(!out.fallback);
        assert_eq!(out.data.suggestions.len(), 2);
        assert_eq!(out.data.suggestions[1].icon, "💡");
    }

    #[tokio::test]
    async fn malformed_comment_output_falls_back() {
        let server = model_replying("Here are some ideas: {suggestions: oops}").await;
        let out = enricher(Some(&server))
            .assist_comment(&titled("Designing Data Pipelines"))
            .await;

        assert!(out.success);
        assert!(out.fallback);
        assert!(out.error.unwrap().starts_with("malformed-json"));
        assert_eq!(out.data.suggestions.len(), 3);
    }

    #[tokio::test]
    async fn comment_with_unknown_content_id_still_succeeds() {
        let out = enricher(None)
            .with_store(Arc::new(MemoryStore::default()))
            .assist_comment(&EnrichmentRequest {
                content_id: Some("nope".into()),
                ..titled("Designing Data Pipelines")
            })
            .await;

        assert!(out.success);
        assert!(out.fallback);
        assert_eq!(out.data.suggestions.len(), 3);
        assert!(out.data.suggestions[0].content.contains("Designing Data Pipelines"));
    }

    #[tokio::test]
    async fn comment_survives_store_errors() {
        let out = enricher(None)
            .with_store(Arc::new(UnavailableStore))
            .assist_comment(&EnrichmentRequest {
                content_id: Some("c1".into()),
                ..titled("Designing Data Pipelines")
            })
            .await;

        assert!(out.success);
        assert_eq!(out.data.suggestions.len(), 3);
    }

    #[tokio::test]
    async fn comment_uses_stored_title_and_prior_insight() {
        let stored = InsightResult {
            body: InsightBody {
                key_points: vec![KeyPoint {
                    title: "idempotent retries".into(),
                    content: "c".into(),
                    importance: 1,
                }],
                ..Default::default()
            },
            generated_at: Utc::now(),
            model_version: "test-model".into(),
        };
        let mut rec = record("c5", "Stored Title");
        rec.ai_insight = Some(serde_json::to_string(&stored).unwrap());

        let store = Arc::new(MemoryStore::default());
        store.records.lock().unwrap().insert("c5".into(), rec);

        let out = enricher(None)
            .with_store(store)
            .assist_comment(&EnrichmentRequest {
                content_id: Some("c5".into()),
                ..Default::default()
            })
            .await;

        let practical = &out.data.suggestions[0].content;
        assert!(practical.contains("Stored Title"));
        assert!(practical.contains("idempotent retries"));
    }

    // --- parse link ---

    #[tokio::test]
    async fn parse_link_reports_failure() {
        let out = enricher(None).parse_link("not a url").await;
        assert!(!out.success);
        assert!(out.data.is_none());
        assert!(out.message.is_some());
    }

    #[tokio::test]
    async fn parse_link_extracts_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/post"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<html><head><meta property="og:title" content="Hello"></head></html>"#,
                "text/html",
            ))
            .mount(&server)
            .await;

        let out = enricher(None)
            .parse_link(&format!("{}/post", server.uri()))
            .await;
        assert!(out.success);
        let data = out.data.unwrap();
        assert_eq!(data.title, "Hello");
        assert_eq!(data.source, SourceType::External);
    }

    // --- add flow ---

    #[tokio::test]
    async fn add_link_stores_descriptor_and_classification() {
        let page = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<html><head><title>Sourdough recipe for beginners</title></head></html>"#,
                "text/html; charset=utf-8",
            ))
            .mount(&page)
            .await;

        let db = std::env::temp_dir().join(format!("ll_core_{}.db", uuid::Uuid::now_v7()));
        let storage = Storage::open(&db).await.unwrap();

        let result = enricher(None)
            .add_link(&storage, &format!("{}/bread", page.uri()), &SilentProgress)
            .await
            .unwrap();

        assert!(result.classification.fallback);
        assert_eq!(result.classification.data.category, Category::Food);

        let stored = storage.get_content(&result.id).await.unwrap().unwrap();
        assert_eq!(stored.descriptor.title, "Sourdough recipe for beginners");
        assert_eq!(
            stored.classification.map(|c| c.category),
            Some(Category::Food)
        );
    }

    #[tokio::test]
    async fn add_link_keeps_extraction_failure_kind() {
        let page = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47]),
            )
            .mount(&page)
            .await;

        let db = std::env::temp_dir().join(format!("ll_core_{}.db", uuid::Uuid::now_v7()));
        let storage = Storage::open(&db).await.unwrap();
        let enricher = enricher(None);

        let err = enricher
            .add_link(&storage, &format!("{}/logo.png", page.uri()), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, LinkLensError::Parse { .. }), "{err}");

        let err = enricher
            .add_link(&storage, "not a url", &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, LinkLensError::Validation { .. }), "{err}");
    }
}
