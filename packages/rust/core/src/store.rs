//! The storage seam the pipeline depends on.

use async_trait::async_trait;

use linklens_shared::{ContentRecord, Result};
use linklens_storage::Storage;

/// Read a content record by id and read/write its insight blob.
#[async_trait]
pub trait InsightStore: Send + Sync {
    async fn get_content(&self, id: &str) -> Result<Option<ContentRecord>>;

    async fn get_insight(&self, id: &str) -> Result<Option<String>>;

    async fn set_insight(&self, id: &str, insight_json: &str) -> Result<()>;
}

#[async_trait]
impl InsightStore for Storage {
    async fn get_content(&self, id: &str) -> Result<Option<ContentRecord>> {
        Storage::get_content(self, id).await
    }

    async fn get_insight(&self, id: &str) -> Result<Option<String>> {
        Storage::get_insight(self, id).await
    }

    async fn set_insight(&self, id: &str, insight_json: &str) -> Result<()> {
        Storage::set_insight(self, id, insight_json).await
    }
}
