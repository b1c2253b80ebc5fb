//! libSQL storage layer for saved content.
//!
//! The [`Storage`] struct wraps a local libSQL database holding content
//! records, their classification, and the opaque insight blob the enrichment
//! pipeline reads and writes by content id.

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use linklens_shared::{
    Category, ClassificationResult, ContentDescriptor, ContentRecord, LinkLensError, Result,
    SourceType,
};
use uuid::Uuid;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LinkLensError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LinkLensError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| LinkLensError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        LinkLensError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Content operations
    // -----------------------------------------------------------------------

    /// Insert a new content record. Returns the generated id.
    pub async fn insert_content(&self, descriptor: &ContentDescriptor) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO content (id, url, title, description, thumbnail, source, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.as_str(),
                    descriptor.url.as_str(),
                    descriptor.title.as_str(),
                    descriptor.description.as_str(),
                    descriptor.thumbnail.as_str(),
                    descriptor.source_type.as_str(),
                    now.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| LinkLensError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// Read a content record by id.
    pub async fn get_content(&self, id: &str) -> Result<Option<ContentRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, url, title, description, thumbnail, source, category, tags_json,
                        summary, ai_insight, created_at, updated_at
                 FROM content WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(|e| LinkLensError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(LinkLensError::Storage(e.to_string())),
        }
    }

    /// Store a classification on an existing record.
    pub async fn set_classification(
        &self,
        id: &str,
        classification: &ClassificationResult,
    ) -> Result<()> {
        let tags_json = serde_json::to_string(&classification.tags)
            .map_err(|e| LinkLensError::Storage(e.to_string()))?;
        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn
            .execute(
                "UPDATE content SET category = ?1, tags_json = ?2, summary = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    classification.category.as_str(),
                    tags_json.as_str(),
                    classification.summary.as_str(),
                    now.as_str(),
                    id,
                ],
            )
            .await
            .map_err(|e| LinkLensError::Storage(e.to_string()))?;
        ensure_updated(changed, id)
    }

    // -----------------------------------------------------------------------
    // Insight blob operations
    // -----------------------------------------------------------------------

    /// Read the insight blob for a record, if any.
    pub async fn get_insight(&self, id: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT ai_insight FROM content WHERE id = ?1", params![id])
            .await
            .map_err(|e| LinkLensError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<String>(0).ok().filter(|s| !s.is_empty())),
            Ok(None) => Ok(None),
            Err(e) => Err(LinkLensError::Storage(e.to_string())),
        }
    }

    /// Overwrite the insight blob for a record. Last write wins.
    pub async fn set_insight(&self, id: &str, insight_json: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn
            .execute(
                "UPDATE content SET ai_insight = ?1, updated_at = ?2 WHERE id = ?3",
                params![insight_json, now.as_str(), id],
            )
            .await
            .map_err(|e| LinkLensError::Storage(e.to_string()))?;
        ensure_updated(changed, id)
    }
}

fn ensure_updated(changed: u64, id: &str) -> Result<()> {
    if changed == 0 {
        return Err(LinkLensError::validation(format!(
            "no content record with id {id}"
        )));
    }
    Ok(())
}

/// Convert a database row to a [`ContentRecord`].
fn row_to_record(row: &libsql::Row) -> Result<ContentRecord> {
    let text = |idx: i32| -> Result<String> {
        row.get::<String>(idx)
            .map_err(|e| LinkLensError::Storage(e.to_string()))
    };

    let classification = match row.get::<String>(6).ok() {
        Some(category) => {
            let tags: Vec<String> = serde_json::from_str(&text(7)?).unwrap_or_default();
            Some(ClassificationResult {
                category: Category::from_label(&category).unwrap_or(Category::Other),
                tags,
                summary: text(8)?,
            })
        }
        None => None,
    };

    Ok(ContentRecord {
        id: text(0)?,
        descriptor: ContentDescriptor {
            url: text(1)?,
            title: text(2)?,
            description: text(3)?,
            thumbnail: text(4)?,
            source_type: SourceType::from_wire(&text(5)?),
        },
        classification,
        ai_insight: row.get::<String>(9).ok().filter(|s| !s.is_empty()),
        created_at: parse_timestamp(&text(10)?)?,
        updated_at: parse_timestamp(&text(11)?)?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LinkLensError::parse(format!("invalid stored timestamp: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("ll_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn descriptor() -> ContentDescriptor {
        ContentDescriptor {
            url: "https://example.com/post".into(),
            title: "Designing Data Pipelines".into(),
            description: "Notes on idempotent stages".into(),
            thumbnail: "https://example.com/cover.png".into(),
            source_type: SourceType::External,
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("ll_test_{}.db", Uuid::now_v7()));
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn content_insert_and_read() {
        let storage = test_storage().await;
        let id = storage.insert_content(&descriptor()).await.expect("insert");

        let record = storage.get_content(&id).await.expect("get").expect("present");
        assert_eq!(record.id, id);
        assert_eq!(record.descriptor, descriptor());
        assert!(record.classification.is_none());
        assert!(record.ai_insight.is_none());

        assert!(storage.get_content("missing").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn classification_is_persisted() {
        let storage = test_storage().await;
        let id = storage.insert_content(&descriptor()).await.unwrap();

        let classification = ClassificationResult {
            category: Category::Technology,
            tags: vec!["pipelines".into(), "rust".into()],
            summary: "How to build idempotent stages".into(),
        };
        storage.set_classification(&id, &classification).await.unwrap();

        let record = storage.get_content(&id).await.unwrap().unwrap();
        assert_eq!(record.classification, Some(classification));
    }

    #[tokio::test]
    async fn insight_blob_last_write_wins() {
        let storage = test_storage().await;
        let id = storage.insert_content(&descriptor()).await.unwrap();

        assert!(storage.get_insight(&id).await.unwrap().is_none());
        storage.set_insight(&id, r#"{"v":1}"#).await.unwrap();
        storage.set_insight(&id, r#"{"v":2}"#).await.unwrap();
        assert_eq!(
            storage.get_insight(&id).await.unwrap().as_deref(),
            Some(r#"{"v":2}"#)
        );
    }

    #[tokio::test]
    async fn updates_to_unknown_id_fail() {
        let storage = test_storage().await;
        let err = storage.set_insight("nope", "{}").await.unwrap_err();
        assert!(err.to_string().contains("no content record"));
        assert!(
            storage
                .set_classification("nope", &ClassificationResult::default())
                .await
                .is_err()
        );
    }
}
