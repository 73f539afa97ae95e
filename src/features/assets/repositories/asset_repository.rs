use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::assets::models::{FileMetadata, FileMetadataChanges, NewFileMetadata};

/// Persistence for asset metadata. Every mutation a caller can trigger is
/// owner-scoped in its predicate.
#[async_trait]
pub trait AssetRepository: Send + Sync {
    /// Insert all rows or none of them
    async fn insert_batch(&self, rows: Vec<NewFileMetadata>) -> Result<Vec<FileMetadata>>;

    async fn find_by_key(&self, key: &str) -> Result<Option<FileMetadata>>;

    /// Apply `changes` to the row `id` owned by `owner_id`; `None` if no such row
    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: &str,
        changes: FileMetadataChanges,
    ) -> Result<Option<FileMetadata>>;

    /// Delete the row matching both `key` and `owner_id`; `false` if none matched
    async fn delete_owned(&self, key: &str, owner_id: &str) -> Result<bool>;

    /// Newest first
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<FileMetadata>>;

    /// Rows never confirmed against storage and created before `older_than`,
    /// ordered by `(created_at, id)` and starting strictly after `after`
    async fn list_unconfirmed(
        &self,
        older_than: DateTime<Utc>,
        after: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<Vec<FileMetadata>>;

    async fn mark_confirmed(&self, id: Uuid) -> Result<()>;

    /// Delete `id` only if it is still unconfirmed
    async fn delete_unconfirmed(&self, id: Uuid) -> Result<bool>;
}

const COLUMNS: &str = "id, key, mime_type, size_bytes, checksum, name, description, \
                       owner_id, created_at, updated_at, confirmed_at";

/// PostgreSQL-backed asset repository
#[derive(Clone)]
pub struct PgAssetRepository {
    pool: PgPool,
}

impl PgAssetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_insert_error(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict("An asset with this key already exists".to_string())
        }
        other => AppError::Database(other),
    }
}

#[async_trait]
impl AssetRepository for PgAssetRepository {
    async fn insert_batch(&self, rows: Vec<NewFileMetadata>) -> Result<Vec<FileMetadata>> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(rows.len());

        for row in rows {
            let file = sqlx::query_as::<_, FileMetadata>(&format!(
                r#"
                INSERT INTO assets (key, mime_type, size_bytes, checksum, name, owner_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {COLUMNS}
                "#
            ))
            .bind(&row.key)
            .bind(&row.mime_type)
            .bind(row.size_bytes)
            .bind(&row.checksum)
            .bind(&row.name)
            .bind(&row.owner_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_insert_error)?;
            inserted.push(file);
        }

        // Dropping `tx` on an early return rolls the whole batch back
        tx.commit().await?;
        Ok(inserted)
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<FileMetadata>> {
        let file = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {COLUMNS} FROM assets WHERE key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(file)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: &str,
        changes: FileMetadataChanges,
    ) -> Result<Option<FileMetadata>> {
        let (set_description, description) = match changes.description {
            Some(description) => (true, description),
            None => (false, None),
        };

        let file = sqlx::query_as::<_, FileMetadata>(&format!(
            r#"
            UPDATE assets
            SET name = COALESCE($3, name),
                description = CASE WHEN $4 THEN $5 ELSE description END,
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(changes.name)
        .bind(set_description)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(file)
    }

    async fn delete_owned(&self, key: &str, owner_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM assets WHERE key = $1 AND owner_id = $2")
            .bind(key)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<FileMetadata>> {
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {COLUMNS} FROM assets WHERE owner_id = $1 ORDER BY created_at DESC, id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(files)
    }

    async fn list_unconfirmed(
        &self,
        older_than: DateTime<Utc>,
        after: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<Vec<FileMetadata>> {
        let (after_created_at, after_id) = after.unzip();
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            r#"
            SELECT {COLUMNS} FROM assets
            WHERE confirmed_at IS NULL AND created_at < $1
              AND ($2::timestamptz IS NULL OR (created_at, id) > ($2, $3::uuid))
            ORDER BY created_at, id
            LIMIT $4
            "#
        ))
        .bind(older_than)
        .bind(after_created_at)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(files)
    }

    async fn mark_confirmed(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE assets SET confirmed_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_unconfirmed(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM assets WHERE id = $1 AND confirmed_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
