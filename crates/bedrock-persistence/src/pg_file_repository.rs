//! `PostgreSQL` implementation of the `FileRepository` trait.

use async_trait::async_trait;
use bedrock_core::error::DomainError;
use bedrock_storage::domain::aggregates::File;
use bedrock_storage::domain::repository::FileRepository;
use bedrock_storage::domain::value_objects::{FileMetadata, FileOwner, FilePath};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::error::{corrupt_row, db_error};

const COLUMNS: &str = "id, entity_type, entity_id, field, filename, path, mime_type, size, \
                       width, height, created_at, updated_at";

/// PostgreSQL-backed file metadata repository.
#[derive(Debug, Clone)]
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    /// Creates a new `PgFileRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn file_from_row(row: &PgRow) -> Result<File, DomainError> {
    let get = |e: sqlx::Error| db_error("failed to read file row", e);
    let path: String = row.try_get("path").map_err(get)?;
    let size: i64 = row.try_get("size").map_err(get)?;
    let width: Option<i32> = row.try_get("width").map_err(get)?;
    let height: Option<i32> = row.try_get("height").map_err(get)?;

    let metadata = FileMetadata::new(
        row.try_get::<String, _>("mime_type").map_err(get)?,
        u64::try_from(size).map_err(|e| corrupt_row("size", e))?,
        width
            .map(u32::try_from)
            .transpose()
            .map_err(|e| corrupt_row("width", e))?,
        height
            .map(u32::try_from)
            .transpose()
            .map_err(|e| corrupt_row("height", e))?,
    );
    let owner = FileOwner::new(
        row.try_get::<String, _>("entity_type").map_err(get)?,
        row.try_get::<String, _>("entity_id").map_err(get)?,
        row.try_get::<String, _>("field").map_err(get)?,
    );

    Ok(File::restore(
        row.try_get("id").map_err(get)?,
        owner,
        row.try_get("filename").map_err(get)?,
        path.parse::<FilePath>().map_err(|e| corrupt_row("path", e))?,
        metadata,
        row.try_get("created_at").map_err(get)?,
        row.try_get("updated_at").map_err(get)?,
    ))
}

fn to_i64(value: u64, column: &str) -> Result<i64, DomainError> {
    i64::try_from(value).map_err(|e| DomainError::Validation(format!("{column} out of range: {e}")))
}

fn to_i32(value: Option<u32>, column: &str) -> Result<Option<i32>, DomainError> {
    value
        .map(i32::try_from)
        .transpose()
        .map_err(|e| DomainError::Validation(format!("{column} out of range: {e}")))
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn find_by_id(&self, file_id: Uuid) -> Result<Option<File>, DomainError> {
        let sql = format!("SELECT {COLUMNS} FROM files WHERE id = $1");
        sqlx::query(&sql)
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("failed to find file", e))?
            .map(|row| file_from_row(&row))
            .transpose()
    }

    async fn find_by_path(&self, path: &str) -> Result<Option<File>, DomainError> {
        let sql = format!("SELECT {COLUMNS} FROM files WHERE path = $1");
        sqlx::query(&sql)
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("failed to find file by path", e))?
            .map(|row| file_from_row(&row))
            .transpose()
    }

    async fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<File>, DomainError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM files WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("failed to list entity files", e))?;
        rows.iter().map(file_from_row).collect()
    }

    async fn find_by_entity_and_field(
        &self,
        entity_type: &str,
        entity_id: &str,
        field: &str,
    ) -> Result<Option<File>, DomainError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM files \
             WHERE entity_type = $1 AND entity_id = $2 AND field = $3 \
             ORDER BY created_at DESC LIMIT 1"
        );
        sqlx::query(&sql)
            .bind(entity_type)
            .bind(entity_id)
            .bind(field)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("failed to find file by owner", e))?
            .map(|row| file_from_row(&row))
            .transpose()
    }

    async fn create(&self, file: &File) -> Result<(), DomainError> {
        let metadata = file.metadata();
        sqlx::query(
            "INSERT INTO files (id, entity_type, entity_id, field, filename, path, mime_type, \
             size, width, height, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(file.id)
        .bind(file.entity_type())
        .bind(file.entity_id())
        .bind(file.field())
        .bind(file.filename())
        .bind(file.path().to_string())
        .bind(metadata.mime_type())
        .bind(to_i64(metadata.size(), "size")?)
        .bind(to_i32(metadata.width(), "width")?)
        .bind(to_i32(metadata.height(), "height")?)
        .bind(file.created_at())
        .bind(file.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("failed to create file", e))?;
        debug!(file_id = %file.id, path = %file.path(), "inserted file row");
        Ok(())
    }

    async fn update(&self, file: &File) -> Result<(), DomainError> {
        let metadata = file.metadata();
        let result = sqlx::query(
            "UPDATE files SET entity_type = $2, entity_id = $3, field = $4, filename = $5, \
             path = $6, mime_type = $7, size = $8, width = $9, height = $10, updated_at = $11 \
             WHERE id = $1",
        )
        .bind(file.id)
        .bind(file.entity_type())
        .bind(file.entity_id())
        .bind(file.field())
        .bind(file.filename())
        .bind(file.path().to_string())
        .bind(metadata.mime_type())
        .bind(to_i64(metadata.size(), "size")?)
        .bind(to_i32(metadata.width(), "width")?)
        .bind(to_i32(metadata.height(), "height")?)
        .bind(file.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("failed to update file", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::AggregateNotFound(file.id));
        }
        Ok(())
    }

    async fn delete(&self, file_id: Uuid) -> Result<Option<File>, DomainError> {
        let sql = format!("DELETE FROM files WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query(&sql)
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("failed to delete file", e))?
            .map(|row| file_from_row(&row))
            .transpose()
    }

    async fn delete_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM files WHERE entity_type = $1 AND entity_id = $2")
            .bind(entity_type)
            .bind(entity_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("failed to delete entity files", e))?;
        debug!(entity_type, entity_id, removed = result.rows_affected(), "deleted file rows");
        Ok(result.rows_affected())
    }
}
