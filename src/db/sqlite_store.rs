use datum_core::{
    Body, Document, DocumentStore, Payload, PutResult, Revision, StoreError,
};
use serde_json::Value;
use sqlx::SqlitePool;

/// Document store backed by the `documents` table.
///
/// Writes are conditional statements; the number of affected rows tells
/// whether the expected revision was still current.
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    rev: String,
    body: Option<String>,
    deleted: bool,
}

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_row(&self, id: &str) -> Result<Option<DocumentRow>, StoreError> {
        sqlx::query_as("SELECT id, rev, body, deleted FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }

    fn hydrate(row: DocumentRow) -> Result<Document, StoreError> {
        let body = row.body.unwrap_or_default();
        let fields = match serde_json::from_str(&body).map_err(backend)? {
            Value::Object(fields) => fields,
            _ => return Err(backend(format!("stored body of {} is not an object", row.id))),
        };
        Ok(Document {
            body: Body::from_fields(fields).map_err(backend)?,
            rev: Revision::new(row.rev),
            id: row.id,
        })
    }
}

fn generation(rev: &Revision) -> i64 {
    rev.generation().unwrap_or(0) as i64
}

impl DocumentStore for SqliteStore {
    async fn get(&self, id: &str) -> Result<Document, StoreError> {
        match self.fetch_row(id).await? {
            None => Err(StoreError::Missing(id.to_string())),
            Some(row) if row.deleted => Err(StoreError::Deleted(id.to_string())),
            Some(row) => Self::hydrate(row),
        }
    }

    async fn put(&self, payload: &Payload) -> Result<PutResult, StoreError> {
        let id = payload
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(StoreError::MissingId)?;
        let body = Value::Object(payload.body.to_fields()).to_string();
        let human_id = payload.body.human_id();

        let rev = match &payload.rev {
            Some(expected) => {
                let rev = Revision::mint(Some(expected), Some(&payload.body));
                let result = sqlx::query(
                    r#"
                    UPDATE documents
                    SET rev = ?, generation = ?, human_id = ?, body = ?, deleted = 0
                    WHERE id = ? AND rev = ?
                    "#,
                )
                .bind(rev.as_str())
                .bind(generation(&rev))
                .bind(human_id)
                .bind(&body)
                .bind(id)
                .bind(expected.as_str())
                .execute(&self.pool)
                .await
                .map_err(backend)?;

                if result.rows_affected() == 0 {
                    return Err(StoreError::Conflict(id.to_string()));
                }
                rev
            }
            None => {
                let previous = match self.fetch_row(id).await? {
                    Some(row) if !row.deleted => return Err(StoreError::Conflict(id.to_string())),
                    Some(row) => Some(Revision::new(row.rev)),
                    None => None,
                };
                let rev = Revision::mint(previous.as_ref(), Some(&payload.body));

                // Only a fresh id or the tombstone read above may be replaced
                let result = sqlx::query(
                    r#"
                    INSERT INTO documents (id, rev, generation, human_id, body, deleted)
                    VALUES (?, ?, ?, ?, ?, 0)
                    ON CONFLICT(id) DO UPDATE SET
                        rev = excluded.rev,
                        generation = excluded.generation,
                        human_id = excluded.human_id,
                        body = excluded.body,
                        deleted = 0
                    WHERE documents.deleted = 1 AND documents.rev = ?
                    "#,
                )
                .bind(id)
                .bind(rev.as_str())
                .bind(generation(&rev))
                .bind(human_id)
                .bind(&body)
                .bind(previous.as_ref().map(Revision::as_str))
                .execute(&self.pool)
                .await
                .map_err(backend)?;

                if result.rows_affected() == 0 {
                    return Err(StoreError::Conflict(id.to_string()));
                }
                rev
            }
        };

        tracing::debug!("stored {} at {}", id, rev);
        Ok(PutResult {
            id: id.to_string(),
            rev,
        })
    }

    async fn remove(&self, id: &str, rev: &Revision) -> Result<(), StoreError> {
        let tombstone = Revision::mint(Some(rev), None);
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET rev = ?, generation = ?, human_id = NULL, body = NULL, deleted = 1
            WHERE id = ? AND rev = ? AND deleted = 0
            "#,
        )
        .bind(tombstone.as_str())
        .bind(generation(&tombstone))
        .bind(id)
        .bind(rev.as_str())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() > 0 {
            return Ok(());
        }
        match self.fetch_row(id).await? {
            None => Err(StoreError::Missing(id.to_string())),
            Some(row) if row.deleted => Err(StoreError::Deleted(id.to_string())),
            Some(_) => Err(StoreError::Conflict(id.to_string())),
        }
    }

    async fn ids_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT id FROM documents WHERE deleted = 0 AND substr(id, 1, ?) = ? ORDER BY id",
        )
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn ids_with_human_id_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT id FROM documents WHERE deleted = 0 AND substr(human_id, 1, ?) = ? ORDER BY id",
        )
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
