//! Postgres-backed [`DocumentStore`] over a single JSONB table.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use super::{DocumentStore, Filter, StoreError, StoreResult, StoredDocument};

#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let data: Option<Json<Value>> = sqlx::query_scalar(
            // language=PostgreSQL
            r#"
                SELECT data
                FROM documents
                WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(data.map(|Json(value)| value))
    }

    async fn create(&self, collection: &str, id: &str, doc: Value) -> StoreResult<String> {
        let result = sqlx::query(
            // language=PostgreSQL
            r#"
                INSERT INTO documents (collection, id, data)
                VALUES ($1, $2, $3)
                ON CONFLICT (collection, id) DO NOTHING
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(doc))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        Ok(id.to_string())
    }

    async fn set(&self, collection: &str, id: &str, doc: Value) -> StoreResult<()> {
        sqlx::query(
            // language=PostgreSQL
            r#"
                INSERT INTO documents (collection, id, data)
                VALUES ($1, $2, $3)
                ON CONFLICT (collection, id)
                DO UPDATE SET
                    data = EXCLUDED.data,
                    updated_at = NOW()
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(doc))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Map<String, Value>) -> StoreResult<()> {
        // `||` on jsonb objects is a shallow merge, right side wins
        let result = sqlx::query(
            // language=PostgreSQL
            r#"
                UPDATE documents
                SET data = data || $3,
                    updated_at = NOW()
                WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(patch)))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        Ok(())
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<StoredDocument>> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT id, data FROM documents WHERE collection = ");
        builder.push_bind(collection);

        for filter in filters {
            builder
                .push(" AND data -> ")
                .push_bind(filter.field.as_str())
                .push(" = ")
                .push_bind(Json(filter.value.clone()));
        }
        builder.push(" ORDER BY created_at, id");

        let rows: Vec<(String, Json<Value>)> = builder.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(id, Json(data))| StoredDocument { id, data })
            .collect())
    }
}
