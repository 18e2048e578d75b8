//! Postgres-backed user table.
//!
//! `update` keeps `updated_at` monotonic with `GREATEST(now(), updated_at)`, so
//! a clock step backwards never makes a row look older than its last write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use chronicle_users::{CredentialSecret, User, UserDraft, UserId};

use super::{RepositoryError, UserRepository};
use crate::error::{map_sqlx_error, PersistenceError};

#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    type Tx = Transaction<'static, Postgres>;

    #[instrument(skip(self, tx, draft), err)]
    async fn create(&self, tx: &mut Self::Tx, draft: &UserDraft) -> Result<User, RepositoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (name, credential_secret)
            VALUES ($1, $2)
            RETURNING id, name, credential_secret, created_at, updated_at
            "#,
        )
        .bind(&draft.name)
        .bind(draft.credential_secret.expose())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;

        Ok(UserRow::from_pg_row(&row, "create_user")?.into_user()?)
    }

    #[instrument(skip(self, tx), fields(user_id = %id), err)]
    async fn find_for_update(&self, tx: &mut Self::Tx, id: UserId) -> Result<User, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, credential_secret, created_at, updated_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("find_user_for_update", e))?
        .ok_or(RepositoryError::NotFound(id))?;

        Ok(UserRow::from_pg_row(&row, "find_user_for_update")?.into_user()?)
    }

    #[instrument(skip(self, tx, draft), fields(user_id = %id), err)]
    async fn update(
        &self,
        tx: &mut Self::Tx,
        id: UserId,
        draft: &UserDraft,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query(
            r#"
            UPDATE users
            SET name = $2,
                credential_secret = $3,
                updated_at = GREATEST(now(), updated_at)
            WHERE id = $1
            RETURNING id, name, credential_secret, created_at, updated_at
            "#,
        )
        .bind(id.get())
        .bind(&draft.name)
        .bind(draft.credential_secret.expose())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?
        .ok_or(RepositoryError::NotFound(id))?;

        Ok(UserRow::from_pg_row(&row, "update_user")?.into_user()?)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get_by_id(&self, id: UserId) -> Result<User, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, credential_secret, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_user", e))?
        .ok_or(RepositoryError::NotFound(id))?;

        Ok(UserRow::from_pg_row(&row, "get_user")?.into_user()?)
    }

    #[instrument(skip(self), err)]
    async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, credential_secret, created_at, updated_at
            FROM users
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(UserRow::from_pg_row(&row, "list_users")?.into_user()?);
        }
        Ok(users)
    }
}

#[derive(Debug)]
struct UserRow {
    id: i64,
    name: String,
    credential_secret: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn from_pg_row(row: &sqlx::postgres::PgRow, operation: &str) -> Result<Self, PersistenceError> {
        let read = || -> Result<Self, sqlx::Error> {
            Ok(UserRow {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                credential_secret: row.try_get("credential_secret")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        };
        read().map_err(|e| map_sqlx_error(operation, e))
    }

    fn into_user(self) -> Result<User, PersistenceError> {
        let id = UserId::try_from(self.id).map_err(|e| PersistenceError::RowDecode(e.to_string()))?;
        Ok(User::from_parts(
            id,
            self.name,
            CredentialSecret::new(self.credential_secret),
            self.created_at,
            self.updated_at,
        ))
    }
}
