//! Postgres-backed event log.
//!
//! ## Ordering
//!
//! `append` takes a transaction-scoped advisory lock before inserting, so two
//! transactions never interleave their appends. The `BIGSERIAL` id therefore
//! follows commit order, and `created_at` is clamped to the newest committed
//! row so the `(created_at, id)` order matches the id order.
//!
//! The lock is released by Postgres on commit or rollback.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use chronicle_core::{AggregateId, EventId};
use chronicle_events::{EventEnvelope, StoredEvent};

use super::query::EventWindow;
use super::r#trait::{EventStore, UncommittedEvent};
use crate::error::{map_sqlx_error, PersistenceError};

/// Advisory lock key serialising appends ("events" in ASCII).
const APPEND_LOCK_KEY: i64 = 0x0065_7665_6e74_73;

#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    type Tx = Transaction<'static, Postgres>;

    #[instrument(
        skip(self, tx, event),
        fields(aggregate_id = %event.aggregate_id, kind = %event.kind),
        err
    )]
    async fn append(
        &self,
        tx: &mut Self::Tx,
        event: UncommittedEvent,
    ) -> Result<StoredEvent, PersistenceError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(APPEND_LOCK_KEY)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("append", e))?;

        let row = sqlx::query(
            r#"
            INSERT INTO events (aggregate_id, aggregate_kind, kind, version, created_at, payload)
            VALUES (
                $1, $2, $3, $4,
                GREATEST(
                    clock_timestamp(),
                    COALESCE((SELECT MAX(created_at) FROM events), '-infinity'::timestamptz)
                ),
                $5
            )
            RETURNING id, aggregate_id, aggregate_kind, kind, version, created_at, payload
            "#,
        )
        .bind(event.aggregate_id.get())
        .bind(&event.aggregate_kind)
        .bind(&event.kind)
        .bind(&event.version)
        .bind(&event.payload)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("append", e))?;

        let stored = StoredEventRow::from_pg_row(&row)
            .map_err(|e| map_sqlx_error("append", e))?
            .into_stored()?;

        tracing::debug!(event_id = %stored.id(), "event appended");
        Ok(stored)
    }

    #[instrument(skip(self), fields(since = %window.since, limit = window.limit), err)]
    async fn query_global(&self, window: EventWindow) -> Result<Vec<StoredEvent>, PersistenceError> {
        let rows = sqlx::query(
            r#"
            SELECT id, aggregate_id, aggregate_kind, kind, version, created_at, payload
            FROM events
            WHERE created_at >= $1
              AND (created_at > $1 OR $2::bigint IS NULL OR id > $2)
            ORDER BY created_at ASC, id ASC
            LIMIT $3
            "#,
        )
        .bind(window.since)
        .bind(window.after.map(EventId::get))
        .bind(i64::from(window.limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("query_global", e))?;

        collect_rows("query_global", rows)
    }

    #[instrument(
        skip(self),
        fields(aggregate_id = %aggregate_id, since = %window.since, limit = window.limit),
        err
    )]
    async fn query_by_aggregate(
        &self,
        aggregate_id: AggregateId,
        window: EventWindow,
    ) -> Result<Vec<StoredEvent>, PersistenceError> {
        let rows = sqlx::query(
            r#"
            SELECT id, aggregate_id, aggregate_kind, kind, version, created_at, payload
            FROM events
            WHERE aggregate_id = $4
              AND created_at >= $1
              AND (created_at > $1 OR $2::bigint IS NULL OR id > $2)
            ORDER BY created_at ASC, id ASC
            LIMIT $3
            "#,
        )
        .bind(window.since)
        .bind(window.after.map(EventId::get))
        .bind(i64::from(window.limit))
        .bind(aggregate_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("query_by_aggregate", e))?;

        collect_rows("query_by_aggregate", rows)
    }
}

fn collect_rows(
    operation: &str,
    rows: Vec<sqlx::postgres::PgRow>,
) -> Result<Vec<StoredEvent>, PersistenceError> {
    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        let stored = StoredEventRow::from_pg_row(&row)
            .map_err(|e| map_sqlx_error(operation, e))?
            .into_stored()?;
        events.push(stored);
    }
    Ok(events)
}

#[derive(Debug)]
struct StoredEventRow {
    id: i64,
    aggregate_id: i64,
    aggregate_kind: String,
    kind: String,
    version: String,
    created_at: DateTime<Utc>,
    payload: Vec<u8>,
}

impl StoredEventRow {
    fn from_pg_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredEventRow {
            id: row.try_get("id")?,
            aggregate_id: row.try_get("aggregate_id")?,
            aggregate_kind: row.try_get("aggregate_kind")?,
            kind: row.try_get("kind")?,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            payload: row.try_get("payload")?,
        })
    }

    fn into_stored(self) -> Result<StoredEvent, PersistenceError> {
        let id = EventId::new(self.id).map_err(|e| PersistenceError::RowDecode(e.to_string()))?;
        let aggregate_id =
            AggregateId::new(self.aggregate_id).map_err(|e| PersistenceError::RowDecode(e.to_string()))?;

        Ok(EventEnvelope::new(
            id,
            aggregate_id,
            self.aggregate_kind,
            self.kind,
            self.version,
            self.created_at,
            self.payload,
        ))
    }
}
