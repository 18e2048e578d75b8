//! In-memory event log backed by [`InMemoryBackend`].

use async_trait::async_trait;
use chrono::Utc;

use chronicle_core::AggregateId;
use chronicle_events::{EventEnvelope, StoredEvent};
use chronicle_users::UserId;

use super::query::EventWindow;
use super::r#trait::{EventStore, UncommittedEvent};
use crate::backend::{InMemoryBackend, MemoryTx};
use crate::error::PersistenceError;

#[derive(Debug, Clone)]
pub struct InMemoryEventStore {
    backend: InMemoryBackend,
}

impl InMemoryEventStore {
    pub fn new(backend: &InMemoryBackend) -> Self {
        Self {
            backend: backend.clone(),
        }
    }

    fn select(
        &self,
        window: EventWindow,
        matches: impl Fn(&StoredEvent) -> bool,
    ) -> Result<Vec<StoredEvent>, PersistenceError> {
        let tables = self.backend.db().read()?;
        let mut page: Vec<StoredEvent> = tables
            .events
            .iter()
            .filter(|e| window.admits(e) && matches(e))
            .cloned()
            .collect();

        page.sort_by_key(|e| (e.created_at(), e.id()));
        page.truncate(window.limit_usize());
        Ok(page)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    type Tx = MemoryTx;

    async fn append(
        &self,
        tx: &mut Self::Tx,
        event: UncommittedEvent,
    ) -> Result<StoredEvent, PersistenceError> {
        // Mirrors the `events.aggregate_id` foreign key.
        if tx.visible_user(UserId::new(event.aggregate_id))?.is_none() {
            return Err(PersistenceError::Constraint(format!(
                "event references aggregate {} which has no row",
                event.aggregate_id
            )));
        }

        // Held until commit/rollback, so ids and timestamps follow commit order.
        tx.lock_log().await;

        let id = tx.next_event_id()?;
        let now = Utc::now();
        let created_at = match tx.last_event_created_at()? {
            Some(last) => now.max(last),
            None => now,
        };

        let stored = EventEnvelope::new(
            id,
            event.aggregate_id,
            event.aggregate_kind,
            event.kind,
            event.version,
            created_at,
            event.payload,
        );
        tx.stage_event(stored.clone());
        Ok(stored)
    }

    async fn query_global(&self, window: EventWindow) -> Result<Vec<StoredEvent>, PersistenceError> {
        self.select(window, |_| true)
    }

    async fn query_by_aggregate(
        &self,
        aggregate_id: AggregateId,
        window: EventWindow,
    ) -> Result<Vec<StoredEvent>, PersistenceError> {
        self.select(window, |e| e.aggregate_id() == aggregate_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::repository::{InMemoryUserRepository, UserRepository};
    use chronicle_core::AggregateRoot;
    use chronicle_users::UserDraft;

    fn uncommitted(aggregate_id: AggregateId) -> UncommittedEvent {
        UncommittedEvent {
            aggregate_id,
            aggregate_kind: "user".to_string(),
            kind: "UserCreated".to_string(),
            version: "v1".to_string(),
            payload: br#"{"id":1,"name":"a"}"#.to_vec(),
        }
    }

    #[tokio::test]
    async fn event_for_unknown_aggregate_violates_constraint() {
        let backend = InMemoryBackend::new();
        let store = InMemoryEventStore::new(&backend);

        let mut tx = backend.begin().await.unwrap();
        let err = store
            .append(&mut tx, uncommitted(AggregateId::new(777).unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Constraint(_)));

        backend.commit(tx).await.unwrap();
        assert!(store.query_global(EventWindow::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn event_for_row_staged_in_same_transaction_is_accepted() {
        let backend = InMemoryBackend::new();
        let store = InMemoryEventStore::new(&backend);
        let repo = InMemoryUserRepository::new(&backend);

        let mut tx = backend.begin().await.unwrap();
        let user = repo.create(&mut tx, &UserDraft::new("alice", "pw")).await.unwrap();
        let stored = store.append(&mut tx, uncommitted(user.id().into())).await.unwrap();
        backend.commit(tx).await.unwrap();

        assert_eq!(
            store.query_global(EventWindow::default()).await.unwrap(),
            vec![stored]
        );
    }
}
