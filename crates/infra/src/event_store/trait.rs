use std::sync::Arc;

use async_trait::async_trait;

use chronicle_core::{AggregateId, AggregateRoot};
use chronicle_events::{EncodedEvent, StoredEvent};

use super::query::EventWindow;
use crate::error::PersistenceError;

/// An event about to be appended. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncommittedEvent {
    pub aggregate_id: AggregateId,
    pub aggregate_kind: String,
    pub kind: String,
    pub version: String,
    pub payload: Vec<u8>,
}

impl UncommittedEvent {
    /// Stamp an encoded event with the aggregate it describes.
    pub fn for_aggregate<A: AggregateRoot>(aggregate: &A, encoded: EncodedEvent) -> Self {
        Self {
            aggregate_id: aggregate.id().into(),
            aggregate_kind: A::KIND.to_string(),
            kind: encoded.kind,
            version: encoded.version,
            payload: encoded.payload,
        }
    }
}

/// Append-only event log.
///
/// `append` runs inside a caller-owned transaction and becomes visible only when
/// that transaction commits. Ids are assigned in commit order: an event with a
/// higher id was never visible before one with a lower id. Queries only see
/// committed events.
#[async_trait]
pub trait EventStore: Send + Sync {
    type Tx: Send + 'static;

    async fn append(
        &self,
        tx: &mut Self::Tx,
        event: UncommittedEvent,
    ) -> Result<StoredEvent, PersistenceError>;

    /// All events in the window, any aggregate.
    async fn query_global(&self, window: EventWindow) -> Result<Vec<StoredEvent>, PersistenceError>;

    /// Events in the window for one aggregate.
    async fn query_by_aggregate(
        &self,
        aggregate_id: AggregateId,
        window: EventWindow,
    ) -> Result<Vec<StoredEvent>, PersistenceError>;
}

#[async_trait]
impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    type Tx = S::Tx;

    async fn append(
        &self,
        tx: &mut Self::Tx,
        event: UncommittedEvent,
    ) -> Result<StoredEvent, PersistenceError> {
        (**self).append(tx, event).await
    }

    async fn query_global(&self, window: EventWindow) -> Result<Vec<StoredEvent>, PersistenceError> {
        (**self).query_global(window).await
    }

    async fn query_by_aggregate(
        &self,
        aggregate_id: AggregateId,
        window: EventWindow,
    ) -> Result<Vec<StoredEvent>, PersistenceError> {
        (**self).query_by_aggregate(aggregate_id, window).await
    }
}
