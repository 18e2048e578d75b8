//! Couples one aggregate mutation with exactly one appended event.
//!
//! The pair is written inside a single [`AtomicScope`]. The scope commits only
//! when both writes succeeded; on every other exit (an error, `?`, a panic in an
//! event builder, or the future being dropped) the guard goes out of scope and
//! the transaction rolls back.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tracing::instrument;

use chronicle_core::{AggregateId, AggregateRoot, Mutation};
use chronicle_events::{encode_event, CodecError, Event, StoredEvent};

use crate::backend::Backend;
use crate::error::PersistenceError;
use crate::event_store::{EventStore, UncommittedEvent};

/// Boxed future borrowed from an open transaction.
pub type ScopeFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("aggregate {0} not found")]
    NotFound(AggregateId),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("failed to encode event: {0}")]
    Encode(#[from] CodecError),
}

/// An open transaction that rolls back unless [`AtomicScope::commit`] is called.
pub struct AtomicScope<'b, B: Backend> {
    backend: &'b B,
    tx: Option<B::Tx>,
}

impl<'b, B: Backend> AtomicScope<'b, B> {
    pub async fn begin(backend: &'b B) -> Result<Self, PersistenceError> {
        let tx = backend.begin().await?;
        Ok(Self {
            backend,
            tx: Some(tx),
        })
    }

    pub fn tx_mut(&mut self) -> Result<&mut B::Tx, PersistenceError> {
        self.tx
            .as_mut()
            .ok_or_else(|| PersistenceError::Transaction("scope already finished".to_string()))
    }

    pub async fn commit(mut self) -> Result<(), PersistenceError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| PersistenceError::Transaction("scope already finished".to_string()))?;
        self.backend.commit(tx).await
    }
}

impl<B: Backend> Drop for AtomicScope<'_, B> {
    fn drop(&mut self) {
        if self.tx.take().is_some() {
            tracing::debug!("atomic scope left without commit; rolled back");
        }
    }
}

/// Result of a committed command: the aggregate after the change, and its event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<A> {
    pub aggregate: A,
    pub event: StoredEvent,
}

#[derive(Debug, Clone)]
pub struct TransactionCoordinator<B, S> {
    backend: B,
    store: S,
}

impl<B, S> TransactionCoordinator<B, S>
where
    B: Backend,
    S: EventStore<Tx = B::Tx>,
{
    pub fn new(backend: B, store: S) -> Self {
        Self { backend, store }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run `mutation` and append the event `build_event` derives from it, atomically.
    ///
    /// `mutation` receives the open transaction and must do all of its writes
    /// through it and may fail with any error that converts into [`CommandError`].
    /// `build_event` sees the before/after state and picks the event.
    #[instrument(skip_all, fields(aggregate_kind = A::KIND), err)]
    pub async fn execute<A, Ev, E, M, F>(
        &self,
        mutation: M,
        build_event: F,
    ) -> Result<Committed<A>, CommandError>
    where
        A: AggregateRoot + Send,
        Ev: Event,
        E: Into<CommandError>,
        M: for<'t> FnOnce(&'t mut B::Tx) -> ScopeFuture<'t, Result<Mutation<A>, E>> + Send,
        F: FnOnce(&Mutation<A>) -> Ev + Send,
    {
        let mut scope = AtomicScope::begin(&self.backend).await?;

        let mutation = mutation(scope.tx_mut()?).await.map_err(Into::<CommandError>::into)?;
        let encoded = encode_event(&build_event(&mutation))?;
        let event = UncommittedEvent::for_aggregate(mutation.current(), encoded);

        let stored = self.store.append(scope.tx_mut()?, event).await?;
        scope.commit().await?;

        tracing::debug!(
            event_id = %stored.id(),
            aggregate_id = %stored.aggregate_id(),
            kind = stored.kind(),
            "mutation committed"
        );

        Ok(Committed {
            aggregate: mutation.into_current(),
            event: stored,
        })
    }
}
