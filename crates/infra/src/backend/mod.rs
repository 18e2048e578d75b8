//! Storage handles that can open atomic scopes.
//!
//! A backend owns the shared connection resource (a pool, or an in-process
//! table set) and hands out transactions. Dropping a transaction without
//! committing it rolls it back; there is no separate rollback call.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::PersistenceError;

pub use in_memory::{InMemoryBackend, MemoryTx};
pub use postgres::PostgresBackend;

#[async_trait]
pub trait Backend: Send + Sync {
    /// An open transaction. Rolled back when dropped uncommitted.
    type Tx: Send + 'static;

    async fn begin(&self) -> Result<Self::Tx, PersistenceError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), PersistenceError>;
}

#[async_trait]
impl<B> Backend for Arc<B>
where
    B: Backend + ?Sized,
{
    type Tx = B::Tx;

    async fn begin(&self) -> Result<Self::Tx, PersistenceError> {
        (**self).begin().await
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), PersistenceError> {
        (**self).commit(tx).await
    }
}
