//! In-process storage handle for tests/dev.
//!
//! Committed rows live behind a single `RwLock`, so readers see either all of a
//! transaction's writes or none of them. A transaction stages its writes
//! privately and publishes them in one step on commit.
//!
//! Two kinds of locks are held by a transaction until it ends:
//! - a per-user row lock, taken before a user row is read for update or changed;
//! - the log lock, taken by the first append, so event ids follow commit order.
//!
//! A row lock entry is removed when its last holder releases it, so the lock
//! table only ever holds rows some transaction is using.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use chronicle_core::{AggregateRoot, EventId};
use chronicle_events::StoredEvent;
use chronicle_users::{User, UserId};

use super::Backend;
use crate::error::PersistenceError;

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) users: BTreeMap<UserId, User>,
    pub(crate) events: Vec<StoredEvent>,
}

#[derive(Debug, Default)]
pub(crate) struct MemoryDb {
    tables: RwLock<Tables>,
    user_seq: AtomicI64,
    event_seq: AtomicI64,
    log_lock: Arc<AsyncMutex<()>>,
    row_locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl MemoryDb {
    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, PersistenceError> {
        self.tables
            .read()
            .map_err(|_| PersistenceError::Transaction("lock poisoned".to_string()))
    }

    #[cfg(test)]
    pub(crate) fn row_lock_count(&self) -> usize {
        self.row_locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }
}

/// In-memory backend. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    db: Arc<MemoryDb>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn db(&self) -> &MemoryDb {
        &self.db
    }
}

/// An open in-memory transaction.
#[derive(Debug)]
pub struct MemoryTx {
    db: Arc<MemoryDb>,
    staged_users: BTreeMap<UserId, User>,
    staged_events: Vec<StoredEvent>,
    row_guards: HashMap<UserId, OwnedMutexGuard<()>>,
    log_guard: Option<OwnedMutexGuard<()>>,
}

impl MemoryTx {
    fn new(db: Arc<MemoryDb>) -> Self {
        Self {
            db,
            staged_users: BTreeMap::new(),
            staged_events: Vec::new(),
            row_guards: HashMap::new(),
            log_guard: None,
        }
    }

    /// Allocate the next user id. Like a serial column, a rolled-back id is never reissued.
    pub(crate) fn next_user_id(&self) -> Result<UserId, PersistenceError> {
        let raw = self.db.user_seq.fetch_add(1, Ordering::SeqCst) + 1;
        UserId::try_from(raw).map_err(|e| PersistenceError::Constraint(e.to_string()))
    }

    pub(crate) fn next_event_id(&self) -> Result<EventId, PersistenceError> {
        let raw = self.db.event_seq.fetch_add(1, Ordering::SeqCst) + 1;
        EventId::new(raw).map_err(|e| PersistenceError::Constraint(e.to_string()))
    }

    /// Block until no other transaction holds the row, then keep it until this one ends.
    pub(crate) async fn lock_row(&mut self, id: UserId) -> Result<(), PersistenceError> {
        if self.row_guards.contains_key(&id) {
            return Ok(());
        }

        let lock = {
            let mut locks = self
                .db
                .row_locks
                .lock()
                .map_err(|_| PersistenceError::Transaction("lock poisoned".to_string()))?;
            locks.entry(id).or_default().clone()
        };

        let guard = lock.lock_owned().await;
        self.row_guards.insert(id, guard);
        Ok(())
    }

    /// Block until no other transaction is appending, then keep the log until this one ends.
    pub(crate) async fn lock_log(&mut self) {
        if self.log_guard.is_none() {
            self.log_guard = Some(self.db.log_lock.clone().lock_owned().await);
        }
    }

    /// A user as this transaction sees it: its own staged write, else the committed row.
    pub(crate) fn visible_user(&self, id: UserId) -> Result<Option<User>, PersistenceError> {
        if let Some(user) = self.staged_users.get(&id) {
            return Ok(Some(user.clone()));
        }
        Ok(self.db.read()?.users.get(&id).cloned())
    }

    pub(crate) fn last_event_created_at(&self) -> Result<Option<DateTime<Utc>>, PersistenceError> {
        if let Some(last) = self.staged_events.last() {
            return Ok(Some(last.created_at()));
        }
        Ok(self.db.read()?.events.last().map(|e| e.created_at()))
    }

    pub(crate) fn stage_user(&mut self, user: User) {
        self.staged_users.insert(user.id(), user);
    }

    pub(crate) fn stage_event(&mut self, event: StoredEvent) {
        self.staged_events.push(event);
    }

    /// Make every staged write visible at once. Locks are released when `self` drops.
    fn publish(mut self) -> Result<(), PersistenceError> {
        let mut tables = self
            .db
            .tables
            .write()
            .map_err(|_| PersistenceError::Transaction("lock poisoned".to_string()))?;

        tables.users.append(&mut self.staged_users);
        tables.events.append(&mut self.staged_events);
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if self.row_guards.is_empty() {
            return;
        }

        let ids: Vec<UserId> = self.row_guards.keys().copied().collect();
        self.row_guards.clear();

        // Waiters hold a clone of the `Arc`, so a count of one means the map is the only owner.
        if let Ok(mut locks) = self.db.row_locks.lock() {
            for id in ids {
                if locks.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                    locks.remove(&id);
                }
            }
        }
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<Self::Tx, PersistenceError> {
        Ok(MemoryTx::new(self.db.clone()))
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), PersistenceError> {
        tx.publish()
    }
}
