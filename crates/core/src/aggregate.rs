//! Aggregate root trait for state-stored, event-recorded domain models.

use chrono::{DateTime, Utc};

/// Aggregate root marker + minimal interface.
///
/// Aggregates here are persisted as current-state rows; every mutation is paired
/// with an appended event. The trait only exposes what the write path needs to
/// stamp those events.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + Into<crate::AggregateId>;

    /// Tag written to `aggregate_kind` on every event this aggregate produces.
    const KIND: &'static str;

    /// Returns the aggregate identifier.
    fn id(&self) -> Self::Id;

    /// Last mutation time. Never moves backwards for a given aggregate.
    fn updated_at(&self) -> DateTime<Utc>;
}

/// The state transition produced by one write command.
///
/// Event builders receive this so they can describe what changed (e.g. compare
/// the stored value before and after an update).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation<A> {
    Created(A),
    Updated { before: A, after: A },
}

impl<A> Mutation<A> {
    /// State after the mutation.
    pub fn current(&self) -> &A {
        match self {
            Mutation::Created(a) => a,
            Mutation::Updated { after, .. } => after,
        }
    }

    pub fn into_current(self) -> A {
        match self {
            Mutation::Created(a) => a,
            Mutation::Updated { after, .. } => after,
        }
    }
}
