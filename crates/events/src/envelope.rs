use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chronicle_core::{AggregateId, EventId};

use crate::codec::{self, CodecError, Payload};

/// An appended event as the log returns it: opaque payload bytes.
pub type StoredEvent = EventEnvelope<Vec<u8>>;

/// An appended event whose payload was decoded for generic inspection.
pub type DecodedEvent = EventEnvelope<Payload>;

/// Envelope for an appended event, containing ordering + ownership metadata.
///
/// Notes:
/// - `id` is assigned by the event store and defines the global order of the log.
/// - `aggregate_id` is a lookup key, not ownership.
/// - `created_at` is assigned at append time and doubles as the read-side cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<P> {
    id: EventId,
    aggregate_id: AggregateId,
    aggregate_kind: String,
    kind: String,
    version: String,
    created_at: DateTime<Utc>,
    payload: P,
}

impl<P> EventEnvelope<P> {
    pub fn new(
        id: EventId,
        aggregate_id: AggregateId,
        aggregate_kind: impl Into<String>,
        kind: impl Into<String>,
        version: impl Into<String>,
        created_at: DateTime<Utc>,
        payload: P,
    ) -> Self {
        Self {
            id,
            aggregate_id,
            aggregate_kind: aggregate_kind.into(),
            kind: kind.into(),
            version: version.into(),
            created_at,
            payload,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn aggregate_kind(&self) -> &str {
        &self.aggregate_kind
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }

    /// Swap the payload while keeping every piece of metadata.
    pub fn try_map_payload<Q, E>(
        self,
        f: impl FnOnce(P) -> Result<Q, E>,
    ) -> Result<EventEnvelope<Q>, E> {
        Ok(EventEnvelope {
            id: self.id,
            aggregate_id: self.aggregate_id,
            aggregate_kind: self.aggregate_kind,
            kind: self.kind,
            version: self.version,
            created_at: self.created_at,
            payload: f(self.payload)?,
        })
    }
}

impl StoredEvent {
    /// Decode the opaque payload into a key-ordered map.
    pub fn decode(self) -> Result<DecodedEvent, CodecError> {
        self.try_map_payload(|bytes| codec::decode(&bytes))
    }
}
