//! Event primitives: the typed `Event` contract, the persisted envelope, and the
//! payload codec shared by the write and read paths.

pub mod codec;
pub mod envelope;
pub mod event;

pub use codec::{CodecError, EncodedEvent, Payload, decode, decode_as, encode, encode_event};
pub use envelope::{DecodedEvent, EventEnvelope, StoredEvent};
pub use event::Event;
