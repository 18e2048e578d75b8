//! Event payload codec.
//!
//! Payloads are stored as opaque bytes (UTF-8 JSON). Writers encode a typed
//! event; generic readers decode into a key-ordered map without knowing the
//! concrete schema, typed readers decode straight into their own variant.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::event::Event;

/// Generic, key-ordered view of a decoded payload.
pub type Payload = serde_json::Map<String, JsonValue>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("payload encoding failed: {0}")]
    Encode(String),

    #[error("payload decoding failed: {0}")]
    Decode(String),
}

/// A typed event reduced to what the event store persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEvent {
    pub kind: String,
    pub version: String,
    pub payload: Vec<u8>,
}

/// Serialize a value into payload bytes.
///
/// Deterministic: struct fields are written in declaration order, maps in key order.
pub fn encode<T>(value: &T) -> Result<Vec<u8>, CodecError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Encode a typed event together with its `kind` and `version` tags.
pub fn encode_event<E: Event>(event: &E) -> Result<EncodedEvent, CodecError> {
    Ok(EncodedEvent {
        kind: event.kind().to_string(),
        version: event.version().to_string(),
        payload: encode(event)?,
    })
}

/// Decode payload bytes into a generic map. Non-object payloads are rejected.
pub fn decode(bytes: &[u8]) -> Result<Payload, CodecError> {
    match serde_json::from_slice::<JsonValue>(bytes) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(other) => Err(CodecError::Decode(format!(
            "expected a JSON object, found {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(CodecError::Decode(e.to_string())),
    }
}

/// Decode payload bytes into a concrete type.
pub fn decode_as<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
