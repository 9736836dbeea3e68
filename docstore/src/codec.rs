//! Message codec: serde types to and from the canonical JSON stored in `data`.
//!
//! Field presence follows the message type's own serde attributes: fields marked
//! `#[serde(default)]` decode to their default when absent, and
//! `skip_serializing_if = "Option::is_none"` keeps unset optionals out of the payload.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{DocStoreError, Result};

/// Any serde type that can be stored as a document.
pub trait Message: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {}

impl<T> Message for T where T: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {}

/// Encodes a message as compact JSON with object keys in sorted order.
///
/// Documents must be JSON objects; anything else is rejected as invalid input.
pub fn encode<M: Serialize + ?Sized>(message: &M) -> Result<String> {
    let value = serde_json::to_value(message)?;
    if !value.is_object() {
        return Err(DocStoreError::InvalidInput(format!(
            "document must encode to a JSON object, got {}",
            json_kind(&value)
        )));
    }
    Ok(serde_json::to_string(&value)?)
}

/// Decodes a freshly built message from stored JSON.
pub fn decode<M: DeserializeOwned>(bytes: &[u8]) -> Result<M> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decodes stored JSON into `target`, replacing its previous contents.
pub fn decode_into<M: DeserializeOwned>(bytes: &[u8], target: &mut M) -> Result<()> {
    *target = decode(bytes)?;
    Ok(())
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
