//! Opaque call payloads.
//!
//! A payload is the byte encoding of one function invocation on a target
//! component. Components define their own call enums; the chain only moves
//! bytes around and hands them to the callee for decoding.

use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TargetError;

/// Encoded function invocation.
///
/// Call enums are encoded as externally tagged JSON, so the first key of
/// the object is the function name (`{"approve":{...}}`).
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Payload(Bytes);

impl Payload {
    /// An empty payload. Dispatching it to a component is a decode error.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Wraps raw bytes without validating them.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Encodes a call enum.
    ///
    /// # Panics
    ///
    /// Panics if `call` fails to serialize. Call enums only contain
    /// addresses, integers, byte payloads and nested calls, none of which
    /// can fail.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn encode<T: Serialize>(call: &T) -> Self {
        let bytes = serde_json::to_vec(call).expect("call enums always serialize");
        Self(Bytes::from(bytes))
    }

    /// Decodes the payload into a component's call enum.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::MalformedPayload`] if the bytes are not a
    /// valid encoding of `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, TargetError> {
        serde_json::from_slice(&self.0).map_err(|e| TargetError::MalformedPayload(e.to_string()))
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Function name of the encoded call, if the payload is well formed.
    #[must_use]
    pub fn function_name(&self) -> Option<String> {
        match serde_json::from_slice::<serde_json::Value>(&self.0).ok()? {
            serde_json::Value::Object(map) if map.len() == 1 => map.keys().next().cloned(),
            serde_json::Value::String(unit) => Some(unit),
            _ => None,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(text) => write!(f, "Payload({text})"),
            Err(_) => write!(f, "Payload(0x{})", hex::encode(&self.0)),
        }
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let digits = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(digits)
            .map(|raw| Self(Bytes::from(raw)))
            .map_err(serde::de::Error::custom)
    }
}
