//! Versioned envelope codec
//!
//! Stored state is wrapped as `{"version": <int>, "state": <json>}`. The
//! envelope shape is the only bit-exact on-disk contract; raw transforms may
//! frame the string further.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// A decoded `{version, state}` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedEnvelope {
    /// Version of the code that wrote `state`
    pub version: i64,
    /// Plain JSON state; an envelope without a `state` field reads as `null`
    #[serde(default)]
    pub state: Value,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T: Serialize> {
    version: i64,
    state: &'a T,
}

/// Serialize `state` into an envelope string tagged with `version`.
pub fn encode<T: Serialize>(state: &T, version: i64, pretty: bool) -> Result<String> {
    let envelope = EnvelopeRef { version, state };
    let raw = if pretty {
        serde_json::to_string_pretty(&envelope)?
    } else {
        serde_json::to_string(&envelope)?
    };
    Ok(raw)
}

/// Parse an envelope string.
///
/// A `version` that is missing or not an integer is rejected here rather
/// than compared later.
pub fn decode(raw: &str) -> Result<VersionedEnvelope> {
    Ok(serde_json::from_str(raw)?)
}
