//! Serde helper functions for request deserialization.
//!
//! JSON update payloads need to tell an absent field apart from an explicit
//! `null`. Fields using [`deserialize_patch`] must also carry `#[serde(default)]`
//! so that a missing key becomes [`Patch::Unchanged`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::catalog::Patch;

/// Deserialize a present field into `Patch::Clear` (null) or `Patch::Set`.
pub fn deserialize_patch<'de, D, T>(deserializer: D) -> Result<Patch<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value: Option<T> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(value) => Patch::Set(value),
        None => Patch::Clear,
    })
}

/// Serialize a patch as `null` or the inner value.
///
/// Pair with `skip_serializing_if = "Patch::is_unchanged"`.
pub fn serialize_patch<S, T>(patch: &Patch<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    match patch {
        Patch::Set(value) => serializer.serialize_some(value),
        Patch::Clear | Patch::Unchanged => serializer.serialize_none(),
    }
}

/// Deserialize an optional string, treating empty strings as None.
pub fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.trim().is_empty()))
}
