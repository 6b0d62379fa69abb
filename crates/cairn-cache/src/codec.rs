//! Text codec for cache entries.
//!
//! Entries are stored as UTF-8 text. Structured values go through
//! `serde_json`; plain strings bypass it so they round-trip byte-for-byte.

use cairn_core::{CairnError, CairnResult};
use serde::de::{value::StrDeserializer, DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Serialize};

/// Stored when an empty sequence is cached on purpose.
pub const EMPTY_SEQUENCE: &str = "[]";

/// Stored when an empty mapping is cached on purpose.
pub const EMPTY_MAPPING: &str = "{}";

/// Returns true for empty or whitespace-only text.
///
/// Blank keys are rejected and blank cached text is treated as a miss.
#[must_use]
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Encodes and decodes values of type `T` to and from cache text.
pub trait EntryCodec<T> {
    /// Encodes a value for storage.
    fn encode(&self, value: &T) -> CairnResult<String>;

    /// Decodes text read from `key`.
    ///
    /// Fails with [`CairnError::MalformedEntry`] when the text does not fit `T`.
    fn decode(&self, key: &str, text: &str) -> CairnResult<T>;

    /// Whether stored `text` holds no value worth caching.
    ///
    /// Such entries are never written and read back as misses.
    fn is_blank_entry(&self, text: &str) -> bool {
        is_blank(text)
    }
}

/// Structural codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> EntryCodec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> CairnResult<String> {
        Ok(serde_json::to_string(value)?)
    }

    /// Text that is not valid JSON for `T` is retried as a raw string, so
    /// string-shaped types also read entries written by the identity path.
    fn decode(&self, key: &str, text: &str) -> CairnResult<T> {
        serde_json::from_str(text).or_else(|e| {
            let raw: StrDeserializer<'_, serde_json::Error> = text.into_deserializer();
            T::deserialize(raw).map_err(|_| CairnError::malformed(key, e))
        })
    }

    /// Blank text, or a JSON string literal whose content is blank.
    fn is_blank_entry(&self, text: &str) -> bool {
        is_blank(text)
            || (text.trim_start().starts_with('"')
                && serde_json::from_str::<String>(text).is_ok_and(|inner| is_blank(&inner)))
    }
}

/// Identity codec for plain strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl EntryCodec<String> for TextCodec {
    fn encode(&self, value: &String) -> CairnResult<String> {
        Ok(value.clone())
    }

    fn decode(&self, _key: &str, text: &str) -> CairnResult<String> {
        Ok(text.to_string())
    }
}
