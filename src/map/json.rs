//! JSON encoding for [`ConcurrentMap`]
//!
//! A map is encoded as a plain JSON object, keys in their serde string form and values in
//! their serde_json encoding. Encoding works on an [`as_map`](ConcurrentMap::as_map) snapshot,
//! so the lock is released before any serialization code runs. Decoding builds a fresh
//! `HashMap` and only wraps it once the whole document has been accepted.

use super::ConcurrentMap;
use crate::{Error, Result};
use core::hash::{BuildHasher, Hash};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use tracing::debug;

impl<K, V, S> ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Encode a snapshot of the map as a JSON object
    ///
    /// # Errors
    ///
    /// [`Error::Encoding`] if a key cannot be used as a JSON object key or a value fails to
    /// serialize.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmapkit::map::ConcurrentMap;
    ///
    /// let map: ConcurrentMap<String, u32> = ConcurrentMap::new();
    /// map.set("a".to_string(), 1);
    /// assert_eq!(map.to_json()?, br#"{"a":1}"#);
    /// # Ok::<(), cmapkit::Error>(())
    /// ```
    pub fn to_json(&self) -> Result<Vec<u8>>
    where
        K: Serialize + Clone,
        V: Serialize + Clone,
        S: Clone,
    {
        serde_json::to_vec(&self.as_map()).map_err(|err| {
            debug!(error = %err, "failed to encode concurrent map");
            Error::Encoding(err)
        })
    }

    /// Encode a snapshot of the map as a JSON string
    ///
    /// # Errors
    ///
    /// Same as [`to_json`](Self::to_json).
    pub fn to_json_string(&self) -> Result<String>
    where
        K: Serialize + Clone,
        V: Serialize + Clone,
        S: Clone,
    {
        serde_json::to_string(&self.as_map()).map_err(|err| {
            debug!(error = %err, "failed to encode concurrent map");
            Error::Encoding(err)
        })
    }
}

impl<K, V, S> ConcurrentMap<K, V, S>
where
    K: Eq + Hash + DeserializeOwned,
    V: DeserializeOwned,
    S: BuildHasher + Default,
{
    /// Build a map from a JSON object
    ///
    /// # Errors
    ///
    /// [`Error::Decoding`] if `bytes` is not a JSON object whose keys parse as `K` and whose
    /// values parse as `V`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmapkit::map::ConcurrentMap;
    ///
    /// let map: ConcurrentMap<u32, String> = ConcurrentMap::from_json(br#"{"1":"one"}"#)?;
    /// assert_eq!(map.get(&1), "one");
    ///
    /// let err = ConcurrentMap::<u32, String>::from_json(b"[1, 2]").unwrap_err();
    /// assert!(err.is_decoding());
    /// # Ok::<(), cmapkit::Error>(())
    /// ```
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let data: HashMap<K, V, S> = serde_json::from_slice(bytes).map_err(decode_error)?;
        debug!(entries = data.len(), "decoded concurrent map");
        Ok(Self::from_map(data))
    }

    /// Build a map from a JSON object held in a string
    ///
    /// # Errors
    ///
    /// Same as [`from_json`](Self::from_json).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let data: HashMap<K, V, S> = serde_json::from_str(json).map_err(decode_error)?;
        debug!(entries = data.len(), "decoded concurrent map");
        Ok(Self::from_map(data))
    }
}

fn decode_error(err: serde_json::Error) -> Error {
    debug!(error = %err, "failed to decode concurrent map");
    Error::Decoding(err)
}

impl<K, V, S> Serialize for ConcurrentMap<K, V, S>
where
    K: Eq + Hash + Clone + Serialize,
    V: Clone + Serialize,
    S: BuildHasher + Clone,
{
    fn serialize<Ser>(&self, serializer: Ser) -> core::result::Result<Ser::Ok, Ser::Error>
    where
        Ser: Serializer,
    {
        self.as_map().serialize(serializer)
    }
}

impl<'de, K, V, S> Deserialize<'de> for ConcurrentMap<K, V, S>
where
    K: Eq + Hash + Deserialize<'de>,
    V: Deserialize<'de>,
    S: BuildHasher + Default,
{
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        HashMap::deserialize(deserializer).map(Self::from_map)
    }
}
