//! # cmapkit
//!
//! Small concurrency and formatting helpers for services that share state between threads.
//!
//! ## Features
//!
//! - **Concurrent Map**: a `HashMap` behind a single reader/writer lock, with snapshot,
//!   filter, in-place update, lock-free-callback iteration and JSON (de)serialization
//! - **Number Joiner**: render integer slices as `"1, 2, 3"`
//! - **Metrics**: optional per-container counters for reads, writes, misses and contention
//!
//! ## Quick Start
//!
//! ```rust
//! use cmapkit::map::ConcurrentMap;
//!
//! let map: ConcurrentMap<String, i64> = ConcurrentMap::new();
//! map.set("a".to_string(), 1);
//! assert_eq!(map.get("a"), 1);
//! assert_eq!(map.get_with_test("missing"), (0, false));
//!
//! let json = map.to_json_string()?;
//! let copy: ConcurrentMap<String, i64> = ConcurrentMap::from_json_str(&json)?;
//! assert_eq!(copy.get("a"), 1);
//! # Ok::<(), cmapkit::Error>(())
//! ```
//!
//! ## Thread Safety
//!
//! `ConcurrentMap` is `Send + Sync` whenever its key, value and hasher types are, and can be
//! shared across threads by reference or through an `Arc` without additional synchronization.
//! Every individual operation is linearizable; sequences of operations are not.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
#![cfg_attr(feature = "unstable", feature(doc_cfg))]

pub mod map;
pub mod metrics;
pub mod strnum;

pub use crate::map::{ConcurrentMap, FxConcurrentMap};
pub use crate::strnum::join_numbers;

/// Error types for cmapkit operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input bytes are not a JSON object mapping keys to values of the requested types
    #[error("failed to decode map: {0}")]
    Decoding(#[source] serde_json::Error),
    /// A key or value could not be represented as JSON
    #[error("failed to encode map: {0}")]
    Encoding(#[source] serde_json::Error),
}

impl Error {
    /// Whether this error came from decoding input
    pub fn is_decoding(&self) -> bool {
        matches!(self, Error::Decoding(_))
    }

    /// Whether this error came from encoding a container
    pub fn is_encoding(&self) -> bool {
        matches!(self, Error::Encoding(_))
    }
}

/// Result type for cmapkit operations
pub type Result<T> = core::result::Result<T, Error>;
