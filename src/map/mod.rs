//! Map implementations
//!
//! This module provides a lock-guarded concurrent map for sharing key-value state between
//! threads.
//!
//! ## Available Maps
//!
//! - [`ConcurrentMap`]: a `HashMap` behind one reader/writer lock
//! - [`FxConcurrentMap`]: the same map hashing with `FxHash`
//!
//! ## Choosing an Operation
//!
//! - Use `get_with_test` or `get_opt` when a stored default must be told apart from a missing key
//! - Use `for_each` when the callback is slow or needs to touch the map itself
//! - Use `update` for an all-or-nothing rewrite of every value
//! - Use `as_map`, `keys` or `values` for point-in-time snapshots

pub mod concurrent;
mod json;

pub use self::concurrent::{ConcurrentMap, FxConcurrentMap};


#[cfg(test)]
mod proptests;
