//! # Memoizer Core
//!
//! Core types for the memoizer library: short-lived, in-memory memoization
//! with call coalescing.
//!
//! A [`Memoizer`] runs each keyed computation at most once for its lifetime and
//! makes concurrent callers for the same key share a single in-flight
//! execution instead of all running it (the "thundering herd").
//!
//! ## Features
//!
//! - **Memoization**: resolved keys are never recomputed, errors included
//! - **Call Coalescing**: concurrent callers for one key wait on one execution
//! - **Flexible Keys**: strings, primitives, tuples and custom types via [`CacheableKey`]
//! - **Instance Scoped**: no globals; each memoizer is its own key namespace
//! - **Statistics**: optional hit/miss/coalesced counters (`stats` feature)
//!
//! ## Module Organization
//!
//! - [`keys`] - Cache key generation trait, separator and the [`cache_key!`] macro
//! - [`singleflight`] - The call-coalescing [`Group`](singleflight::Group)
//! - [`memoizer`] - The blocking [`Memoizer`]
//!
//! ## Non-goals
//!
//! There is no expiration, no size bound, no eviction and no persistence. A
//! memoizer grows with every distinct key it sees until it is dropped.
pub mod keys;
pub mod memoizer;
pub mod singleflight;

#[cfg(feature = "stats")]
mod stats;

pub use keys::{join_key_parts, CacheableKey, KEY_SEPARATOR};
pub use memoizer::Memoizer;

#[cfg(feature = "stats")]
pub use stats::CacheStats;
