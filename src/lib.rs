//! # Memoizer
//!
//! A small, thread-safe memoization cache for request-scoped work: each keyed
//! computation runs at most once per cache instance, and concurrent callers
//! asking for the same key share one in-flight execution.
//!
//! ## Features
//!
//! - **Run once per key**: outcomes are stored and replayed verbatim
//! - **Errors are cached too**: an `Err` is a resolved outcome, not a retry trigger
//! - **Coalescing**: no thundering herd when many threads miss the same key
//! - **Flexible keys**: strings, primitives, tuples or custom [`CacheableKey`] types
//! - **No globals**: one instance per request, dropped with it
//!
//! ## Quick Start
//!
//! ```rust
//! use memoizer::Memoizer;
//!
//! let memo: Memoizer<u64, String> = Memoizer::new();
//!
//! // First call runs the computation
//! let first = memo.compute("user:42", || Ok(42));
//! // Second call replays the stored outcome
//! let second = memo.compute("user:42", || unreachable!());
//! assert_eq!(first, second);
//! ```
//!
//! ## Keys From Several Values
//!
//! Tuples are joined with `|`, as is the [`cache_key!`] macro:
//!
//! ```rust
//! use memoizer::{cache_key, CacheableKey, Memoizer};
//!
//! let memo: Memoizer<String, ()> = Memoizer::new();
//!
//! let _ = memo.compute(&("invoice", 17), || Ok("pending".to_string()));
//! assert_eq!(memo.get(&cache_key!("invoice", 17)), Some(Ok("pending".to_string())));
//! assert_eq!(("invoice", 17).to_cache_key(), "invoice|17");
//! ```
//!
//! Or with a custom implementation:
//!
//! ```rust
//! use memoizer::{CacheableKey, Memoizer};
//!
//! struct UserId(u64);
//!
//! impl CacheableKey for UserId {
//!     fn to_cache_key(&self) -> String {
//!         format!("user:{}", self.0)
//!     }
//! }
//!
//! let memo: Memoizer<&'static str, ()> = Memoizer::new();
//! let _ = memo.compute(&UserId(7), || Ok("grace"));
//! assert!(memo.contains_key("user:7"));
//! ```
//!
//! ## Error Handling
//!
//! Failed computations are remembered exactly like successful ones:
//!
//! ```rust
//! use memoizer::Memoizer;
//!
//! let memo: Memoizer<i32, String> = Memoizer::new();
//!
//! let first = memo.compute("div", || Err("Division by zero".to_string()));
//! // The error is replayed; the closure does not run
//! let second = memo.compute("div", || Ok(1));
//! assert_eq!(first, Err("Division by zero".to_string()));
//! assert_eq!(second, first);
//! ```
//!
//! Callers that need a retry must use a new key per attempt or a new
//! memoizer.
//!
//! ## Sharing Across Threads
//!
//! ```rust
//! use memoizer::Memoizer;
//! use std::thread;
//!
//! let memo: Memoizer<u32, ()> = Memoizer::new();
//!
//! thread::scope(|scope| {
//!     for _ in 0..4 {
//!         scope.spawn(|| memo.compute("config", || Ok(8080)));
//!     }
//! });
//! assert_eq!(memo.len(), 1);
//! ```
//!
//! For async/await code see the `memoizer-async` crate.

pub use memoizer_core::*;
