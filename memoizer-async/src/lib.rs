//! # Memoizer Async
//!
//! Memoization with call coalescing for async/await computations.
//!
//! [`AsyncMemoizer`] stores the outcome of each keyed async computation for
//! its own lifetime and makes concurrent tasks asking for the same key await
//! a single shared execution. It is executor-agnostic: nothing is spawned and
//! no timers are used.
//!
//! ## Features
//!
//! - 🎯 **Run once per key**: resolved outcomes, errors included, are replayed
//! - 🤝 **Coalescing**: concurrent first calls await one `Shared` future
//! - 🛑 **Cancellation-safe**: dropping one waiter never aborts the others
//! - 🔑 **Flexible keys**: any [`CacheableKey`], shared with `memoizer-core`
//! - 📈 **Statistics**: hit/miss/coalesced counters with the `stats` feature
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! memoizer-async = "0.3.0"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ```rust,ignore
//! use memoizer_async::AsyncMemoizer;
//! use std::sync::Arc;
//!
//! async fn handle_request(db: Arc<Db>) -> Result<Page, DbError> {
//!     let memo: Arc<AsyncMemoizer<User, DbError>> = Arc::new(AsyncMemoizer::new());
//!
//!     // Every widget asks for the same user; the query runs once.
//!     let widgets = (0..5).map(|_| {
//!         let memo = Arc::clone(&memo);
//!         let db = Arc::clone(&db);
//!         tokio::spawn(async move {
//!             memo.compute("user:42", move || async move { db.fetch_user(42).await }).await
//!         })
//!     });
//!     // ...
//! }
//! ```
//!
//! ## Thread Safety
//!
//! `AsyncMemoizer` is `Send + Sync` and can be shared across tasks and
//! threads behind an `Arc`.

mod memoizer;

pub use memoizer::AsyncMemoizer;

// Re-export key and stats types from memoizer-core
pub use memoizer_core::{cache_key, join_key_parts, CacheableKey, KEY_SEPARATOR};

#[cfg(feature = "stats")]
pub use memoizer_core::CacheStats;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{cache_key, AsyncMemoizer, CacheableKey};
}
