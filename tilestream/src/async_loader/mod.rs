//! Asynchronous tile loading.
//!
//! The async loaders push synchronous [`TileImagesLoader`](crate::loader::TileImagesLoader)
//! calls onto a [`Scheduler`](crate::scheduler::Scheduler) and hand results
//! back on the consuming thread.
//!
//! # Request lifecycle
//!
//! ```text
//!   load() ──► Loading ──► worker: loader.load(key, cancel)
//!                              │
//!                              ▼
//!                         staged outcome
//!                              │
//!   update() ◄─────────────────┘
//!      │
//!      ├── cancel requested ──► FailedOrCanceled (dropped, never delivered)
//!      ├── loader returned None ──► FailedOrCanceled
//!      └── images ready (≤ cap per update) ──► write result ──► Loaded
//! ```
//!
//! Completed requests only become visible through `update()`, which delivers
//! at most [`DEFAULT_MAX_LOADS_PER_UPDATE`] per call unless configured
//! otherwise. Dropping a loader cancels every outstanding request and waits
//! for its in-flight jobs, so no worker writes after the loader is gone.

mod concurrent;
mod finalizing;
mod progress;
mod queue;

pub use concurrent::ConcurrentAsyncTileLoader;
pub use finalizing::{AsyncTileLoader, TileFinalizer};
pub use progress::{LoadState, TileProgress, TileResult};

/// Completed requests delivered per `update()` by default.
pub const DEFAULT_MAX_LOADS_PER_UPDATE: usize = 16;
