//! Per-request progress and result hand-off.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one load request.
///
/// `Loaded` and `FailedOrCanceled` are terminal and set by the consuming
/// thread's `update()`, never by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoadState {
    NotLoaded = 0,
    Loading = 1,
    Loaded = 2,
    FailedOrCanceled = 3,
}

impl LoadState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LoadState::Loading,
            2 => LoadState::Loaded,
            3 => LoadState::FailedOrCanceled,
            _ => LoadState::NotLoaded,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadState::Loaded | LoadState::FailedOrCanceled)
    }
}

/// Progress and cancellation handle shared by a requester and its loader.
///
/// Cancellation is cooperative: the worker polls
/// [`is_cancel_requested`](Self::is_cancel_requested) at loader entry and
/// after the layers are loaded. A cancelled request is never delivered.
#[derive(Debug)]
pub struct TileProgress {
    state: AtomicU8,
    cancel: CancellationToken,
}

impl Default for TileProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TileProgress {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LoadState::NotLoaded as u8),
            cancel: CancellationToken::new(),
        }
    }

    /// Convenience constructor for the common shared form.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn state(&self) -> LoadState {
        LoadState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: LoadState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Requests cancellation. Idempotent, callable from any thread.
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token tripped by [`request_cancel`](Self::request_cancel), for async
    /// callers that want to `select!` on it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Slot a finished request is delivered into.
///
/// Clones share the slot, so the requester keeps one clone and hands the
/// other to the loader.
#[derive(Debug)]
pub struct TileResult<T> {
    slot: Arc<Mutex<Option<Arc<T>>>>,
}

impl<T> Clone for TileResult<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for TileResult<T> {
    fn default() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }
}

impl<T> TileResult<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.lock().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Removes and returns the delivered value.
    pub fn take(&self) -> Option<Arc<T>> {
        self.slot.lock().take()
    }

    pub(crate) fn set(&self, value: Arc<T>) {
        *self.slot.lock() = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_starts_not_loaded() {
        let progress = TileProgress::new();
        assert_eq!(progress.state(), LoadState::NotLoaded);
        assert!(!progress.is_cancel_requested());
    }

    #[test]
    fn test_cancel_is_idempotent_and_visible_through_token() {
        let progress = TileProgress::new();
        let token = progress.cancellation_token();
        progress.request_cancel();
        progress.request_cancel();
        assert!(progress.is_cancel_requested());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_state_round_trip() {
        let progress = TileProgress::new();
        for state in [
            LoadState::Loading,
            LoadState::Loaded,
            LoadState::FailedOrCanceled,
            LoadState::NotLoaded,
        ] {
            progress.set_state(state);
            assert_eq!(progress.state(), state);
        }
        assert!(LoadState::Loaded.is_terminal());
        assert!(!LoadState::Loading.is_terminal());
    }

    #[test]
    fn test_result_slot_is_shared_between_clones() {
        let a: TileResult<u32> = TileResult::new();
        let b = a.clone();
        assert!(!b.is_ready());
        a.set(Arc::new(7));
        assert_eq!(b.get().as_deref(), Some(&7));
        assert_eq!(b.take().as_deref(), Some(&7));
        assert!(!a.is_ready());
    }
}
