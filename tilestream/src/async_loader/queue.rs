//! Outstanding request bookkeeping shared by the async loaders.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, trace};

use crate::loader::TileImagesLoader;
use crate::quadtree::QuadTreeTileKey;
use crate::scheduler::{SchedulerPtr, SyncToken};

use super::{LoadState, TileProgress};

/// Worker-side outcome, invisible to the requester until `drain`.
enum Staged<I> {
    Pending,
    Loaded(Arc<I>),
    Failed,
}

struct Request<I, R> {
    key: QuadTreeTileKey,
    progress: Arc<TileProgress>,
    staged: Arc<Mutex<Staged<I>>>,
    target: R,
}

/// Requests submitted to a scheduler, drained on the consuming thread.
///
/// Dropping the queue requests cancellation of every outstanding request and
/// blocks until the scheduler has no job of this queue in flight.
pub(crate) struct RequestQueue<I, R> {
    scheduler: SchedulerPtr,
    token: SyncToken,
    requests: Vec<Request<I, R>>,
}

impl<I: Send + Sync + 'static, R> RequestQueue<I, R> {
    pub fn new(scheduler: SchedulerPtr) -> Self {
        Self {
            scheduler,
            token: SyncToken::new(),
            requests: Vec::new(),
        }
    }

    /// Records a request and schedules `loader.load(key)` for it.
    pub fn submit<L>(&mut self, loader: &Arc<L>, key: QuadTreeTileKey, progress: Arc<TileProgress>, target: R)
    where
        L: TileImagesLoader<Images = I>,
    {
        progress.set_state(LoadState::Loading);
        let staged = Arc::new(Mutex::new(Staged::Pending));

        let job = {
            let loader = Arc::clone(loader);
            let progress = Arc::clone(&progress);
            let staged = Arc::clone(&staged);
            Box::new(move || {
                let cancel = || progress.is_cancel_requested();
                let outcome = match loader.load(key, &cancel) {
                    Some(images) => Staged::Loaded(images),
                    None => Staged::Failed,
                };
                *staged.lock() = outcome;
            })
        };

        trace!(%key, "Scheduling tile load");
        self.requests.push(Request {
            key,
            progress,
            staged,
            target,
        });
        self.scheduler.run(job, &self.token);
    }

    /// Retires cancelled and failed requests, then delivers up to `cap`
    /// completed requests in submission order. Returns how many were
    /// delivered.
    pub fn drain<F>(&mut self, cap: usize, mut deliver: F) -> usize
    where
        F: FnMut(QuadTreeTileKey, Arc<I>, &mut R),
    {
        let mut delivered = 0;
        let mut i = 0;
        while i < self.requests.len() {
            let request = &mut self.requests[i];

            if request.progress.is_cancel_requested() {
                request.progress.set_state(LoadState::FailedOrCanceled);
                trace!(key = %request.key, "Dropped cancelled tile load");
                self.requests.remove(i);
                continue;
            }

            let ready = {
                let staged = request.staged.lock();
                match &*staged {
                    Staged::Pending => None,
                    Staged::Failed => Some(None),
                    Staged::Loaded(images) => Some(Some(Arc::clone(images))),
                }
            };

            match ready {
                None => i += 1,
                Some(None) => {
                    request.progress.set_state(LoadState::FailedOrCanceled);
                    debug!(key = %request.key, "Tile load produced no images");
                    self.requests.remove(i);
                }
                Some(Some(images)) if delivered < cap => {
                    deliver(request.key, images, &mut request.target);
                    request.progress.set_state(LoadState::Loaded);
                    self.requests.remove(i);
                    delivered += 1;
                }
                Some(Some(_)) => i += 1,
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn wait(&self) {
        self.scheduler.wait_for(&self.token);
    }
}

impl<I, R> Drop for RequestQueue<I, R> {
    fn drop(&mut self) {
        if !self.requests.is_empty() {
            info!(outstanding = self.requests.len(), "Cancelling tile loads on shutdown");
        }
        for request in &self.requests {
            request.progress.request_cancel();
        }
        self.scheduler.wait_for(&self.token);
    }
}
