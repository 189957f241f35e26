//! Altitude queries that never block on a tile load.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::loader::ResolvedTileImage;
use crate::quadtree::QuadTreeTileKey;
use crate::scheduler::{SchedulerPtr, SyncToken};
use crate::source::TileSourcePtr;

use super::blocking::sample_resolved;
use super::{
    AltitudeError, AltitudeProviderConfig, AltitudeResult, BlockingTilePlanetAltitudeProvider,
    LatLon, PlanetAltitudeProvider,
};

/// Answers immediately from whatever is cached and streams in finer tiles
/// in the background.
///
/// A query walks levels from 0 towards the maximum LOD while the cache
/// holds them. The first missing level is handed to the scheduler and the
/// walk stops there. A cached miss also ends the walk: its ancestor chain
/// has no data, so a source without any elevation costs one load per root. Only one background load runs at a time, so repeated
/// queries before it finishes schedule nothing new. Callers re-poll to pick
/// up finer data.
///
/// The background loads go through an owned
/// [`BlockingTilePlanetAltitudeProvider`], so both share one cache.
pub struct NonBlockingTilePlanetAltitudeProvider {
    provider: Arc<BlockingTilePlanetAltitudeProvider>,
    scheduler: SchedulerPtr,
    token: SyncToken,
    request_lock: Mutex<()>,
}

impl NonBlockingTilePlanetAltitudeProvider {
    pub fn new(
        source: TileSourcePtr,
        config: AltitudeProviderConfig,
        scheduler: SchedulerPtr,
    ) -> Self {
        Self::with_provider(
            Arc::new(BlockingTilePlanetAltitudeProvider::new(source, config)),
            scheduler,
        )
    }

    /// Shares `provider` and its cache.
    pub fn with_provider(
        provider: Arc<BlockingTilePlanetAltitudeProvider>,
        scheduler: SchedulerPtr,
    ) -> Self {
        Self {
            provider,
            scheduler,
            token: SyncToken::new(),
            request_lock: Mutex::new(()),
        }
    }

    pub fn blocking(&self) -> &Arc<BlockingTilePlanetAltitudeProvider> {
        &self.provider
    }

    /// Altitude from the best cached tile, scheduling a load of the next
    /// finer level when one is missing.
    pub fn altitude_or_request_load(&self, position: LatLon) -> Result<AltitudeResult, AltitudeError> {
        let max_key = self.provider.max_lod_key(position);
        if let Some(resolved) = self.provider.cached(max_key) {
            return sample_resolved(&resolved, position).map(AltitudeResult::final_value);
        }

        let mut best: Option<ResolvedTileImage> = None;
        for level in 0..=max_key.level {
            let key = max_key.ancestor(level);
            match self.provider.cached(key) {
                Some(resolved) if resolved.is_found() => best = Some(resolved),
                // A miss covers every coarser level too
                Some(_) => break,
                None => {
                    self.request_load(key);
                    break;
                }
            }
        }

        match best {
            Some(resolved) => sample_resolved(&resolved, position).map(AltitudeResult::provisional),
            None => Ok(AltitudeResult::provisional(0.0)),
        }
    }

    /// Blocks until the background load, if any, has finished.
    pub fn wait_for_loads(&self) {
        self.scheduler.wait_for(&self.token);
    }

    fn request_load(&self, key: QuadTreeTileKey) {
        let _guard = self.request_lock.lock();
        if !self.scheduler.has_finished(&self.token) {
            return;
        }
        trace!(%key, "Scheduling background elevation load");
        let provider = Arc::clone(&self.provider);
        self.scheduler.run(
            Box::new(move || {
                provider.resolve(key);
            }),
            &self.token,
        );
    }
}

impl PlanetAltitudeProvider for NonBlockingTilePlanetAltitudeProvider {
    fn altitude(&self, position: LatLon) -> Result<AltitudeResult, AltitudeError> {
        self.altitude_or_request_load(position)
    }
}

impl Drop for NonBlockingTilePlanetAltitudeProvider {
    fn drop(&mut self) {
        self.scheduler.wait_for(&self.token);
    }
}
