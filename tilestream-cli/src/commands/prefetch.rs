//! Prefetch command - stream every tile of a region through the loaders.
//!
//! Warms the image caches and reports how much of the region has elevation
//! data at the requested level or above.

use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tilestream::altitude::LatLon;
use tilestream::async_loader::{ConcurrentAsyncTileLoader, LoadState, TileProgress, TileResult};
use tilestream::loader::{PlanetTileImages, PlanetTileImagesLoader};
use tilestream::quadtree::geo::key_at_level_including_lon_lat;
use tilestream::quadtree::QuadTreeTileKey;
use tracing::info;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Largest region accepted, in tiles.
pub const MAX_PREFETCH_TILES: u64 = 1 << 20;

/// Requests kept in flight at once.
const IN_FLIGHT: usize = 256;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Arguments for the prefetch command.
pub struct PrefetchArgs {
    pub level: u32,
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

/// Inclusive block of keys at one level covering a lon/lat rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub level: u32,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Region {
    /// Keys at `level` touching the rectangle, given in degrees.
    pub fn from_degrees(level: u32, west: f64, south: f64, east: f64, north: f64) -> Self {
        let north_west = key_at_level_including_lon_lat(LatLon::from_degrees(north, west).lon_lat(), level);
        let south_east = key_at_level_including_lon_lat(LatLon::from_degrees(south, east).lon_lat(), level);
        Self {
            level,
            min_x: north_west.x,
            min_y: north_west.y,
            max_x: south_east.x,
            max_y: south_east.y,
        }
    }

    pub fn len(&self) -> u64 {
        u64::from(self.max_x - self.min_x + 1) * u64::from(self.max_y - self.min_y + 1)
    }

    /// Keys row by row from the north-west corner.
    pub fn keys(&self) -> impl Iterator<Item = QuadTreeTileKey> {
        let Region {
            level,
            min_x,
            min_y,
            max_x,
            max_y,
        } = *self;
        (min_y..=max_y).flat_map(move |y| (min_x..=max_x).map(move |x| QuadTreeTileKey::new(level, x, y)))
    }
}

fn validate(args: &PrefetchArgs) -> Result<(), CliError> {
    for (name, value, limit) in [
        ("west", args.west, 180.0),
        ("east", args.east, 180.0),
        ("south", args.south, 90.0),
        ("north", args.north, 90.0),
    ] {
        if !(-limit..=limit).contains(&value) {
            return Err(CliError::InvalidArgument(format!(
                "{} {} is outside -{}..{}",
                name, value, limit, limit
            )));
        }
    }
    if args.west > args.east {
        return Err(CliError::InvalidArgument(
            "west must not exceed east; split regions crossing the antimeridian".to_string(),
        ));
    }
    if args.south > args.north {
        return Err(CliError::InvalidArgument(
            "south must not exceed north".to_string(),
        ));
    }
    Ok(())
}

/// Run the prefetch command.
pub fn run(args: PrefetchArgs) -> Result<(), CliError> {
    validate(&args)?;
    let region = Region::from_degrees(args.level, args.west, args.south, args.east, args.north);
    if region.len() > MAX_PREFETCH_TILES {
        return Err(CliError::InvalidArgument(format!(
            "region has {} tiles at level {}, the limit is {}",
            region.len(),
            args.level,
            MAX_PREFETCH_TILES
        )));
    }

    let runner = CliRunner::new()?;
    runner.log_startup("prefetch");
    let config = runner.config();

    let images = PlanetTileImagesLoader::new(
        config.loader_config(),
        config.elevation.source(),
        config.albedo.source(),
    );
    let mut loader = ConcurrentAsyncTileLoader::new(Arc::new(images), runner.scheduler()?)
        .with_max_loads_per_update(IN_FLIGHT);

    println!(
        "Prefetching {} tiles at level {} ({}..{} x {}..{})",
        region.len(),
        region.level,
        region.min_x,
        region.max_x,
        region.min_y,
        region.max_y
    );

    let bar = ProgressBar::new(region.len());
    if let Ok(style) =
        ProgressStyle::default_bar().template("{msg} {pos}/{len} [{wide_bar}] {percent}% {per_sec} {eta}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message("tiles");

    let started = Instant::now();
    let summary = stream_region(&mut loader, region, &bar);
    bar.finish_and_clear();

    info!(
        tiles = summary.loaded,
        failed = summary.failed,
        with_elevation = summary.with_elevation,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Prefetch complete"
    );

    println!();
    println!("Prefetch Summary");
    println!("────────────────");
    println!("  Tiles loaded:   {} ({} failed)", summary.loaded, summary.failed);
    println!("  With elevation: {}", summary.with_elevation);
    println!("  Elapsed:        {:.1}s", started.elapsed().as_secs_f64());
    Ok(())
}

#[derive(Debug, Default)]
struct PrefetchSummary {
    loaded: u64,
    failed: u64,
    with_elevation: u64,
}

fn stream_region(
    loader: &mut ConcurrentAsyncTileLoader<PlanetTileImagesLoader>,
    region: Region,
    bar: &ProgressBar,
) -> PrefetchSummary {
    let mut summary = PrefetchSummary::default();
    let mut keys = region.keys().peekable();
    let mut outstanding: Vec<(TileResult<PlanetTileImages>, Arc<TileProgress>)> = Vec::new();

    loop {
        while outstanding.len() < IN_FLIGHT {
            let Some(key) = keys.next() else { break };
            let request = (TileResult::new(), TileProgress::shared());
            loader.load(key, request.0.clone(), Arc::clone(&request.1));
            outstanding.push(request);
        }

        loader.update();
        outstanding.retain(|(result, progress)| match progress.state() {
            LoadState::Loaded => {
                summary.loaded += 1;
                if result.take().is_some_and(|images| images.has_elevation_data) {
                    summary.with_elevation += 1;
                }
                bar.inc(1);
                false
            }
            LoadState::FailedOrCanceled => {
                summary.failed += 1;
                bar.inc(1);
                false
            }
            LoadState::NotLoaded | LoadState::Loading => true,
        });

        if outstanding.is_empty() && keys.peek().is_none() {
            return summary;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
