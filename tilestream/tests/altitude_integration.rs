//! Integration tests for the altitude providers on background threads.
//!
//! Run with: `cargo test --test altitude_integration`

mod common;

use std::sync::Arc;

use tilestream::altitude::{
    AltitudeProviderConfig, AltitudeResult, BlockingTilePlanetAltitudeProvider, LatLon,
    NonBlockingTilePlanetAltitudeProvider, PlanetAltitudeProvider,
};
use tilestream::quadtree::QuadTreeTileKey;
use tilestream::raster::ElevationRerange;
use tilestream::source::{
    DirectoryTileSource, DirectoryTileSourceConfig, EmptyTileSource, LevelRange, TileSource,
};

use common::{CountingScheduler, CountingSource};

fn counting_pool() -> Arc<CountingScheduler> {
    Arc::new(CountingScheduler::new())
}

#[test]
fn test_non_blocking_refines_until_final() {
    let scheduler = counting_pool();
    let provider = NonBlockingTilePlanetAltitudeProvider::new(
        Arc::new(CountingSource::new(6)),
        AltitudeProviderConfig::default().with_max_lod(8),
        scheduler.clone(),
    );
    let position = LatLon::from_degrees(46.0, 7.5);

    let mut results = Vec::new();
    loop {
        let result = provider.altitude(position).unwrap();
        results.push(result);
        if !result.provisional {
            break;
        }
        assert!(results.len() <= 20, "never became final");
        provider.wait_for_loads();
    }

    // One load per level 0..=8, one query per load plus the final one
    assert_eq!(scheduler.submitted(), 9);
    assert_eq!(results.len(), 10);
    assert_eq!(results[0], AltitudeResult::provisional(0.0));
    assert!(results
        .windows(2)
        .all(|w| w[1].altitude >= w[0].altitude - 1e-9));

    // Data stops at level 6, so the final value comes from there
    assert!(!results.last().unwrap().provisional);
    assert!((results.last().unwrap().altitude - 600.0).abs() < 1e-6);
}

#[test]
fn test_non_blocking_null_source_stops_requesting() {
    let scheduler = counting_pool();
    let provider = NonBlockingTilePlanetAltitudeProvider::new(
        Arc::new(EmptyTileSource),
        AltitudeProviderConfig::default().with_max_lod(5),
        scheduler.clone(),
    );
    let west = LatLon::from_degrees(0.0, -90.0);
    let east = LatLon::from_degrees(0.0, 90.0);

    for _ in 0..3 {
        assert_eq!(provider.altitude(west).unwrap(), AltitudeResult::provisional(0.0));
        provider.wait_for_loads();
    }
    assert_eq!(scheduler.submitted(), 1);

    for _ in 0..3 {
        assert_eq!(provider.altitude(east).unwrap(), AltitudeResult::provisional(0.0));
        provider.wait_for_loads();
    }
    assert_eq!(scheduler.submitted(), 2);
}

#[test]
fn test_non_blocking_empty_directory_loads_once() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = DirectoryTileSource::new(DirectoryTileSourceConfig::elevation(
        dir.path(),
        LevelRange::new(0, 14),
        ElevationRerange::EARTH,
    ));
    let position = LatLon::from_degrees(35.0, -110.0);
    assert!(source.has_any_children(QuadTreeTileKey::new(0, 0, 0)));

    let scheduler = counting_pool();
    let provider = NonBlockingTilePlanetAltitudeProvider::new(
        Arc::new(source),
        AltitudeProviderConfig::default().with_max_lod(10),
        scheduler.clone(),
    );
    for _ in 0..30 {
        assert_eq!(provider.altitude(position).unwrap(), AltitudeResult::provisional(0.0));
        provider.wait_for_loads();
    }

    // The directory promises finer levels but the root has no data
    assert_eq!(scheduler.submitted(), 1);
}

#[test]
fn test_blocking_concurrent_queries_walk_once() {
    let source = Arc::new(CountingSource::new(3));
    let provider = BlockingTilePlanetAltitudeProvider::new(
        source.clone(),
        AltitudeProviderConfig::default().with_max_lod(6),
    );
    let position = LatLon::from_degrees(-12.0, 45.0);

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| provider.altitude(position).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for result in results {
        assert!(!result.provisional);
        assert!((result.altitude - 300.0).abs() < 1e-6);
    }
    // Levels 6 down to 3
    assert_eq!(source.total_calls(), 4);
}

#[test]
fn test_blocking_null_source_is_final_sea_level() {
    let provider = BlockingTilePlanetAltitudeProvider::new(
        Arc::new(EmptyTileSource),
        AltitudeProviderConfig::default(),
    );
    let result = provider.altitude(LatLon::from_degrees(60.0, -150.0)).unwrap();
    assert_eq!(result, AltitudeResult::final_value(0.0));
}
