//! Altitude command - query terrain height at a point.

use std::sync::Arc;

use tilestream::altitude::{
    AltitudeResult, BlockingTilePlanetAltitudeProvider, LatLon,
    NonBlockingTilePlanetAltitudeProvider, PlanetAltitudeProvider,
};
use tracing::debug;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the altitude command.
pub struct AltitudeArgs {
    pub lat: f64,
    pub lon: f64,
    pub blocking: bool,
}

/// Run the altitude command.
pub fn run(args: AltitudeArgs) -> Result<(), CliError> {
    if !(-90.0..=90.0).contains(&args.lat) {
        return Err(CliError::InvalidArgument(format!(
            "latitude {} is outside -90..90",
            args.lat
        )));
    }
    if !(-180.0..=180.0).contains(&args.lon) {
        return Err(CliError::InvalidArgument(format!(
            "longitude {} is outside -180..180",
            args.lon
        )));
    }

    let runner = CliRunner::new()?;
    runner.log_startup("altitude");
    let config = runner.config();

    let position = LatLon::from_degrees(args.lat, args.lon);
    let provider = Arc::new(BlockingTilePlanetAltitudeProvider::new(
        config.elevation.source(),
        config.altitude_config(),
    ));

    let (result, queries) = if args.blocking {
        (provider.altitude(position)?, 1)
    } else {
        let streaming =
            NonBlockingTilePlanetAltitudeProvider::with_provider(provider, runner.scheduler()?);
        refine(&streaming, position)?
    };

    println!("Position: {:.6}, {:.6}", args.lat, args.lon);
    println!("Altitude: {:.2} m", result.altitude);
    if !args.blocking {
        println!("Queries:  {}", queries);
    }
    Ok(())
}

/// Polls until the answer stops being provisional.
fn refine(
    provider: &NonBlockingTilePlanetAltitudeProvider,
    position: LatLon,
) -> Result<(AltitudeResult, usize), CliError> {
    let max_lod = provider.blocking().config().max_lod as usize;
    let mut queries = 0;
    loop {
        let result = provider.altitude(position)?;
        queries += 1;
        debug!(altitude = result.altitude, provisional = result.provisional, "Altitude query");
        // Each query loads at most one more level
        if !result.provisional || queries > max_lod + 1 {
            return Ok((result, queries));
        }
        provider.wait_for_loads();
    }
}
