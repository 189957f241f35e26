//! INI configuration file.
//!
//! Settings live in `config.ini` under the platform configuration directory
//! (`~/.config/tilestream/config.ini` on Linux):
//!
//! ```ini
//! [planet]
//! radius = 6371000
//!
//! [elevation]
//! directory = /data/elevation
//! extension = png
//! max_level = 14
//! rerange_scale = 1
//! rerange_offset = -32767
//! terrain_rgb = false
//!
//! [albedo]
//! directory = /data/albedo
//! extension = jpg
//! max_level = 16
//!
//! [loader]
//! max_elevation_lod = 14
//! min_attribute_lod = 12
//! max_attribute_lod = 16
//! worker_threads = 8
//!
//! [altitude]
//! max_lod = 10
//! cache_capacity = 1024
//!
//! [logging]
//! level = info
//! directory = /var/log/tilestream
//! ```
//!
//! Every key is optional. Components never read the file themselves; they
//! take the plain config structs produced here.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use ini::Ini;
use thiserror::Error;

use crate::altitude::AltitudeProviderConfig;
use crate::loader::PlanetTileImagesLoaderConfig;
use crate::quadtree::QuadTreeTileKey;
use crate::raster::ElevationRerange;
use crate::source::{
    DirectoryTileSource, DirectoryTileSourceConfig, EmptyTileSource, LevelRange, TerrainRgbSource,
    TileSourcePtr,
};

/// Finest level accepted by level settings.
pub const MAX_CONFIG_LEVEL: u32 = QuadTreeTileKey::MAX_LEVEL;

/// Errors reading, writing or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: ConfigKey,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

/// Path of the configuration file.
///
/// Falls back to the working directory when the platform has no
/// configuration directory.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Directory holding the configuration file.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilestream")
}

// =============================================================================
// Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PlanetSettings {
    /// Planet radius in metres.
    pub radius: f64,
}

impl Default for PlanetSettings {
    fn default() -> Self {
        Self { radius: 6_371_000.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElevationSettings {
    pub directory: Option<PathBuf>,
    pub extension: String,
    pub max_level: u32,
    pub rerange_scale: f64,
    pub rerange_offset: f64,
    /// Tiles are terrain-RGB colour images instead of 16-bit grayscale.
    pub terrain_rgb: bool,
}

impl Default for ElevationSettings {
    fn default() -> Self {
        Self {
            directory: None,
            extension: "png".to_string(),
            max_level: 14,
            rerange_scale: ElevationRerange::EARTH.scale,
            rerange_offset: ElevationRerange::EARTH.offset,
            terrain_rgb: false,
        }
    }
}

impl ElevationSettings {
    pub fn rerange(&self) -> ElevationRerange {
        ElevationRerange::new(self.rerange_scale, self.rerange_offset)
    }

    /// Source for the configured directory, or an empty source.
    pub fn source(&self) -> TileSourcePtr {
        let Some(directory) = &self.directory else {
            return Arc::new(EmptyTileSource);
        };
        let levels = LevelRange::new(0, self.max_level);
        if self.terrain_rgb {
            let config = DirectoryTileSourceConfig::color(directory, levels)
                .with_extension(self.extension.clone());
            Arc::new(TerrainRgbSource::new(DirectoryTileSource::new(config)))
        } else {
            let config = DirectoryTileSourceConfig::elevation(directory, levels, self.rerange())
                .with_extension(self.extension.clone());
            Arc::new(DirectoryTileSource::new(config))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlbedoSettings {
    pub directory: Option<PathBuf>,
    pub extension: String,
    pub max_level: u32,
}

impl Default for AlbedoSettings {
    fn default() -> Self {
        Self {
            directory: None,
            extension: "jpg".to_string(),
            max_level: 16,
        }
    }
}

impl AlbedoSettings {
    /// Source for the configured directory, or an empty source.
    pub fn source(&self) -> TileSourcePtr {
        match &self.directory {
            Some(directory) => Arc::new(DirectoryTileSource::new(
                DirectoryTileSourceConfig::color(directory, LevelRange::new(0, self.max_level))
                    .with_extension(self.extension.clone()),
            )),
            None => Arc::new(EmptyTileSource),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoaderSettings {
    pub max_elevation_lod: u32,
    pub min_attribute_lod: u32,
    pub max_attribute_lod: u32,
    pub worker_threads: usize,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        let defaults = PlanetTileImagesLoaderConfig::default();
        Self {
            max_elevation_lod: defaults.max_elevation_lod,
            min_attribute_lod: defaults.min_attribute_lod,
            max_attribute_lod: defaults.max_attribute_lod,
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AltitudeSettings {
    pub max_lod: u32,
    pub cache_capacity: u64,
}

impl Default for AltitudeSettings {
    fn default() -> Self {
        let defaults = AltitudeProviderConfig::default();
        Self {
            max_lod: defaults.max_lod,
            cache_capacity: defaults.cache_capacity,
        }
    }
}

/// Logging settings, consumed by [`init_logging`](crate::logging::init_logging).
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for daily log files. Console only when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

// =============================================================================
// Config file
// =============================================================================

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub planet: PlanetSettings,
    pub elevation: ElevationSettings,
    pub albedo: AlbedoSettings,
    pub loader: LoaderSettings,
    pub altitude: AltitudeSettings,
    pub logging: LoggingConfig,
}

impl ConfigFile {
    /// Loads the default config file, or defaults if it does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Loads `path`. Keys missing from the file keep their defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::default();
        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|section| section.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Writes to the default config file path.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Writes every set value to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }
        ini.write_to_file(path).map_err(write_error)
    }

    /// Checks constraints spanning several keys.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loader.min_attribute_lod > self.loader.max_attribute_lod {
            return Err(ConfigError::InvalidValue {
                key: ConfigKey::LoaderMinAttributeLod,
                value: self.loader.min_attribute_lod.to_string(),
                reason: format!(
                    "must not exceed loader.max_attribute_lod ({})",
                    self.loader.max_attribute_lod
                ),
            });
        }
        Ok(())
    }

    pub fn loader_config(&self) -> PlanetTileImagesLoaderConfig {
        PlanetTileImagesLoaderConfig::default()
            .with_planet_radius(self.planet.radius)
            .with_max_elevation_lod(self.loader.max_elevation_lod)
            .with_attribute_lods(self.loader.min_attribute_lod, self.loader.max_attribute_lod)
    }

    pub fn altitude_config(&self) -> AltitudeProviderConfig {
        AltitudeProviderConfig::default()
            .with_max_lod(self.altitude.max_lod)
            .with_cache_capacity(self.altitude.cache_capacity)
    }
}

// =============================================================================
// Keys
// =============================================================================

/// A `section.key` setting addressable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    PlanetRadius,
    ElevationDirectory,
    ElevationExtension,
    ElevationMaxLevel,
    ElevationRerangeScale,
    ElevationRerangeOffset,
    ElevationTerrainRgb,
    AlbedoDirectory,
    AlbedoExtension,
    AlbedoMaxLevel,
    LoaderMaxElevationLod,
    LoaderMinAttributeLod,
    LoaderMaxAttributeLod,
    LoaderWorkerThreads,
    AltitudeMaxLod,
    AltitudeCacheCapacity,
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    /// Every key, grouped by section in file order.
    pub fn all() -> &'static [ConfigKey] {
        use ConfigKey::*;
        &[
            PlanetRadius,
            ElevationDirectory,
            ElevationExtension,
            ElevationMaxLevel,
            ElevationRerangeScale,
            ElevationRerangeOffset,
            ElevationTerrainRgb,
            AlbedoDirectory,
            AlbedoExtension,
            AlbedoMaxLevel,
            LoaderMaxElevationLod,
            LoaderMinAttributeLod,
            LoaderMaxAttributeLod,
            LoaderWorkerThreads,
            AltitudeMaxLod,
            AltitudeCacheCapacity,
            LoggingLevel,
            LoggingDirectory,
        ]
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            PlanetRadius => "planet",
            ElevationDirectory | ElevationExtension | ElevationMaxLevel | ElevationRerangeScale
            | ElevationRerangeOffset | ElevationTerrainRgb => "elevation",
            AlbedoDirectory | AlbedoExtension | AlbedoMaxLevel => "albedo",
            LoaderMaxElevationLod | LoaderMinAttributeLod | LoaderMaxAttributeLod
            | LoaderWorkerThreads => "loader",
            AltitudeMaxLod | AltitudeCacheCapacity => "altitude",
            LoggingLevel | LoggingDirectory => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            PlanetRadius => "radius",
            ElevationDirectory | AlbedoDirectory | LoggingDirectory => "directory",
            ElevationExtension | AlbedoExtension => "extension",
            ElevationMaxLevel | AlbedoMaxLevel => "max_level",
            ElevationRerangeScale => "rerange_scale",
            ElevationRerangeOffset => "rerange_offset",
            ElevationTerrainRgb => "terrain_rgb",
            LoaderMaxElevationLod => "max_elevation_lod",
            LoaderMinAttributeLod => "min_attribute_lod",
            LoaderMaxAttributeLod => "max_attribute_lod",
            LoaderWorkerThreads => "worker_threads",
            AltitudeMaxLod => "max_lod",
            AltitudeCacheCapacity => "cache_capacity",
            LoggingLevel => "level",
        }
    }

    /// Current value as written to the file. Empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        use ConfigKey::*;
        let path = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };
        match self {
            PlanetRadius => config.planet.radius.to_string(),
            ElevationDirectory => path(&config.elevation.directory),
            ElevationExtension => config.elevation.extension.clone(),
            ElevationMaxLevel => config.elevation.max_level.to_string(),
            ElevationRerangeScale => config.elevation.rerange_scale.to_string(),
            ElevationRerangeOffset => config.elevation.rerange_offset.to_string(),
            ElevationTerrainRgb => config.elevation.terrain_rgb.to_string(),
            AlbedoDirectory => path(&config.albedo.directory),
            AlbedoExtension => config.albedo.extension.clone(),
            AlbedoMaxLevel => config.albedo.max_level.to_string(),
            LoaderMaxElevationLod => config.loader.max_elevation_lod.to_string(),
            LoaderMinAttributeLod => config.loader.min_attribute_lod.to_string(),
            LoaderMaxAttributeLod => config.loader.max_attribute_lod.to_string(),
            LoaderWorkerThreads => config.loader.worker_threads.to_string(),
            AltitudeMaxLod => config.altitude.max_lod.to_string(),
            AltitudeCacheCapacity => config.altitude.cache_capacity.to_string(),
            LoggingLevel => config.logging.level.clone(),
            LoggingDirectory => path(&config.logging.directory),
        }
    }

    /// Parses and stores `value`, leaving `config` untouched on error.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        use ConfigKey::*;
        let value = value.trim();
        match self {
            PlanetRadius => {
                let radius: f64 = self.parse(value)?;
                if !(radius.is_finite() && radius > 0.0) {
                    return Err(self.invalid(value, "must be a positive number of metres"));
                }
                config.planet.radius = radius;
            }
            ElevationDirectory => config.elevation.directory = optional_path(value),
            ElevationExtension => config.elevation.extension = self.extension(value)?,
            ElevationMaxLevel => config.elevation.max_level = self.level(value)?,
            ElevationRerangeScale => {
                let scale: f64 = self.parse(value)?;
                if !scale.is_finite() || scale == 0.0 {
                    return Err(self.invalid(value, "must be a finite non-zero number"));
                }
                config.elevation.rerange_scale = scale;
            }
            ElevationRerangeOffset => {
                let offset: f64 = self.parse(value)?;
                if !offset.is_finite() {
                    return Err(self.invalid(value, "must be a finite number"));
                }
                config.elevation.rerange_offset = offset;
            }
            ElevationTerrainRgb => config.elevation.terrain_rgb = self.boolean(value)?,
            AlbedoDirectory => config.albedo.directory = optional_path(value),
            AlbedoExtension => config.albedo.extension = self.extension(value)?,
            AlbedoMaxLevel => config.albedo.max_level = self.level(value)?,
            LoaderMaxElevationLod => config.loader.max_elevation_lod = self.level(value)?,
            LoaderMinAttributeLod => config.loader.min_attribute_lod = self.level(value)?,
            LoaderMaxAttributeLod => config.loader.max_attribute_lod = self.level(value)?,
            LoaderWorkerThreads => {
                let threads: usize = self.parse(value)?;
                if threads == 0 {
                    return Err(self.invalid(value, "must be at least 1"));
                }
                config.loader.worker_threads = threads;
            }
            AltitudeMaxLod => config.altitude.max_lod = self.level(value)?,
            AltitudeCacheCapacity => {
                let capacity: u64 = self.parse(value)?;
                if capacity == 0 {
                    return Err(self.invalid(value, "must be at least 1"));
                }
                config.altitude.cache_capacity = capacity;
            }
            LoggingLevel => {
                if let Err(e) = tracing_subscriber::EnvFilter::try_new(value) {
                    return Err(self.invalid(value, &e.to_string()));
                }
                config.logging.level = value.to_string();
            }
            LoggingDirectory => config.logging.directory = optional_path(value),
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: *self,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn parse<T>(&self, value: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        value
            .parse()
            .map_err(|e: T::Err| self.invalid(value, &e.to_string()))
    }

    fn level(&self, value: &str) -> Result<u32, ConfigError> {
        let level: u32 = self.parse(value)?;
        if level > MAX_CONFIG_LEVEL {
            return Err(self.invalid(value, &format!("must be at most {MAX_CONFIG_LEVEL}")));
        }
        Ok(level)
    }

    fn boolean(&self, value: &str) -> Result<bool, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(self.invalid(value, "expected true or false")),
        }
    }

    fn extension(&self, value: &str) -> Result<String, ConfigError> {
        let extension = value.trim_start_matches('.');
        if extension.is_empty() || extension.contains(['/', '\\']) {
            return Err(self.invalid(value, "expected a file extension such as png"));
        }
        Ok(extension.to_string())
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_component_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.loader_config(), PlanetTileImagesLoaderConfig::default());
        assert_eq!(config.altitude_config(), AltitudeProviderConfig::default());
        assert_eq!(config.elevation.rerange(), ElevationRerange::EARTH);
    }

    #[test]
    fn test_key_names_round_trip() {
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), *key);
        }
        assert_eq!(ConfigKey::AltitudeMaxLod.to_string(), "altitude.max_lod");
    }

    #[test]
    fn test_unknown_key() {
        let err = "altitude.nope".parse::<ConfigKey>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(k) if k == "altitude.nope"));
    }

    #[test]
    fn test_set_validates_values() {
        let mut config = ConfigFile::default();

        assert!(ConfigKey::AltitudeMaxLod.set(&mut config, "12").is_ok());
        assert_eq!(config.altitude.max_lod, 12);

        assert!(ConfigKey::AltitudeMaxLod.set(&mut config, "31").is_err());
        assert!(ConfigKey::PlanetRadius.set(&mut config, "-1").is_err());
        assert!(ConfigKey::LoaderWorkerThreads.set(&mut config, "0").is_err());
        assert!(ConfigKey::ElevationTerrainRgb.set(&mut config, "maybe").is_err());
        assert_eq!(config.altitude.max_lod, 12);

        ConfigKey::ElevationTerrainRgb.set(&mut config, "yes").unwrap();
        assert!(config.elevation.terrain_rgb);
        ConfigKey::AlbedoExtension.set(&mut config, ".webp").unwrap();
        assert_eq!(config.albedo.extension, "webp");
    }

    #[test]
    fn test_empty_directory_unsets() {
        let mut config = ConfigFile::default();
        ConfigKey::ElevationDirectory.set(&mut config, "/data/dem").unwrap();
        assert_eq!(config.elevation.directory, Some(PathBuf::from("/data/dem")));
        ConfigKey::ElevationDirectory.set(&mut config, "").unwrap();
        assert_eq!(config.elevation.directory, None);
        assert_eq!(ConfigKey::ElevationDirectory.get(&config), "");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        ConfigKey::PlanetRadius.set(&mut config, "3389500").unwrap();
        ConfigKey::ElevationDirectory.set(&mut config, "/data/mars").unwrap();
        ConfigKey::LoggingLevel.set(&mut config, "debug,tilestream=trace").unwrap();
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[altitude]\nmax_lod = 8\n").unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded.altitude.max_lod, 8);
        assert_eq!(loaded.altitude.cache_capacity, 1024);
        assert_eq!(loaded.planet, PlanetSettings::default());
    }

    #[test]
    fn test_load_rejects_inverted_attribute_range() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[loader]\nmin_attribute_lod = 15\nmax_attribute_lod = 13\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: ConfigKey::LoaderMinAttributeLod,
                ..
            }
        ));
    }

    #[test]
    fn test_load_reports_bad_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[planet]\nradius = big\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("planet.radius"));
    }

    #[test]
    fn test_config_file_path_ends_with_crate_directory() {
        let path = config_file_path();
        assert!(path.ends_with("tilestream/config.ini"));
    }
}
