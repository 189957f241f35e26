//! `tilestream config` - inspect and edit the settings file.
//!
//! Every subcommand reads the default file unless `--file` names another.
//! A value is checked by its key and the whole file is re-validated before
//! anything is written, so a rejected `set` leaves the file as it was.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use tilestream::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Arguments shared by the config subcommands.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Settings file to use instead of the default location
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one value, with its default when it differs
    Get {
        /// Key as section.key, e.g. altitude.max_lod
        key: String,
    },

    /// Check and store a value
    Set {
        /// Key as section.key, e.g. elevation.directory
        key: String,

        /// New value; an empty string unsets a directory
        value: String,
    },

    /// Restore a key to its default
    Reset {
        key: String,
    },

    /// Print every key, marking the ones that differ from the defaults
    List {
        /// Only print keys that differ from the defaults
        #[arg(long)]
        changed: bool,
    },

    /// Print the settings file location
    Path,
}

/// A settings file and its parsed contents.
struct Settings {
    path: PathBuf,
    config: ConfigFile,
}

impl Settings {
    /// Reads `path`, or defaults when the file does not exist yet.
    fn open(path: PathBuf) -> Result<Self, CliError> {
        let config = if path.exists() {
            ConfigFile::load_from(&path)?
        } else {
            ConfigFile::default()
        };
        Ok(Self { path, config })
    }

    fn get(&self, name: &str) -> Result<String, CliError> {
        let key = parse_key(name)?;
        Ok(describe(key, &self.config))
    }

    fn set(&mut self, name: &str, value: &str) -> Result<String, CliError> {
        let key = parse_key(name)?;
        key.set(&mut self.config, value)?;
        self.config.validate()?;
        self.config.save_to(&self.path)?;
        Ok(format!("{} = {}", key, describe(key, &self.config)))
    }

    fn reset(&mut self, name: &str) -> Result<String, CliError> {
        let key = parse_key(name)?;
        let default = key.get(&ConfigFile::default());
        self.set(&key.name(), &default)
    }
}

/// Run a config subcommand.
pub fn run(args: ConfigArgs) -> Result<(), CliError> {
    let path = args.file.unwrap_or_else(config_file_path);
    match args.command {
        ConfigCommands::Path => {
            let state = if path.exists() { "" } else { " (not created yet)" };
            println!("{}{}", path.display(), state);
        }
        ConfigCommands::Get { key } => println!("{}", Settings::open(path)?.get(&key)?),
        ConfigCommands::Set { key, value } => println!("{}", Settings::open(path)?.set(&key, &value)?),
        ConfigCommands::Reset { key } => println!("{}", Settings::open(path)?.reset(&key)?),
        ConfigCommands::List { changed } => {
            let settings = Settings::open(path)?;
            print!("{}", render_list(&settings.config, changed));
        }
    }
    Ok(())
}

/// Parses `section.key`, naming the section's keys when only the key part
/// is wrong.
fn parse_key(name: &str) -> Result<ConfigKey, CliError> {
    name.parse().map_err(|_| {
        let section = name.split_once('.').map_or(name, |(section, _)| section);
        let siblings: Vec<_> = ConfigKey::all()
            .iter()
            .filter(|key| key.section() == section)
            .map(|key| key.key_name())
            .collect();

        let hint = if siblings.is_empty() {
            let mut sections: Vec<_> = ConfigKey::all().iter().map(|key| key.section()).collect();
            sections.dedup();
            format!("sections are {}", sections.join(", "))
        } else {
            format!("[{}] has {}", section, siblings.join(", "))
        };
        CliError::Config(format!("unknown key '{}'; {}", name, hint))
    })
}

fn shown(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

/// Value of `key`, followed by the default when they differ.
fn describe(key: ConfigKey, config: &ConfigFile) -> String {
    let value = key.get(config);
    let default = key.get(&ConfigFile::default());
    if value == default {
        shown(&value).to_string()
    } else {
        format!("{} (default: {})", shown(&value), shown(&default))
    }
}

/// One `[section]` block per section with aligned keys. Changed keys carry
/// a `*`.
fn render_list(config: &ConfigFile, changed_only: bool) -> String {
    let defaults = ConfigFile::default();
    let width = ConfigKey::all()
        .iter()
        .map(|key| key.key_name().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let mut section = "";
    for &key in ConfigKey::all() {
        let value = key.get(config);
        let changed = value != key.get(&defaults);
        if changed_only && !changed {
            continue;
        }
        if key.section() != section {
            if !section.is_empty() {
                out.push('\n');
            }
            section = key.section();
            out.push_str(&format!("[{}]\n", section));
        }
        let marker = if changed { '*' } else { ' ' };
        out.push_str(&format!(
            "{} {:<width$} = {}\n",
            marker,
            key.key_name(),
            shown(&value),
            width = width
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> Settings {
        Settings::open(dir.path().join("config.ini")).unwrap()
    }

    #[test]
    fn test_missing_file_reads_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        assert_eq!(settings.config, ConfigFile::default());
        assert_eq!(settings.get("elevation.directory").unwrap(), "(not set)");
    }

    #[test]
    fn test_set_persists_and_reports_default() {
        let dir = TempDir::new().unwrap();
        let mut first = settings(&dir);
        let printed = first.set("altitude.max_lod", "12").unwrap();
        let default = ConfigFile::default().altitude.max_lod;
        assert_eq!(printed, format!("altitude.max_lod = 12 (default: {default})"));

        let reopened = settings(&dir);
        assert_eq!(reopened.config.altitude.max_lod, 12);
    }

    #[test]
    fn test_rejected_value_leaves_file_unchanged() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings(&dir);
        settings.set("planet.radius", "1000").unwrap();

        let error = settings.set("planet.radius", "-5").unwrap_err();
        assert!(matches!(error, CliError::ConfigFile(_)));
        assert_eq!(self::settings(&dir).config.planet.radius, 1000.0);
    }

    #[test]
    fn test_set_rejects_conflicting_attribute_lods() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings(&dir);
        let max = settings.config.loader.max_attribute_lod;

        let error = settings.set("loader.min_attribute_lod", &(max + 1).to_string());
        assert!(error.is_err());
        assert!(!dir.path().join("config.ini").exists());
    }

    #[test]
    fn test_reset_restores_default() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings(&dir);
        settings.set("albedo.directory", "/data/albedo").unwrap();
        settings.set("albedo.extension", "webp").unwrap();

        assert_eq!(settings.reset("albedo.directory").unwrap(), "albedo.directory = (not set)");
        assert_eq!(settings.reset("albedo.extension").unwrap(), "albedo.extension = jpg");
        assert_eq!(self::settings(&dir).config, ConfigFile::default());
    }

    #[test]
    fn test_unknown_key_names_section_keys() {
        let message = match parse_key("altitude.lod") {
            Err(CliError::Config(message)) => message,
            other => panic!("unexpected {other:?}"),
        };
        assert!(message.contains("max_lod"), "{message}");
        assert!(message.contains("cache_capacity"), "{message}");

        let message = match parse_key("render.fov") {
            Err(CliError::Config(message)) => message,
            other => panic!("unexpected {other:?}"),
        };
        assert!(message.contains("sections are planet, elevation"), "{message}");
    }

    #[test]
    fn test_list_marks_changed_keys() {
        let mut config = ConfigFile::default();
        ConfigKey::AltitudeCacheCapacity.set(&mut config, "64").unwrap();

        let full = render_list(&config, false);
        assert!(full.starts_with("[planet]\n"));
        assert!(full.lines().any(|line| line.starts_with("* cache_capacity") && line.ends_with("= 64")));
        assert_eq!(full.lines().filter(|line| line.starts_with('*')).count(), 1);

        assert_eq!(
            render_list(&config, true),
            format!("[altitude]\n* {:<17} = 64\n", "cache_capacity")
        );
    }
}
