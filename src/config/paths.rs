use std::path::Path;
use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use super::validate_directory;
use crate::constants::DEFAULT_CAR_ROSTER;
use crate::constants::DEFAULT_CODRIVER_PACKAGES_DIR;
use crate::constants::DEFAULT_LABEL_OVERRIDE_FILE;
use crate::constants::DEFAULT_PACENOTE_DIR;
use crate::constants::DEFAULT_RACE_STATS_DB;
use crate::Error;
use crate::Result;

/// File locations. Everything except `state_file` and `log_dir` is relative
/// to the game root chosen by the user.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathsConfig {
    /// Persisted `{ "folderPath": ... }` host state
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Overrides the game root stored in the host state when non-empty
    #[serde(default)]
    pub game_root: String,

    #[serde(default = "default_pacenote_dir")]
    pub pacenote_dir: PathBuf,

    #[serde(default = "default_race_stats_db")]
    pub race_stats_db: PathBuf,

    #[serde(default = "default_car_roster")]
    pub car_roster: PathBuf,

    #[serde(default = "default_codriver_packages_dir")]
    pub codriver_packages_dir: PathBuf,

    #[serde(default = "default_label_override_file")]
    pub label_override_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            log_dir: default_log_dir(),
            game_root: String::new(),
            pacenote_dir: default_pacenote_dir(),
            race_stats_db: default_race_stats_db(),
            car_roster: default_car_roster(),
            codriver_packages_dir: default_codriver_packages_dir(),
            label_override_file: default_label_override_file(),
        }
    }
}

impl PathsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.state_file.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "state_file path cannot be empty".into(),
            )));
        }
        for (name, path) in [
            ("pacenote_dir", &self.pacenote_dir),
            ("race_stats_db", &self.race_stats_db),
            ("car_roster", &self.car_roster),
            ("codriver_packages_dir", &self.codriver_packages_dir),
            ("label_override_file", &self.label_override_file),
        ] {
            if path.is_absolute() {
                return Err(Error::Config(ConfigError::Message(format!(
                    "{name} must be relative to the game root, got {}",
                    path.display()
                ))));
            }
        }
        validate_directory(&self.log_dir, "log_dir")
    }

    /// Game root forced by configuration, if any
    pub fn configured_game_root(&self) -> Option<PathBuf> {
        if self.game_root.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(self.game_root.trim()))
        }
    }

    /// Resolves the game-relative layout against a concrete game root
    pub fn resolve(
        &self,
        game_root: &Path,
    ) -> HostPaths {
        HostPaths {
            game_root: game_root.to_path_buf(),
            pacenote_root: game_root.join(&self.pacenote_dir),
            race_stats_db: game_root.join(&self.race_stats_db),
            car_roster: game_root.join(&self.car_roster),
            codriver_packages_dir: game_root.join(&self.codriver_packages_dir),
            label_override_file: game_root.join(&self.label_override_file),
        }
    }
}

/// Absolute locations derived from one game root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPaths {
    pub game_root: PathBuf,
    pub pacenote_root: PathBuf,
    pub race_stats_db: PathBuf,
    pub car_roster: PathBuf,
    pub codriver_packages_dir: PathBuf,
    pub label_override_file: PathBuf,
}

fn default_state_file() -> PathBuf {
    PathBuf::from("./config.json")
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}
fn default_pacenote_dir() -> PathBuf {
    PathBuf::from(DEFAULT_PACENOTE_DIR)
}
fn default_race_stats_db() -> PathBuf {
    PathBuf::from(DEFAULT_RACE_STATS_DB)
}
fn default_car_roster() -> PathBuf {
    PathBuf::from(DEFAULT_CAR_ROSTER)
}
fn default_codriver_packages_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CODRIVER_PACKAGES_DIR)
}
fn default_label_override_file() -> PathBuf {
    PathBuf::from(DEFAULT_LABEL_OVERRIDE_FILE)
}
