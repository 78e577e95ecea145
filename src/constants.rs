use std::time::Duration;

// -
// Game folder layout, relative to the configured game root

/// Folder holding the user's pacenote annotation files
pub(crate) const DEFAULT_PACENOTE_DIR: &str = "Plugins/NGPCarMenu/MyPacenotes";
/// NGPCarMenu race statistics database
pub(crate) const DEFAULT_RACE_STATS_DB: &str = "Plugins/NGPCarMenu/RaceStat/raceStatDB.sqlite3";
/// Car slot roster
pub(crate) const DEFAULT_CAR_ROSTER: &str = "Cars/Cars.ini";
/// Co-driver package tree
pub(crate) const DEFAULT_CODRIVER_PACKAGES_DIR: &str = "Plugins/Pacenote/config/pacenotes/packages";
/// Label override file written verbatim by the `pacenoteLabels` request
pub(crate) const DEFAULT_LABEL_OVERRIDE_FILE: &str = "Plugins/Pacenote/config/pacenotes/PacenoteLabels.ini";

// -
// Annotation format

pub(crate) const ANNOTATION_SUFFIX: &str = "ini";
pub(crate) const PACENOTES_SECTION: &str = "PACENOTES";
pub(crate) const PACENOTES_COUNT_KEY: &str = "count";

// -
// Lifecycle

/// How long shutdown waits for the connection server task to finish
pub(crate) const SERVER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

// -
// Stage matching

/// Largest edit distance a fuzzy stage match may have
pub(crate) const FUZZY_MAX_DISTANCE: usize = 3;
/// Minimum distance separation between best and runner-up fuzzy candidates
pub(crate) const AMBIGUITY_GAP: usize = 2;

// -
// Co-driver packages

pub(crate) const UNKNOWN_PACENOTE_TYPE: &str = "UNKNOWN";
pub(crate) const PACKAGE_SECTION_PREFIX: &str = "PACKAGE::";
pub(crate) const CATEGORY_SECTION_PREFIX: &str = "CATEGORY::";
pub(crate) const PACENOTE_SECTION_PREFIX: &str = "PACENOTE::";
