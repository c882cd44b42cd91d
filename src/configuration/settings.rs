use crate::configuration::constants::common::{
    DEFAULT_RESULT_ROOT, DEFAULT_TMP_ROOT, SETTINGS_DIRS, SETTINGS_ENV_PREFIX, SETTINGS_FILE_NAME,
};
use config::{Config, ConfigError, Environment, File};
use serde_derive::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Process-wide settings, built once and passed by reference to the loader
/// and to every test case constructor.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Directories searched for suite specifications, in order.
    #[serde(default = "default_path", with = "crate::configuration::deserialize::string_or_list")]
    pub path: Vec<String>,
    /// Dotted prefixes tried before the plain test name.
    #[serde(default, with = "crate::configuration::deserialize::string_or_list")]
    pub overlays: Vec<String>,
    #[serde(default = "default_result_root")]
    pub result_root: PathBuf,
    #[serde(default = "default_tmp_root")]
    pub tmp_root: PathBuf,
    #[serde(default)]
    pub variables: Mapping,
    /// Device control configurations, selected per test with `cfg_idx`.
    #[serde(default)]
    pub devices: Vec<Mapping>,
}

fn default_path() -> Vec<String> {
    vec![".".to_owned()]
}

fn default_result_root() -> PathBuf {
    PathBuf::from(DEFAULT_RESULT_ROOT)
}

fn default_tmp_root() -> PathBuf {
    PathBuf::from(DEFAULT_TMP_ROOT)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            path: default_path(),
            overlays: Vec::new(),
            result_root: default_result_root(),
            tmp_root: default_tmp_root(),
            variables: Mapping::new(),
            devices: Vec::new(),
        }
    }
}

impl Settings {
    /// Loads settings from `file`, or from the first settings file found in
    /// the conventional locations. Environment variables prefixed with
    /// `TRELLIS_` override values from the file.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::new();
        match file.map(Path::to_path_buf).or_else(Settings::locate) {
            Some(path) => {
                debug!("Loading settings from {}", path.display());
                config.merge(File::from(path))?;
            }
            None => debug!("No settings file found, using defaults"),
        }
        config.merge(Environment::with_prefix(SETTINGS_ENV_PREFIX))?;
        config.try_into()
    }

    fn locate() -> Option<PathBuf> {
        SETTINGS_DIRS
            .iter()
            .map(|dir| Path::new(dir).join(SETTINGS_FILE_NAME))
            .find(|candidate| {
                trace!("Trying settings file {}", candidate.display());
                candidate.is_file()
            })
    }

    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.path.iter().map(PathBuf::from).collect()
    }

    /// Looks up a free-form variable. Keys are matched case-insensitively
    /// since the settings loader folds them to lower case.
    pub fn variable(&self, key: &str) -> Option<&Value> {
        self.variables
            .get(&Value::from(key))
            .or_else(|| self.variables.get(&Value::from(key.to_lowercase())))
    }

    pub fn device(&self, index: usize) -> Option<&Mapping> {
        self.devices.get(index)
    }
}
