pub mod cargo_env {
    pub const CARGO_PKG_NAME: &'static str = env!("CARGO_PKG_NAME");
}

pub mod common {
    /// Settings file looked up when `--config` is not given.
    pub const SETTINGS_FILE_NAME: &'static str = "trellis.yaml";
    /// Directories searched for the settings file, in order.
    pub const SETTINGS_DIRS: [&'static str; 2] = ["", "conf"];
    /// Prefix of environment variables overriding settings values.
    pub const SETTINGS_ENV_PREFIX: &'static str = "TRELLIS";
    pub const DEFAULT_RESULT_ROOT: &'static str = "result";
    pub const DEFAULT_TMP_ROOT: &'static str = "tmp";
    /// Name of the symlink pointing at the most recent run.
    pub const LATEST_LINK: &'static str = "latest";
    pub const RUN_DIR_FORMAT: &'static str = "%Y-%m-%d_%H-%M-%S";
}

pub mod layout {
    /// The single descriptor file present in every result directory.
    pub const RESULT_FILE_NAME: &'static str = "result.yaml";
    /// Failure message of a leaf, written beside its descriptor.
    pub const ERROR_FILE_NAME: &'static str = "err";
    pub const SPEC_EXTENSION: &'static str = "yaml";
    /// File tried when `a/b.yaml` does not exist: `a/b/all.yaml`.
    pub const SPEC_DIRECTORY_INDEX: &'static str = "all";
    pub const RUN_DIR_PREFIX: &'static str = "run-";
    /// Method used for case types that declare none.
    pub const DEFAULT_METHOD: &'static str = "run";
}
