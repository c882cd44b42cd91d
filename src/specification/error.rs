use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// An invalid policy directive. Always fatal at load time.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("only specify one of count and retry")]
    CountAndRetry,
    #[error("{key} parameter is not int as expected: {value}")]
    NotInteger { key: &'static str, value: String },
    #[error("{key} parameter is less than 2 ({value}) - mistake?")]
    BelowMinimum { key: &'static str, value: u64 },
    #[error("only valid value of exit-on-error is true, got {0}")]
    ExitOnError(String),
    #[error("{key} must be a boolean, got {value}")]
    NotBoolean { key: &'static str, value: String },
    #[error("{key} must be a scalar, got {value}")]
    NotScalar { key: &'static str, value: String },
    #[error("invalid type directive: {0}")]
    InvalidType(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to load test: {0}")]
    NotFound(String),
    #[error("cannot read specification {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed specification {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid entry in {}: {reason}", .path.display())]
    Entry { path: PathBuf, reason: String },
    #[error("it is not allowed to have an empty {section} section in {}", .path.display())]
    NullSection { path: PathBuf, section: &'static str },
    #[error("placeholder in {}: {reason}", .path.display())]
    Placeholder { path: PathBuf, reason: String },
    #[error("cannot load test unit {name}: {reason}")]
    Unit { name: String, reason: String },
    #[error("invalid policy for {name}: {source}")]
    Configuration {
        name: String,
        #[source]
        source: ConfigurationError,
    },
}

impl LoadError {
    pub fn unit<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        LoadError::Unit {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
