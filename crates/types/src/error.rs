//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating, parsing, or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration source was given.
    #[error("No input file given")]
    Missing,

    /// The configuration source could not be read.
    #[error("Failed to read config {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required key is absent.
    #[error("Missing required config key `{0}`")]
    MissingKey(&'static str),

    /// A key is present but holds a value of the wrong type or range.
    #[error("Invalid value for `{key}`: expected {expected}, found {found}")]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
        found: String,
    },

    /// A gas file name does not follow the mixture naming scheme.
    #[error("Invalid gas file name `{0}`: expected <gas>_<fraction>..._<pressure>bar[_<temp>C].gas")]
    InvalidGasFile(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, expected: &'static str, found: impl ToString) -> Self {
        ConfigError::InvalidValue {
            key,
            expected,
            found: found.to_string(),
        }
    }
}
