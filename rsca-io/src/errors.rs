use rsca_core::errors::RSCAError;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for loading inputs and writing results.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Could not access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not process CSV file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Column `{column}` not found in {path}")]
    MissingColumn { path: PathBuf, column: String },
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Could not serialise configuration: {0}")]
    ConfigSerialisation(#[from] toml::ser::Error),
    #[error("Could not generate synthetic emissions: {0}")]
    Synthetic(String),
    #[error("Could not draw {path}: {message}")]
    Plot { path: PathBuf, message: String },
    #[error(transparent)]
    Model(#[from] RSCAError),
}

impl AdapterError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| AdapterError::Io { path, source }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>) -> impl FnOnce(csv::Error) -> Self {
        let path = path.into();
        move |source| AdapterError::Csv { path, source }
    }
}

/// Convenience type for `Result<T, AdapterError>`.
pub type AdapterResult<T> = Result<T, AdapterError>;
