use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TagconfError {
    #[error("No canonical tag configured; set Settings::tag before parsing")]
    UndefinedTag,

    #[error("Expected a record at '{key}', found {type_name}")]
    NotARecord { key: String, type_name: &'static str },

    #[error("Only records can be embedded (field '{field}')")]
    AnonymousNotRecord { field: String },

    #[error("Type not supported at '{key}': {type_name}")]
    TypeNotSupported { key: String, type_name: &'static str },

    #[error("Invalid value {value:?} for '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("-{key} is required")]
    Required { key: String },

    #[error("Key '{key}' is produced by more than one field")]
    DuplicateKey { key: String },

    #[error("File format not defined for extension '{extension}'")]
    FormatNotDefined { extension: String },

    #[error("Format '{extension}' failed: {reason}")]
    Format { extension: String, reason: String },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    JsonError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    IniError {
        path: PathBuf,
        source: ini::ParseError,
    },

    #[error("Failed to parse {path}: {source}")]
    DotEnvError {
        path: PathBuf,
        source: dotenvy::Error,
    },

    #[cfg(feature = "clap")]
    #[error("{0}")]
    Flags(#[from] clap::Error),

    #[error("{0}")]
    HelpRequested(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl TagconfError {
    /// The key path an error is about, when it has one.
    pub fn key(&self) -> Option<&str> {
        match self {
            TagconfError::NotARecord { key, .. }
            | TagconfError::TypeNotSupported { key, .. }
            | TagconfError::InvalidValue { key, .. }
            | TagconfError::Required { key }
            | TagconfError::DuplicateKey { key } => Some(key),
            _ => None,
        }
    }
}
