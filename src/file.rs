//! Config file location and loading.
//!
//! A loader has at most one config file: a directory (default `./`) plus a
//! file name. Two environment variables can override either part at run
//! time, `CONFIG_FILE` and `CONFIG_PATH` by default, looked up with the env
//! prefix (`APP_CONFIG_FILE` when the prefix is `APP`).
//!
//! The format is chosen by the file name's extension. A missing file is
//! skipped unless the loader requires it; an unreadable or malformed one is
//! always an error.

use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::TagconfError;
use crate::format::{self, FileFormat};
use crate::schema::Node;
use crate::types::Settings;

/// Where the config file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub dir: PathBuf,
    pub name: String,
}

impl ConfigFile {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    /// The format extension, `.env` style dotfiles included.
    pub fn extension(&self) -> &str {
        format::extension_of(&self.name)
    }
}

/// Name of an override variable: `{env_prefix}{separator}{name}`, or just
/// `name` without a prefix.
pub fn override_var(settings: &Settings, name: &str) -> String {
    if settings.env_prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{name}", settings.env_prefix, settings.separator)
    }
}

/// Resolve the config file from builder options and override variables.
///
/// `lookup` reads an environment variable; set variables win even when
/// empty. Returns `None` when no file name is configured.
pub fn locate(
    settings: &Settings,
    dir: &Path,
    name: Option<&str>,
    file_env: &str,
    path_env: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<ConfigFile> {
    let name = lookup(&override_var(settings, file_env)).or_else(|| name.map(str::to_string));
    let dir = lookup(&override_var(settings, path_env))
        .map(PathBuf::from)
        .unwrap_or_else(|| dir.to_path_buf());
    match name {
        Some(name) if !name.is_empty() => Some(ConfigFile { dir, name }),
        _ => None,
    }
}

/// Load `file` into `root` with `format`, then render the format's help.
///
/// Returns the help text. A missing file leaves `root` untouched unless
/// `required` is set, in which case it is an [`TagconfError::IoError`].
pub fn load_file(
    file: &ConfigFile,
    format: &FileFormat,
    root: &mut dyn Node,
    settings: &Settings,
    required: bool,
) -> Result<String, TagconfError> {
    let path = file.path();
    if path.is_file() {
        debug!("loading config file {}", path.display());
        (format.load)(&path, root, settings)?;
    } else if required {
        return Err(TagconfError::IoError {
            path,
            source: io::Error::new(io::ErrorKind::NotFound, "config file not found"),
        });
    } else {
        debug!("config file {} not found, skipping", path.display());
    }
    (format.prepare_help)(root, settings)
}
