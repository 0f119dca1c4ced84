//! Tag-driven layered configuration. Describe your settings as a struct,
//! annotate the fields, and load them from defaults, a config file,
//! environment variables and command-line flags in one call.
//!
//! ```ignore
//! #[derive(tagconf::Config, Default)]
//! struct AppConfig {
//!     #[conf(key = "PORT", default = 8080, help = "listen port")]
//!     port: u16,
//!     #[conf(key = "DB")]
//!     db: DbConfig,
//! }
//!
//! let mut config = AppConfig::default();
//! Tagconf::builder()
//!     .file("app.toml")
//!     .env_prefix("APP")
//!     .parse(&mut config)?;
//! ```
//!
//! That reads `./app.toml` if it exists, then `APP_PORT` and `APP_DB_*`
//! variables, then `--PORT` and `--DB-*` flags, and fills every field no
//! source mentioned with its declared default.
//!
//! # Tags
//!
//! Each field carries its metadata in `#[conf(...)]`. The derive records
//! every `name = value` pair as a tag, so the tag names themselves are
//! configurable through [`Settings`]:
//!
//! - **`key`** overrides the field's key segment (`key = "-"` hides the
//!   field and everything under it).
//! - **`default`** is the value used when no source sets the field.
//! - **`help`** is shown in `--help`; the field's `///` doc comment is the
//!   fallback.
//! - **`required`** makes an empty value an error after all sources ran.
//! - **`flatten`** embeds a nested struct without adding a key segment.
//!
//! # Keys
//!
//! A field's key is the path of key segments from the root, joined with a
//! separator: `_` for env vars and files, `-` for flags. Sequence elements
//! add `[i]` (`G[0]_A`). Env and flag walks put their prefix in front of
//! top-level keys.
//!
//! # Layer precedence
//!
//! ```text
//! Declared defaults     #[conf(default = ...)]
//!        ↑ overridden by
//! Config file           ./app.toml, format picked by extension
//!        ↑ overridden by
//! Environment vars      PREFIX_KEY
//!        ↑ overridden by
//! Flags                 --KEY=value
//! ```
//!
//! Defaults are written first, into every field that still holds its zero
//! value, so a file that sets `PORT = 0` keeps the zero. Booleans always
//! start from their declared default.
//!
//! # File formats
//!
//! JSON, TOML, INI and `.env` files are built in. Register more with
//! [`Loader::register_format`]; a [`FileFormat`] is an extension plus a
//! load and a help function. Document formats can parse into a
//! `serde_json::Value` and hand it to [`format::apply_document`].
//!
//! # Watching
//!
//! [`Loader::parse_and_watch`] keeps a shared value current while the config
//! file changes, reporting each reload on the returned [`Watch`].
//!
//! # Error handling
//!
//! All fallible operations return [`TagconfError`]. Shape problems (a
//! missing tag name, an unsupported field type, a flattened scalar) are
//! found before any field is written.

extern crate self as tagconf;

pub mod error;
pub mod format;
pub mod resolve;
pub mod scalar;
pub mod schema;
pub mod types;
pub mod walk;
pub mod watch;

mod builder;
#[cfg(feature = "clap")]
mod cli;
mod defaults;
mod env;
mod file;
mod validate;

#[cfg(test)]
mod fixtures;

pub use builder::{Loader, Tagconf};
pub use error::TagconfError;
pub use format::FileFormat;
pub use schema::{ElementKind, FieldMeta, Node, Record, Scalar, ScalarKind, Sequence, Slot};
pub use tagconf_derive::Config;
pub use types::{KeyPath, Segment, Settings};
pub use watch::Watch;
