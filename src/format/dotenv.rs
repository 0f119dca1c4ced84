//! `.env` config files.
//!
//! Keys are matched case-insensitively against the key path rendered with
//! the key separator. A leading `{env_prefix}{separator}` is stripped first,
//! so `APP_S_A=1` and `s_a=1` both set `S.A` when the prefix is `APP`. List
//! values are split on whitespace.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, trace};

use super::FileFormat;
use crate::error::TagconfError;
use crate::schema::{ElementKind, FieldMeta, Node, Scalar, Sequence};
use crate::types::{KeyPath, Settings};
use crate::walk::{Visitor, Walker};

pub const FORMAT: FileFormat = FileFormat {
    extension: ".env",
    load,
    prepare_help,
};

/// Read `path` and normalise its keys: prefix stripped, lowercased.
fn read_pairs(path: &Path, settings: &Settings) -> Result<HashMap<String, String>, TagconfError> {
    let to_error = |e: dotenvy::Error| TagconfError::DotEnvError {
        path: path.to_path_buf(),
        source: e,
    };
    let prefix = if settings.env_prefix.is_empty() {
        String::new()
    } else {
        format!("{}{}", settings.env_prefix, settings.separator)
    };

    let mut pairs = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(to_error)? {
        let (key, value) = item.map_err(to_error)?;
        let key = match key.strip_prefix(&prefix) {
            Some(rest) if !prefix.is_empty() => rest,
            _ => key.as_str(),
        };
        pairs.insert(key.to_lowercase(), value);
    }
    Ok(pairs)
}

struct DotEnv<'a> {
    walker: &'a Walker<'a>,
    pairs: &'a HashMap<String, String>,
    applied: usize,
}

impl<'a> DotEnv<'a> {
    fn lookup(&self, key: &KeyPath) -> Option<(String, &'a str)> {
        let name = self.walker.render(key);
        let pairs: &'a HashMap<String, String> = self.pairs;
        let value = pairs.get(&name.to_lowercase())?;
        Some((name, value.as_str()))
    }
}

impl Visitor for DotEnv<'_> {
    fn scalar(
        &mut self,
        _field: &FieldMeta,
        key: &KeyPath,
        value: &mut dyn Scalar,
    ) -> Result<(), TagconfError> {
        let Some((name, raw)) = self.lookup(key) else {
            return Ok(());
        };
        value.set_str(raw).map_err(|reason| TagconfError::InvalidValue {
            key: name.clone(),
            value: raw.to_string(),
            reason,
        })?;
        trace!(".env {name} = {raw:?}");
        self.applied += 1;
        Ok(())
    }

    fn sequence(
        &mut self,
        _field: &FieldMeta,
        key: &KeyPath,
        value: &mut dyn Sequence,
    ) -> Result<(), TagconfError> {
        if value.element_kind().is_composite() {
            return Ok(());
        }
        let Some((name, raw)) = self.lookup(key) else {
            return Ok(());
        };
        let items: Vec<&str> = raw.split_whitespace().collect();
        value
            .set_items(&items)
            .map_err(|reason| TagconfError::InvalidValue {
                key: name,
                value: raw.to_string(),
                reason,
            })?;
        self.applied += 1;
        Ok(())
    }
}

/// Parse `path` as a dotenv file and write its values into `root`.
pub fn load(path: &Path, root: &mut dyn Node, settings: &Settings) -> Result<(), TagconfError> {
    let pairs = read_pairs(path, settings)?;
    let walker = Walker::files(settings);
    let mut visitor = DotEnv {
        walker: &walker,
        pairs: &pairs,
        applied: 0,
    };
    walker.walk(root, &mut visitor)?;
    debug!("applied {} values from {}", visitor.applied, path.display());
    Ok(())
}

/// One `PREFIX_KEY=value` line per key, each preceded by its help as a
/// comment.
pub fn prepare_help(root: &mut dyn Node, settings: &Settings) -> Result<String, TagconfError> {
    struct Help<'a> {
        walker: &'a Walker<'a>,
        out: String,
    }

    impl Help<'_> {
        fn line(&mut self, field: &FieldMeta, key: &KeyPath, value: &str) {
            let help = field
                .tag(&self.walker.settings().help_tag)
                .unwrap_or(field.doc);
            if !help.is_empty() {
                self.out.push_str(&format!("# {help}\n"));
            }
            let name = self.walker.render(key).to_uppercase();
            self.out.push_str(&format!("{name}={value}\n"));
        }
    }

    impl Visitor for Help<'_> {
        fn scalar(
            &mut self,
            field: &FieldMeta,
            key: &KeyPath,
            value: &mut dyn Scalar,
        ) -> Result<(), TagconfError> {
            self.line(field, key, &value.display());
            Ok(())
        }

        fn sequence(
            &mut self,
            field: &FieldMeta,
            key: &KeyPath,
            value: &mut dyn Sequence,
        ) -> Result<(), TagconfError> {
            if let ElementKind::Scalar(_) = value.element_kind() {
                let items = value.display_items().join(" ");
                self.line(field, key, &items);
            }
            Ok(())
        }
    }

    let walker = Walker::env(settings);
    let mut help = Help {
        walker: &walker,
        out: String::new(),
    };
    walker.walk(root, &mut help)?;
    Ok(help.out)
}
