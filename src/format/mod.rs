//! Config file formats.
//!
//! A [`FileFormat`] is an extension plus two functions: `load` writes the
//! file's values into the tree, `prepare_help` renders a sample file listing
//! every recognised key. The built-in formats are `.json`, `.toml`, `.ini`
//! and `.env`; callers can register more (or replace one) on the
//! [`Loader`](crate::Loader).
//!
//! The structured formats share one loader: they parse into a
//! `serde_json::Value` and [`apply_document`] walks the tree, reading each
//! key by navigating the document segment by segment.

pub mod dotenv;
pub mod ini;
pub mod json;
pub mod toml;

use std::path::Path;

use log::{debug, trace};
use serde_json::{Map, Value};

use crate::defaults::{fill_element_defaults, split_list};
use crate::error::TagconfError;
use crate::schema::{ElementKind, FieldMeta, Node, Scalar, ScalarKind, Sequence};
use crate::types::{KeyPath, Segment, Settings};
use crate::walk::{Visitor, Walker};

/// Writes a file's values into a configuration tree.
pub type LoadFn = fn(&Path, &mut dyn Node, &Settings) -> Result<(), TagconfError>;

/// Renders a sample file for usage output.
pub type HelpFn = fn(&mut dyn Node, &Settings) -> Result<String, TagconfError>;

/// A registered config file format.
#[derive(Clone, Copy)]
pub struct FileFormat {
    /// Extension including the dot, e.g. `".toml"`.
    pub extension: &'static str,
    pub load: LoadFn,
    pub prepare_help: HelpFn,
}

impl std::fmt::Debug for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileFormat")
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

/// The formats every loader starts with.
pub fn builtin_formats() -> Vec<FileFormat> {
    vec![json::FORMAT, toml::FORMAT, ini::FORMAT, dotenv::FORMAT]
}

/// Add `format`, replacing any registered format with the same extension.
pub fn register(formats: &mut Vec<FileFormat>, format: FileFormat) {
    match formats.iter_mut().find(|f| f.extension == format.extension) {
        Some(existing) => *existing = format,
        None => formats.push(format),
    }
}

/// Find the format registered for `extension`.
pub fn find_format<'f>(
    formats: &'f [FileFormat],
    extension: &str,
) -> Result<&'f FileFormat, TagconfError> {
    formats
        .iter()
        .find(|f| f.extension == extension)
        .ok_or_else(|| TagconfError::FormatNotDefined {
            extension: extension.to_string(),
        })
}

/// The extension of a file name, from the last dot, dot included.
///
/// Unlike `Path::extension`, a dotfile is its own extension: `.env` yields
/// `".env"` and `app.env` yields `".env"`. No dot yields `""`.
pub fn extension_of(file_name: &str) -> &str {
    let base = file_name.rsplit('/').next().unwrap_or(file_name);
    match base.rfind('.') {
        Some(i) => &base[i..],
        None => "",
    }
}

// -- Loading -----------------------------------------------------------------

struct Document<'a> {
    walker: &'a Walker<'a>,
    root: &'a Value,
    applied: usize,
}

impl<'a> Document<'a> {
    fn lookup(&self, key: &KeyPath) -> Option<&'a Value> {
        let mut current = self.root;
        for segment in key.segments() {
            current = match segment {
                Segment::Name(name) => current.as_object()?.get(name)?,
                Segment::Index(i) => current.as_array()?.get(*i)?,
            };
        }
        Some(current)
    }

    fn invalid(&self, key: &KeyPath, value: &Value, reason: impl Into<String>) -> TagconfError {
        TagconfError::InvalidValue {
            key: self.walker.render(key),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// A document leaf as the string a [`Scalar`] parses.
fn leaf_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl Visitor for Document<'_> {
    fn scalar(
        &mut self,
        _field: &FieldMeta,
        key: &KeyPath,
        value: &mut dyn Scalar,
    ) -> Result<(), TagconfError> {
        let Some(found) = self.lookup(key) else {
            return Ok(());
        };
        if found.is_null() {
            return Ok(());
        }
        let Some(text) = leaf_text(found) else {
            return Err(self.invalid(key, found, "expected a single value"));
        };
        value
            .set_str(&text)
            .map_err(|reason| self.invalid(key, found, reason))?;
        trace!("file {key} = {text:?}");
        self.applied += 1;
        Ok(())
    }

    fn sequence(
        &mut self,
        _field: &FieldMeta,
        key: &KeyPath,
        value: &mut dyn Sequence,
    ) -> Result<(), TagconfError> {
        let Some(found) = self.lookup(key) else {
            return Ok(());
        };
        match found {
            Value::Null => return Ok(()),
            Value::Array(items) if value.element_kind().is_composite() => {
                let existing = value.len();
                value.resize(items.len());
                for i in existing..items.len() {
                    if let Some(element) = value.element_mut(i) {
                        fill_element_defaults(self.walker.settings(), element, &key.index(i))?;
                    }
                }
            }
            Value::Array(items) => {
                let mut texts = Vec::with_capacity(items.len());
                for item in items {
                    let text = leaf_text(item)
                        .ok_or_else(|| self.invalid(key, item, "expected a list of single values"))?;
                    texts.push(text);
                }
                let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
                value
                    .set_items(&texts)
                    .map_err(|reason| self.invalid(key, found, reason))?;
            }
            Value::String(s) if !value.element_kind().is_composite() => {
                let items = split_list(s, &self.walker.settings().list_separator);
                value
                    .set_items(&items)
                    .map_err(|reason| self.invalid(key, found, reason))?;
            }
            other => return Err(self.invalid(key, other, "expected a list")),
        }
        trace!("file {key} = {found}");
        self.applied += 1;
        Ok(())
    }
}

/// Write every key present in `document` into `root`.
///
/// Keys are matched segment by segment with no prefix, so a nested record
/// `S` with field `A` reads `document["S"]["A"]` and element `i` of a record
/// sequence `G` reads `document["G"][i]`.
pub fn apply_document(
    settings: &Settings,
    root: &mut dyn Node,
    document: &Value,
) -> Result<(), TagconfError> {
    let walker = Walker::files(settings);
    let mut visitor = Document {
        walker: &walker,
        root: document,
        applied: 0,
    };
    walker.walk(root, &mut visitor)?;
    debug!("applied {} values from file", visitor.applied);
    Ok(())
}

/// Read a file to a string, mapping failures to [`TagconfError::IoError`].
pub(crate) fn read_file(path: &Path) -> Result<String, TagconfError> {
    std::fs::read_to_string(path).map_err(|e| TagconfError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

// -- Help ----------------------------------------------------------------------

/// One recognised key with its current value, for sample files.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: KeyPath,
    /// Current value, typed by the field's kind. `Null` when unset.
    pub value: Value,
    /// Help tag, falling back to the doc comment.
    pub help: &'static str,
}

/// Every enabled leaf in walk order with its current value.
pub fn entries(settings: &Settings, root: &mut dyn Node) -> Result<Vec<Entry>, TagconfError> {
    struct Collect<'s> {
        settings: &'s Settings,
        entries: Vec<Entry>,
    }

    impl Collect<'_> {
        fn push(&mut self, field: &FieldMeta, key: &KeyPath, value: Value) {
            let help = field.tag(&self.settings.help_tag).unwrap_or(field.doc);
            self.entries.push(Entry {
                key: key.clone(),
                value,
                help,
            });
        }
    }

    impl Visitor for Collect<'_> {
        fn scalar(
            &mut self,
            field: &FieldMeta,
            key: &KeyPath,
            value: &mut dyn Scalar,
        ) -> Result<(), TagconfError> {
            let typed = typed_value(value.kind(), value.display());
            self.push(field, key, typed);
            Ok(())
        }

        fn sequence(
            &mut self,
            field: &FieldMeta,
            key: &KeyPath,
            value: &mut dyn Sequence,
        ) -> Result<(), TagconfError> {
            if let ElementKind::Scalar(kind) = value.element_kind() {
                let items = value
                    .display_items()
                    .into_iter()
                    .map(|item| typed_value(kind, item))
                    .collect();
                self.push(field, key, Value::Array(items));
            }
            Ok(())
        }
    }

    let mut collect = Collect {
        settings,
        entries: Vec::new(),
    };
    Walker::files(settings).walk(root, &mut collect)?;
    Ok(collect.entries)
}

/// Type a displayed scalar for a document. Unparseable or empty non-string
/// values become `Null`.
fn typed_value(kind: ScalarKind, text: String) -> Value {
    match kind {
        ScalarKind::Bool => text.parse::<bool>().map(Value::Bool).unwrap_or(Value::Null),
        ScalarKind::Int => text.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
        ScalarKind::Uint => text.parse::<u64>().map(Value::from).unwrap_or(Value::Null),
        ScalarKind::Float => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ScalarKind::String | ScalarKind::Duration => Value::String(text),
    }
}

/// Place `value` at `segments` inside `target`, creating objects and arrays
/// on the way.
pub(crate) fn insert_at(target: &mut Value, segments: &[Segment], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *target = value;
        return;
    };
    let slot = match first {
        Segment::Name(name) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            match target {
                Value::Object(map) => map.entry(name.clone()).or_insert(Value::Null),
                _ => return,
            }
        }
        Segment::Index(i) => {
            if !target.is_array() {
                *target = Value::Array(Vec::new());
            }
            match target {
                Value::Array(items) => {
                    if items.len() <= *i {
                        items.resize(*i + 1, Value::Null);
                    }
                    &mut items[*i]
                }
                _ => return,
            }
        }
    };
    insert_at(slot, rest, value);
}
