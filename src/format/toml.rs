//! `.toml` config files.
//!
//! Loading goes through the `toml` parser and the shared document walk.
//! Help is a commented sample file built with `toml_edit`, each value
//! followed by its help text.

use std::path::Path;

use serde_json::Value as Json;
use toml_edit::{ArrayOfTables, DocumentMut, Item, Table};

use super::{FileFormat, apply_document, entries, read_file};
use crate::error::TagconfError;
use crate::schema::Node;
use crate::types::{Segment, Settings};

pub const FORMAT: FileFormat = FileFormat {
    extension: ".toml",
    load,
    prepare_help,
};

/// Parse `path` as TOML and write its values into `root`.
pub fn load(path: &Path, root: &mut dyn Node, settings: &Settings) -> Result<(), TagconfError> {
    let content = read_file(path)?;
    let table: ::toml::Table = ::toml::from_str(&content).map_err(|e| TagconfError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let document = to_json(::toml::Value::Table(table));
    apply_document(settings, root, &document)
}

/// Convert a parsed TOML value for the shared document walk. Datetimes
/// become their RFC 3339 text.
fn to_json(value: ::toml::Value) -> Json {
    match value {
        ::toml::Value::String(s) => Json::String(s),
        ::toml::Value::Integer(i) => Json::from(i),
        ::toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        ::toml::Value::Boolean(b) => Json::Bool(b),
        ::toml::Value::Datetime(dt) => Json::String(dt.to_string()),
        ::toml::Value::Array(items) => Json::Array(items.into_iter().map(to_json).collect()),
        ::toml::Value::Table(table) => Json::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, to_json(value)))
                .collect(),
        ),
    }
}

/// A sample TOML file holding every key with its current value.
pub fn prepare_help(root: &mut dyn Node, settings: &Settings) -> Result<String, TagconfError> {
    let mut doc = DocumentMut::new();
    for entry in entries(settings, root)? {
        let Some(value) = to_toml(&entry.value) else {
            continue;
        };
        let value = if entry.help.is_empty() {
            value
        } else {
            value.decorated(" ", format!(" # {}", entry.help))
        };
        insert(doc.as_table_mut(), entry.key.segments(), value);
    }
    Ok(doc.to_string())
}

/// TOML has no null; unset values are left out of the sample.
fn to_toml(value: &Json) -> Option<toml_edit::Value> {
    match value {
        Json::Null | Json::Object(_) => None,
        Json::Bool(b) => Some((*b).into()),
        Json::Number(n) => n
            .as_i64()
            .map(toml_edit::Value::from)
            .or_else(|| n.as_f64().map(toml_edit::Value::from)),
        Json::String(s) => Some(s.as_str().into()),
        Json::Array(items) => {
            let mut array = toml_edit::Array::new();
            for item in items.iter().filter_map(to_toml) {
                array.push(item);
            }
            Some(toml_edit::Value::Array(array))
        }
    }
}

fn insert(table: &mut Table, segments: &[Segment], value: toml_edit::Value) {
    match segments {
        [Segment::Name(name)] => {
            table.insert(name, Item::Value(value));
        }
        [Segment::Name(name), Segment::Index(i), rest @ ..] => {
            let item = table
                .entry(name)
                .or_insert(Item::ArrayOfTables(ArrayOfTables::new()));
            let Some(array) = item.as_array_of_tables_mut() else {
                return;
            };
            while array.len() <= *i {
                array.push(Table::new());
            }
            if let Some(element) = array.get_mut(*i) {
                insert(element, rest, value);
            }
        }
        [Segment::Name(name), rest @ ..] => {
            let item = table.entry(name).or_insert(Item::Table(Table::new()));
            if let Some(sub) = item.as_table_mut() {
                insert(sub, rest, value);
            }
        }
        _ => {}
    }
}
