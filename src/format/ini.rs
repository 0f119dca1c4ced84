//! `.ini` config files.
//!
//! Keys before the first section header are top-level keys. A section names
//! the record its keys belong to, with `.` between nesting levels: `[S.S]`
//! holds the fields of `S.S`. A purely numeric level addresses a sequence
//! element, so `[G.0]` is the first element of the record list `G`. Every
//! value is text; lists of scalars are split on the list separator.

use std::path::Path;

use ::ini::{Ini, ParseOption};
use serde_json::Value;

use super::{Entry, FileFormat, apply_document, entries, insert_at, read_file};
use crate::error::TagconfError;
use crate::schema::Node;
use crate::types::{Segment, Settings};

pub const FORMAT: FileFormat = FileFormat {
    extension: ".ini",
    load,
    prepare_help,
};

/// Parse `path` as INI and write its values into `root`.
pub fn load(path: &Path, root: &mut dyn Node, settings: &Settings) -> Result<(), TagconfError> {
    let content = read_file(path)?;
    let options = ParseOption {
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_str_opt(&content, options).map_err(|e| TagconfError::IniError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut document = Value::Object(serde_json::Map::new());
    for (section, properties) in ini.iter() {
        let mut segments = section.map(section_segments).unwrap_or_default();
        for (key, value) in properties.iter() {
            segments.push(Segment::Name(key.to_string()));
            insert_at(&mut document, &segments, Value::String(value.to_string()));
            segments.pop();
        }
    }
    apply_document(settings, root, &document)
}

fn section_segments(name: &str) -> Vec<Segment> {
    name.split('.')
        .map(|part| match part.parse::<usize>() {
            Ok(i) => Segment::Index(i),
            Err(_) => Segment::Name(part.to_string()),
        })
        .collect()
}

fn section_name(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Name(name) => name.clone(),
            Segment::Index(i) => i.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn text(value: &Value, separator: &str) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| text(item, separator))
            .collect::<Vec<_>>()
            .join(separator),
        other => other.to_string(),
    }
}

/// A sample file: top-level keys first, then one section per record in walk
/// order, each key preceded by its help as a `;` comment.
pub fn prepare_help(root: &mut dyn Node, settings: &Settings) -> Result<String, TagconfError> {
    let mut sections: Vec<(String, Vec<Entry>)> = vec![(String::new(), Vec::new())];
    for entry in entries(settings, root)? {
        let Some((_, parent)) = entry.key.segments().split_last() else {
            continue;
        };
        let name = section_name(parent);
        match sections.iter_mut().find(|(section, _)| *section == name) {
            Some((_, list)) => list.push(entry),
            None => sections.push((name, vec![entry])),
        }
    }

    let mut out = String::new();
    for (name, list) in &sections {
        if !name.is_empty() {
            out.push_str(&format!("\n[{name}]\n"));
        }
        for entry in list {
            if !entry.help.is_empty() {
                out.push_str(&format!("; {}\n", entry.help));
            }
            let Some(Segment::Name(key)) = entry.key.segments().last() else {
                continue;
            };
            let value = text(&entry.value, &settings.list_separator);
            out.push_str(&format!("{key} = {value}\n"));
        }
    }
    Ok(out)
}
