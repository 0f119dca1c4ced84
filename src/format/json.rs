//! `.json` config files.

use std::path::Path;

use serde_json::Value;

use super::{FileFormat, apply_document, entries, insert_at, read_file};
use crate::error::TagconfError;
use crate::schema::Node;
use crate::types::Settings;

pub const FORMAT: FileFormat = FileFormat {
    extension: ".json",
    load,
    prepare_help,
};

/// Parse `path` as JSON and write its values into `root`.
pub fn load(path: &Path, root: &mut dyn Node, settings: &Settings) -> Result<(), TagconfError> {
    let content = read_file(path)?;
    let document: Value = serde_json::from_str(&content).map_err(|e| TagconfError::JsonError {
        path: path.to_path_buf(),
        source: e,
    })?;
    apply_document(settings, root, &document)
}

/// A pretty-printed JSON document holding every key with its current value.
pub fn prepare_help(root: &mut dyn Node, settings: &Settings) -> Result<String, TagconfError> {
    let mut document = Value::Object(serde_json::Map::new());
    for entry in entries(settings, root)? {
        insert_at(&mut document, entry.key.segments(), entry.value);
    }
    serde_json::to_string_pretty(&document).map_err(|e| TagconfError::Format {
        extension: FORMAT.extension.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"A": 7, "S": {"B": true}, "tags": ["a"]}"#).unwrap();

        let mut config = TestConfig::default();
        load(&path, &mut config, &Settings::default()).unwrap();
        assert_eq!(config.a, 7);
        assert!(config.s.b);
        assert_eq!(config.tags, vec!["a"]);
    }

    #[test]
    fn malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let mut config = TestConfig::default();
        let err = load(&path, &mut config, &Settings::default()).unwrap_err();
        assert!(matches!(err, TagconfError::JsonError { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let mut config = TestConfig::default();
        let err = load(&dir.path().join("nope.json"), &mut config, &Settings::default()).unwrap_err();
        assert!(matches!(err, TagconfError::IoError { .. }));
    }

    #[test]
    fn help_is_a_sample_document() {
        let mut config = ListConfig {
            g: vec![Item { a: 7, b: true }],
            ..ListConfig::default()
        };
        let help = prepare_help(&mut config, &Settings::default()).unwrap();
        let parsed: Value = serde_json::from_str(&help).unwrap();
        assert_eq!(parsed["G"][0]["A"], 7);
        assert_eq!(parsed["G"][0]["B"], true);
        assert_eq!(parsed["names"], serde_json::json!([]));
    }
}
