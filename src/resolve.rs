//! Key path resolution: turn a field's tags and its parent's path into the
//! key every source uses to find that field.

use crate::schema::FieldMeta;
use crate::types::{KeyPath, Settings};

/// Resolves field keys for one walk.
///
/// `prefix` is the global prefix applied to top-level fields only; each
/// adapter passes its own (`env_prefix`, `flag_prefix`, or nothing).
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    settings: &'a Settings,
    prefix: &'a str,
}

impl<'a> Resolver<'a> {
    pub fn new(settings: &'a Settings, prefix: &'a str) -> Self {
        Self { settings, prefix }
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    /// The key for `field` under `parent`, or `None` when the field is
    /// disabled.
    ///
    /// The segment is the field's key override if it has a non-empty one,
    /// else its declared name. The global prefix is only added when `parent`
    /// is the root.
    pub fn resolve(&self, field: &FieldMeta, parent: &KeyPath) -> Option<KeyPath> {
        let override_key = field.tag(&self.settings.tag).unwrap_or_default();
        if override_key == self.settings.disabled {
            return None;
        }
        let segment = if override_key.is_empty() {
            field.name
        } else {
            override_key
        };

        if !parent.is_root() {
            Some(parent.child(segment))
        } else if !self.prefix.is_empty() {
            Some(KeyPath::root().child(self.prefix).child(segment))
        } else {
            Some(KeyPath::root().child(segment))
        }
    }
}
