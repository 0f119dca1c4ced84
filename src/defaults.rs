//! Declared defaults.
//!
//! Both passes run before any source. Booleans have no "unset" value, so
//! they are always overwritten with their declared default
//! ([`populate_bool_defaults`]). Every other scalar is filled only while it
//! still holds its zero value ([`fill_declared_defaults`]), so a value the
//! caller set keeps precedence. Sequence elements a file creates later get
//! the same fill through [`fill_element_defaults`].

use log::trace;

use crate::error::TagconfError;
use crate::resolve::Resolver;
use crate::schema::{FieldMeta, Node, Record, Scalar, ScalarKind, Sequence, Slot};
use crate::types::{KeyPath, Settings};
use crate::walk::{Visitor, Walker};

/// Default strings that make a boolean `true`. Anything else is `false`.
const TRUTHY: [&str; 2] = ["true", "t"];

/// Set every enabled boolean field to its declared default.
///
/// Recurses into nested and embedded records but not into sequences, so
/// booleans inside sequence elements keep whatever they hold.
pub fn populate_bool_defaults(settings: &Settings, root: &mut dyn Node) -> Result<(), TagconfError> {
    if settings.tag.is_empty() {
        return Err(TagconfError::UndefinedTag);
    }
    let type_name = root.type_name();
    match root.slot() {
        Slot::Record(record) => {
            let resolver = Resolver::new(settings, "");
            seed_record(&resolver, record, &KeyPath::root())
        }
        _ => Err(TagconfError::NotARecord {
            key: String::new(),
            type_name,
        }),
    }
}

fn seed_record(
    resolver: &Resolver<'_>,
    record: &mut dyn Record,
    parent: &KeyPath,
) -> Result<(), TagconfError> {
    let default_tag = &resolver.settings().default_tag;
    for (index, field) in record.fields().iter().enumerate() {
        let Some(node) = record.field_mut(index) else {
            continue;
        };
        match node.slot() {
            Slot::Record(inner) if field.embedded => seed_record(resolver, inner, parent)?,
            _ if field.embedded => {
                return Err(TagconfError::AnonymousNotRecord {
                    field: field.name.to_string(),
                });
            }
            Slot::Record(inner) => {
                if let Some(key) = resolver.resolve(field, parent) {
                    seed_record(resolver, inner, &key)?;
                }
            }
            Slot::Scalar(scalar) if scalar.kind() == ScalarKind::Bool => {
                if resolver.resolve(field, parent).is_none() {
                    continue;
                }
                let declared = field.tag(default_tag).unwrap_or_default();
                let value = if TRUTHY.contains(&declared) { "true" } else { "false" };
                scalar
                    .set_str(value)
                    .map_err(|reason| TagconfError::InvalidValue {
                        key: field.name.to_string(),
                        value: value.to_string(),
                        reason,
                    })?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Fills non-boolean scalars and scalar lists that are still empty.
struct Fill<'a> {
    walker: &'a Walker<'a>,
}

impl Visitor for Fill<'_> {
    fn scalar(
        &mut self,
        field: &FieldMeta,
        key: &KeyPath,
        value: &mut dyn Scalar,
    ) -> Result<(), TagconfError> {
        // booleans were seeded by `populate_bool_defaults`
        if value.kind() == ScalarKind::Bool || !value.is_zero() {
            return Ok(());
        }
        let Some(declared) = field.tag(&self.walker.settings().default_tag) else {
            return Ok(());
        };
        trace!("default {} = {declared:?}", self.walker.render(key));
        value
            .set_str(declared)
            .map_err(|reason| TagconfError::InvalidValue {
                key: self.walker.render(key),
                value: declared.to_string(),
                reason,
            })
    }

    fn sequence(
        &mut self,
        field: &FieldMeta,
        key: &KeyPath,
        value: &mut dyn Sequence,
    ) -> Result<(), TagconfError> {
        if !value.is_empty() || value.element_kind().is_composite() {
            return Ok(());
        }
        let Some(declared) = field.tag(&self.walker.settings().default_tag) else {
            return Ok(());
        };
        let items = split_list(declared, &self.walker.settings().list_separator);
        value
            .set_items(&items)
            .map_err(|reason| TagconfError::InvalidValue {
                key: self.walker.render(key),
                value: declared.to_string(),
                reason,
            })
    }
}

/// Apply declared defaults to every enabled non-boolean leaf still at its
/// zero value, including leaves inside sequence elements.
pub fn fill_declared_defaults(settings: &Settings, root: &mut dyn Node) -> Result<(), TagconfError> {
    let walker = Walker::files(settings);
    walker.walk(root, &mut Fill { walker: &walker })
}

/// Fill declared defaults into a sequence element created under `key`.
pub(crate) fn fill_element_defaults(
    settings: &Settings,
    element: &mut dyn Node,
    key: &KeyPath,
) -> Result<(), TagconfError> {
    let walker = Walker::files(settings);
    walker.walk_element(element, key, &mut Fill { walker: &walker })
}

/// Split a list value, trimming items and dropping empty ones.
pub(crate) fn split_list<'s>(raw: &'s str, separator: &str) -> Vec<&'s str> {
    raw.split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}
