//! The recursive tree walker.
//!
//! A walk enumerates every field of a record in declaration order, resolves
//! its key, and dispatches on its [`Slot`]:
//!
//! - scalars go to the [`Visitor`],
//! - records are walked recursively with their key as the new parent,
//! - sequences go through the sequence handler, which checks the
//!   required/non-empty constraint and recurses into composite elements with
//!   an `[i]`-qualified key.
//!
//! The walker itself never writes a value. Every source adapter supplies a
//! `Visitor` and the first error aborts the walk.

use log::trace;

use crate::error::TagconfError;
use crate::resolve::Resolver;
use crate::schema::{ElementKind, FieldMeta, Node, Record, Scalar, Sequence, Slot};
use crate::types::{KeyPath, Settings};

/// Per-leaf callbacks of a walk.
pub trait Visitor {
    /// Called for every enabled scalar leaf.
    fn scalar(
        &mut self,
        field: &FieldMeta,
        key: &KeyPath,
        value: &mut dyn Scalar,
    ) -> Result<(), TagconfError>;

    /// Called for every enabled sequence before its elements are visited.
    /// Adapters that fill scalar lists or size record lists do it here.
    fn sequence(
        &mut self,
        _field: &FieldMeta,
        _key: &KeyPath,
        _value: &mut dyn Sequence,
    ) -> Result<(), TagconfError> {
        Ok(())
    }

    /// Whether empty sequences tagged as required fail the walk.
    fn enforces_required(&self) -> bool {
        false
    }

    /// Whether an empty composite sequence is checked through a default
    /// element at `[0]`. Only for visitors that write nothing.
    fn checks_empty_elements(&self) -> bool {
        false
    }
}

/// Walks a configuration tree with one key-naming scheme.
#[derive(Debug, Clone, Copy)]
pub struct Walker<'a> {
    resolver: Resolver<'a>,
    separator: &'a str,
}

impl<'a> Walker<'a> {
    pub fn new(settings: &'a Settings, prefix: &'a str, separator: &'a str) -> Self {
        Self {
            resolver: Resolver::new(settings, prefix),
            separator,
        }
    }

    /// Keys as file formats see them: no prefix, `separator` between names.
    pub fn files(settings: &'a Settings) -> Self {
        Self::new(settings, "", &settings.separator)
    }

    /// Keys as environment variable names.
    pub fn env(settings: &'a Settings) -> Self {
        Self::new(settings, &settings.env_prefix, &settings.separator)
    }

    /// Keys as command-line flag names.
    pub fn flags(settings: &'a Settings) -> Self {
        Self::new(settings, &settings.flag_prefix, &settings.flag_separator)
    }

    pub fn settings(&self) -> &'a Settings {
        self.resolver.settings()
    }

    pub fn resolver(&self) -> Resolver<'a> {
        self.resolver
    }

    /// Render a key the way this walk names it.
    pub fn render(&self, key: &KeyPath) -> String {
        key.join(self.separator)
    }

    /// Walk `root`, which must be a record.
    pub fn walk(&self, root: &mut dyn Node, visitor: &mut dyn Visitor) -> Result<(), TagconfError> {
        if self.settings().tag.is_empty() {
            return Err(TagconfError::UndefinedTag);
        }
        let type_name = root.type_name();
        match root.slot() {
            Slot::Record(record) => self.walk_record(record, &KeyPath::root(), visitor),
            _ => Err(TagconfError::NotARecord {
                key: String::new(),
                type_name,
            }),
        }
    }

    fn walk_record(
        &self,
        record: &mut dyn Record,
        parent: &KeyPath,
        visitor: &mut dyn Visitor,
    ) -> Result<(), TagconfError> {
        for (index, field) in record.fields().iter().enumerate() {
            let Some(node) = record.field_mut(index) else {
                continue;
            };

            // embedded records splice their fields into the parent's key space
            if field.embedded {
                match node.slot() {
                    Slot::Record(inner) => {
                        self.walk_record(inner, parent, visitor)?;
                        continue;
                    }
                    _ => {
                        return Err(TagconfError::AnonymousNotRecord {
                            field: field.name.to_string(),
                        });
                    }
                }
            }

            let Some(key) = self.resolver.resolve(field, parent) else {
                trace!("skipping disabled field {}", field.name);
                continue;
            };
            self.visit(field, &key, node, visitor)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        field: &FieldMeta,
        key: &KeyPath,
        node: &mut dyn Node,
        visitor: &mut dyn Visitor,
    ) -> Result<(), TagconfError> {
        match node.slot() {
            Slot::Scalar(scalar) => visitor.scalar(field, key, scalar),
            Slot::Record(record) => self.walk_record(record, key, visitor),
            Slot::Sequence(sequence) => self.walk_sequence(field, key, sequence, visitor),
            Slot::Unsupported(type_name) => Err(TagconfError::TypeNotSupported {
                key: self.render(key),
                type_name,
            }),
        }
    }

    fn walk_sequence(
        &self,
        field: &FieldMeta,
        key: &KeyPath,
        sequence: &mut dyn Sequence,
        visitor: &mut dyn Visitor,
    ) -> Result<(), TagconfError> {
        let required = field.tag(&self.settings().required_tag) == Some("true");
        if visitor.enforces_required() && required && sequence.is_empty() {
            return Err(TagconfError::Required {
                key: self.render(key),
            });
        }

        visitor.sequence(field, key, sequence)?;

        match sequence.element_kind() {
            ElementKind::Scalar(_) => Ok(()),
            ElementKind::Unsupported(type_name) => Err(TagconfError::TypeNotSupported {
                key: self.render(key),
                type_name,
            }),
            ElementKind::Record | ElementKind::Sequence => {
                if sequence.is_empty() && visitor.checks_empty_elements() {
                    let element_key = key.index(0);
                    return sequence.with_default_element(&mut |element| {
                        self.walk_element(element, &element_key, visitor)
                    });
                }
                for i in 0..sequence.len() {
                    let element_key = key.index(i);
                    let Some(element) = sequence.element_mut(i) else {
                        break;
                    };
                    self.walk_element(element, &element_key, visitor)?;
                }
                Ok(())
            }
        }
    }

    /// Walk one sequence element that sits under `key`.
    pub fn walk_element(
        &self,
        element: &mut dyn Node,
        key: &KeyPath,
        visitor: &mut dyn Visitor,
    ) -> Result<(), TagconfError> {
        let type_name = element.type_name();
        match element.slot() {
            Slot::Record(record) => self.walk_record(record, key, visitor),
            _ => Err(TagconfError::NotARecord {
                key: self.render(key),
                type_name,
            }),
        }
    }
}

/// Visits nothing. Walking with it checks the tree's structure.
struct Structure;

impl Visitor for Structure {
    fn scalar(&mut self, _: &FieldMeta, _: &KeyPath, _: &mut dyn Scalar) -> Result<(), TagconfError> {
        Ok(())
    }

    fn checks_empty_elements(&self) -> bool {
        true
    }
}

/// Fail with the first structural error in `root` without touching any
/// value.
pub fn check(settings: &Settings, root: &mut dyn Node) -> Result<(), TagconfError> {
    Walker::files(settings).walk(root, &mut Structure)
}

/// Every enabled leaf key (scalars and sequences) in walk order, rendered by
/// `walker`.
pub fn keys(walker: &Walker<'_>, root: &mut dyn Node) -> Result<Vec<String>, TagconfError> {
    struct Collect<'w, 'a> {
        walker: &'w Walker<'a>,
        keys: Vec<String>,
    }

    impl Visitor for Collect<'_, '_> {
        fn scalar(&mut self, _: &FieldMeta, key: &KeyPath, _: &mut dyn Scalar) -> Result<(), TagconfError> {
            self.keys.push(self.walker.render(key));
            Ok(())
        }

        fn sequence(
            &mut self,
            _: &FieldMeta,
            key: &KeyPath,
            value: &mut dyn Sequence,
        ) -> Result<(), TagconfError> {
            if !value.element_kind().is_composite() {
                self.keys.push(self.walker.render(key));
            }
            Ok(())
        }
    }

    let mut collect = Collect {
        walker,
        keys: Vec::new(),
    };
    walker.walk(root, &mut collect)?;
    Ok(collect.keys)
}
