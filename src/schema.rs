//! The description table that stands in for runtime reflection.
//!
//! `#[derive(Config)]` implements [`Record`] for a struct: a static list of
//! [`FieldMeta`] plus indexed mutable access to each field. Every field type
//! implements [`Node`], which reports its structural kind as a [`Slot`]. The
//! walker matches on `Slot`, so each kind has exactly one handler and the
//! compiler checks that none is missing.

use std::collections::{BTreeMap, HashMap};

use crate::error::TagconfError;

/// Compile-time description of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    /// Declared field name.
    pub name: &'static str,
    /// `(tag, value)` pairs from `#[conf(...)]`, in declaration order.
    pub tags: &'static [(&'static str, &'static str)],
    /// `#[conf(flatten)]`: fields are spliced into the parent's key space.
    pub embedded: bool,
    /// The field's doc comment, lines joined with a space.
    pub doc: &'static str,
}

impl FieldMeta {
    /// Value of tag `name`, if the field carries it.
    pub fn tag(&self, name: &str) -> Option<&'static str> {
        self.tags.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }
}

/// Kind of a scalar leaf, used for conversion and help rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Int,
    Uint,
    Float,
    Bool,
    Duration,
}

impl ScalarKind {
    pub fn label(self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Int => "int",
            ScalarKind::Uint => "uint",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "bool",
            ScalarKind::Duration => "duration",
        }
    }
}

/// Structural kind of a sequence's elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Scalar(ScalarKind),
    Record,
    Sequence,
    Unsupported(&'static str),
}

impl ElementKind {
    /// Elements the walker descends into.
    pub fn is_composite(self) -> bool {
        matches!(self, ElementKind::Record | ElementKind::Sequence)
    }
}

/// A field value viewed by structural kind.
pub enum Slot<'a> {
    Scalar(&'a mut dyn Scalar),
    Record(&'a mut dyn Record),
    Sequence(&'a mut dyn Sequence),
    /// A kind no handler exists for. Carries the Rust type name.
    Unsupported(&'static str),
}

/// Anything a configuration walk can visit.
pub trait Node {
    fn slot(&mut self) -> Slot<'_>;

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A struct with named fields, usually implemented by `#[derive(Config)]`.
pub trait Record {
    /// Field descriptors in declaration order.
    fn fields(&self) -> &'static [FieldMeta];

    /// Mutable access to the field at `index` of [`fields`](Self::fields).
    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Node>;
}

/// A leaf value that can be written from a string.
pub trait Scalar {
    fn kind(&self) -> ScalarKind;

    /// Parse `raw` and store it. The error is a human-readable reason.
    fn set_str(&mut self, raw: &str) -> Result<(), String>;

    /// Whether the value is the type's "unset" value (`0`, `""`, `None`, ...).
    fn is_zero(&self) -> bool;

    /// The current value in the same syntax `set_str` accepts.
    fn display(&self) -> String;
}

/// An ordered, homogeneous sequence.
pub trait Sequence {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn element_kind(&self) -> ElementKind;

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Node>;

    /// Grow with default elements or truncate to `len`.
    fn resize(&mut self, len: usize);

    /// Replace all items by parsing each string. Scalar elements only.
    fn set_items(&mut self, items: &[&str]) -> Result<(), String>;

    /// Current items rendered as strings. Empty for composite elements.
    fn display_items(&mut self) -> Vec<String>;

    /// Run `f` on a fresh default element that is not part of the sequence.
    fn with_default_element(
        &self,
        f: &mut dyn FnMut(&mut dyn Node) -> Result<(), TagconfError>,
    ) -> Result<(), TagconfError>;
}

impl<T: Node + Default> Node for Vec<T> {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Sequence(self)
    }
}

impl<T: Node + Default> Sequence for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn element_kind(&self) -> ElementKind {
        let mut element = T::default();
        match element.slot() {
            Slot::Scalar(s) => ElementKind::Scalar(s.kind()),
            Slot::Record(_) => ElementKind::Record,
            Slot::Sequence(_) => ElementKind::Sequence,
            Slot::Unsupported(name) => ElementKind::Unsupported(name),
        }
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Node> {
        self.get_mut(index).map(|e| e as &mut dyn Node)
    }

    fn resize(&mut self, len: usize) {
        self.resize_with(len, T::default);
    }

    fn set_items(&mut self, items: &[&str]) -> Result<(), String> {
        let mut out = Vec::with_capacity(items.len());
        for raw in items {
            let mut item = T::default();
            match item.slot() {
                Slot::Scalar(s) => s.set_str(raw)?,
                _ => return Err(format!("cannot parse {raw:?} into a non-scalar element")),
            }
            out.push(item);
        }
        *self = out;
        Ok(())
    }

    fn display_items(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        for item in self.iter_mut() {
            if let Slot::Scalar(s) = item.slot() {
                out.push(s.display());
            }
        }
        out
    }

    fn with_default_element(
        &self,
        f: &mut dyn FnMut(&mut dyn Node) -> Result<(), TagconfError>,
    ) -> Result<(), TagconfError> {
        let mut element = T::default();
        f(&mut element)
    }
}

impl<K, V> Node for HashMap<K, V> {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Unsupported(std::any::type_name::<Self>())
    }
}

impl<K, V> Node for BTreeMap<K, V> {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Unsupported(std::any::type_name::<Self>())
    }
}
