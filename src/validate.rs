//! Required-field validation, the last step of a parse.
//!
//! Keys are reported in flag style (`-S-S-A is required`), which is what a
//! user types to fix the problem.

use crate::error::TagconfError;
use crate::schema::{FieldMeta, Node, Scalar};
use crate::types::{KeyPath, Settings};
use crate::walk::{Visitor, Walker};

struct Required<'a> {
    walker: &'a Walker<'a>,
}

impl Visitor for Required<'_> {
    fn scalar(
        &mut self,
        field: &FieldMeta,
        key: &KeyPath,
        value: &mut dyn Scalar,
    ) -> Result<(), TagconfError> {
        let required = field.tag(&self.walker.settings().required_tag) == Some("true");
        if required && value.is_zero() {
            return Err(TagconfError::Required {
                key: self.walker.render(key),
            });
        }
        Ok(())
    }

    fn enforces_required(&self) -> bool {
        true
    }
}

/// Fail on the first required scalar still at its zero value or required
/// sequence that is still empty.
pub fn validate_required(settings: &Settings, root: &mut dyn Node) -> Result<(), TagconfError> {
    let walker = Walker::flags(settings);
    walker.walk(root, &mut Required { walker: &walker })
}
