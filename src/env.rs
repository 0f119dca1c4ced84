use std::collections::HashMap;

use log::{debug, trace};

use crate::defaults::split_list;
use crate::error::TagconfError;
use crate::schema::{ElementKind, FieldMeta, Node, Scalar, Sequence};
use crate::types::{KeyPath, Settings};
use crate::walk::{Visitor, Walker};

/// The environment variable name for `key`.
///
/// `key` is rendered with the key separator (and the env prefix already in
/// its first segment). With `kebab_to_snake`, dashes become underscores so a
/// `log-level` key reads `LOG_LEVEL`-style variables.
pub fn var_name(settings: &Settings, walker: &Walker<'_>, key: &KeyPath) -> String {
    let name = walker.render(key);
    if settings.kebab_to_snake {
        name.replace('-', "_")
    } else {
        name
    }
}

struct EnvVisitor<'a> {
    walker: &'a Walker<'a>,
    vars: &'a HashMap<String, String>,
    applied: usize,
}

impl<'a> EnvVisitor<'a> {
    /// The variable's value, or `None` when it is unset or empty.
    fn lookup(&self, key: &KeyPath) -> Option<(String, &'a str)> {
        let name = var_name(self.walker.settings(), self.walker, key);
        let vars: &'a HashMap<String, String> = self.vars;
        let value = vars.get(&name)?;
        if value.is_empty() {
            return None;
        }
        Some((name, value.as_str()))
    }
}

impl Visitor for EnvVisitor<'_> {
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
        trace!("env {name} = {raw:?}");
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
        let items = split_list(raw, &self.walker.settings().list_separator);
        value
            .set_items(&items)
            .map_err(|reason| TagconfError::InvalidValue {
                key: name.clone(),
                value: raw.to_string(),
                reason,
            })?;
        trace!("env {name} = {items:?}");
        self.applied += 1;
        Ok(())
    }
}

/// Write every field whose environment variable is set and non-empty.
///
/// Takes the variables as an iterator so tests can pass synthetic data
/// instead of `std::env::vars()`.
pub fn apply_env(
    settings: &Settings,
    root: &mut dyn Node,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<(), TagconfError> {
    let vars: HashMap<String, String> = vars.into_iter().collect();
    let walker = Walker::env(settings);
    let mut visitor = EnvVisitor {
        walker: &walker,
        vars: &vars,
        applied: 0,
    };
    walker.walk(root, &mut visitor)?;
    debug!("applied {} environment variables", visitor.applied);
    Ok(())
}

/// Usage text listing every recognised environment variable.
#[cfg_attr(not(feature = "clap"), allow(dead_code))]
pub fn env_help(settings: &Settings, root: &mut dyn Node) -> Result<String, TagconfError> {
    struct Help<'a> {
        walker: &'a Walker<'a>,
        lines: Vec<String>,
    }

    impl Help<'_> {
        fn line(&mut self, field: &FieldMeta, key: &KeyPath, kind: String) {
            let name = var_name(self.walker.settings(), self.walker, key);
            let help = field
                .tag(&self.walker.settings().help_tag)
                .unwrap_or(field.doc);
            let mut line = format!("  {name} {kind}");
            if !help.is_empty() {
                line.push_str("\n    \t");
                line.push_str(help);
            }
            self.lines.push(line);
        }
    }

    impl Visitor for Help<'_> {
        fn scalar(
            &mut self,
            field: &FieldMeta,
            key: &KeyPath,
            value: &mut dyn Scalar,
        ) -> Result<(), TagconfError> {
            self.line(field, key, value.kind().label().to_string());
            Ok(())
        }

        fn sequence(
            &mut self,
            field: &FieldMeta,
            key: &KeyPath,
            value: &mut dyn Sequence,
        ) -> Result<(), TagconfError> {
            if let ElementKind::Scalar(kind) = value.element_kind() {
                self.line(field, key, format!("list of {}", kind.label()));
            }
            Ok(())
        }
    }

    let walker = Walker::env(settings);
    let mut help = Help {
        walker: &walker,
        lines: Vec::new(),
    };
    walker.walk(root, &mut help)?;
    if help.lines.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("Environment variables:\n{}\n", help.lines.join("\n")))
}
