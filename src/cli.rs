//! Command-line flags through [clap](https://docs.rs/clap).
//!
//! This module is compiled only when the `clap` Cargo feature is enabled (on
//! by default). Every scalar leaf, and every list of scalars, becomes one
//! long flag named by its key in flag style (`--S-S-A=1`). The command is
//! built at run time with clap's builder API since the flag set comes from
//! the configuration tree, not from a derive.
//!
//! Single-dash long flags (`-A=5`) are accepted and rewritten to `--A=5`
//! before clap sees them. Booleans take an optional value that must be
//! attached with `=`: `--debug` and `--debug=false` both work. Lists accept
//! repeated flags, each split on [`Settings::list_separator`].
//!
//! Only values given on the command line are written back; clap's defaults
//! are there for the help screen.

use std::collections::HashSet;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use log::{debug, trace};

use crate::defaults::split_list;
use crate::error::TagconfError;
use crate::schema::{ElementKind, FieldMeta, Node, Scalar, ScalarKind, Sequence};
use crate::types::{KeyPath, Settings};
use crate::walk::{Visitor, Walker};

/// Id of the hidden argument that collects positional arguments.
const REST: &str = "__rest";

/// One generated flag.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagSpec {
    pub name: String,
    pub kind: ScalarKind,
    pub list: bool,
    pub help: String,
    /// Current value, shown as the default.
    pub default: Option<String>,
}

impl FlagSpec {
    fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.name.clone())
            .long(self.name.clone())
            .value_parser(value_parser!(String))
            .value_name(self.kind.label().to_uppercase());
        if !self.help.is_empty() {
            arg = arg.help(self.help.clone());
        }
        if self.list {
            arg = arg.action(ArgAction::Append);
        } else if self.kind == ScalarKind::Bool {
            arg = arg
                .action(ArgAction::Set)
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true");
        } else {
            arg = arg.action(ArgAction::Set);
        }
        if let Some(default) = &self.default {
            arg = arg.default_value(default.clone());
        }
        arg
    }
}

struct Specs<'a> {
    walker: &'a Walker<'a>,
    seen: HashSet<String>,
    specs: Vec<FlagSpec>,
}

impl Specs<'_> {
    fn push(
        &mut self,
        field: &FieldMeta,
        key: &KeyPath,
        kind: ScalarKind,
        list: bool,
        default: Option<String>,
    ) -> Result<(), TagconfError> {
        let name = self.walker.render(key);
        // clap owns `--help`
        if name == "help" || !self.seen.insert(name.clone()) {
            return Err(TagconfError::DuplicateKey { key: name });
        }
        let help = field
            .tag(&self.walker.settings().help_tag)
            .unwrap_or(field.doc)
            .to_string();
        self.specs.push(FlagSpec {
            name,
            kind,
            list,
            help,
            default,
        });
        Ok(())
    }
}

impl Visitor for Specs<'_> {
    fn scalar(
        &mut self,
        field: &FieldMeta,
        key: &KeyPath,
        value: &mut dyn Scalar,
    ) -> Result<(), TagconfError> {
        let shown = value.display();
        let default = (!shown.is_empty()).then_some(shown);
        self.push(field, key, value.kind(), false, default)
    }

    fn sequence(
        &mut self,
        field: &FieldMeta,
        key: &KeyPath,
        value: &mut dyn Sequence,
    ) -> Result<(), TagconfError> {
        let ElementKind::Scalar(kind) = value.element_kind() else {
            return Ok(());
        };
        let items = value.display_items();
        let separator = self.walker.settings().list_separator.as_str();
        let default = (!items.is_empty()).then(|| items.join(separator));
        self.push(field, key, kind, true, default)
    }
}

/// The flags `root` accepts, in walk order.
pub fn flag_specs(settings: &Settings, root: &mut dyn Node) -> Result<Vec<FlagSpec>, TagconfError> {
    let walker = Walker::flags(settings);
    let mut specs = Specs {
        walker: &walker,
        seen: HashSet::new(),
        specs: Vec::new(),
    };
    walker.walk(root, &mut specs)?;
    Ok(specs.specs)
}

/// Build the clap command for `specs`.
pub fn build_command(name: &str, specs: &[FlagSpec]) -> Command {
    let mut command = Command::new(name.to_string())
        .disable_version_flag(true)
        .allow_negative_numbers(true);
    for spec in specs {
        command = command.arg(spec.to_arg());
    }
    command.arg(
        Arg::new(REST)
            .num_args(0..)
            .action(ArgAction::Append)
            .value_parser(value_parser!(String))
            .hide(true),
    )
}

/// Rewrite single-dash long flags to double-dash. Stops at `--`. Negative
/// numbers and a bare `-` are left alone; `-h` means `--help`.
pub fn normalize_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out = Vec::new();
    let mut args = args.into_iter();
    if let Some(bin) = args.next() {
        out.push(bin);
    }
    let mut passthrough = false;
    for arg in args {
        if passthrough || arg == "-" || arg.starts_with("--") || !arg.starts_with('-') {
            passthrough |= arg == "--";
            out.push(arg);
            continue;
        }
        let rest = &arg[1..];
        if rest.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            out.push(arg);
        } else if rest == "h" {
            out.push("--help".to_string());
        } else {
            out.push(format!("-{arg}"));
        }
    }
    out
}

struct Apply<'a> {
    walker: &'a Walker<'a>,
    matches: &'a ArgMatches,
    applied: usize,
}

impl Apply<'_> {
    fn given(&self, name: &str) -> bool {
        self.matches.value_source(name) == Some(ValueSource::CommandLine)
    }
}

impl Visitor for Apply<'_> {
    fn scalar(
        &mut self,
        _field: &FieldMeta,
        key: &KeyPath,
        value: &mut dyn Scalar,
    ) -> Result<(), TagconfError> {
        let name = self.walker.render(key);
        if !self.given(&name) {
            return Ok(());
        }
        let Some(raw) = self.matches.get_one::<String>(&name) else {
            return Ok(());
        };
        value.set_str(raw).map_err(|reason| TagconfError::InvalidValue {
            key: name.clone(),
            value: raw.clone(),
            reason,
        })?;
        trace!("flag {name} = {raw:?}");
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
        let name = self.walker.render(key);
        if !self.given(&name) {
            return Ok(());
        }
        let Some(raw) = self.matches.get_many::<String>(&name) else {
            return Ok(());
        };
        let separator = self.walker.settings().list_separator.as_str();
        let items: Vec<&str> = raw.flat_map(|given| split_list(given, separator)).collect();
        value
            .set_items(&items)
            .map_err(|reason| TagconfError::InvalidValue {
                key: name.clone(),
                value: items.join(separator),
                reason,
            })?;
        trace!("flag {name} = {items:?}");
        self.applied += 1;
        Ok(())
    }
}

/// Parse `args` (program name first) and write every flag given on the
/// command line into `root`.
///
/// `--help` fails with [`TagconfError::HelpRequested`] carrying the flag
/// help followed by `extra_help`.
pub fn apply_flags(
    settings: &Settings,
    root: &mut dyn Node,
    args: impl IntoIterator<Item = String>,
    extra_help: &str,
) -> Result<(), TagconfError> {
    let args = normalize_args(args);
    let name = args
        .first()
        .and_then(|bin| std::path::Path::new(bin).file_name())
        .map(|bin| bin.to_string_lossy().into_owned())
        .unwrap_or_default();

    let specs = flag_specs(settings, root)?;
    let mut command = build_command(&name, &specs);
    let matches = match command.try_get_matches_from_mut(args) {
        Ok(matches) => matches,
        Err(e) if e.kind() == clap::error::ErrorKind::DisplayHelp => {
            let mut help = command.render_help().to_string();
            if !extra_help.is_empty() {
                help.push('\n');
                help.push_str(extra_help);
            }
            return Err(TagconfError::HelpRequested(help));
        }
        Err(e) => return Err(TagconfError::Flags(e)),
    };

    let walker = Walker::flags(settings);
    let mut apply = Apply {
        walker: &walker,
        matches: &matches,
        applied: 0,
    };
    walker.walk(root, &mut apply)?;
    debug!("applied {} command-line flags", apply.applied);
    Ok(())
}
