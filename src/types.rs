use std::fmt;

/// Naming and key-building rules shared by every walk.
///
/// There is no global state: build one `Settings`, hand it to the
/// [`Loader`](crate::Loader), and every walk reads from it. Two loaders with
/// different settings can parse concurrently.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Tag holding a field's key override. Empty means "not configured" and
    /// fails every walk with [`UndefinedTag`](crate::TagconfError::UndefinedTag).
    pub tag: String,
    /// Tag holding a field's default value.
    pub default_tag: String,
    /// Tag holding a field's usage line.
    pub help_tag: String,
    /// Tag marking a field as required (value `"true"`).
    pub required_tag: String,
    /// Key override that removes a field (and its subtree) from all walks.
    pub disabled: String,
    /// Separator between key segments for files and the environment.
    pub separator: String,
    /// Separator between key segments for command-line flags.
    pub flag_separator: String,
    /// Prefix placed before top-level environment keys.
    pub env_prefix: String,
    /// Prefix placed before top-level flag names.
    pub flag_prefix: String,
    /// Turn dashes in keys into underscores when naming environment variables.
    pub kebab_to_snake: bool,
    /// Separator for list values given as a single string.
    pub list_separator: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tag: "key".into(),
            default_tag: "default".into(),
            help_tag: "help".into(),
            required_tag: "required".into(),
            disabled: "-".into(),
            separator: "_".into(),
            flag_separator: "-".into(),
            env_prefix: String::new(),
            flag_prefix: String::new(),
            kebab_to_snake: false,
            list_separator: ",".into(),
        }
    }
}

/// One step of a [`KeyPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A field segment: override key, declared name, or a global prefix.
    Name(String),
    /// A 0-based position inside a sequence.
    Index(usize),
}

/// The fully-qualified identifier of a field, built while descending.
///
/// Rendering joins names with a separator and appends indices as `[i]`:
/// `parent`, `child`, `2`, `field` renders as `parent_child[2]_field`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<Segment>,
}

impl KeyPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// A new path one name deeper.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Name(name.to_string()));
        Self { segments }
    }

    /// A new path addressing element `index` of this sequence.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    /// Render with `separator` between names.
    pub fn join(&self, separator: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Name(name) => {
                    if !out.is_empty() {
                        out.push_str(separator);
                    }
                    out.push_str(name);
                }
                Segment::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
            }
        }
        out
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.join("_"))
    }
}
