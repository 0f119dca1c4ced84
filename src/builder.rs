use std::path::PathBuf;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::defaults;
use crate::env;
use crate::error::TagconfError;
use crate::file::{self, ConfigFile};
use crate::format::{self, FileFormat};
use crate::schema::Node;
use crate::types::Settings;
use crate::validate;
use crate::walk;
use crate::watch::{self, Watch};

/// Entry point for building a tagconf loader.
pub struct Tagconf;

impl Tagconf {
    pub fn builder() -> Loader {
        Loader::new()
    }
}

/// Builder for loading a tagged config struct from defaults, a config file,
/// environment variables and command-line flags.
///
/// Sources apply in increasing precedence: declared defaults, the config
/// file, the environment, then flags. Every source is sparse; a key a source
/// does not mention keeps the value from the layer below.
#[derive(Debug, Clone)]
pub struct Loader {
    settings: Settings,
    app_name: Option<String>,
    path: PathBuf,
    file: Option<String>,
    file_required: bool,
    file_env: String,
    path_env: String,
    formats: Vec<FileFormat>,
    env_enabled: bool,
    #[cfg_attr(not(feature = "clap"), allow(dead_code))]
    flags_enabled: bool,
    env_vars: Option<Vec<(String, String)>>,
    #[cfg_attr(not(feature = "clap"), allow(dead_code))]
    args: Option<Vec<String>>,
    watch: bool,
}

impl Loader {
    fn new() -> Self {
        Self {
            settings: Settings::default(),
            app_name: None,
            path: PathBuf::from("./"),
            file: None,
            file_required: false,
            file_env: "CONFIG_FILE".into(),
            path_env: "CONFIG_PATH".into(),
            formats: format::builtin_formats(),
            env_enabled: true,
            flags_enabled: true,
            env_vars: None,
            args: None,
            watch: false,
        }
    }

    /// Replace the tag names, separators and prefixes used by every walk.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the env var prefix (`APP` reads `APP_PORT`).
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.settings.env_prefix = prefix.to_string();
        self
    }

    /// Set the flag prefix (`app` reads `--app-port`).
    pub fn flag_prefix(mut self, prefix: &str) -> Self {
        self.settings.flag_prefix = prefix.to_string();
        self
    }

    /// Program name shown in `--help` (default: the first argument).
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// Directory holding the config file (default: `./`).
    pub fn path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.path = dir.into();
        self
    }

    /// Config file name. Its extension picks the format.
    pub fn file(mut self, name: &str) -> Self {
        self.file = Some(name.to_string());
        self
    }

    /// Fail when the config file does not exist (default: skip it).
    pub fn file_required(mut self, required: bool) -> Self {
        self.file_required = required;
        self
    }

    /// Env var that overrides the file name (default: `CONFIG_FILE`, read
    /// with the env prefix).
    pub fn file_env(mut self, name: &str) -> Self {
        self.file_env = name.to_string();
        self
    }

    /// Env var that overrides the directory (default: `CONFIG_PATH`, read
    /// with the env prefix).
    pub fn path_env(mut self, name: &str) -> Self {
        self.path_env = name.to_string();
        self
    }

    /// Add a file format, replacing any format with the same extension.
    pub fn register_format(mut self, format: FileFormat) -> Self {
        format::register(&mut self.formats, format);
        self
    }

    /// Skip the environment layer. Override variables for the file
    /// location are still honoured.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    /// Skip the command-line layer.
    pub fn no_flags(mut self) -> Self {
        self.flags_enabled = false;
        self
    }

    /// Read these variables instead of the process environment.
    pub fn env_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Parse these arguments (program name first) instead of the process
    /// arguments.
    pub fn args<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Reload when the config file changes (see [`parse_and_watch`](Self::parse_and_watch)).
    pub fn watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    fn effective_env_vars(&self) -> Vec<(String, String)> {
        match &self.env_vars {
            Some(vars) => vars.clone(),
            None => std::env::vars().collect(),
        }
    }

    #[cfg(feature = "clap")]
    fn effective_args(&self) -> Vec<String> {
        let mut args = match &self.args {
            Some(args) => args.clone(),
            None => std::env::args().collect(),
        };
        if let Some(name) = &self.app_name {
            match args.first_mut() {
                Some(first) => *first = name.clone(),
                None => args.push(name.clone()),
            }
        }
        args
    }

    /// Resolve the config file after applying the override variables.
    ///
    /// A name without an extension has no format and is ignored.
    fn effective_file(&self, vars: &[(String, String)]) -> Option<ConfigFile> {
        let lookup = |name: &str| {
            vars.iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };
        let found = file::locate(
            &self.settings,
            &self.path,
            self.file.as_deref(),
            &self.file_env,
            &self.path_env,
            lookup,
        )?;
        if found.extension().is_empty() {
            debug!("config file {} has no extension, ignoring", found.name);
            return None;
        }
        Some(found)
    }

    /// Run every layer over `config`.
    ///
    /// The file location, its format and the shape of `config` are checked
    /// before anything is written. A `--help` argument ends with
    /// [`TagconfError::HelpRequested`] carrying the full usage text.
    pub fn parse<T: Node>(&self, config: &mut T) -> Result<(), TagconfError> {
        self.run(config)
    }

    fn run(&self, root: &mut dyn Node) -> Result<(), TagconfError> {
        let settings = &self.settings;
        let vars = self.effective_env_vars();
        let config_file = self.effective_file(&vars);
        let config_format = match &config_file {
            Some(found) => Some(format::find_format(&self.formats, found.extension())?),
            None => None,
        };
        walk::check(settings, root)?;

        defaults::populate_bool_defaults(settings, root)?;
        defaults::fill_declared_defaults(settings, root)?;

        #[cfg_attr(not(feature = "clap"), allow(unused_variables))]
        let file_help = match (&config_file, config_format) {
            (Some(found), Some(config_format)) => {
                file::load_file(found, config_format, root, settings, self.file_required)?
            }
            _ => String::new(),
        };

        if self.env_enabled {
            env::apply_env(settings, root, vars)?;
        }

        #[cfg(feature = "clap")]
        if self.flags_enabled {
            let mut extra = env::env_help(settings, root)?;
            if let Some(found) = &config_file
                && !file_help.is_empty()
            {
                extra.push_str(&format!("\nConfig file {}:\n", found.path().display()));
                extra.push_str(&file_help);
            }
            crate::cli::apply_flags(settings, root, self.effective_args(), &extra)?;
        }

        validate::validate_required(settings, root)
    }

    /// Parse into `shared`, then keep it current while the file changes.
    ///
    /// Every reload runs all layers over a copy of the value `shared` held
    /// before this call, so keys removed from the file fall back to their
    /// defaults. The returned [`Watch`] never delivers when watching is off
    /// or no config file is configured.
    pub fn parse_and_watch<T>(&self, shared: &Arc<RwLock<T>>) -> Result<Watch, TagconfError>
    where
        T: Node + Clone + Send + Sync + 'static,
    {
        let seed = shared.read().clone();
        let mut fresh = seed.clone();
        self.run(&mut fresh)?;
        *shared.write() = fresh;

        if !self.watch {
            return Ok(Watch::idle());
        }
        let vars = self.effective_env_vars();
        let Some(found) = self.effective_file(&vars) else {
            return Ok(Watch::idle());
        };

        let loader = self.clone();
        let target = Arc::clone(shared);
        watch::spawn(found.path(), move || {
            let mut next = seed.clone();
            loader.run(&mut next)?;
            *target.write() = next;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::*;
    use std::fs;
    use std::path::Path;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn loader(dir: &Path) -> Loader {
        Tagconf::builder()
            .path(dir)
            .env_vars(Vec::<(String, String)>::new())
            .args(["app"])
    }

    #[test]
    fn defaults_are_sensible() {
        let builder = Tagconf::builder();
        assert_eq!(builder.path, PathBuf::from("./"));
        assert_eq!(builder.file, None);
        assert_eq!(builder.file_env, "CONFIG_FILE");
        assert_eq!(builder.path_env, "CONFIG_PATH");
        assert!(builder.env_enabled);
        assert!(builder.flags_enabled);
        assert!(!builder.watch);
        assert_eq!(builder.formats.len(), 4);
    }

    #[test]
    fn prefixes_update_settings() {
        let builder = Tagconf::builder().env_prefix("APP").flag_prefix("app");
        assert_eq!(builder.settings.env_prefix, "APP");
        assert_eq!(builder.settings.flag_prefix, "app");
    }

    #[test]
    fn register_format_replaces_same_extension() {
        let custom = FileFormat {
            extension: ".json",
            ..format::toml::FORMAT
        };
        let builder = Tagconf::builder().register_format(custom);
        assert_eq!(builder.formats.len(), 4);
        let json = format::find_format(&builder.formats, ".json").unwrap();
        assert_eq!(json.load as usize, format::toml::FORMAT.load as usize);
    }

    #[test]
    fn file_override_variables() {
        let builder = Tagconf::builder()
            .env_prefix("APP")
            .file("app.toml")
            .path("/etc/app");
        let vars = vec![
            ("APP_CONFIG_FILE".to_string(), "other.json".to_string()),
            ("APP_CONFIG_PATH".to_string(), "/srv".to_string()),
        ];
        let found = builder.effective_file(&vars).unwrap();
        assert_eq!(found.path(), PathBuf::from("/srv/other.json"));
    }

    #[test]
    fn file_without_extension_is_ignored() {
        let builder = Tagconf::builder().file("Appfile");
        assert_eq!(builder.effective_file(&[]), None);
    }

    #[cfg(feature = "clap")]
    #[test]
    fn app_name_replaces_program_name() {
        let builder = Tagconf::builder().app_name("svc").args(["/usr/bin/x", "-A=1"]);
        assert_eq!(builder.effective_args(), vec!["svc", "-A=1"]);
        let empty = Tagconf::builder().app_name("svc").args(Vec::<String>::new());
        assert_eq!(empty.effective_args(), vec!["svc"]);
    }

    // --- Parse tests ---

    #[test]
    fn parse_defaults_only() {
        let dir = TempDir::new().unwrap();
        let mut config = TestConfig::default();
        loader(dir.path()).parse(&mut config).unwrap();

        assert_eq!(config.a, 100);
        assert_eq!(config.b, "test");
        assert!(!config.c);
        assert!(config.d);
        assert_eq!(config.m, Duration::from_millis(150));
        assert_eq!(config.s.a, 500);
        assert!(config.s.b);
        assert_eq!(config.s.s.a, 600);
        assert_eq!(config.tags, vec!["x", "y"]);
        assert_eq!(config.hidden, HiddenConfig::default());
    }

    #[test]
    fn parse_with_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.toml"), "A = 3000\n[S]\nB = false\n").unwrap();

        let mut config = TestConfig::default();
        loader(dir.path()).file("app.toml").parse(&mut config).unwrap();

        assert_eq!(config.a, 3000);
        assert!(!config.s.b);
        assert_eq!(config.b, "test"); // default preserved
    }

    #[test]
    fn explicit_zero_in_file_beats_default() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.json"), r#"{"A": 0, "B": "", "tags": []}"#).unwrap();

        let mut config = TestConfig::default();
        loader(dir.path()).file("app.json").parse(&mut config).unwrap();

        assert_eq!(config.a, 0);
        assert_eq!(config.b, "");
        assert!(config.tags.is_empty());
        assert_eq!(config.s.a, 500, "keys the file leaves out keep defaults");
    }

    #[test]
    fn path_fields_parse_with_flags_on() {
        let dir = TempDir::new().unwrap();
        let mut config = PathConfig::default();
        loader(dir.path()).parse(&mut config).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/app"));

        #[cfg(feature = "clap")]
        {
            let mut config = PathConfig::default();
            loader(dir.path())
                .args(["app", "-data_dir=/srv/app"])
                .parse(&mut config)
                .unwrap();
            assert_eq!(config.data_dir, PathBuf::from("/srv/app"));
        }
    }

    #[cfg(feature = "clap")]
    #[test]
    fn layers_apply_in_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.json"), r#"{"A": 900, "B": "file"}"#).unwrap();

        let mut config = TestConfig::default();
        loader(dir.path())
            .file("app.json")
            .env_prefix("APP")
            .env_vars([("APP_A", "5"), ("APP_S_A", "6")])
            .args(["app", "-A=7"])
            .parse(&mut config)
            .unwrap();

        assert_eq!(config.a, 7);
        assert_eq!(config.b, "file");
        assert_eq!(config.s.a, 6);
        assert_eq!(config.s.s.a, 600);
    }

    #[test]
    fn default_then_env_then_flag() {
        let dir = TempDir::new().unwrap();

        let mut config = TestConfig::default();
        loader(dir.path()).parse(&mut config).unwrap();
        assert_eq!(config.a, 100);

        let mut config = TestConfig::default();
        loader(dir.path())
            .env_vars([("A", "900")])
            .parse(&mut config)
            .unwrap();
        assert_eq!(config.a, 900);

        #[cfg(feature = "clap")]
        {
            let mut config = TestConfig::default();
            loader(dir.path())
                .env_vars([("A", "900")])
                .args(["app", "-A=5"])
                .parse(&mut config)
                .unwrap();
            assert_eq!(config.a, 5);
        }
    }

    #[test]
    fn no_env_and_no_flags_skip_layers() {
        let dir = TempDir::new().unwrap();
        let mut config = TestConfig::default();
        loader(dir.path())
            .env_vars([("A", "5")])
            .args(["app", "-A=7"])
            .no_env()
            .no_flags()
            .parse(&mut config)
            .unwrap();
        assert_eq!(config.a, 100);
    }

    #[test]
    fn unregistered_extension_fails_before_mutation() {
        let dir = TempDir::new().unwrap();
        let mut config = TestConfig::default();
        let err = loader(dir.path())
            .file("app.yaml")
            .parse(&mut config)
            .unwrap_err();
        assert!(matches!(err, TagconfError::FormatNotDefined { ref extension } if extension == ".yaml"));
        assert_eq!(config, TestConfig::default());
    }

    #[test]
    fn shape_errors_fail_before_mutation() {
        let dir = TempDir::new().unwrap();
        let mut config = MapConfig::default();
        let err = loader(dir.path()).parse(&mut config).unwrap_err();
        assert!(matches!(err, TagconfError::TypeNotSupported { .. }));

        let mut config = BadEmbedConfig::default();
        let err = loader(dir.path()).parse(&mut config).unwrap_err();
        assert!(matches!(err, TagconfError::AnonymousNotRecord { ref field } if field == "name"));
        assert_eq!(config, BadEmbedConfig::default());
    }

    #[test]
    fn element_shape_errors_fail_before_file_is_applied() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.json"), r#"{"name": "written", "items": [{}]}"#).unwrap();

        let mut config = MapListConfig::default();
        let err = loader(dir.path())
            .file("app.json")
            .parse(&mut config)
            .unwrap_err();
        assert!(
            matches!(err, TagconfError::TypeNotSupported { ref key, .. } if key == "items[0]_labels"),
            "{err:?}"
        );
        assert_eq!(config, MapListConfig::default());
    }

    #[test]
    fn missing_required_file() {
        let dir = TempDir::new().unwrap();
        let mut config = TestConfig::default();
        let err = loader(dir.path())
            .file("app.toml")
            .file_required(true)
            .parse(&mut config)
            .unwrap_err();
        assert!(matches!(err, TagconfError::IoError { .. }));
    }

    #[test]
    fn required_values_are_checked_last() {
        let dir = TempDir::new().unwrap();
        let mut config = RequiredConfig::default();
        let err = loader(dir.path()).parse(&mut config).unwrap_err();
        assert_eq!(err.to_string(), "-db-host is required");

        let mut config = RequiredConfig::default();
        loader(dir.path())
            .env_vars([("db_host", "localhost")])
            .parse(&mut config)
            .unwrap();
        assert_eq!(config.db.host, "localhost");
        assert_eq!(config.db.port, 5432);
    }

    #[test]
    fn record_sequences_from_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("app.json"),
            r#"{"names": ["a", "b"], "G": [{"A": 1}, {"B": false}], "owners": [{"name": "x"}]}"#,
        )
        .unwrap();

        let mut config = ListConfig::default();
        loader(dir.path()).file("app.json").parse(&mut config).unwrap();

        assert_eq!(config.names, vec!["a", "b"]);
        assert_eq!(config.g.len(), 2);
        assert_eq!(config.g[0].a, 1);
        assert_eq!(config.g[1].a, 7);
        assert!(!config.g[1].b);
        assert_eq!(config.owners[0].name, "x");
    }

    #[test]
    fn empty_required_sequence_fails() {
        let dir = TempDir::new().unwrap();
        let mut config = ListConfig::default();
        let err = loader(dir.path()).parse(&mut config).unwrap_err();
        assert_eq!(err.to_string(), "-G is required");
    }

    #[cfg(feature = "clap")]
    #[test]
    fn help_includes_every_source() {
        let dir = TempDir::new().unwrap();
        let mut config = TestConfig::default();
        let err = loader(dir.path())
            .file("app.toml")
            .env_prefix("APP")
            .args(["app", "--help"])
            .parse(&mut config)
            .unwrap_err();
        let TagconfError::HelpRequested(text) = err else {
            panic!("expected help, got {err:?}");
        };
        assert!(text.contains("--S-A"), "{text}");
        assert!(text.contains("APP_S_A"), "{text}");
        assert!(text.contains("Config file"), "{text}");
        assert!(text.contains("# a string value"), "{text}");
    }

    #[test]
    fn watch_off_returns_idle() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.toml"), "A = 1\n").unwrap();
        let shared = Arc::new(RwLock::new(TestConfig::default()));

        let watch = loader(dir.path())
            .file("app.toml")
            .parse_and_watch(&shared)
            .unwrap();

        assert_eq!(shared.read().a, 1);
        assert!(watch.updates.try_recv().is_err());
    }

    #[test]
    fn watch_reloads_after_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "A = 1\n").unwrap();
        let shared = Arc::new(RwLock::new(TestConfig::default()));

        let watch = loader(dir.path())
            .file("app.toml")
            .watch(true)
            .parse_and_watch(&shared)
            .unwrap();
        assert_eq!(shared.read().a, 1);

        fs::write(&path, "A = 2\n").unwrap();
        let stamp = watch
            .updates
            .recv_timeout(Duration::from_secs(10))
            .expect("reload after write");
        assert!(stamp > 0);
        // several write events may arrive for one save; wait for the last
        while watch.updates.recv_timeout(Duration::from_millis(300)).is_ok() {}
        assert_eq!(shared.read().a, 2);
    }

    #[test]
    fn watch_reports_failed_reload_and_keeps_watching() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "A = 1\n").unwrap();
        let shared = Arc::new(RwLock::new(TestConfig::default()));

        let watch = loader(dir.path())
            .file("app.toml")
            .watch(true)
            .parse_and_watch(&shared)
            .unwrap();

        fs::write(&path, "A = [\n").unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut failure = None;
        while failure.is_none() && Instant::now() < deadline {
            failure = watch.errors.recv_timeout(Duration::from_millis(100)).ok();
            // an empty file seen mid-write reloads fine; keep the slot free
            let _ = watch.updates.try_recv();
        }
        let failure = failure.expect("failed reload is reported");
        assert!(matches!(failure, TagconfError::ParseError { .. }), "{failure:?}");

        fs::write(&path, "A = 3\n").unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut reloads = 0;
        while shared.read().a != 3 && Instant::now() < deadline {
            if watch.updates.recv_timeout(Duration::from_millis(100)).is_ok() {
                reloads += 1;
            }
            let _ = watch.errors.try_recv();
        }
        assert!(reloads > 0);
        assert_eq!(shared.read().a, 3);
    }
}
