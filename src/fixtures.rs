#[cfg(test)]
pub mod test {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::Config;

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct TestConfig {
        /// Plain integer.
        #[conf(key = "A", default = 100)]
        pub a: i32,

        #[conf(key = "B", default = "test", help = "a string value")]
        pub b: String,

        #[conf(key = "C", default = "false")]
        pub c: bool,

        #[conf(key = "D", default = "t")]
        pub d: bool,

        /// Poll interval.
        #[conf(key = "M", default = "150ms")]
        pub m: Duration,

        #[conf(key = "S")]
        pub s: SubConfig,

        #[conf(default = "x,y")]
        pub tags: Vec<String>,

        #[conf(key = "-")]
        pub skipped: String,

        #[conf(key = "-")]
        pub hidden: HiddenConfig,
    }

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct SubConfig {
        #[conf(key = "A", default = 500)]
        pub a: i32,

        #[conf(key = "B", default = "true")]
        pub b: bool,

        #[conf(key = "S")]
        pub s: SubSubConfig,
    }

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct SubSubConfig {
        #[conf(key = "A", default = 600)]
        pub a: i32,

        #[conf(key = "B")]
        pub b: bool,
    }

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct HiddenConfig {
        #[conf(default = "false")]
        pub flag: bool,

        #[conf(default = 1)]
        pub level: u8,
    }

    // -- Sequences ---------------------------------------------------------------

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct ListConfig {
        pub names: Vec<String>,

        #[conf(key = "G", required)]
        pub g: Vec<Item>,

        pub owners: Vec<Owner>,
    }

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct Item {
        #[conf(key = "A", default = 7)]
        pub a: i32,

        #[conf(key = "B", default = "t")]
        pub b: bool,
    }

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct Owner {
        #[conf(required)]
        pub name: String,
    }

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct NestedListConfig {
        pub grid: Vec<Vec<Item>>,
    }

    // -- Embedding ---------------------------------------------------------------

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct EmbedConfig {
        #[conf(flatten)]
        pub inner: Embedded,

        #[conf(key = "Z")]
        pub z: i32,
    }

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct Embedded {
        #[conf(key = "E", default = "e")]
        pub e: String,
    }

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct BadEmbedConfig {
        #[conf(flatten)]
        pub name: String,

        pub port: u16,
    }

    // -- Odd shapes ----------------------------------------------------------------

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct BoolConfig {
        #[conf(default = "TRUE")]
        pub upper: bool,

        #[conf(default = "1")]
        pub one: bool,

        #[conf(default = "true")]
        pub lower: bool,
    }

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct BadDefaultConfig {
        #[conf(default = "abc")]
        pub port: u16,
    }

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct MapConfig {
        pub name: String,

        pub labels: HashMap<String, String>,
    }

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct PathConfig {
        #[conf(default = "/var/lib/app", help = "data directory")]
        pub data_dir: PathBuf,
    }

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct MapListConfig {
        pub name: String,

        pub items: Vec<MapConfig>,
    }

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct DuplicateConfig {
        #[conf(key = "port")]
        pub listen: u16,

        pub port: u16,
    }

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct RequiredConfig {
        pub db: DbConfig,
    }

    #[derive(Config, Debug, Default, Clone, PartialEq)]
    pub struct DbConfig {
        #[conf(required)]
        pub host: String,

        #[conf(default = 5432)]
        pub port: u16,
    }

    #[test]
    fn derived_table_matches_declaration() {
        use crate::Record;

        let config = TestConfig::default();
        let fields = config.fields();
        assert_eq!(fields.len(), 9);
        assert_eq!(fields[0].name, "a");
        assert_eq!(fields[0].tag("key"), Some("A"));
        assert_eq!(fields[0].tag("default"), Some("100"));
        assert_eq!(fields[0].doc, "Plain integer.");
        assert_eq!(fields[1].tag("help"), Some("a string value"));
        assert_eq!(fields[7].tag("key"), Some("-"));
    }

    #[test]
    fn derived_flatten_and_required() {
        use crate::Record;

        let embed = EmbedConfig::default();
        assert!(embed.fields()[0].embedded);
        assert!(!embed.fields()[1].embedded);

        let owner = Owner::default();
        assert_eq!(owner.fields()[0].tag("required"), Some("true"));
    }
}
