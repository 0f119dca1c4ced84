//! # tagconf watch demo
//!
//! Loads a small server config from defaults, `watch-demo.toml` in the
//! working directory, `DEMO_*` variables and flags, then prints the config
//! again every time the file is saved.
//!
//! ## Running
//!
//! The watched file must exist, so create it first:
//!
//! ```sh
//! touch watch-demo.toml
//! cargo run --example watch_demo
//! cargo run --example watch_demo -- --help
//! DEMO_SERVER_PORT=9999 cargo run --example watch_demo -- -debug
//! ```
//!
//! Edit `watch-demo.toml` while it runs to see the reload. Remove a key
//! from the file and its default comes back.

use std::sync::Arc;

use crossbeam::channel::select;
use parking_lot::RwLock;

use tagconf::{Config, Tagconf, TagconfError};

#[derive(Config, Debug, Default, Clone)]
struct DemoConfig {
    /// Log every request.
    #[conf(default = "false")]
    debug: bool,

    #[conf(key = "server")]
    server: Server,

    #[conf(help = "hosts allowed to connect", default = "127.0.0.1")]
    allow: Vec<String>,
}

#[derive(Config, Debug, Default, Clone)]
struct Server {
    #[conf(default = "localhost", help = "address to bind")]
    host: String,

    #[conf(default = 8080, help = "listen port")]
    port: u16,

    /// Read timeout, e.g. `5s` or `1m30s`.
    #[conf(default = "5s")]
    timeout: std::time::Duration,
}

fn main() {
    let shared = Arc::new(RwLock::new(DemoConfig::default()));
    let watch = match Tagconf::builder()
        .app_name("watch-demo")
        .file("watch-demo.toml")
        .env_prefix("DEMO")
        .watch(true)
        .parse_and_watch(&shared)
    {
        Ok(watch) => watch,
        Err(TagconfError::HelpRequested(help)) => {
            println!("{help}");
            return;
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    println!("{:#?}", shared.read());
    println!("watching watch-demo.toml, Ctrl-C to stop");

    loop {
        select! {
            recv(watch.updates) -> stamp => match stamp {
                Ok(stamp) => println!("reloaded at {stamp}:\n{:#?}", shared.read()),
                Err(_) => break,
            },
            recv(watch.errors) -> err => match err {
                Ok(err) => eprintln!("reload failed: {err}"),
                Err(_) => break,
            },
        }
    }
}
