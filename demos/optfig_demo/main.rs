//! A small service config loaded from every layer.
//!
//! ```text
//! cargo run --example optfig_demo -- --help
//! cargo run --example optfig_demo -- -w 8 --server.port 9000 --labels.team core
//! DEMO_SERVER_HOST=0.0.0.0 cargo run --example optfig_demo -- --config demo.yaml
//! RUST_LOG=optfig=trace cargo run --example optfig_demo
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use optfig::{Config, Dynamic, Optfig, OptfigError};

#[derive(Config, Debug, Default)]
struct DemoConfig {
    /// Path to the `file` to read settings from.
    #[config(short = 'f')]
    pub config: String,

    /// Worker threads.
    #[config(short = 'w', default = 4)]
    pub workers: u32,

    /// Log verbosely.
    #[config(short = 'v')]
    pub verbose: bool,

    /// Listener settings.
    pub server: Server,

    /// Upstreams to balance across.
    pub upstreams: Vec<Upstream>,

    /// Free-form labels attached to metrics.
    pub labels: HashMap<String, Dynamic>,

    /// Shared secret, base64 encoded.
    #[config(hidden)]
    pub secret: bytes::Bytes,
}

#[derive(Config, Debug, Default)]
struct Server {
    #[config(default = "127.0.0.1")]
    pub host: String,

    #[config(short = 'p', default = 8080)]
    pub port: u16,

    /// Request timeout in `seconds`.
    #[config(default = 2.5)]
    pub timeout: f64,

    pub tls: Option<Tls>,
}

#[derive(Config, Debug, Default)]
struct Tls {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Config, Debug, Default)]
struct Upstream {
    pub url: String,
    pub weight: u32,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let mut config = DemoConfig::default();
    let result = Optfig::builder()
        .app_name("optfig_demo")
        .config_file_option("config")
        .default_file("demo.toml")
        .env_prefix("DEMO_")
        .load(&mut config);

    match result {
        Ok(()) => println!("{config:#?}"),
        Err(OptfigError::HelpRequested(usage)) => {
            print!("{usage}");
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    }
}
