use std::{
    env,
    path::PathBuf,
    sync::{Arc, RwLock},
};

use medimart_server::ServerBuilder;
use medimart_server::config::loader::load_config;
use medimart_server::config_watch::start_config_watcher;

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    CliArgument,
    EnvironmentVariable,
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (MEDIMART_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    medimart_server::observability::init_tracing();

    let (config_path, source) = resolve_config_path();

    let cfg = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %config_path,
        source = %source,
        storage = ?cfg.storage.backend,
        "Configuration loaded"
    );

    medimart_server::observability::apply_logging_level(&cfg.logging.level);

    let shared_config = Arc::new(RwLock::new(cfg.clone()));
    if start_config_watcher(PathBuf::from(&config_path), shared_config).is_some() {
        tracing::info!("Hot-reload enabled");
    }

    let server = match ServerBuilder::new().with_config(cfg).build().await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Server initialization failed: {e:#}");
            std::process::exit(2);
        }
    };

    if let Err(err) = server.run().await {
        eprintln!("Server error: {err:#}");
        std::process::exit(1);
    }
}

/// Priority: `--config <path>`, then `MEDIMART_CONFIG`, then `medimart.toml`.
fn resolve_config_path() -> (String, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (path, ConfigSource::CliArgument);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return (path.to_string(), ConfigSource::CliArgument);
        }
    }

    if let Ok(path) = env::var("MEDIMART_CONFIG")
        && !path.is_empty()
    {
        return (path, ConfigSource::EnvironmentVariable);
    }

    ("medimart.toml".to_string(), ConfigSource::Default)
}
