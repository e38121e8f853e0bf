use std::{
    path::PathBuf,
    sync::{Arc, RwLock},
    time::Duration,
};

use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::new_debouncer;
use tracing::{error, info, warn};

use crate::config::{AppConfig, loader};

const DEBOUNCE: Duration = Duration::from_millis(500);

/// Start watching a configuration file for changes.
/// On change, it will attempt to reload and validate configuration. If successful,
/// it updates the shared config and applies hot-reloadable settings (the logging level).
/// Everything else takes effect on the next restart.
///
/// Returns the watcher thread handle, or `None` when the file does not exist.
pub fn start_config_watcher(
    path: PathBuf,
    shared: Arc<RwLock<AppConfig>>,
) -> Option<std::thread::JoinHandle<()>> {
    if !path.exists() {
        warn!("config file {:?} does not exist; watcher disabled", path);
        return None;
    }

    let handle = std::thread::spawn(move || {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut debouncer = match new_debouncer(DEBOUNCE, tx) {
            Ok(d) => d,
            Err(e) => {
                error!("failed to start config watcher: {}", e);
                return;
            }
        };

        if let Err(e) = debouncer
            .watcher()
            .watch(&path, RecursiveMode::NonRecursive)
        {
            error!("failed to watch config file: {}", e);
            return;
        }
        info!(path = ?path, "watching configuration file");

        // Ends when the debouncer (and with it the sender) is dropped
        for res in rx {
            match res {
                Ok(_events) => match loader::load_config(path.to_str()) {
                    Ok(new_cfg) => {
                        crate::observability::apply_logging_level(&new_cfg.logging.level);
                        if let Ok(mut guard) = shared.write() {
                            *guard = new_cfg;
                        }
                        info!("configuration reloaded successfully");
                    }
                    Err(e) => {
                        error!("configuration reload failed: {}", e);
                    }
                },
                Err(e) => error!("watch error: {}", e),
            }
        }
    });

    Some(handle)
}
