//! Hot reload of `salatr.toml`.
//!
//! The watcher observes the config directory (editors usually replace files rather
//! than write them in place), reloads the file after a change and hands the parsed
//! settings to the controller. A file that fails to load is reported and ignored;
//! the controller keeps its current settings.

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use super::Config;
use crate::io::signals::ControlEvent;
use crate::utils::private_path;

/// Editors often write a file in several steps.
const DEBOUNCE_MS: u64 = 500;

pub struct ConfigWatcher {
    sender: Sender<ControlEvent>,
    config_path: PathBuf,
    debug_enabled: bool,
}

impl ConfigWatcher {
    pub fn new(sender: Sender<ControlEvent>, config_path: PathBuf, debug_enabled: bool) -> Self {
        Self {
            sender,
            config_path,
            debug_enabled,
        }
    }

    /// Spawn the watcher thread.
    pub fn start(self) -> Result<()> {
        let watch_dir = self
            .config_path
            .parent()
            .context("Config path has no parent directory")?
            .to_path_buf();

        let (tx, rx) = std::sync::mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Ok(event) = res
                    && matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    )
                {
                    let _ = tx.send(event);
                }
            },
            NotifyConfig::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", watch_dir.display()))?;

        if self.debug_enabled {
            log_pipe!();
            log_debug!("Watching {} for changes", private_path(&self.config_path));
        }

        thread::spawn(move || {
            // Dropping the watcher stops event delivery
            let _watcher = watcher;
            let mut last_reload: Option<Instant> = None;

            for event in rx {
                if !event.paths.iter().any(|p| affects_config(p, &self.config_path)) {
                    continue;
                }

                if last_reload.is_some_and(|at| at.elapsed() < Duration::from_millis(DEBOUNCE_MS)) {
                    continue;
                }

                // Let the writer finish before reading
                thread::sleep(Duration::from_millis(50));
                last_reload = Some(Instant::now());

                if !self.config_path.exists() {
                    continue;
                }

                match Config::load_from_path(&self.config_path) {
                    Ok(config) => {
                        if self
                            .sender
                            .send(ControlEvent::ConfigChanged(Box::new(config)))
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        log_pipe!();
                        log_warning!("Ignoring configuration change: {e:#}");
                    }
                }
            }
        });

        Ok(())
    }
}

/// Matches the config file itself and editor temp files written next to it.
fn affects_config(event_path: &Path, config_path: &Path) -> bool {
    if event_path == config_path {
        return true;
    }

    let same_dir = event_path.parent() == config_path.parent();
    let names = event_path
        .file_name()
        .and_then(|n| n.to_str())
        .zip(config_path.file_name().and_then(|n| n.to_str()));

    same_dir && names.is_some_and(|(event_name, config_name)| event_name.starts_with(config_name))
}

/// Start watching the active config file for changes.
pub fn start_config_watcher(
    sender: Sender<ControlEvent>,
    config_path: PathBuf,
    debug_enabled: bool,
) -> Result<()> {
    ConfigWatcher::new(sender, config_path, debug_enabled).start()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affects_config_matches_editor_temp_files() {
        let config = Path::new("/home/user/.config/salatr/salatr.toml");
        assert!(affects_config(config, config));
        assert!(affects_config(
            Path::new("/home/user/.config/salatr/salatr.toml.swp"),
            config
        ));
        assert!(!affects_config(
            Path::new("/home/user/.config/salatr/other.toml"),
            config
        ));
        assert!(!affects_config(
            Path::new("/tmp/salatr.toml"),
            config
        ));
    }
}
