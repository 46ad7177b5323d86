//! Optional config from .depsolverc or ~/.depsolverc (JSON). Merged with env and CLI.

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const CONFIG_FILE: &str = ".depsolverc";

/// Optional config from file. Env and CLI override these.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Index file used when `--index` is not given.
    pub index: Option<PathBuf>,
    /// Print results as JSON.
    pub json: Option<bool>,
    /// Colored output; `None` means "when stdout is a terminal".
    pub color: Option<bool>,
}

/// Load config from .depsolverc in `dir`, then ~/.depsolverc. The first file
/// found wins; a missing or invalid file yields the default.
pub fn load_config(dir: &Path) -> Config {
    let candidates = [
        Some(dir.join(CONFIG_FILE)),
        dirs::home_dir().map(|home| home.join(CONFIG_FILE)),
    ];
    for path in candidates.into_iter().flatten() {
        if path.is_file() {
            return read_config(&path);
        }
    }
    Config::default()
}

fn read_config(path: &Path) -> Config {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("ignoring {}: {}", path.display(), e);
            return Config::default();
        }
    };
    match serde_json::from_str::<Config>(&content) {
        Ok(mut cfg) => {
            // Relative index paths are relative to the config file.
            if let (Some(index), Some(parent)) = (cfg.index.as_mut(), path.parent()) {
                if index.is_relative() {
                    *index = parent.join(&*index);
                }
            }
            log::debug!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            log::warn!("ignoring invalid {}: {}", path.display(), e);
            Config::default()
        }
    }
}

impl Config {
    /// Apply `DEPSOLVE_INDEX` and `NO_COLOR` on top of the file settings.
    pub fn with_env(self) -> Self {
        self.with_overrides(
            std::env::var_os("DEPSOLVE_INDEX").map(PathBuf::from),
            std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()),
        )
    }

    fn with_overrides(mut self, index: Option<PathBuf>, no_color: bool) -> Self {
        if let Some(index) = index {
            self.index = Some(index);
        }
        if no_color {
            self.color = Some(false);
        }
        self
    }
}
