use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use pagedir_base::{ErrorKind, PagedirError, PagedirResult, ResultExt};

use crate::page::{NewPage, Position};

/// Configuration for a page directory run, read from `pagedir.toml`.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Title printed above the directory listing.
    pub title: String,
    /// JSON or YAML file holding the pages to load, relative to the config file.
    pub pages_file: PathBuf,
    /// Reorders applied after loading, in order.
    #[serde(default)]
    pub moves: Vec<MoveConfig>,
}

/// A requested position change for one page.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveConfig {
    pub api: String,
    /// Page name; ids are generated at load time.
    pub page: String,
    pub order: Position,
}

/// A page entry of the seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedPage {
    pub api: String,
    #[serde(flatten)]
    pub page: NewPage,
}

/// Load `pagedir.toml`, resolving `pages_file` against the config's directory.
pub fn load_config(path: &Path) -> PagedirResult<Config> {
    debug!(path = %path.display(), "Loading configuration");
    let text = read_file(path)?;
    let mut config = toml::from_str::<Config>(&text)
        .map_err(|e| config_error(e.to_string()))
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    if config.pages_file.is_relative() {
        if let Some(dir) = path.parent() {
            config.pages_file = dir.join(&config.pages_file);
        }
    }
    Ok(config)
}

/// Load seed pages from a `.json`, `.yaml` or `.yml` file.
pub fn load_seed_pages(path: &Path) -> PagedirResult<Vec<SeedPage>> {
    debug!(path = %path.display(), "Loading seed pages");
    let text = read_file(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let pages: PagedirResult<Vec<SeedPage>> = match extension.as_deref() {
        Some("json") => {
            serde_json::from_str(&text).map_err(|e| config_error(e.to_string()))
        }
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&text).map_err(|e| config_error(e.to_string()))
        }
        _ => Err(config_error(
            "seed file must have a .json, .yaml or .yml extension".to_string(),
        )),
    };
    pages.with_context(|| format!("Failed to load pages from {}", path.display()))
}

fn read_file(path: &Path) -> PagedirResult<String> {
    std::fs::read_to_string(path).map_err(|source| {
        PagedirError::boxed(ErrorKind::FileError {
            path: path.to_path_buf(),
            source,
        })
    })
}

fn config_error(message: String) -> Box<PagedirError> {
    PagedirError::boxed(ErrorKind::ConfigError { message })
}
