//! Configuration for castkeep paths and the CDN base URL.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CASTKEEP_HOME, CASTKEEP_STORAGE, CASTKEEP_CDN_URL)
//! 2. Config file (.castkeep/config.yaml)
//! 3. Defaults (~/.castkeep)
//!
//! Config file discovery:
//! - Searches current directory and parents for .castkeep/config.yaml
//! - Paths in config file are relative to the config file's parent directory
//!
//! Nothing here is cached globally; the CLI loads one `Config` and injects
//! it into the service.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Feed URLs resolve against this when no CDN is configured.
const DEFAULT_CDN_URL: &str = "http://localhost:8080";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub cdn_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to config file)
    pub home: Option<String>,
    /// Blob storage directory (relative to config file)
    pub storage: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute path to castkeep home (catalog state)
    pub home: PathBuf,
    /// Absolute path to the blob storage root
    pub storage_dir: PathBuf,
    /// Base URL the published feeds reference media under
    pub cdn_url: String,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self> {
        let default_home = dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".castkeep");

        let config_file = find_config_file();

        let (home, storage_dir, cdn_url) = if let Some(ref config_path) = config_file {
            let config = load_config_file(config_path)?;

            // Base directory is the parent of .castkeep/ (the project root)
            let castkeep_dir = config_path.parent().unwrap_or(Path::new("."));
            let base_dir = castkeep_dir.parent().unwrap_or(Path::new("."));

            let home = if let Ok(env_home) = std::env::var("CASTKEEP_HOME") {
                PathBuf::from(env_home)
            } else if let Some(ref home_path) = config.paths.home {
                resolve_path(castkeep_dir, home_path)
            } else {
                default_home.clone()
            };

            let storage_dir = if let Ok(env_storage) = std::env::var("CASTKEEP_STORAGE") {
                PathBuf::from(env_storage)
            } else if let Some(ref storage_path) = config.paths.storage {
                resolve_path(base_dir, storage_path)
            } else {
                home.join("storage")
            };

            let cdn_url = std::env::var("CASTKEEP_CDN_URL")
                .ok()
                .or(config.cdn_url)
                .unwrap_or_else(|| DEFAULT_CDN_URL.to_string());

            (home, storage_dir, cdn_url)
        } else {
            let home = std::env::var("CASTKEEP_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_home.clone());

            let storage_dir = std::env::var("CASTKEEP_STORAGE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home.join("storage"));

            let cdn_url = std::env::var("CASTKEEP_CDN_URL")
                .unwrap_or_else(|_| DEFAULT_CDN_URL.to_string());

            (home, storage_dir, cdn_url)
        };

        Ok(Self {
            home,
            storage_dir,
            cdn_url,
            config_file,
        })
    }

    /// Catalog database path ($CASTKEEP_HOME/catalog.db)
    pub fn catalog_path(&self) -> PathBuf {
        self.home.join("catalog.db")
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".castkeep").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}
