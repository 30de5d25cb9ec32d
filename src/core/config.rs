/*
 * Session configuration for the explorer. An `ExplorerConfig` is loaded once,
 * then handed by reference to each component at construction; nothing reads
 * configuration from ambient state afterwards.
 *
 * Loading goes through the `ConfigManagerOperations` trait so callers and tests
 * can substitute their own source. `CoreConfigManager` reads a JSON file from
 * the platform-local configuration directory, falling back to defaults when no
 * file is present.
 */
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::models::Action;
use crate::core::sort_engine::{FolderPosition, SortField, SortOrder};

const CONFIG_FILENAME: &str = "explorer_config.json";

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Json(serde_json::Error),
    NoProjectDirectory,
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {e}"),
            ConfigError::Json(e) => write!(f, "Configuration JSON error: {e}"),
            ConfigError::NoProjectDirectory => {
                write!(f, "Could not determine project directory for configuration")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            ConfigError::NoProjectDirectory => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    pub allow_multiple_selection: bool,
    pub allowed_actions: Vec<Action>,
    // Storage quota in bytes, reported alongside summaries.
    pub file_root_size_limit: Option<u64>,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        OptionsConfig {
            allow_multiple_selection: true,
            allowed_actions: Action::all(),
            file_root_size_limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiletreeConfig {
    pub enabled: bool,
    pub folders_only: bool,
}

impl Default for FiletreeConfig {
    fn default() -> Self {
        FiletreeConfig {
            enabled: true,
            folders_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    pub field: SortField,
    pub order: SortOrder,
    pub folder_position: FolderPosition,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub enabled: bool,
    pub case_sensitive: bool,
    pub typing_delay_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            enabled: true,
            case_sensitive: false,
            typing_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    pub enabled: bool,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        ClipboardConfig { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub root_path: String,
    pub root_label: String,
    pub options: OptionsConfig,
    pub filetree: FiletreeConfig,
    pub sort: SortConfig,
    pub search: SearchConfig,
    // Filter name -> allowed file extensions (without the dot).
    pub filters: HashMap<String, Vec<String>>,
    pub clipboard: ClipboardConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        ExplorerConfig {
            root_path: "/".to_string(),
            root_label: "Files".to_string(),
            options: OptionsConfig::default(),
            filetree: FiletreeConfig::default(),
            sort: SortConfig::default(),
            search: SearchConfig::default(),
            filters: HashMap::new(),
            clipboard: ClipboardConfig::default(),
        }
    }
}

impl ExplorerConfig {
    pub fn is_action_allowed(&self, action: Action) -> bool {
        self.options.allowed_actions.contains(&action)
    }
}

pub trait ConfigManagerOperations: Send + Sync {
    fn load_config(&self, app_name: &str) -> Result<ExplorerConfig>;
    fn load_config_from_path(&self, path: &Path) -> Result<ExplorerConfig>;
}

pub struct CoreConfigManager {}

impl CoreConfigManager {
    pub fn new() -> Self {
        CoreConfigManager {}
    }

    fn config_dir(app_name: &str) -> Option<PathBuf> {
        ProjectDirs::from("", "", app_name).map(|dirs| dirs.config_local_dir().to_path_buf())
    }
}

impl Default for CoreConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManagerOperations for CoreConfigManager {
    /*
     * Loads `explorer_config.json` from the application's local configuration
     * directory. A missing file is not an error: the defaults are returned.
     */
    fn load_config(&self, app_name: &str) -> Result<ExplorerConfig> {
        log::trace!("CoreConfigManager: Loading explorer config for app '{app_name}'");
        let config_dir = Self::config_dir(app_name).ok_or(ConfigError::NoProjectDirectory)?;
        let file_path = config_dir.join(CONFIG_FILENAME);
        if !file_path.exists() {
            log::debug!("CoreConfigManager: Config file {file_path:?} does not exist, using defaults.");
            return Ok(ExplorerConfig::default());
        }
        self.load_config_from_path(&file_path)
    }

    fn load_config_from_path(&self, path: &Path) -> Result<ExplorerConfig> {
        let contents = fs::read_to_string(path)?;
        let config: ExplorerConfig = serde_json::from_str(&contents)?;
        log::debug!(
            "CoreConfigManager: Loaded config from {path:?} (root '{}', {} filters).",
            config.root_path,
            config.filters.len()
        );
        Ok(config)
    }
}
