use crate::domain::config::{DevCmdConfig, DeviceConfig, GlobalConfig, DEFAULT_PULSES_PER_KWH};
use crate::domain::error::{DevCmdError, DevCmdResult};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "devcmd";
const PROJECT_DIR_NAME: &str = ".devcmd";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration manager
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> DevCmdResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Manager over explicit file locations
    pub fn with_paths(global_config_path: PathBuf, project_config_path: Option<PathBuf>) -> Self {
        Self {
            global_config_path,
            project_config_path,
        }
    }

    /// Load configuration from files
    pub fn load_config(&self) -> DevCmdResult<DevCmdConfig> {
        // Start with default configuration
        let mut config = DevCmdConfig::default();

        if self.global_config_path.exists() {
            config = self.load_config_from_path(&self.global_config_path)?;
        }

        // Project devices extend the global ones; a project default wins
        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                let project_config = self.load_config_from_path(project_path)?;
                if project_config.global.default_device.is_some() {
                    config.global.default_device = project_config.global.default_device;
                }
                config.devices.extend(project_config.devices);
            }
        }

        Ok(config)
    }

    /// Get global configuration path
    fn get_global_config_path() -> DevCmdResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| DevCmdError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        Self::find_project_config_from(&current_dir)
    }

    fn find_project_config_from(start: &Path) -> Option<PathBuf> {
        let mut path = start;

        loop {
            let config_path = path.join(PROJECT_DIR_NAME).join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> DevCmdResult<DevCmdConfig> {
        let content = fs::read_to_string(path).map_err(|e| DevCmdError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| DevCmdError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &DevCmdConfig) -> DevCmdResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| DevCmdError::Config {
                message: format!("Failed to create config directory {}: {}", parent.display(), e),
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| DevCmdError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| DevCmdError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Create default project configuration under `path/.devcmd/`
    pub fn init_project_config(&self, path: &Path) -> DevCmdResult<PathBuf> {
        let config_file = path.join(PROJECT_DIR_NAME).join(CONFIG_FILE_NAME);

        if config_file.exists() {
            return Err(DevCmdError::Config {
                message: format!("Project configuration already exists at {}", config_file.display()),
            });
        }

        let default_config = DevCmdConfig {
            global: GlobalConfig {
                default_device: Some("garage".to_string()),
                ..GlobalConfig::default()
            },
            devices: vec![DeviceConfig {
                name: "garage".to_string(),
                description: "Power meter and garage door controller".to_string(),
                host: "192.168.0.24".to_string(),
                port: 6438,
                connect_timeout_ms: Some(3000),
                read_timeout_ms: Some(3000),
                pulses_per_kwh: DEFAULT_PULSES_PER_KWH,
            }],
        };

        self.save_config_to_path(&config_file, &default_config)?;

        Ok(config_file)
    }

    /// Get the global config path
    pub fn get_global_config_path_ref(&self) -> &PathBuf {
        &self.global_config_path
    }
}
