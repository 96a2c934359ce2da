//! Configuration file management.

use std::path::{Path, PathBuf};

use gridmap_engine::EngineConfig;
use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// HTTP listener.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database and tile storage.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Pyramid and registration tunables.
    #[serde(default)]
    pub map: MapConfig,
    /// Live update stream.
    #[serde(default)]
    pub updates: UpdatesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = `$GRIDMAP_DATA_DIR` or `~/.gridmap`.
    #[serde(default)]
    pub data_dir: String,
}

/// Map configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Highest pyramid level.
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
    /// Tile edge in pixels.
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Seconds before a stored fragment is requested again.
    #[serde(default = "default_reupload_interval")]
    pub reupload_interval_secs: u64,
    /// New maps start hidden until an administrator changes the setting.
    #[serde(default)]
    pub default_hidden: bool,
}

/// Update stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatesConfig {
    /// Per-viewer tile event queue.
    #[serde(default = "default_tile_queue")]
    pub tile_queue_capacity: usize,
    /// Per-viewer merge event queue.
    #[serde(default = "default_merge_queue")]
    pub merge_queue_capacity: usize,
    /// Seconds between coalesced tile flushes.
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_zoom() -> u8 {
    gridmap_types::DEFAULT_MAX_ZOOM
}

fn default_tile_size() -> u32 {
    gridmap_types::DEFAULT_TILE_SIZE
}

fn default_reupload_interval() -> u64 {
    gridmap_types::DEFAULT_REUPLOAD_INTERVAL_SECS
}

fn default_tile_queue() -> usize {
    1000
}

fn default_merge_queue() -> usize {
    5
}

fn default_flush_interval() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            max_zoom: default_max_zoom(),
            tile_size: default_tile_size(),
            reupload_interval_secs: default_reupload_interval(),
            default_hidden: false,
        }
    }
}

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self {
            tile_queue_capacity: default_tile_queue(),
            merge_queue_capacity: default_merge_queue(),
            flush_interval_secs: default_flush_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_zoom: self.map.max_zoom,
            tile_size: self.map.tile_size,
            reupload_interval_secs: self.map.reupload_interval_secs,
            default_hidden: self.map.default_hidden,
            tile_queue_capacity: self.updates.tile_queue_capacity,
            merge_queue_capacity: self.updates.merge_queue_capacity,
        }
    }

    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("GRIDMAP_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".gridmap"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/gridmap"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.map.max_zoom, 5);
        assert_eq!(config.map.tile_size, 100);
        assert_eq!(config.map.reupload_interval_secs, 1800);
        assert_eq!(config.updates.tile_queue_capacity, 1000);
        assert_eq!(config.updates.merge_queue_capacity, 5);
        assert_eq!(config.updates.flush_interval_secs, 5);
        assert_eq!(config.logging.log_level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let _parsed: DaemonConfig = toml::from_str(&toml_str).expect("parse");
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[map]\nmax_zoom = 3\ndefault_hidden = true\n\n[storage]\ndata_dir = \"/srv/map\"\n",
        )
        .expect("write");
        let config = DaemonConfig::load_from(&path).expect("load");
        assert_eq!(config.map.max_zoom, 3);
        assert_eq!(config.map.tile_size, 100);
        assert_eq!(config.data_dir(), PathBuf::from("/srv/map"));

        let engine = config.engine_config();
        assert!(engine.default_hidden);
        assert_eq!(engine.max_zoom, 3);
    }

    #[test]
    fn test_missing_file_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = DaemonConfig::load_from(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(config.map.max_zoom, 5);
    }
}
