//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Lighting engine tuning.
    pub lighting: LightingConfig,
    /// Map and lightmap grid dimensions.
    pub map: MapConfig,
    /// Demo driver settings.
    pub demo: DemoConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Lighting engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    /// Maximum number of chunks handed to the renderer per frame.
    pub max_chunk_updates_per_frame: usize,
    /// Maximum number of outdated static-lit chunks recomputed per frame.
    pub max_static_updates_per_frame: usize,
    /// Capacity of each chunk's static light list.
    pub max_lights_per_chunk: usize,
    /// Run skylight propagation on a dedicated background thread.
    ///
    /// When disabled, skylight steps run inside every update instead.
    pub skylight_worker: bool,
    /// Pause between two skylight worker steps, in microseconds.
    pub worker_sleep_us: u64,
    /// Chunk steps run per update when the worker thread is disabled.
    pub skylight_steps_per_update: usize,
    /// Sky colour used outside the grid (RGB).
    pub ambient_sky: [u8; 3],
    /// Direction the skylight travels in (x, y, z with z up).
    pub skylight_direction: [f32; 3],
}

/// Map dimensions. The lightmap grid is derived from these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    /// Map width in tiles.
    pub tiles_x: u32,
    /// Map depth in tiles.
    pub tiles_y: u32,
    /// Number of vertical lightmap cells.
    pub height_cells: u32,
}

/// Demo driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    /// Number of simulated frames.
    pub frames: u32,
    /// Simulated frame length in milliseconds.
    pub frame_ms: u64,
    /// Seed for the procedural park layout.
    pub seed: u64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Write a JSON log file next to the config in debug builds.
    pub log_to_file: bool,
}

// --- Default implementations ---

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            max_chunk_updates_per_frame: 64,
            max_static_updates_per_frame: 100,
            max_lights_per_chunk: 64,
            skylight_worker: true,
            worker_sleep_us: 1000,
            skylight_steps_per_update: 256,
            ambient_sky: [180, 190, 210],
            skylight_direction: [0.35, 0.25, -1.0],
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tiles_x: 64,
            tiles_y: 64,
            height_cells: 64,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            frames: 240,
            frame_ms: 16,
            seed: 42,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: false,
        }
    }
}

/// Platform config directory for this application (`<config_dir>/parklight`).
///
/// Falls back to the current directory when the platform has no config dir.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("parklight"))
        .unwrap_or_else(|| PathBuf::from("."))
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).map_err(ConfigError::read(&config_path))?;
            let config: Config =
                ron::from_str(&contents).map_err(ConfigError::parse(&config_path))?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::write(config_dir))?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::write(&config_path))?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents =
            std::fs::read_to_string(&config_path).map_err(ConfigError::read(&config_path))?;
        let new_config: Config =
            ron::from_str(&contents).map_err(ConfigError::parse(&config_path))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(!ron_str.is_empty());
        assert!(ron_str.contains("max_chunk_updates_per_frame: 64"));
        assert!(ron_str.contains("tiles_x: 64"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_field_uses_default() {
        let ron_str = "(lighting: (skylight_worker: false), debug: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert!(!config.lighting.skylight_worker);
        assert_eq!(config.lighting.max_static_updates_per_frame, 100);
        assert_eq!(config.map, MapConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let ron_str = "(future_setting: true)";
        let result: Result<Config, _> = ron::from_str(ron_str);
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.map.tiles_x = 128;
        config.lighting.ambient_sky = [10, 20, 30];
        config.debug.log_level = "debug".to_string();

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.lighting.max_chunk_updates_per_frame = 8;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().lighting.max_chunk_updates_per_frame, 8);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "(lighting: (skylight_worker: 3))").unwrap();

        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(&err, ConfigError::Parse { path, .. } if path.ends_with("config.ron")));
        assert!(err.to_string().contains("config.ron"));
    }

    #[test]
    fn test_default_config_dir_is_namespaced() {
        let dir = default_config_dir();
        assert!(dir.ends_with("parklight") || dir == PathBuf::from("."));
    }
}
