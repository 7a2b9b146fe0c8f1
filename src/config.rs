use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MIN_POLL_INTERVAL_MS: u64 = 100;
pub const MAX_POLL_INTERVAL_MS: u64 = 500;

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("orbit")
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_duration_minutes() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

/// Location of the settings file, `~/.config/orbit/config.json` on Linux.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("orbit")
        .join("config.json")
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OrbitConfig {
    #[serde(default = "default_data_dir")]
    pub data_directory: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_true")]
    pub desktop_notifications: bool,
    #[serde(default)]
    pub debug_logging: bool,
    /// Cycle length given to a loop file that does not exist yet.
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: u32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            data_directory: default_data_dir(),
            poll_interval_ms: default_poll_interval_ms(),
            desktop_notifications: true,
            debug_logging: false,
            default_duration_minutes: default_duration_minutes(),
        }
    }
}

impl OrbitConfig {
    /// Load settings from `path`. A missing or unreadable file gives the defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn loop_path(&self) -> PathBuf {
        self.data_directory.join("loop.org")
    }

    /// Host polling cadence, kept within 100–500 ms.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.poll_interval_ms
                .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS),
        )
    }

    /// Ensure the data directory exists.
    pub fn ensure_files(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_is_clamped() {
        let mut config = OrbitConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        config.poll_interval_ms = 5;
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        config.poll_interval_ms = 10_000;
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: OrbitConfig =
            serde_json::from_str(r#"{"data_directory": "/tmp/orbit-test"}"#).unwrap();
        assert_eq!(config.data_directory, PathBuf::from("/tmp/orbit-test"));
        assert_eq!(config.poll_interval_ms, 250);
        assert!(config.desktop_notifications);
        assert!(!config.debug_logging);
        assert_eq!(config.default_duration_minutes, 60);
    }

    #[test]
    fn load_reads_written_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(OrbitConfig::load(&path), OrbitConfig::default());

        let config = OrbitConfig {
            data_directory: dir.path().to_path_buf(),
            poll_interval_ms: 400,
            desktop_notifications: false,
            debug_logging: true,
            default_duration_minutes: 25,
        };
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(OrbitConfig::load(&path), config);
        assert_eq!(config.loop_path(), dir.path().join("loop.org"));
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(OrbitConfig::load(&path), OrbitConfig::default());
    }
}
