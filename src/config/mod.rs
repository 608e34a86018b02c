//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding the configured server URL
pub const SERVER_ENV_VAR: &str = "SNAPSUM_SERVER";

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Job backend connection
    pub server: ServerSettings,
    /// Dashboard preferences
    pub ui: UiSettings,
}

/// Job backend connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Base URL the `/api/...` endpoints are resolved against
    pub base_url: String,
    /// TCP connect timeout
    pub connect_timeout_secs: u64,
    /// Upper bound for the upload request
    pub upload_timeout_secs: u64,
    /// Close the event stream after this long without any bytes (pings included)
    pub stream_idle_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            connect_timeout_secs: 10,
            upload_timeout_secs: 120,
            stream_idle_timeout_secs: 60,
        }
    }
}

/// Dashboard preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Largest preview edge in pixels
    pub preview_max_size: u32,
    /// Initial window size
    pub window_size: (f32, f32),
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            preview_max_size: 360,
            window_size: (960.0, 680.0),
        }
    }
}

impl AppConfig {
    /// Apply `SNAPSUM_SERVER` if set and non-empty
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(SERVER_ENV_VAR) {
            let url = url.trim();
            if !url.is_empty() {
                self.server.base_url = url.to_string();
            }
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.server.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.server.connect_timeout_secs, 10);
        assert_eq!(config.server.upload_timeout_secs, 120);
        assert_eq!(config.server.stream_idle_timeout_secs, 60);

        assert_eq!(config.ui.preview_max_size, 360);
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.server.base_url = "http://ocr.lan:9000".to_string();
        config.server.stream_idle_timeout_secs = 15;
        config.ui.preview_max_size = 512;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [server]
            base_url = "http://10.0.0.2:8090"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.server.base_url, "http://10.0.0.2:8090");
        assert_eq!(parsed.server.stream_idle_timeout_secs, 60);
        assert_eq!(parsed.ui, UiSettings::default());
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.server.upload_timeout_secs = 30;
        save_config(&config, &path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
