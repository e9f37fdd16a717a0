use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use wind_estimator_core::WindSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub baud_rate: u32,
    /// ms, a read that times out just means the link is quiet
    pub read_timeout: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            read_timeout: 500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlideConfig {
    pub serial: SerialConfig,
    pub wind: WindSettings,
}

impl GlideConfig {
    /// Reads the config, writing the defaults first if there is none.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = Self::config_path(path);

        if !config_path.exists() {
            let config = Self::default();
            config.save(Some(&config_path))?;
            return Ok(config);
        }

        let config_str = fs::read_to_string(config_path)?;
        let config = toml::from_str(&config_str)?;
        Ok(config)
    }

    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = Self::config_path(path);
        let config_str = toml::to_string_pretty(self)?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(config_path, config_str)?;
        Ok(())
    }

    fn config_path(path: Option<&Path>) -> PathBuf {
        path.map_or_else(|| ".glide-cli.toml".into(), Path::to_path_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: GlideConfig = toml::from_str(
            "[serial]\nbaud_rate = 115200\n\n[wind.zigzag]\nwindow_capacity = 24\n",
        )
        .unwrap();
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.serial.read_timeout, 500);
        assert_eq!(config.wind.zigzag.window_capacity, 24);
        assert_eq!(config.wind.ekf, Default::default());
    }

    #[test]
    fn defaults_survive_toml() {
        let config = GlideConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(toml::from_str::<GlideConfig>(&text).unwrap(), config);
    }
}
