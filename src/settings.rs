use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Optional on-disk defaults. Every field may be omitted; command-line flags
/// win over anything set here.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub serial: SerialSettings,
    #[serde(default)]
    pub game: GameSettings,
    #[serde(default)]
    pub input: InputSettings,
    #[serde(default)]
    pub classifier: ClassifierSettings,
}

#[derive(Debug, Default, Deserialize)]
pub struct SerialSettings {
    pub port: Option<String>,
    pub baud: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GameSettings {
    pub tick_speed: Option<u32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub fps: Option<u32>,
    pub large_burnout_life: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InputSettings {
    pub key_hold_ms: Option<u64>,
    pub mic: Option<bool>,
    pub mic_gain: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClassifierSettings {
    pub predictions: Option<PathBuf>,
}

impl Settings {
    /// Load the user's settings file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match Self::from_file(&path) {
            Ok(settings) => {
                tracing::info!(path = %path.display(), "loaded settings");
                settings
            }
            Err(e) => {
                tracing::warn!("ignoring settings: {e}");
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| Error::Settings {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("termfire")
            .join("config.toml")
    }
}
