// Settings persistence for the mosaic binary.
// Uses platform-native config dir: e.g. ~/Library/Application Support/mosaic/settings.json
// on macOS, ~/.config/mosaic/settings.json on Linux.

use mosaic_atlas::BankConfig;
use mosaic_core::{BorderFlags, PixelFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MosaicSettings {
    #[serde(default)]
    pub atlas: BankConfig,
    /// Border applied to every registered sprite.
    #[serde(default = "default_border")]
    pub border: BorderFlags,
    #[serde(default)]
    pub demo: DemoSettings,
}

fn default_border() -> BorderFlags {
    BorderFlags::EXTRUDE
}

impl Default for MosaicSettings {
    fn default() -> Self {
        Self {
            atlas: BankConfig::default(),
            border: default_border(),
            demo: DemoSettings::default(),
        }
    }
}

/// Generated sprite sheet used by the packing report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    pub sprite_count: usize,
    pub min_size: u32,
    pub max_size: u32,
    pub format: PixelFormat,
    pub seed: u64,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            sprite_count: 500,
            min_size: 8,
            max_size: 96,
            format: PixelFormat::Rgba8888,
            seed: 1,
        }
    }
}

fn settings_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("mosaic").join("settings.json"))
}

pub fn load_settings() -> MosaicSettings {
    let path = match settings_path() {
        Some(p) => p,
        None => return MosaicSettings::default(),
    };

    match std::fs::read_to_string(&path) {
        Ok(data) => match serde_json::from_str(&data) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to parse {}: {}", path.display(), e);
                MosaicSettings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // First run: write the defaults out so they can be edited.
            let settings = MosaicSettings::default();
            save_settings(&settings);
            settings
        }
        Err(e) => {
            log::warn!("Failed to read {}: {}", path.display(), e);
            MosaicSettings::default()
        }
    }
}

pub fn save_settings(settings: &MosaicSettings) {
    let path = match settings_path() {
        Some(p) => p,
        None => {
            log::warn!("Cannot determine settings path");
            return;
        }
    };

    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            log::error!("Failed to create config dir {}: {}", parent.display(), e);
            return;
        }
    }

    match serde_json::to_string_pretty(settings) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&path, json) {
                log::error!("Failed to write {}: {}", path.display(), e);
            }
        }
        Err(e) => {
            log::error!("Failed to serialize settings: {}", e);
        }
    }
}
