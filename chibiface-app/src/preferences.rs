use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use chibiface_core::CropParams;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppPreferences {
    #[serde(default = "default_window_width")]
    pub window_width: f32,
    #[serde(default = "default_window_height")]
    pub window_height: f32,
    /// Restore the crop sliders from the previous session on startup.
    #[serde(default = "default_true")]
    pub restore_last_params: bool,
    #[serde(default)]
    pub last_params: Option<CropParams>,
    /// Directory of the last export. When empty, the file dialog decides.
    #[serde(default)]
    pub export_dir: String,
}

fn default_window_width() -> f32 {
    1200.0
}
fn default_window_height() -> f32 {
    800.0
}
fn default_true() -> bool {
    true
}

impl Default for AppPreferences {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            restore_last_params: true,
            last_params: None,
            export_dir: String::new(),
        }
    }
}

impl AppPreferences {
    /// Load preferences from next to the executable, falling back to defaults.
    pub fn load() -> Self {
        let path = config_path();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(json) => match serde_json::from_str::<AppPreferences>(&json) {
                    Ok(prefs) => {
                        info!("Loaded preferences from {}", path.display());
                        return prefs;
                    }
                    Err(e) => {
                        error!("Failed to parse preferences: {e}");
                    }
                },
                Err(e) => {
                    error!("Failed to read preferences file: {e}");
                }
            }
        } else {
            debug!("No preferences file at {}", path.display());
        }
        Self::default()
    }

    /// Persist preferences to disk.
    pub fn save(&self) {
        let path = config_path();
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory: {e}");
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(&path, &json) {
                    error!("Failed to write preferences: {e}");
                } else {
                    debug!("Saved preferences");
                }
            }
            Err(e) => error!("Failed to serialize preferences: {e}"),
        }
    }
}

fn config_path() -> PathBuf {
    crate::app_dir::exe_directory().join("preferences.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let prefs: AppPreferences = serde_json::from_str("{}").expect("should parse");
        assert_eq!(prefs.window_width, 1200.0);
        assert!(prefs.restore_last_params);
        assert!(prefs.last_params.is_none());
        assert!(prefs.export_dir.is_empty());
    }

    #[test]
    fn round_trips_crop_params() {
        let mut prefs = AppPreferences::default();
        prefs.last_params = Some(CropParams {
            scale: 2.2,
            v_offset: -15.0,
            tone: 40.0,
        });
        let json = serde_json::to_string(&prefs).expect("should serialize");
        let back: AppPreferences = serde_json::from_str(&json).expect("should parse");
        assert_eq!(back.last_params, prefs.last_params);
    }
}
